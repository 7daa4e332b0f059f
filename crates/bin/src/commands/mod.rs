pub mod config;
pub mod demo;
pub mod route;
pub mod routes;
