//! Route guard
//!
//! Classifies navigation targets against the public-route table and decides,
//! per render, whether a guarded subtree is shown, redirected, or shown under
//! the soft sign-in prompt.

pub mod route_guard;
pub mod routes;

pub use route_guard::{GuardOutcome, PromptFlags, RouteGuard};
pub use routes::{DEFAULT_PUBLIC_ROUTES, RoutePredicate, RouteTable, normalize_path};
