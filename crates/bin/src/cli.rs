//! CLI argument definitions for the servicehub binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use servicehub::Role;

/// Smart ServiceHub session tooling
#[derive(Parser, Debug)]
#[command(name = "servicehub")]
#[command(about = "Smart ServiceHub: inspect routing decisions and exercise the session core")]
#[command(version)]
pub struct Cli {
    /// JSON settings file. Defaults apply when omitted.
    #[arg(short, long, global = true, env = "SERVICEHUB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show how the route guard treats a location
    Route(RouteArgs),
    /// List the public-route predicates
    Routes,
    /// Register or sign in a user and print the resulting session
    Demo(DemoArgs),
    /// Print the effective settings
    Config,
}

/// Arguments for the route command
#[derive(clap::Args, Debug)]
pub struct RouteArgs {
    /// Location to classify, e.g. `/profile?tab=stats`
    pub path: String,

    /// Evaluate as a signed-in visitor
    #[arg(long)]
    pub authenticated: bool,

    /// Evaluate a guard mounted with `requireAuth` off
    #[arg(long)]
    pub no_require_auth: bool,
}

/// Arguments for the demo command
#[derive(clap::Args, Debug)]
pub struct DemoArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub password: String,

    /// Display name for a new account
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "user")]
    pub role: Role,

    #[arg(long)]
    pub phone: Option<String>,

    /// Directory holding the durable store (servicehub.json)
    #[arg(short = 'D', long, env = "SERVICEHUB_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}
