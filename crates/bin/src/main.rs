use clap::Parser;
use servicehub::Settings;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use output::OutputFormat;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("servicehub=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let format = OutputFormat::from_flag(cli.json);

    match &cli.command {
        Commands::Route(args) => commands::route::run(args, &settings, format),
        Commands::Routes => commands::routes::run(&settings, format),
        Commands::Demo(args) => commands::demo::run(args, &settings, format).await,
        Commands::Config => commands::config::run(&settings, format),
    }
}
