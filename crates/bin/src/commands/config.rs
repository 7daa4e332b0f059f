//! Config command - print the effective settings.

use servicehub::Settings;

use crate::output::{OutputFormat, print_json};

/// Run the config command
pub fn run(settings: &Settings, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Human => {
            let keys = settings.keys();
            println!("Storage prefix:    {}", settings.storage_prefix);
            println!("Home route:        {}", settings.home_route);
            println!("Prompt delay:      {} ms", settings.prompt_delay_ms);
            println!("Auto-close delay:  {} ms", settings.auto_close_delay_ms);
            println!("Dismiss fade:      {} ms", settings.dismiss_fade_ms);
            println!("Settle timeout:    {} ms", settings.session_settle_timeout_ms);
            println!("Public routes:     {}", settings.public_routes.len());
            println!("Identity key:      {}", keys.identity());
            println!("Token key:         {}", keys.token());
            println!("Profile key:       {}", keys.profile("<uid>"));
            println!("Prompt-seen key:   {}", keys.prompt_seen());
        }
        OutputFormat::Json => print_json(settings)?,
    }
    Ok(())
}
