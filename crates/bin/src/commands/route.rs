//! Route command - classify a location and show the guard's decision.

use std::sync::Arc;

use servicehub::{
    GuardOutcome, MemoryStore, Role, RouteGuard, SessionState, SessionUser, Settings,
    guard::normalize_path,
};

use crate::cli::RouteArgs;
use crate::output::{OutputFormat, print_json};

fn visitor(authenticated: bool) -> SessionState {
    if !authenticated {
        return SessionState::Anonymous;
    }
    SessionState::Authenticated(Arc::new(SessionUser {
        uid: "cli-visitor".to_string(),
        email: None,
        display_name: Some("CLI visitor".to_string()),
        photo_url: None,
        role: Role::User,
        is_email_verified: false,
        created_at: None,
        last_login: None,
        profile: Default::default(),
    }))
}

/// Run the route command
pub fn run(args: &RouteArgs, settings: &Settings, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let is_public = settings.route_table().is_public(&args.path);
    let session = visitor(args.authenticated);

    // A fresh guard with an empty session-scoped store, as on a first visit.
    let mut guard = RouteGuard::mount(settings, Arc::new(MemoryStore::new()), !args.no_require_auth);
    let outcome = guard.render(&session, &args.path);

    match format {
        OutputFormat::Human => {
            println!("Location:    {}", args.path);
            if let Some(path) = normalize_path(&args.path) {
                println!("Path:        {path}");
            }
            println!("Public:      {}", if is_public { "yes" } else { "no" });
            println!("Session:     {:?}", session.status());
            let decision = match &outcome {
                GuardOutcome::Loading => "loading".to_string(),
                GuardOutcome::Render => "render".to_string(),
                GuardOutcome::RenderWithPrompt => "render with sign-in prompt".to_string(),
                GuardOutcome::Redirect { to, .. } => format!("redirect to {to}"),
            };
            println!("Outcome:     {decision}");
        }
        OutputFormat::Json => {
            print_json(&serde_json::json!({
                "location": args.path,
                "path": normalize_path(&args.path),
                "public": is_public,
                "session": session.status(),
                "require_auth": guard.require_auth(),
                "decision": outcome,
            }))?;
        }
    }

    Ok(())
}
