//! Demo command - run a signup through the credential form against the
//! in-process identity provider and print the merged session user.
//!
//! The provider lives only as long as the process, so every run creates a new
//! account. The profile blob written for it is removed again on exit.

use std::{path::PathBuf, sync::Arc};

use servicehub::{
    CredentialForm, FileStore, IdentityAdapter, KeyValueStore, SessionStore, Settings, SystemClock,
    identity::InMemoryIdentityBackend,
};

use crate::cli::DemoArgs;
use crate::output::{OutputFormat, print_json};

const STORE_FILE: &str = "servicehub.json";

fn fill_signup(form: &mut CredentialForm, args: &DemoArgs) {
    form.set_email(args.email.clone());
    form.set_password(args.password.clone());
    form.set_confirm_password(args.password.clone());
    form.set_full_name(args.name.clone());
    form.set_phone(args.phone.clone().unwrap_or_default());
}

/// Run the demo command
pub async fn run(args: &DemoArgs, settings: &Settings, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = args.data_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(data_dir.join(STORE_FILE))?);
    let keys = settings.keys();

    let adapter = IdentityAdapter::new(
        Arc::new(InMemoryIdentityBackend::new()),
        Arc::clone(&store),
        Arc::new(SystemClock),
        keys.clone(),
    );
    let session = SessionStore::start(adapter.clone(), Arc::clone(&store), keys.clone())?;

    let mut form = CredentialForm::new(session.clone(), settings.session_settle_timeout());
    form.switch_mode();
    form.set_role(args.role);
    fill_signup(&mut form, args);
    let user = form.submit().await?;

    match format {
        OutputFormat::Human => {
            println!("Signed in:   {}", user.uid);
            println!("Name:        {}", user.display_name.as_deref().unwrap_or("-"));
            println!("Role:        {}", user.role);
            println!("Verified:    {}", if user.is_email_verified { "yes" } else { "no" });
            println!("Badges:      {}", user.profile.achievements.len());
            println!("Store:       {}", data_dir.join(STORE_FILE).display());
        }
        OutputFormat::Json => print_json(user.as_ref())?,
    }

    adapter.sign_out().await;
    session.shutdown();
    store.remove(&keys.profile(&user.uid))?;
    if adapter.cached_identity().is_some() {
        tracing::warn!("Identity still cached after sign out");
    }

    Ok(())
}
