use std::{sync::Arc, time::Duration};

use servicehub::{
    CredentialForm, FixedClock, IdentityAdapter, KeyValueStore, MemoryStore, Role, RouteGuard,
    SessionState, SessionStore, SessionUser, Settings,
    identity::InMemoryIdentityBackend,
};
use tokio::sync::watch;

pub const EMAIL: &str = "a@x.com";
pub const PASSWORD: &str = "secret1";
pub const NAME: &str = "Ana";

/// Everything one browser tab would hold, wired to in-memory collaborators.
pub struct TestApp {
    pub backend: Arc<InMemoryIdentityBackend>,
    pub durable: MemoryStore,
    pub session_storage: MemoryStore,
    pub clock: Arc<FixedClock>,
    pub settings: Settings,
    pub adapter: IdentityAdapter,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let backend = Arc::new(InMemoryIdentityBackend::new());
        let durable = MemoryStore::new();
        let clock = Arc::new(FixedClock::default());
        let adapter = IdentityAdapter::new(
            backend.clone(),
            Arc::new(durable.clone()),
            clock.clone(),
            settings.keys(),
        );
        Self {
            backend,
            durable,
            session_storage: MemoryStore::new(),
            clock,
            settings,
            adapter,
        }
    }

    pub fn durable_store(&self) -> Arc<dyn KeyValueStore> {
        Arc::new(self.durable.clone())
    }

    /// Start the session store without waiting for the first callback.
    pub fn start_session(&self) -> SessionStore {
        SessionStore::start(self.adapter.clone(), self.durable_store(), self.settings.keys())
            .expect("session store starts")
    }

    /// Start the session store and wait until it leaves `Loading`.
    pub async fn settled_session(&self) -> SessionStore {
        let session = self.start_session();
        let rx = session.subscribe();
        wait_for_state(rx, |s| !s.is_loading()).await;
        session
    }

    pub fn form(&self, session: &SessionStore) -> CredentialForm {
        CredentialForm::new(session.clone(), self.settings.session_settle_timeout())
    }

    pub fn guard(&self, require_auth: bool) -> RouteGuard {
        RouteGuard::mount(&self.settings, Arc::new(self.session_storage.clone()), require_auth)
    }

    /// Register the default test account through the adapter.
    pub async fn register_default(&self) -> String {
        self.adapter
            .register(EMAIL, PASSWORD, NAME, Role::User, None)
            .await
            .expect("registration succeeds")
            .user
            .uid
    }
}

/// Wait (up to five seconds) until `pred` holds for the published state.
pub async fn wait_for_state(
    mut rx: watch::Receiver<SessionState>,
    pred: impl Fn(&SessionState) -> bool,
) -> SessionState {
    tokio::time::timeout(Duration::from_secs(5), async move {
        loop {
            let current = rx.borrow_and_update().clone();
            if pred(&current) {
                return current;
            }
            rx.changed().await.expect("session store alive");
        }
    })
    .await
    .expect("session reached expected state")
}

/// Wait until the session user is `uid`.
pub async fn wait_for_user(session: &SessionStore, uid: &str) -> Arc<SessionUser> {
    session
        .wait_for_user(uid, Duration::from_secs(5))
        .await
        .expect("session picked up user")
}

/// Fill a signup form with the default account.
pub fn fill_signup(form: &mut CredentialForm) {
    form.switch_mode();
    form.set_email(EMAIL);
    form.set_password(PASSWORD);
    form.set_confirm_password(PASSWORD);
    form.set_full_name(NAME);
}
