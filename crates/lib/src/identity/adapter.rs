//! Identity provider adapter
//!
//! Wraps an [`IdentityBackend`] behind the contract the rest of the app uses:
//! every expected failure comes back as an [`AuthFailure`] carrying a fixed
//! user-facing message, and the signed-in identity plus its bearer token are
//! mirrored into the durable store so they can be read synchronously.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::Mutex;

use super::{
    IdentitySubscription,
    backend::IdentityBackend,
    errors::{AuthFailure, IdentityError, ProviderError, ProviderErrorCode},
    types::{AuthSuccess, Identity, IdentityPatch, ProviderAccount, Role, SignInMethod},
};
use crate::{
    clock::Clock,
    config::StorageKeys,
    storage::{self, KeyValueStore},
};

/// Log a provider failure with its raw detail and reduce it to the mapped message.
fn failure(operation: &'static str, err: ProviderError) -> AuthFailure {
    if matches!(err.code, ProviderErrorCode::Other(_)) {
        tracing::error!(operation, code = %err.code, detail = %err.detail, "Unexpected identity provider failure");
    } else {
        tracing::warn!(operation, code = %err.code, detail = %err.detail, "Identity provider call failed");
    }
    AuthFailure::from(err)
}

/// Adapter over a remote identity backend.
///
/// Cheap to clone; clones share the backend, the cache and the subscription slot.
#[derive(Clone, Debug)]
pub struct IdentityAdapter {
    backend: Arc<dyn IdentityBackend>,
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    keys: StorageKeys,
    /// Serializes provider mutations with the subscription's profile lookup, so a
    /// sign-in event is resolved only after the operation that caused it finished
    /// writing the profile record.
    gate: Arc<Mutex<()>>,
    subscribed: Arc<AtomicBool>,
}

impl IdentityAdapter {
    /// Create an adapter.
    ///
    /// # Arguments
    /// * `backend` - The remote identity provider
    /// * `storage` - Durable store for the identity mirror and bearer token
    /// * `clock` - Time source for created-at and last-login stamps
    /// * `keys` - Storage key names
    pub fn new(
        backend: Arc<dyn IdentityBackend>,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        keys: StorageKeys,
    ) -> Self {
        Self {
            backend,
            storage,
            clock,
            keys,
            gate: Arc::new(Mutex::new(())),
            subscribed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn backend(&self) -> &Arc<dyn IdentityBackend> {
        &self.backend
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Create an account, name it, write its canonical profile record and sign it in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        role: Role,
        phone: Option<&str>,
    ) -> Result<AuthSuccess, AuthFailure> {
        let _gate = self.gate.lock().await;

        let account = self
            .backend
            .create_account(email, password)
            .await
            .map_err(|e| failure("register", e))?;

        self.backend
            .update_account(&account.uid, Some(display_name), None)
            .await
            .map_err(|e| failure("register", e))?;

        let now = self.clock.now();
        let identity = Identity {
            uid: account.uid.clone(),
            email: account.email.clone().unwrap_or_else(|| email.to_string()),
            display_name: Some(display_name.to_string()),
            photo_url: account.photo_url.clone(),
            role,
            phone: phone.filter(|p| !p.is_empty()).map(str::to_string),
            is_email_verified: account.email_verified,
            profile_completed: false,
            created_at: now,
            last_login: now,
        };
        self.backend
            .set_profile(&identity)
            .await
            .map_err(|e| failure("register", e))?;

        if let Err(e) = self.backend.send_email_verification(&identity.uid).await {
            tracing::warn!(uid = %identity.uid, error = %e, "Failed to send verification email");
        }

        self.store_session(&identity).await;
        tracing::info!(uid = %identity.uid, role = %identity.role, "Registered account");

        Ok(AuthSuccess {
            needs_verification: !account.email_verified,
            user: identity,
        })
    }

    /// Sign in with email and password.
    ///
    /// An account without a canonical profile record gets a default `user`
    /// record written instead of failing.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSuccess, AuthFailure> {
        let _gate = self.gate.lock().await;

        let account = self
            .backend
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| failure("authenticate", e))?;

        self.finish_sign_in(&account, SignInMethod::Password).await
    }

    /// Sign in through the external provider's popup.
    ///
    /// Missing profile records are created the same way as in [`authenticate`](Self::authenticate).
    pub async fn authenticate_with_external_provider(&self) -> Result<AuthSuccess, AuthFailure> {
        let _gate = self.gate.lock().await;

        let account = self
            .backend
            .sign_in_with_popup()
            .await
            .map_err(|e| failure("authenticate_external", e))?;

        self.finish_sign_in(&account, SignInMethod::External).await
    }

    async fn finish_sign_in(
        &self,
        account: &ProviderAccount,
        method: SignInMethod,
    ) -> Result<AuthSuccess, AuthFailure> {
        let now = self.clock.now();
        let existing = self
            .backend
            .get_profile(&account.uid)
            .await
            .map_err(|e| failure("authenticate", e))?;

        let identity = match existing {
            Some(mut record) => {
                record.last_login = now;
                record
            }
            None => {
                tracing::info!(
                    uid = %account.uid,
                    %method,
                    "No profile record for account, creating default"
                );
                Identity::from_account(account, now)
            }
        };
        self.backend
            .set_profile(&identity)
            .await
            .map_err(|e| failure("authenticate", e))?;

        self.store_session(&identity).await;
        tracing::info!(uid = %identity.uid, %method, "Signed in");

        Ok(AuthSuccess {
            needs_verification: !account.email_verified,
            user: identity,
        })
    }

    /// Request a password-reset email.
    pub async fn send_password_reset(&self, email: &str) -> Result<(), AuthFailure> {
        self.backend
            .send_password_reset(email)
            .await
            .map_err(|e| failure("send_password_reset", e))
    }

    /// Sign out and clear the local identity mirror and bearer token.
    ///
    /// Never fails: provider errors are logged and local state is cleared anyway.
    pub async fn sign_out(&self) {
        let _gate = self.gate.lock().await;

        if let Err(e) = self.backend.sign_out().await {
            tracing::warn!(code = %e.code, detail = %e.detail, "Sign out failed at provider");
        }
        for key in [self.keys.identity(), self.keys.token()] {
            if let Err(e) = self.storage.remove(&key) {
                tracing::warn!(key = %key, error = %e, "Failed to clear cached session value");
            }
        }
        tracing::info!("Signed out");
    }

    /// Merge `patch` into the canonical profile record and the local mirror.
    pub async fn update_profile(&self, patch: &IdentityPatch) -> Result<Identity, AuthFailure> {
        let _gate = self.gate.lock().await;

        let Some(mut current) = self.cached_identity() else {
            return Err(AuthFailure::no_user_logged_in());
        };

        if let Err(e) = self.backend.merge_profile(&current.uid, patch).await {
            tracing::warn!(uid = %current.uid, code = %e.code, detail = %e.detail, "Profile update failed");
            return Err(AuthFailure::profile_update_failed(e.code));
        }

        current.apply(patch);
        self.write_identity(&current);
        Ok(current)
    }

    /// The cached identity, if one is stored and parses.
    pub fn cached_identity(&self) -> Option<Identity> {
        match storage::read_json(self.storage.as_ref(), &self.keys.identity()) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable cached identity");
                None
            }
        }
    }

    /// The stored bearer token, if any.
    pub fn bearer_token(&self) -> Option<String> {
        self.storage.get(&self.keys.token()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read bearer token");
            None
        })
    }

    /// Subscribe to identity changes.
    ///
    /// `callback` runs once with the current state, then on every sign-in and
    /// sign-out, in provider order. On sign-in the canonical profile record is
    /// looked up first; when there is none the callback receives `None`. No
    /// default record is created on this path.
    ///
    /// Only one subscription may be active at a time. Must be called from within
    /// a Tokio runtime.
    pub fn subscribe<F>(&self, mut callback: F) -> Result<IdentitySubscription, IdentityError>
    where
        F: FnMut(Option<Identity>) + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| IdentityError::NoRuntime {
            reason: e.to_string(),
        })?;
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return Err(IdentityError::AlreadySubscribed);
        }

        let mut events = self.backend.listen();
        let backend = Arc::clone(&self.backend);
        let gate = Arc::clone(&self.gate);

        let task = runtime.spawn(async move {
            while let Some(change) = events.recv().await {
                let resolved = match change {
                    Some(account) => {
                        let _gate = gate.lock().await;
                        match backend.get_profile(&account.uid).await {
                            Ok(Some(identity)) => Some(identity),
                            Ok(None) => {
                                tracing::debug!(uid = %account.uid, "Signed-in account has no profile record");
                                None
                            }
                            Err(e) => {
                                tracing::warn!(uid = %account.uid, error = %e, "Profile lookup failed");
                                None
                            }
                        }
                    }
                    None => None,
                };
                callback(resolved);
            }
            tracing::debug!("Identity event stream ended");
        });

        Ok(IdentitySubscription::new(task, Arc::clone(&self.subscribed)))
    }

    async fn store_session(&self, identity: &Identity) {
        self.write_identity(identity);
        match self.backend.id_token(&identity.uid).await {
            Ok(token) => {
                if let Err(e) = self.storage.set(&self.keys.token(), &token) {
                    tracing::warn!(error = %e, "Failed to cache bearer token");
                }
            }
            Err(e) => tracing::warn!(uid = %identity.uid, error = %e, "Failed to obtain bearer token"),
        }
    }

    fn write_identity(&self, identity: &Identity) {
        if let Err(e) = storage::write_json(self.storage.as_ref(), &self.keys.identity(), identity) {
            tracing::warn!(uid = %identity.uid, error = %e, "Failed to cache identity");
        }
    }
}
