//! In-process identity backend.
//!
//! A complete [`IdentityBackend`] that keeps accounts, canonical profile records
//! and the signed-in account in memory. Passwords are hashed with Argon2id. It
//! validates credentials the way a hosted provider does and reports failures with
//! the same error codes, so everything above it behaves as it would against a
//! remote provider. Failure switches (`set_offline`, `fail_next`, ...) let tests
//! drive every error path.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core},
};
use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use rand::RngCore;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{
    backend::{AuthStateReceiver, IdentityBackend},
    errors::{ProviderError, ProviderErrorCode},
    types::{Identity, IdentityPatch, ProviderAccount},
};

/// Consecutive wrong passwords after which sign-in is rate limited.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Backend operations that can be made to fail once via
/// [`InMemoryIdentityBackend::fail_next`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendOp {
    CreateAccount,
    SignIn,
    Popup,
    PasswordReset,
    EmailVerification,
    SignOut,
    UpdateAccount,
    IdToken,
    GetProfile,
    SetProfile,
    MergeProfile,
}

#[derive(Debug)]
struct AccountRecord {
    uid: String,
    email: String,
    /// None for accounts created through the external provider
    password_hash: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    email_verified: bool,
    disabled: bool,
    failed_attempts: u32,
}

impl AccountRecord {
    fn view(&self) -> ProviderAccount {
        ProviderAccount {
            uid: self.uid.clone(),
            email: Some(self.email.clone()),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
            email_verified: self.email_verified,
        }
    }
}

#[derive(Debug, Clone)]
struct PopupAccount {
    email: String,
    display_name: Option<String>,
    photo_url: Option<String>,
}

#[derive(Debug)]
struct State {
    /// Keyed by lowercased email
    accounts: HashMap<String, AccountRecord>,
    profiles: HashMap<String, Identity>,
    current: Option<String>,
    listeners: Vec<mpsc::UnboundedSender<Option<ProviderAccount>>>,
    offline: bool,
    external_enabled: bool,
    popup: Option<PopupAccount>,
    injected: HashMap<BackendOp, ProviderErrorCode>,
    password_resets: Vec<String>,
    verification_requests: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            accounts: HashMap::new(),
            profiles: HashMap::new(),
            current: None,
            listeners: Vec::new(),
            offline: false,
            external_enabled: true,
            popup: None,
            injected: HashMap::new(),
            password_resets: Vec::new(),
            verification_requests: Vec::new(),
        }
    }
}

impl State {
    /// Fail the call if the backend is offline or a failure was injected for `op`.
    fn check(&mut self, op: BackendOp) -> Result<(), ProviderError> {
        if self.offline {
            return Err(ProviderError::new(
                ProviderErrorCode::NetworkRequestFailed,
                format!("{op:?}: backend unreachable"),
            ));
        }
        if let Some(code) = self.injected.remove(&op) {
            return Err(ProviderError::new(code, format!("{op:?}: injected failure")));
        }
        Ok(())
    }

    fn account_by_uid(&mut self, uid: &str) -> Option<&mut AccountRecord> {
        self.accounts.values_mut().find(|a| a.uid == uid)
    }

    fn current_account(&self) -> Option<ProviderAccount> {
        let uid = self.current.as_ref()?;
        self.accounts
            .values()
            .find(|a| &a.uid == uid)
            .map(AccountRecord::view)
    }

    fn emit(&mut self, change: Option<ProviderAccount>) {
        self.listeners.retain(|tx| tx.send(change.clone()).is_ok());
    }

    fn sign_in(&mut self, account: ProviderAccount) {
        self.current = Some(account.uid.clone());
        self.emit(Some(account));
    }
}

/// In-memory [`IdentityBackend`].
#[derive(Debug, Default)]
pub struct InMemoryIdentityBackend {
    state: Mutex<State>,
}

impl InMemoryIdentityBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call fail with a network error while `offline` is set.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Make the next call to `op` fail with `code`.
    pub fn fail_next(&self, op: BackendOp, code: ProviderErrorCode) {
        self.lock().injected.insert(op, code);
    }

    /// Enable or disable the external (popup) sign-in method.
    pub fn set_external_enabled(&self, enabled: bool) {
        self.lock().external_enabled = enabled;
    }

    /// Account the next popup sign-ins complete as. Without one, popups are closed by the user.
    pub fn script_popup(&self, email: &str, display_name: Option<&str>, photo_url: Option<&str>) {
        self.lock().popup = Some(PopupAccount {
            email: email.to_string(),
            display_name: display_name.map(str::to_string),
            photo_url: photo_url.map(str::to_string),
        });
    }

    /// Delete the canonical profile record for `uid`, leaving the account in place.
    pub fn delete_profile(&self, uid: &str) {
        self.lock().profiles.remove(uid);
    }

    /// Disable the account registered under `email`.
    pub fn disable_account(&self, email: &str) {
        if let Some(account) = self.lock().accounts.get_mut(&email.to_lowercase()) {
            account.disabled = true;
        }
    }

    /// Mark the account registered under `email` as verified.
    pub fn mark_email_verified(&self, email: &str) {
        if let Some(account) = self.lock().accounts.get_mut(&email.to_lowercase()) {
            account.email_verified = true;
        }
    }

    /// Canonical profile record for `uid`, read without going through the async API.
    pub fn profile(&self, uid: &str) -> Option<Identity> {
        self.lock().profiles.get(uid).cloned()
    }

    /// Uid of the signed-in account.
    pub fn current_uid(&self) -> Option<String> {
        self.lock().current.clone()
    }

    /// Emails password resets were requested for, oldest first.
    pub fn password_reset_requests(&self) -> Vec<String> {
        self.lock().password_resets.clone()
    }

    /// Uids verification emails were requested for, oldest first.
    pub fn verification_requests(&self) -> Vec<String> {
        self.lock().verification_requests.clone()
    }

    /// Number of live auth-state listeners.
    pub fn listener_count(&self) -> usize {
        let mut state = self.lock();
        state.listeners.retain(|tx| !tx.is_closed());
        state.listeners.len()
    }
}

fn validate_email(email: &str) -> Result<(), ProviderError> {
    if email.trim().is_empty() {
        return Err(ProviderError::new(ProviderErrorCode::MissingEmail, "email is empty"));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ProviderError::new(
            ProviderErrorCode::InvalidEmail,
            format!("malformed email '{email}'"),
        ))
    }
}

fn hash_password(password: &str) -> Result<String, ProviderError> {
    let salt = SaltString::generate(&mut rand_core::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            ProviderError::new(
                ProviderErrorCode::Other("auth/internal-error".into()),
                format!("password hashing failed: {e}"),
            )
        })
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn profile_not_found(uid: &str) -> ProviderError {
    ProviderError::new(
        ProviderErrorCode::Other("profile/not-found".into()),
        format!("no profile record for {uid}"),
    )
}

#[async_trait]
impl IdentityBackend for InMemoryIdentityBackend {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderAccount, ProviderError> {
        self.lock().check(BackendOp::CreateAccount)?;
        validate_email(email)?;
        if password.is_empty() {
            return Err(ProviderError::new(ProviderErrorCode::MissingPassword, "password is empty"));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ProviderError::new(
                ProviderErrorCode::WeakPassword,
                format!("password shorter than {MIN_PASSWORD_LENGTH}"),
            ));
        }
        let key = email.to_lowercase();
        if self.lock().accounts.contains_key(&key) {
            return Err(ProviderError::new(
                ProviderErrorCode::EmailAlreadyInUse,
                format!("{email} already registered"),
            ));
        }

        // Hash outside the lock.
        let password_hash = hash_password(password)?;

        let mut state = self.lock();
        if state.accounts.contains_key(&key) {
            return Err(ProviderError::new(
                ProviderErrorCode::EmailAlreadyInUse,
                format!("{email} already registered"),
            ));
        }
        let record = AccountRecord {
            uid: Uuid::new_v4().simple().to_string(),
            email: email.to_string(),
            password_hash: Some(password_hash),
            display_name: None,
            photo_url: None,
            email_verified: false,
            disabled: false,
            failed_attempts: 0,
        };
        let account = record.view();
        state.accounts.insert(key, record);
        state.sign_in(account.clone());
        Ok(account)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderAccount, ProviderError> {
        self.lock().check(BackendOp::SignIn)?;
        validate_email(email)?;
        if password.is_empty() {
            return Err(ProviderError::new(ProviderErrorCode::MissingPassword, "password is empty"));
        }

        let key = email.to_lowercase();
        let hash = {
            let state = self.lock();
            let Some(account) = state.accounts.get(&key) else {
                return Err(ProviderError::new(
                    ProviderErrorCode::UserNotFound,
                    format!("no account for {email}"),
                ));
            };
            if account.disabled {
                return Err(ProviderError::new(
                    ProviderErrorCode::UserDisabled,
                    format!("{} is disabled", account.uid),
                ));
            }
            if account.failed_attempts >= MAX_FAILED_ATTEMPTS {
                return Err(ProviderError::new(
                    ProviderErrorCode::TooManyRequests,
                    format!("{} failed attempts", account.failed_attempts),
                ));
            }
            account.password_hash.clone()
        };

        let Some(hash) = hash else {
            return Err(ProviderError::new(
                ProviderErrorCode::InvalidCredential,
                "account has no password credential",
            ));
        };
        let ok = verify_password(password, &hash);

        let mut state = self.lock();
        let Some(account) = state.accounts.get_mut(&key) else {
            return Err(ProviderError::new(
                ProviderErrorCode::UserNotFound,
                format!("no account for {email}"),
            ));
        };
        if !ok {
            account.failed_attempts += 1;
            return Err(ProviderError::new(
                ProviderErrorCode::WrongPassword,
                "password mismatch",
            ));
        }
        account.failed_attempts = 0;
        let view = account.view();
        state.sign_in(view.clone());
        Ok(view)
    }

    async fn sign_in_with_popup(&self) -> Result<ProviderAccount, ProviderError> {
        let mut state = self.lock();
        state.check(BackendOp::Popup)?;
        if !state.external_enabled {
            return Err(ProviderError::new(
                ProviderErrorCode::OperationNotAllowed,
                "external sign-in disabled",
            ));
        }
        let Some(popup) = state.popup.clone() else {
            return Err(ProviderError::new(
                ProviderErrorCode::PopupClosedByUser,
                "popup closed",
            ));
        };

        let key = popup.email.to_lowercase();
        let account = state.accounts.entry(key).or_insert_with(|| AccountRecord {
            uid: Uuid::new_v4().simple().to_string(),
            email: popup.email.clone(),
            password_hash: None,
            display_name: popup.display_name.clone(),
            photo_url: popup.photo_url.clone(),
            email_verified: true,
            disabled: false,
            failed_attempts: 0,
        });
        if account.disabled {
            return Err(ProviderError::new(
                ProviderErrorCode::UserDisabled,
                format!("{} is disabled", account.uid),
            ));
        }
        let view = account.view();
        state.sign_in(view.clone());
        Ok(view)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.check(BackendOp::PasswordReset)?;
        validate_email(email)?;
        if !state.accounts.contains_key(&email.to_lowercase()) {
            return Err(ProviderError::new(
                ProviderErrorCode::UserNotFound,
                format!("no account for {email}"),
            ));
        }
        state.password_resets.push(email.to_string());
        Ok(())
    }

    async fn send_email_verification(&self, uid: &str) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.check(BackendOp::EmailVerification)?;
        if state.account_by_uid(uid).is_none() {
            return Err(ProviderError::new(
                ProviderErrorCode::UserNotFound,
                format!("no account {uid}"),
            ));
        }
        state.verification_requests.push(uid.to_string());
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.check(BackendOp::SignOut)?;
        state.current = None;
        state.emit(None);
        Ok(())
    }

    async fn update_account(
        &self,
        uid: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.check(BackendOp::UpdateAccount)?;
        let Some(account) = state.account_by_uid(uid) else {
            return Err(ProviderError::new(
                ProviderErrorCode::UserNotFound,
                format!("no account {uid}"),
            ));
        };
        if let Some(name) = display_name {
            account.display_name = Some(name.to_string());
        }
        if let Some(photo) = photo_url {
            account.photo_url = Some(photo.to_string());
        }
        Ok(())
    }

    async fn id_token(&self, uid: &str) -> Result<String, ProviderError> {
        let mut state = self.lock();
        state.check(BackendOp::IdToken)?;
        if state.current.as_deref() != Some(uid) {
            return Err(ProviderError::new(
                ProviderErrorCode::InvalidCredential,
                format!("{uid} is not signed in"),
            ));
        }
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Ok(Base64UrlUnpadded::encode_string(&bytes))
    }

    async fn get_profile(&self, uid: &str) -> Result<Option<Identity>, ProviderError> {
        let mut state = self.lock();
        state.check(BackendOp::GetProfile)?;
        Ok(state.profiles.get(uid).cloned())
    }

    async fn set_profile(&self, record: &Identity) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.check(BackendOp::SetProfile)?;
        state.profiles.insert(record.uid.clone(), record.clone());
        Ok(())
    }

    async fn merge_profile(&self, uid: &str, patch: &IdentityPatch) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.check(BackendOp::MergeProfile)?;
        if !state.profiles.contains_key(uid) {
            // Merging into a missing record creates it, like a merge-write would.
            let Some(account) = state.account_by_uid(uid).map(|a| a.view()) else {
                return Err(profile_not_found(uid));
            };
            let record = Identity::from_account(&account, Utc::now());
            state.profiles.insert(uid.to_string(), record);
        }
        if let Some(record) = state.profiles.get_mut(uid) {
            record.apply(patch);
        }
        Ok(())
    }

    fn listen(&self) -> AuthStateReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        // Receiver is held above, so this send cannot fail.
        let _ = tx.send(state.current_account());
        state.listeners.push(tx);
        rx
    }
}
