//! Credential form: login and signup against the identity adapter.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use zeroize::Zeroizing;

use super::defaults;
use crate::{
    identity::{AuthFailure, AuthSuccess, Role},
    session::{SessionError, SessionStore, SessionUser, UserPatch},
};

pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters";
pub const EMAIL_REQUIRED: &str = "Email is required";
pub const PASSWORD_REQUIRED: &str = "Password is required";
pub const FULL_NAME_REQUIRED: &str = "Full name is required";

const MIN_PASSWORD_LENGTH: usize = 6;

/// Why a submission did not sign anyone in.
#[derive(Debug, Error)]
pub enum FormError {
    /// Input rejected before contacting the provider.
    #[error("{0}")]
    Validation(String),

    /// The provider rejected the credentials.
    #[error(transparent)]
    Auth(#[from] AuthFailure),

    /// Signed in, but the session never picked the user up.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl FormError {
    pub fn is_validation_error(&self) -> bool {
        matches!(self, FormError::Validation(_))
    }

    /// Text shown next to the form.
    pub fn user_message(&self) -> String {
        match self {
            FormError::Validation(msg) => msg.clone(),
            FormError::Auth(failure) => failure.message.clone(),
            FormError::Session(_) => crate::identity::errors::GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<FormError> for crate::Error {
    fn from(err: FormError) -> Self {
        crate::Error::Form(err)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormMode {
    #[default]
    Login,
    Signup,
}

/// Login/signup form state.
///
/// On success the form waits for the session to show the signed-in user, then
/// applies the default profile fields through [`SessionStore::update`].
#[derive(Debug)]
pub struct CredentialForm {
    session: SessionStore,
    settle_timeout: Duration,
    mode: FormMode,
    email: String,
    password: Zeroizing<String>,
    confirm_password: Zeroizing<String>,
    full_name: String,
    phone: String,
    role: Role,
    error: Option<String>,
}

impl CredentialForm {
    pub fn new(session: SessionStore, settle_timeout: Duration) -> Self {
        Self {
            session,
            settle_timeout,
            mode: FormMode::Login,
            email: String::new(),
            password: Zeroizing::new(String::new()),
            confirm_password: Zeroizing::new(String::new()),
            full_name: String::new(),
            phone: String::new(),
            role: Role::User,
            error: None,
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    /// Flip between login and signup, clearing every field.
    pub fn switch_mode(&mut self) {
        self.mode = match self.mode {
            FormMode::Login => FormMode::Signup,
            FormMode::Signup => FormMode::Login,
        };
        self.reset();
    }

    pub fn reset(&mut self) {
        self.email.clear();
        self.password = Zeroizing::new(String::new());
        self.confirm_password = Zeroizing::new(String::new());
        self.full_name.clear();
        self.phone.clear();
        self.error = None;
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = Zeroizing::new(password.into());
    }

    pub fn set_confirm_password(&mut self, password: impl Into<String>) {
        self.confirm_password = Zeroizing::new(password.into());
    }

    pub fn set_full_name(&mut self, name: impl Into<String>) {
        self.full_name = name.into();
    }

    pub fn set_phone(&mut self, phone: impl Into<String>) {
        self.phone = phone.into();
    }

    /// Role for accounts created by this form. Kept across mode switches.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Message from the last failed submission.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn validate(&self) -> Result<(), FormError> {
        let fail = |msg: &str| -> Result<(), FormError> { Err(FormError::Validation(msg.to_string())) };
        if self.email.trim().is_empty() {
            return fail(EMAIL_REQUIRED);
        }
        if self.password.is_empty() {
            return fail(PASSWORD_REQUIRED);
        }
        if self.mode == FormMode::Signup {
            if self.full_name.trim().is_empty() {
                return fail(FULL_NAME_REQUIRED);
            }
            if *self.password != *self.confirm_password {
                return fail(PASSWORDS_DO_NOT_MATCH);
            }
            if self.password.chars().count() < MIN_PASSWORD_LENGTH {
                return fail(PASSWORD_TOO_SHORT);
            }
        }
        Ok(())
    }

    /// Submit in the current mode.
    pub async fn submit(&mut self) -> Result<Arc<SessionUser>, FormError> {
        self.error = None;
        let result = self.try_submit().await;
        self.record(result)
    }

    /// Sign in through the external provider, ignoring the typed fields.
    pub async fn submit_external(&mut self) -> Result<Arc<SessionUser>, FormError> {
        self.error = None;
        let result = self.try_submit_external().await;
        self.record(result)
    }

    async fn try_submit(&self) -> Result<Arc<SessionUser>, FormError> {
        self.validate()?;
        let adapter = self.session.adapter();
        let clock = Arc::clone(adapter.clock());

        let (success, patch) = match self.mode {
            FormMode::Login => {
                let success = adapter.authenticate(self.email.trim(), &self.password).await?;
                (success, defaults::login(clock.as_ref(), &self.phone))
            }
            FormMode::Signup => {
                let phone = Some(self.phone.as_str()).filter(|p| !p.is_empty());
                let success = adapter
                    .register(self.email.trim(), &self.password, &self.full_name, self.role, phone)
                    .await?;
                (success, defaults::signup(clock.as_ref(), &self.full_name, &self.phone))
            }
        };
        self.settle(success, patch).await
    }

    async fn try_submit_external(&self) -> Result<Arc<SessionUser>, FormError> {
        let adapter = self.session.adapter();
        let clock = Arc::clone(adapter.clock());
        let success = adapter.authenticate_with_external_provider().await?;
        let patch = defaults::external(clock.as_ref(), &success.user);
        self.settle(success, patch).await
    }

    /// Wait for the session to pick up the new user, then apply `patch`.
    async fn settle(&self, success: AuthSuccess, patch: UserPatch) -> Result<Arc<SessionUser>, FormError> {
        let user = self
            .session
            .wait_for_user(&success.user.uid, self.settle_timeout)
            .await?;
        self.session.update(patch);
        Ok(self.session.user().unwrap_or(user))
    }

    fn record(&mut self, result: Result<Arc<SessionUser>, FormError>) -> Result<Arc<SessionUser>, FormError> {
        if let Err(e) = &result {
            tracing::debug!(error = %e, mode = ?self.mode, "Credential form submission failed");
            self.error = Some(e.user_message());
        }
        result
    }
}
