//! Error types for the identity provider boundary.
//!
//! Provider failures carry a [`ProviderErrorCode`]. The adapter never lets a raw
//! provider message reach the user: every failure is reduced to the fixed message
//! of its code (or the generic fallback) inside an [`AuthFailure`].

use std::fmt;

use thiserror::Error as ThisError;

use crate::Error;

/// Message shown for any code without a dedicated entry.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

/// Message for `update_profile` when no identity is cached.
pub const NO_USER_LOGGED_IN: &str = "No user logged in";

/// Message for `update_profile` when the provider rejects the write.
pub const PROFILE_UPDATE_FAILED: &str = "Failed to update profile. Please try again.";

/// Provider error codes, in the `auth/<kebab-case>` namespace the provider uses.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    EmailAlreadyInUse,
    InvalidEmail,
    WeakPassword,
    UserNotFound,
    WrongPassword,
    TooManyRequests,
    NetworkRequestFailed,
    PopupClosedByUser,
    CancelledPopupRequest,
    OperationNotAllowed,
    InvalidCredential,
    UserDisabled,
    ExpiredActionCode,
    InvalidActionCode,
    MissingEmail,
    MissingPassword,
    /// Any code this crate has no mapping for.
    Other(String),
}

const KNOWN_CODES: &[(&str, ProviderErrorCode)] = &[
    ("auth/email-already-in-use", ProviderErrorCode::EmailAlreadyInUse),
    ("auth/invalid-email", ProviderErrorCode::InvalidEmail),
    ("auth/weak-password", ProviderErrorCode::WeakPassword),
    ("auth/user-not-found", ProviderErrorCode::UserNotFound),
    ("auth/wrong-password", ProviderErrorCode::WrongPassword),
    ("auth/too-many-requests", ProviderErrorCode::TooManyRequests),
    ("auth/network-request-failed", ProviderErrorCode::NetworkRequestFailed),
    ("auth/popup-closed-by-user", ProviderErrorCode::PopupClosedByUser),
    ("auth/cancelled-popup-request", ProviderErrorCode::CancelledPopupRequest),
    ("auth/operation-not-allowed", ProviderErrorCode::OperationNotAllowed),
    ("auth/invalid-credential", ProviderErrorCode::InvalidCredential),
    ("auth/user-disabled", ProviderErrorCode::UserDisabled),
    ("auth/expired-action-code", ProviderErrorCode::ExpiredActionCode),
    ("auth/invalid-action-code", ProviderErrorCode::InvalidActionCode),
    ("auth/missing-email", ProviderErrorCode::MissingEmail),
    ("auth/missing-password", ProviderErrorCode::MissingPassword),
];

impl ProviderErrorCode {
    /// Parse a provider code string such as `auth/wrong-password`.
    pub fn parse(code: &str) -> Self {
        KNOWN_CODES
            .iter()
            .find(|(name, _)| *name == code)
            .map(|(_, known)| known.clone())
            .unwrap_or_else(|| ProviderErrorCode::Other(code.to_string()))
    }

    /// The provider's code string.
    pub fn as_str(&self) -> &str {
        match self {
            ProviderErrorCode::Other(code) => code,
            known => KNOWN_CODES
                .iter()
                .find(|(_, c)| c == known)
                .map(|(name, _)| *name)
                .unwrap_or("auth/unknown"),
        }
    }

    /// The fixed user-facing message for this code.
    pub fn user_message(&self) -> &'static str {
        match self {
            ProviderErrorCode::EmailAlreadyInUse => "This email is already registered. Please login.",
            ProviderErrorCode::InvalidEmail => "Please enter a valid email address.",
            ProviderErrorCode::WeakPassword => "Password should be at least 6 characters long.",
            ProviderErrorCode::UserNotFound => "No account found with this email address.",
            ProviderErrorCode::WrongPassword => "Incorrect password. Please try again.",
            ProviderErrorCode::TooManyRequests => "Too many failed attempts. Please try again later.",
            ProviderErrorCode::NetworkRequestFailed => "Network error. Please check your connection.",
            ProviderErrorCode::PopupClosedByUser => "Sign-in popup was closed before completion.",
            ProviderErrorCode::CancelledPopupRequest => "Sign-in was cancelled.",
            ProviderErrorCode::OperationNotAllowed => "This sign-in method is not enabled.",
            ProviderErrorCode::InvalidCredential => "Invalid credentials provided.",
            ProviderErrorCode::UserDisabled => "This account has been disabled.",
            ProviderErrorCode::ExpiredActionCode => "The verification code has expired.",
            ProviderErrorCode::InvalidActionCode => "The verification code is invalid.",
            ProviderErrorCode::MissingEmail => "Please provide an email address.",
            ProviderErrorCode::MissingPassword => "Please provide a password.",
            ProviderErrorCode::Other(_) => GENERIC_ERROR_MESSAGE,
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by an [`IdentityBackend`](super::IdentityBackend).
///
/// `detail` is the provider's own text. It is logged, never shown.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{code}: {detail}")]
pub struct ProviderError {
    pub code: ProviderErrorCode,
    pub detail: String,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

/// Expected failure of an adapter operation, already mapped for display.
///
/// This is the error half of the adapter's result contract; it is returned,
/// never thrown.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct AuthFailure {
    /// The provider code this failure was mapped from, if any.
    pub code: Option<ProviderErrorCode>,
    /// User-facing message.
    pub message: String,
}

impl AuthFailure {
    pub(crate) fn no_user_logged_in() -> Self {
        Self {
            code: None,
            message: NO_USER_LOGGED_IN.to_string(),
        }
    }

    pub(crate) fn profile_update_failed(code: ProviderErrorCode) -> Self {
        Self {
            code: Some(code),
            message: PROFILE_UPDATE_FAILED.to_string(),
        }
    }
}

impl From<ProviderError> for AuthFailure {
    fn from(err: ProviderError) -> Self {
        Self {
            message: err.code.user_message().to_string(),
            code: Some(err.code),
        }
    }
}

/// Errors from identity operations that are not part of the result contract.
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum IdentityError {
    /// The identity event source already has its single subscriber.
    #[error("Identity changes already have an active subscriber")]
    AlreadySubscribed,

    /// Subscribing requires a running Tokio runtime.
    #[error("No async runtime available: {reason}")]
    NoRuntime { reason: String },
}

impl From<IdentityError> for Error {
    fn from(err: IdentityError) -> Self {
        Error::Identity(err)
    }
}
