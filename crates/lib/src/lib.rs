//!
//! Smart ServiceHub session core.
//!
//! This library tracks who is using the app, reconciles the identity provider's
//! canonical account record with a locally cached extended profile, and decides
//! per navigation whether a view is shown, redirected, or shown with a sign-in nudge.
//!
//! ## Core Concepts
//!
//! * **Identity Provider Adapter (`identity::IdentityAdapter`)**: Wraps a remote identity
//!   backend (`identity::IdentityBackend`), maps provider error codes to user-facing
//!   messages and mirrors the signed-in identity into a synchronous local cache.
//! * **Session Store (`session::SessionStore`)**: The single source of truth for the
//!   current session. Subscribes to identity changes and publishes a merged user.
//! * **Route Guard (`guard::RouteGuard`)**: Classifies navigation targets as public or
//!   protected and produces a `guard::GuardOutcome` for each render.
//! * **Auth Prompt (`prompt::AuthPrompt`)**: The dismissible sign-in nudge, plus the
//!   `prompt::CredentialForm` that performs login and signup.
//! * **Storage (`storage::KeyValueStore`)**: The durable and session-scoped key-value
//!   stores every cached value lives in.

pub mod clock;
pub mod config;
pub mod guard;
pub mod identity;
pub mod prompt;
pub mod session;
pub mod storage;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use config::{Settings, StorageKeys};
pub use guard::{GuardOutcome, RouteGuard, RouteTable};
pub use identity::{AuthFailure, AuthSuccess, Identity, IdentityAdapter, Role};
pub use prompt::{AuthPrompt, CredentialForm, PromptEvent};
pub use session::{SessionState, SessionStatus, SessionStore, SessionUser, UserPatch};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

/// Result type used throughout the servicehub library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the servicehub library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured storage errors from the storage module
    #[error(transparent)]
    Storage(storage::StorageError),

    /// Structured identity errors from the identity module
    #[error(transparent)]
    Identity(identity::IdentityError),

    /// Structured session errors from the session module
    #[error(transparent)]
    Session(session::SessionError),

    /// Configuration errors from the config module
    #[error(transparent)]
    Config(config::ConfigError),

    /// Credential form errors from the prompt module
    #[error(transparent)]
    Form(prompt::FormError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
            Error::Storage(_) => "storage",
            Error::Identity(_) => "identity",
            Error::Session(_) => "session",
            Error::Config(_) => "config",
            Error::Form(_) => "prompt",
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Storage(storage_err) => storage_err.is_io_error(),
            _ => false,
        }
    }

    /// Check if this error came from the identity provider boundary.
    pub fn is_identity_error(&self) -> bool {
        matches!(self, Error::Identity(_))
    }

    /// Check if this error indicates a wait on the session timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Session(session_err) => session_err.is_timeout(),
            _ => false,
        }
    }

    /// Check if this error is validation-related.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::Form(form_err) => form_err.is_validation_error(),
            _ => false,
        }
    }
}
