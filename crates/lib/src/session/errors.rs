//! Error types for the session store

use thiserror::Error;

/// Errors raised while waiting on the session store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The expected user did not become the session user in time.
    #[error("Session did not reflect user {uid} within {waited_ms} ms")]
    Timeout { uid: String, waited_ms: u64 },

    /// The store was shut down while waiting.
    #[error("Session store closed")]
    Closed,
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout { .. })
    }
}

impl From<SessionError> for crate::Error {
    fn from(err: SessionError) -> Self {
        crate::Error::Session(err)
    }
}
