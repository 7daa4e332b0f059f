//! Storage error types.

use thiserror::Error as ThisError;

use crate::Error;

/// Errors raised by [`KeyValueStore`](super::KeyValueStore) implementations.
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum StorageError {
    /// The backing file could not be read or written.
    #[error("Storage I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be serialized.
    #[error("Failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A stored value exists but does not parse.
    #[error("Stored value for '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The persisted document was written by an unsupported format version.
    #[error("Unsupported storage format version {found}; expected {expected}")]
    UnsupportedVersion { found: u8, expected: u8 },
}

impl StorageError {
    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        matches!(self, StorageError::Io { .. })
    }

    /// Check if this error means stored data could not be parsed.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            StorageError::Corrupt { .. } | StorageError::UnsupportedVersion { .. }
        )
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}
