//! Key-value storage boundary.
//!
//! Two logical stores sit behind [`KeyValueStore`]: a durable, cross-session store
//! (bearer token, identity mirror, one extended profile per user) and a
//! session-scoped store (the soft-prompt flag). Both are synchronous; values are
//! strings and structured values go through [`read_json`] / [`write_json`].

use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};

pub mod errors;
pub mod file;
pub mod memory;

pub use errors::StorageError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// A synchronous string key-value store.
///
/// Writes are last-write-wins; implementations do not lock across calls.
pub trait KeyValueStore: Send + Sync + Debug {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Read and deserialize a JSON value stored under `key`.
///
/// Returns `Ok(None)` when the key is absent and an error when the stored text
/// does not parse as `T`.
pub fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Serialize `value` as JSON and store it under `key`.
pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}
