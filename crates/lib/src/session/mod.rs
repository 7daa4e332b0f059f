//! Session store
//!
//! Tracks who is using the app. The store subscribes to the identity adapter,
//! merges each canonical identity with the extended profile cached under the
//! user's key, and publishes the result as a [`SessionState`].

pub mod errors;
pub mod merge;
pub mod store;
pub mod types;

pub use errors::SessionError;
pub use merge::{DEFAULT_DISPLAY_NAME, MergeFrom};
pub use store::SessionStore;
pub use types::*;
