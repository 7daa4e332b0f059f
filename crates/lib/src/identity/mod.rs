//! Identity provider adapter
//!
//! Wraps a remote identity backend: registration, sign-in (password and external
//! provider), password reset, sign-out, profile updates, a synchronous local
//! mirror of the signed-in identity, and a single-subscriber stream of identity
//! changes.

pub mod adapter;
pub mod backend;
pub mod errors;
pub mod memory;
pub mod subscription;
pub mod types;

pub use adapter::IdentityAdapter;
pub use backend::{AuthStateReceiver, IdentityBackend};
pub use errors::{AuthFailure, IdentityError, ProviderError, ProviderErrorCode};
pub use memory::{BackendOp, InMemoryIdentityBackend};
pub use subscription::IdentitySubscription;
pub use types::*;
