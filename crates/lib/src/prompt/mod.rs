//! Soft authentication prompt
//!
//! The overlay shown to anonymous visitors on protected routes, and the
//! credential form it opens for login and signup.

pub mod defaults;
pub mod form;
pub mod overlay;

pub use form::{CredentialForm, FormError, FormMode};
pub use overlay::{AuthPrompt, PromptEvent, PromptPhase};
