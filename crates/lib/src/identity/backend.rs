//! The remote identity provider boundary.

use std::fmt::Debug;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    errors::ProviderError,
    types::{Identity, IdentityPatch, ProviderAccount},
};

/// Auth-state changes: `Some` on sign-in, `None` on sign-out.
pub type AuthStateReceiver = mpsc::UnboundedReceiver<Option<ProviderAccount>>;

/// A remote identity backend.
///
/// Implementations own account creation, credential checks, token issuance and
/// the canonical per-user profile records. The adapter is the only caller.
#[async_trait]
pub trait IdentityBackend: Send + Sync + Debug {
    /// Create an account and sign it in.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderAccount, ProviderError>;

    /// Check a password credential and sign the account in.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderAccount, ProviderError>;

    /// Sign in through the external provider's popup flow.
    async fn sign_in_with_popup(&self) -> Result<ProviderAccount, ProviderError>;

    /// Ask the provider to email a password-reset link.
    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError>;

    /// Ask the provider to email a verification link.
    async fn send_email_verification(&self, uid: &str) -> Result<(), ProviderError>;

    /// End the provider session.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Update the account-level display name and avatar.
    async fn update_account(
        &self,
        uid: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), ProviderError>;

    /// Issue a bearer token for the signed-in account.
    async fn id_token(&self, uid: &str) -> Result<String, ProviderError>;

    /// Fetch the canonical profile record, if one exists.
    async fn get_profile(&self, uid: &str) -> Result<Option<Identity>, ProviderError>;

    /// Write the canonical profile record, replacing any previous one.
    async fn set_profile(&self, record: &Identity) -> Result<(), ProviderError>;

    /// Merge `patch` into the canonical profile record, creating the record if the
    /// account has none.
    async fn merge_profile(&self, uid: &str, patch: &IdentityPatch) -> Result<(), ProviderError>;

    /// Register an auth-state listener.
    ///
    /// The receiver yields the current state immediately, then every change in
    /// the order it happened. Changes are never coalesced.
    fn listen(&self) -> AuthStateReceiver;
}
