//! Core data types for the identity provider boundary

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse account role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Provider,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Provider => "provider",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "provider" => Ok(Role::Provider),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Canonical account record, stored by the provider keyed by `uid` and mirrored
/// to the local cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable, opaque primary key
    pub uid: String,

    pub email: String,

    pub display_name: Option<String>,

    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,

    pub role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    pub is_email_verified: bool,

    /// Whether the user has filled in the rest of their profile
    #[serde(default)]
    pub profile_completed: bool,

    pub created_at: DateTime<Utc>,

    pub last_login: DateTime<Utc>,
}

impl Identity {
    /// Minimal record for an account that has no canonical profile yet.
    pub(crate) fn from_account(account: &ProviderAccount, now: DateTime<Utc>) -> Self {
        Self {
            uid: account.uid.clone(),
            email: account.email.clone().unwrap_or_default(),
            display_name: account.display_name.clone(),
            photo_url: account.photo_url.clone(),
            role: Role::User,
            phone: None,
            is_email_verified: account.email_verified,
            profile_completed: false,
            created_at: now,
            last_login: now,
        }
    }

    /// Apply the fields present in `patch`.
    pub fn apply(&mut self, patch: &IdentityPatch) {
        if let Some(name) = &patch.display_name {
            self.display_name = Some(name.clone());
        }
        if let Some(photo) = &patch.photo_url {
            self.photo_url = Some(photo.clone());
        }
        if let Some(phone) = &patch.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(done) = patch.profile_completed {
            self.profile_completed = done;
        }
    }
}

/// Partial update of the canonical record. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_completed: Option<bool>,
}

impl IdentityPatch {
    pub fn is_empty(&self) -> bool {
        *self == IdentityPatch::default()
    }
}

/// The provider's own view of a signed-in account, before the canonical
/// profile record is consulted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderAccount {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
}

/// Which sign-in path produced an account. Used for logging first sign-ins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignInMethod {
    Password,
    External,
}

impl fmt::Display for SignInMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignInMethod::Password => f.write_str("password"),
            SignInMethod::External => f.write_str("external"),
        }
    }
}

/// Successful sign-in or registration.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthSuccess {
    pub user: Identity,
    /// The account's email address has not been verified yet.
    pub needs_verification: bool,
}
