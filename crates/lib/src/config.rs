//! Runtime configuration for the session core.
//!
//! Settings are plain serde data so they can be loaded from a JSON file, built in
//! code, or overridden piecemeal in tests. Every field has a default, so an empty
//! JSON object is a valid configuration.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::{
    Error,
    guard::{RoutePredicate, RouteTable},
};

/// Errors raised while loading or validating [`Settings`].
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Session core settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Prefix applied to every storage key.
    pub storage_prefix: String,

    /// Route anonymous visitors are redirected to.
    pub home_route: String,

    /// Delay before the soft sign-in prompt arms, in milliseconds.
    pub prompt_delay_ms: u64,

    /// Delay between a successful sign-in and the prompt closing itself.
    pub auto_close_delay_ms: u64,

    /// Fade-out time after the prompt is dismissed.
    pub dismiss_fade_ms: u64,

    /// How long the credential form waits for the session to reflect a sign-in.
    pub session_settle_timeout_ms: u64,

    /// Ordered public-route predicates. Paths not matched are protected.
    pub public_routes: Vec<RoutePredicate>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_prefix: "servicehub.".to_string(),
            home_route: "/".to_string(),
            prompt_delay_ms: 3000,
            auto_close_delay_ms: 1000,
            dismiss_fade_ms: 300,
            session_settle_timeout_ms: 5000,
            public_routes: RouteTable::default().predicates().to_vec(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file and validate them.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the invariants the guard relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(bad) = self
            .public_routes
            .iter()
            .find(|p| !p.path().starts_with('/'))
        {
            return Err(ConfigError::Invalid {
                reason: format!("public route '{}' must start with '/'", bad.path()),
            });
        }
        if !self.route_table().is_public(&self.home_route) {
            // Redirecting to a protected home route would loop.
            return Err(ConfigError::Invalid {
                reason: format!("home route '{}' is not public", self.home_route),
            });
        }
        Ok(())
    }

    /// Storage keys derived from the configured prefix.
    pub fn keys(&self) -> StorageKeys {
        StorageKeys::new(self.storage_prefix.clone())
    }

    /// The public-route table described by these settings.
    pub fn route_table(&self) -> RouteTable {
        RouteTable::new(self.public_routes.clone())
    }

    pub fn prompt_delay(&self) -> Duration {
        Duration::from_millis(self.prompt_delay_ms)
    }

    pub fn auto_close_delay(&self) -> Duration {
        Duration::from_millis(self.auto_close_delay_ms)
    }

    pub fn dismiss_fade(&self) -> Duration {
        Duration::from_millis(self.dismiss_fade_ms)
    }

    pub fn session_settle_timeout(&self) -> Duration {
        Duration::from_millis(self.session_settle_timeout_ms)
    }
}

/// Names of every key the session core reads or writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageKeys {
    prefix: String,
}

impl StorageKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Thin identity mirror written by the identity adapter.
    pub fn identity(&self) -> String {
        format!("{}user", self.prefix)
    }

    /// Bearer token issued at sign-in.
    pub fn token(&self) -> String {
        format!("{}token", self.prefix)
    }

    /// Extended profile blob for one user.
    pub fn profile(&self, uid: &str) -> String {
        format!("{}user_{uid}", self.prefix)
    }

    /// Session-scoped "soft prompt already shown" flag.
    pub fn prompt_seen(&self) -> String {
        format!("{}authPromptSeen", self.prefix)
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Settings::default().keys()
    }
}
