//! Application configuration management.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the platform config directory
//! 3. `BL4_CRYPTER_*` environment variables
//! 4. Command-line flags (applied by the caller)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Prefix of environment variables read as configuration.
pub const ENV_PREFIX: &str = "BL4_CRYPTER_";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Seconds cache mode waits for the finalize command; unset waits forever.
    #[serde(default)]
    pub finalize_timeout_secs: Option<u64>,

    /// Re-hash files during change detection even if metadata is unchanged.
    #[serde(default)]
    pub paranoid: bool,
}

impl Config {
    /// Load the configuration from the default platform-specific path.
    ///
    /// Falls back to defaults (with a debug log) if loading fails.
    pub fn load() -> Self {
        let path = Self::config_path();
        match Self::load_from(path.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load the configuration from an explicit file plus the environment.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an environment variable holds an
    /// invalid value.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let config = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the loaded values.
    #[must_use]
    pub fn with_overrides(mut self, finalize_timeout_secs: Option<u64>, paranoid: bool) -> Self {
        if finalize_timeout_secs.is_some() {
            self.finalize_timeout_secs = finalize_timeout_secs;
        }
        self.paranoid |= paranoid;
        self
    }

    /// The finalize timeout as a duration.
    #[must_use]
    pub fn finalize_timeout(&self) -> Option<Duration> {
        self.finalize_timeout_secs.map(Duration::from_secs)
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "bl4_auto_crypter", "bl4_auto_crypter")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
