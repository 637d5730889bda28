use crate::error::ConfigError;
use crate::persist::CookieOptions;
use cookie::time::Duration;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment variables that override the store configuration.
/// Nested keys are separated by `__`, e.g.
/// `BLACKJACK_STORE_PERSISTENCE__EXPIRES_DAYS=7`.
pub const ENV_PREFIX: &str = "BLACKJACK_STORE_";

/// Longest cookie lifetime accepted, in days. Browsers cap cookie expiry
/// at 400 days.
pub const MAX_EXPIRES_DAYS: i64 = 400;

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Check module invariants on every commit
    pub strict: bool,

    /// Log every commit through `tracing`
    pub log_mutations: bool,

    /// Cookie persistence
    pub persistence: PersistenceConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            strict: false,
            log_mutations: false,
            persistence: PersistenceConfig::default(),
        }
    }
}

/// Cookie persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub enabled: bool,
    /// Cookie lifetime in days
    pub expires_days: i64,
    /// Send cookies over encrypted connections only
    pub secure: bool,
    pub path: String,
    /// Modules to persist; all of them when unset
    pub paths: Option<Vec<String>>,
    /// Replace module state with the saved state instead of merging
    pub overwrite: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expires_days: 3,
            secure: false,
            path: "/".to_string(),
            paths: None,
            overwrite: false,
        }
    }
}

impl PersistenceConfig {
    /// Cookie attributes for these settings. The lifetime is clamped to
    /// `1..=MAX_EXPIRES_DAYS`.
    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            expires: Duration::days(self.expires_days.clamp(1, MAX_EXPIRES_DAYS)),
            secure: self.secure,
            path: self.path.clone(),
        }
    }
}

impl StoreConfig {
    /// Defaults, then the TOML file at `path` if given, then the environment.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(StoreConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let days = self.persistence.expires_days;
        if !(1..=MAX_EXPIRES_DAYS).contains(&days) {
            return Err(ConfigError::Invalid(format!(
                "persistence.expires_days must be between 1 and {MAX_EXPIRES_DAYS}, got {days}"
            )));
        }
        Ok(())
    }
}
