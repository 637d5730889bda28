use super::cookie_jar::CookieJar;
use crate::error::StorageError;
use cookie::time::Duration;
use cookie::Cookie;
use serde_json::Value;
use tracing::{debug, warn};

/// Durable storage for serialized module state.
pub trait StateStorage: Send + Sync {
    /// Read the state saved under `key`.
    ///
    /// Missing, expired or unreadable state is `None`.
    fn load(&self, key: &str) -> Option<Value>;

    /// Save `state` under `key`.
    fn save(&self, key: &str, state: &Value) -> Result<(), StorageError>;

    /// Forget whatever is saved under `key`.
    fn remove(&self, key: &str);
}

/// Attributes written on every persisted cookie.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieOptions {
    pub expires: Duration,
    pub secure: bool,
    pub path: String,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            expires: Duration::days(3),
            secure: false,
            path: "/".to_string(),
        }
    }
}

/// [`StateStorage`] backed by one JSON cookie per key.
#[derive(Debug, Clone)]
pub struct CookieStorage {
    jar: CookieJar,
    options: CookieOptions,
}

impl CookieStorage {
    pub fn new(jar: CookieJar) -> Self {
        Self::with_options(jar, CookieOptions::default())
    }

    pub fn with_options(jar: CookieJar, options: CookieOptions) -> Self {
        Self { jar, options }
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    pub fn options(&self) -> &CookieOptions {
        &self.options
    }
}

impl StateStorage for CookieStorage {
    fn load(&self, key: &str) -> Option<Value> {
        let raw = self.jar.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(cookie = key, error = %err, "ignoring unparsable cookie");
                None
            }
        }
    }

    fn save(&self, key: &str, state: &Value) -> Result<(), StorageError> {
        let value = serde_json::to_string(state)?;
        let expires = self
            .jar
            .now()
            .checked_add(self.options.expires)
            .ok_or(StorageError::ExpiryOutOfRange(self.options.expires))?;
        let cookie = Cookie::build((key.to_string(), value))
            .expires(expires)
            .secure(self.options.secure)
            .path(self.options.path.clone())
            .build();

        self.jar.set(cookie)?;
        debug!(cookie = key, %expires, "state saved");
        Ok(())
    }

    fn remove(&self, key: &str) {
        if self.jar.remove(key) {
            debug!(cookie = key, "state removed");
        }
    }
}
