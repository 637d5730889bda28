//! Error types for the store, its storage adapters and configuration.

use thiserror::Error;

/// Errors returned by [`Store`](crate::Store) operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invariant violated in module `{module}`: {reason}")]
    InvariantViolated { module: &'static str, reason: String },

    #[error("unknown module `{0}`")]
    UnknownModule(String),

    #[error("module state does not round-trip through JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors returned by a [`StateStorage`](crate::persist::StateStorage) write.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("cookie storage is disabled")]
    Disabled,

    #[error("cookie `{name}` is {size} bytes, over the {limit} byte limit")]
    CookieTooLarge {
        name: String,
        size: usize,
        limit: usize,
    },

    #[error("cookie expiry {0} from now is out of range")]
    ExpiryOutOfRange(cookie::time::Duration),

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while loading [`StoreConfig`](crate::StoreConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid store configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("invalid store configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Extract(Box::new(err))
    }
}
