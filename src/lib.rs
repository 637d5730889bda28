//! # blackjack-store
//!
//! Client-side state management for the blackjack app.
//!
//! ## Store
//!
//! - `Store<T>` - Thread-safe container for a tree of module states
//! - `Module` / `StateTree` - Named state partitions and the tree holding them
//! - `Middleware` - Hooks around every commit, run in registration order
//!
//! ## Persistence
//!
//! - `PersistedState` - Middleware that rehydrates modules on start and saves
//!   them after every commit
//! - `CookieStorage` - One JSON cookie per module, valid for 3 days
//! - `CookieJar` - In-memory browser cookie jar with clock-driven expiry
//!
//! ## App
//!
//! `create_store` wires the `main`, `login` and `bets` modules behind cookie
//! persistence:
//!
//! ```
//! use blackjack_store::modules::BetsMutation;
//! use blackjack_store::{create_store, CookieJar, StoreConfig};
//!
//! let jar = CookieJar::new();
//! let store = create_store(jar.clone(), &StoreConfig::default());
//! assert_eq!(store.modules(), ["main", "login", "bets"]);
//!
//! store.commit(BetsMutation::SetBalance(100).into()).unwrap();
//! assert_eq!(jar.get("bets").as_deref(), Some(r#"{"balance":100,"bets":[]}"#));
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod modules;
pub mod persist;
pub mod store;

// Re-export main types for convenience
pub use app::{create_store, AppMutation, AppState, AppStore};
pub use config::{PersistenceConfig, StoreConfig, MAX_EXPIRES_DAYS};
pub use error::{ConfigError, StorageError, StoreError};
pub use persist::{CookieJar, CookieStorage, PersistedState, StateStorage};
pub use store::{Middleware, Module, Mutation, StateTree, Store};
