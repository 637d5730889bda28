//! High-level state management with stores.
//!
//! A store owns a tree of module states, applies committed mutations,
//! runs middleware around each commit and notifies subscribers.

mod middleware;
mod store;
mod tree;

pub use middleware::{Middleware, MutationLogger};
pub use store::{Store, StoreBuilder, SubscriptionId};
pub use tree::{Module, Mutation, StateTree};
