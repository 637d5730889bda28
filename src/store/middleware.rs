use super::tree::{Mutation, StateTree};
use tracing::{debug, info};

/// A store extension hooked around every commit.
///
/// Middleware run in the order they were registered on the
/// [`StoreBuilder`](super::StoreBuilder). All hooks default to no-ops.
pub trait Middleware<T: StateTree>: Send + Sync {
    /// Called once while the store is being built, before anyone can read it.
    fn install(&self, _state: &mut T) {}

    /// Called before a mutation is applied.
    fn before_apply(&self, _mutation: &T::Mutation, _state: &T) {}

    /// Called after a mutation has been applied.
    fn after_apply(&self, _mutation: &T::Mutation, _state: &T) {}
}

/// Logs every commit through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct MutationLogger {
    verbose: bool,
}

impl MutationLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log the mutation payload.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl<T: StateTree> Middleware<T> for MutationLogger {
    fn install(&self, _state: &mut T) {
        debug!(modules = ?T::modules(), "mutation logger installed");
    }

    fn before_apply(&self, mutation: &T::Mutation, _state: &T) {
        if self.verbose {
            debug!(mutation = %mutation.kind(), payload = ?mutation, "applying");
        }
    }

    fn after_apply(&self, mutation: &T::Mutation, _state: &T) {
        info!(mutation = %mutation.kind(), "mutation applied");
    }
}
