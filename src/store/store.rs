use super::middleware::Middleware;
use super::tree::{Mutation, StateTree};
use crate::error::StoreError;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

type Subscriber<T> = Arc<dyn Fn(&<T as StateTree>::Mutation, &T) + Send + Sync>;

/// Handle returned by [`Store::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

/// A thread-safe store holding a tree of module states.
///
/// State only changes through [`Store::commit`]. Cloning a store is cheap
/// and yields another handle to the same state.
pub struct Store<T: StateTree> {
    state: Arc<RwLock<T>>,
    subscribers: Arc<RwLock<Vec<(SubscriptionId, Subscriber<T>)>>>,
    middleware: Arc<[Box<dyn Middleware<T>>]>,
    next_subscription: Arc<AtomicUsize>,
    strict: bool,
}

/// Builder for a [`Store`] with middleware and options.
pub struct StoreBuilder<T: StateTree> {
    initial: T,
    middleware: Vec<Box<dyn Middleware<T>>>,
    strict: bool,
}

impl<T: StateTree> StoreBuilder<T> {
    /// Append a middleware. Middleware run in the order they are added.
    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<T> + 'static,
    {
        self.middleware.push(Box::new(middleware));
        self
    }

    /// Check module invariants after every commit and roll back on failure.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Install every middleware and create the store.
    pub fn build(self) -> Store<T> {
        let mut state = self.initial;
        for middleware in &self.middleware {
            middleware.install(&mut state);
        }
        debug!(
            modules = ?T::modules(),
            middleware = self.middleware.len(),
            strict = self.strict,
            "store created"
        );

        Store {
            state: Arc::new(RwLock::new(state)),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            middleware: self.middleware.into(),
            next_subscription: Arc::new(AtomicUsize::new(0)),
            strict: self.strict,
        }
    }
}

impl<T: StateTree> Store<T> {
    /// Create a store with no middleware.
    pub fn new(initial: T) -> Self {
        Self::builder(initial).build()
    }

    pub fn builder(initial: T) -> StoreBuilder<T> {
        StoreBuilder {
            initial,
            middleware: Vec::new(),
            strict: false,
        }
    }

    /// Module names in registration order.
    pub fn modules(&self) -> &'static [&'static str] {
        T::modules()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Get a clone of the current state.
    pub fn state(&self) -> T {
        self.state.read().clone()
    }

    /// Read state without cloning it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let state = self.state.read();
        f(&state)
    }

    /// Serialize one module's current state.
    pub fn module_snapshot(&self, module: &str) -> Result<Value, StoreError> {
        self.state.read().snapshot(module)
    }

    /// Apply a mutation.
    ///
    /// Middleware see the mutation before and after it is applied, then
    /// subscribers are notified. In strict mode a mutation that breaks a
    /// module invariant is rolled back and nobody is notified.
    pub fn commit(&self, mutation: T::Mutation) -> Result<(), StoreError> {
        {
            let state = self.state.read();
            for middleware in self.middleware.iter() {
                middleware.before_apply(&mutation, &state);
            }
        }

        {
            let mut state = self.state.write();
            if self.strict {
                let previous = state.clone();
                state.apply(&mutation);
                if let Err(err) = state.check() {
                    *state = previous;
                    warn!(mutation = %mutation.kind(), error = %err, "mutation rolled back");
                    return Err(err);
                }
            } else {
                state.apply(&mutation);
            }
        }
        debug!(mutation = %mutation.kind(), "committed");

        self.notify(&mutation);
        Ok(())
    }

    /// Replace the whole state without running middleware or subscribers.
    pub fn replace_state(&self, new_state: T) {
        *self.state.write() = new_state;
    }

    /// Subscribe to commits.
    ///
    /// The callback runs after every successful commit with the mutation and
    /// a snapshot of the new state. No lock is held while it runs, so it may
    /// commit or subscribe to the same store.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T::Mutation, &T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    fn notify(&self, mutation: &T::Mutation) {
        // Middleware run under the read lock so saves land in commit order.
        let snapshot = {
            let state = self.state.read();
            for middleware in self.middleware.iter() {
                middleware.after_apply(mutation, &state);
            }
            state.clone()
        };

        let subscribers: Vec<Subscriber<T>> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        for subscriber in subscribers {
            subscriber(mutation, &snapshot);
        }
    }
}

impl<T: StateTree> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            subscribers: Arc::clone(&self.subscribers),
            middleware: Arc::clone(&self.middleware),
            next_subscription: Arc::clone(&self.next_subscription),
            strict: self.strict,
        }
    }
}
