use super::merge::merge;
use super::storage::StateStorage;
use crate::store::{Middleware, Mutation, StateTree};
use std::fmt;
use tracing::{debug, warn};

type MutationFilter = Box<dyn Fn(&dyn Mutation) -> bool + Send + Sync>;

/// Middleware that mirrors module state into a [`StateStorage`].
///
/// On install every persisted module is rehydrated from storage: the saved
/// value is deep-merged into the module's current state (or replaces it
/// when `overwrite` is set). After every commit each persisted module is
/// saved under its own name. Storage failures are logged and never reach
/// the store.
pub struct PersistedState<S> {
    storage: S,
    paths: Option<Vec<String>>,
    overwrite: bool,
    filter: Option<MutationFilter>,
}

impl<S: StateStorage> PersistedState<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            paths: None,
            overwrite: false,
            filter: None,
        }
    }

    /// Only persist the named modules.
    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.paths = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Replace module state on rehydration instead of merging into it.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Only save after mutations accepted by `filter`.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&dyn Mutation) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn persisted<'a>(
        &'a self,
        modules: &'static [&'static str],
    ) -> impl Iterator<Item = &'static str> + 'a {
        modules.iter().copied().filter(move |module| match &self.paths {
            Some(paths) => paths.iter().any(|path| path.as_str() == *module),
            None => true,
        })
    }

    fn rehydrate<T: StateTree>(&self, state: &mut T, module: &str) {
        let Some(saved) = self.storage.load(module) else {
            debug!(module, "no persisted state");
            return;
        };

        let value = if self.overwrite {
            saved
        } else {
            match state.snapshot(module) {
                Ok(mut current) => {
                    merge(&mut current, saved);
                    current
                }
                Err(err) => {
                    warn!(module, error = %err, "cannot snapshot module for rehydration");
                    return;
                }
            }
        };

        match state.restore(module, value) {
            Ok(()) => debug!(module, "state rehydrated"),
            Err(err) => warn!(module, error = %err, "discarding persisted state"),
        }
    }
}

impl<T, S> Middleware<T> for PersistedState<S>
where
    T: StateTree,
    S: StateStorage,
{
    fn install(&self, state: &mut T) {
        if let Some(paths) = &self.paths {
            for path in paths {
                if !T::modules().contains(&path.as_str()) {
                    warn!(path = %path, "persisted path names no module");
                }
            }
        }
        for module in self.persisted(T::modules()) {
            self.rehydrate(state, module);
        }
    }

    fn after_apply(&self, mutation: &T::Mutation, state: &T) {
        if let Some(filter) = &self.filter {
            if !filter(mutation) {
                return;
            }
        }

        for module in self.persisted(T::modules()) {
            let value = match state.snapshot(module) {
                Ok(value) => value,
                Err(err) => {
                    warn!(module, error = %err, "cannot snapshot module");
                    continue;
                }
            };
            if let Err(err) = self.storage.save(module, &value) {
                warn!(module, mutation = %mutation.kind(), error = %err, "state not persisted");
                // Whatever is still saved is older than memory now.
                self.storage.remove(module);
            }
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for PersistedState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedState")
            .field("storage", &self.storage)
            .field("paths", &self.paths)
            .field("overwrite", &self.overwrite)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StorageError, StoreError};
    use crate::store::{Module, Store};
    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct MapStorage {
        saved: Arc<Mutex<HashMap<String, Value>>>,
        fail: bool,
    }

    impl StateStorage for MapStorage {
        fn load(&self, key: &str) -> Option<Value> {
            self.saved.lock().get(key).cloned()
        }

        fn save(&self, key: &str, state: &Value) -> Result<(), StorageError> {
            if self.fail {
                return Err(StorageError::Disabled);
            }
            self.saved.lock().insert(key.to_string(), state.clone());
            Ok(())
        }

        fn remove(&self, key: &str) {
            self.saved.lock().remove(key);
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
        volume: u8,
    }

    impl Default for Prefs {
        fn default() -> Self {
            Self {
                theme: "green".to_string(),
                volume: 5,
            }
        }
    }

    #[derive(Debug)]
    enum PrefsMutation {
        Volume(u8),
    }

    impl Module for Prefs {
        const NAME: &'static str = "prefs";
        type Mutation = PrefsMutation;

        fn apply(&mut self, mutation: &PrefsMutation) {
            match mutation {
                PrefsMutation::Volume(v) => self.volume = *v,
            }
        }
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Seen {
        count: u32,
    }

    impl Module for Seen {
        const NAME: &'static str = "seen";
        type Mutation = ();

        fn apply(&mut self, _: &()) {
            self.count += 1;
        }
    }

    #[derive(Debug)]
    enum TreeMutation {
        Prefs(PrefsMutation),
        Seen,
    }

    impl Mutation for TreeMutation {
        fn module(&self) -> &'static str {
            match self {
                TreeMutation::Prefs(_) => Prefs::NAME,
                TreeMutation::Seen => Seen::NAME,
            }
        }

        fn name(&self) -> &'static str {
            match self {
                TreeMutation::Prefs(_) => "SET_VOLUME",
                TreeMutation::Seen => "MARK_SEEN",
            }
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Tree {
        prefs: Prefs,
        seen: Seen,
    }

    impl StateTree for Tree {
        type Mutation = TreeMutation;

        fn modules() -> &'static [&'static str] {
            const MODULES: &[&str] = &[Prefs::NAME, Seen::NAME];
            MODULES
        }

        fn apply(&mut self, mutation: &TreeMutation) {
            match mutation {
                TreeMutation::Prefs(m) => self.prefs.apply(m),
                TreeMutation::Seen => self.seen.apply(&()),
            }
        }

        fn snapshot(&self, module: &str) -> Result<Value, StoreError> {
            match module {
                Prefs::NAME => Ok(self.prefs.snapshot()?),
                Seen::NAME => Ok(self.seen.snapshot()?),
                other => Err(StoreError::UnknownModule(other.to_string())),
            }
        }

        fn restore(&mut self, module: &str, value: Value) -> Result<(), StoreError> {
            match module {
                Prefs::NAME => Ok(self.prefs.restore(value)?),
                Seen::NAME => Ok(self.seen.restore(value)?),
                other => Err(StoreError::UnknownModule(other.to_string())),
            }
        }
    }

    fn seeded(entries: &[(&str, Value)]) -> MapStorage {
        let storage = MapStorage::default();
        for (key, value) in entries {
            storage.saved.lock().insert(key.to_string(), value.clone());
        }
        storage
    }

    #[test]
    fn partial_saved_state_merges_into_defaults() {
        let storage = seeded(&[("prefs", json!({ "volume": 9 }))]);
        let store = Store::builder(Tree::default())
            .middleware(PersistedState::new(storage))
            .build();

        assert_eq!(
            store.state().prefs,
            Prefs {
                theme: "green".to_string(),
                volume: 9
            }
        );
    }

    #[test]
    fn overwrite_rejects_partial_state() {
        let storage = seeded(&[("prefs", json!({ "volume": 9 }))]);
        let store = Store::builder(Tree::default())
            .middleware(PersistedState::new(storage).overwrite(true))
            .build();

        assert_eq!(store.state().prefs, Prefs::default());
    }

    #[test]
    fn mistyped_saved_state_keeps_default() {
        let storage = seeded(&[("seen", json!({ "count": "many" }))]);
        let store = Store::builder(Tree::default())
            .middleware(PersistedState::new(storage))
            .build();

        assert_eq!(store.state().seen, Seen::default());
    }

    #[test]
    fn commits_save_every_persisted_module() {
        let storage = MapStorage::default();
        let store = Store::builder(Tree::default())
            .middleware(PersistedState::new(storage.clone()))
            .build();

        store.commit(TreeMutation::Seen).unwrap();

        let saved = storage.saved.lock();
        assert_eq!(saved.get("seen"), Some(&json!({ "count": 1 })));
        assert_eq!(
            saved.get("prefs"),
            Some(&json!({ "theme": "green", "volume": 5 }))
        );
    }

    #[test]
    fn paths_limit_what_is_persisted() {
        let storage = seeded(&[("seen", json!({ "count": 4 }))]);
        let store = Store::builder(Tree::default())
            .middleware(PersistedState::new(storage.clone()).paths(["prefs"]))
            .build();

        assert_eq!(store.state().seen.count, 0);
        store.commit(TreeMutation::Prefs(PrefsMutation::Volume(1))).unwrap();

        let saved = storage.saved.lock();
        assert_eq!(saved.get("seen"), Some(&json!({ "count": 4 })));
        assert_eq!(saved.get("prefs").unwrap()["volume"], json!(1));
    }

    #[test]
    fn filter_skips_saves() {
        let storage = MapStorage::default();
        let store = Store::builder(Tree::default())
            .middleware(
                PersistedState::new(storage.clone())
                    .filter(|mutation| mutation.module() != Seen::NAME),
            )
            .build();

        store.commit(TreeMutation::Seen).unwrap();
        assert!(storage.saved.lock().is_empty());

        store.commit(TreeMutation::Prefs(PrefsMutation::Volume(2))).unwrap();
        assert_eq!(storage.saved.lock().len(), 2);
    }

    #[test]
    fn failing_storage_does_not_break_commits() {
        let storage = MapStorage {
            fail: true,
            ..MapStorage::default()
        };
        let store = Store::builder(Tree::default())
            .middleware(PersistedState::new(storage))
            .build();

        store.commit(TreeMutation::Seen).unwrap();
        assert_eq!(store.state().seen.count, 1);
    }

    #[test]
    fn failed_save_drops_stale_state() {
        let storage = MapStorage {
            fail: true,
            ..seeded(&[("seen", json!({ "count": 4 }))])
        };
        let saved = storage.saved.clone();
        let store = Store::builder(Tree::default())
            .middleware(PersistedState::new(storage))
            .build();
        assert_eq!(store.state().seen.count, 4);

        store.commit(TreeMutation::Seen).unwrap();
        assert_eq!(store.state().seen.count, 5);
        assert!(saved.lock().is_empty());
    }
}
