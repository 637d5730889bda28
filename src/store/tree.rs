use crate::error::StoreError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt::Debug;

/// A mutation that can be committed to a store.
///
/// Every mutation belongs to exactly one module and has a short name,
/// which together form its kind, e.g. `bets/PLACE_BET`.
pub trait Mutation: Debug + Send + Sync {
    /// Name of the module this mutation targets.
    fn module(&self) -> &'static str;

    /// Name of the mutation within its module.
    fn name(&self) -> &'static str;

    /// `module/name`.
    fn kind(&self) -> String {
        format!("{}/{}", self.module(), self.name())
    }
}

/// An independently owned partition of the state tree.
///
/// The initial state is `Default::default()`. Derived values (getters) are
/// plain inherent methods on the implementing type.
pub trait Module: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Key of the module in the state tree.
    const NAME: &'static str;

    type Mutation: Debug + Send + Sync;

    /// Apply a mutation to this module's state.
    fn apply(&mut self, mutation: &Self::Mutation);

    /// Check the module's invariants. Only consulted in strict mode.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }

    /// Serialize the module's state.
    fn snapshot(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Replace the module's state with a deserialized value.
    ///
    /// On error the current state is left untouched.
    fn restore(&mut self, value: Value) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(value)?;
        Ok(())
    }

    /// Run [`Module::check`], tagging a failure with the module name.
    fn verify(&self) -> Result<(), StoreError> {
        self.check().map_err(|reason| StoreError::InvariantViolated {
            module: Self::NAME,
            reason,
        })
    }
}

/// The root of a store's state: a fixed, ordered set of named modules.
pub trait StateTree: Clone + Send + Sync + 'static {
    type Mutation: Mutation;

    /// Module names in registration order.
    fn modules() -> &'static [&'static str];

    /// Route a mutation to the module it targets.
    fn apply(&mut self, mutation: &Self::Mutation);

    /// Serialize one module's state.
    fn snapshot(&self, module: &str) -> Result<Value, StoreError>;

    /// Replace one module's state from a serialized value.
    fn restore(&mut self, module: &str, value: Value) -> Result<(), StoreError>;

    /// Check every module's invariants.
    fn check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
