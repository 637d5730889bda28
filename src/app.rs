//! The blackjack app's store: the `main`, `login` and `bets` modules behind
//! cookie persistence.

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::modules::{BetsMutation, BetsState, LoginMutation, LoginState, MainMutation, MainState};
use crate::persist::{CookieJar, CookieStorage, PersistedState};
use crate::store::{Module, Mutation, MutationLogger, StateTree, Store};
use serde_json::Value;
use tracing::info;

/// Root state of the app.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub main: MainState,
    pub login: LoginState,
    pub bets: BetsState,
}

/// Any mutation of the app state, tagged with its module.
#[derive(Debug, Clone, PartialEq)]
pub enum AppMutation {
    Main(MainMutation),
    Login(LoginMutation),
    Bets(BetsMutation),
}

impl From<MainMutation> for AppMutation {
    fn from(mutation: MainMutation) -> Self {
        AppMutation::Main(mutation)
    }
}

impl From<LoginMutation> for AppMutation {
    fn from(mutation: LoginMutation) -> Self {
        AppMutation::Login(mutation)
    }
}

impl From<BetsMutation> for AppMutation {
    fn from(mutation: BetsMutation) -> Self {
        AppMutation::Bets(mutation)
    }
}

impl Mutation for AppMutation {
    fn module(&self) -> &'static str {
        match self {
            AppMutation::Main(_) => MainState::NAME,
            AppMutation::Login(_) => LoginState::NAME,
            AppMutation::Bets(_) => BetsState::NAME,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AppMutation::Main(mutation) => mutation.name(),
            AppMutation::Login(mutation) => mutation.name(),
            AppMutation::Bets(mutation) => mutation.name(),
        }
    }
}

const MODULES: &[&str] = &[MainState::NAME, LoginState::NAME, BetsState::NAME];

impl StateTree for AppState {
    type Mutation = AppMutation;

    fn modules() -> &'static [&'static str] {
        MODULES
    }

    fn apply(&mut self, mutation: &AppMutation) {
        match mutation {
            AppMutation::Main(mutation) => self.main.apply(mutation),
            AppMutation::Login(mutation) => self.login.apply(mutation),
            AppMutation::Bets(mutation) => self.bets.apply(mutation),
        }
    }

    fn snapshot(&self, module: &str) -> Result<Value, StoreError> {
        match module {
            MainState::NAME => Ok(self.main.snapshot()?),
            LoginState::NAME => Ok(self.login.snapshot()?),
            BetsState::NAME => Ok(self.bets.snapshot()?),
            other => Err(StoreError::UnknownModule(other.to_string())),
        }
    }

    fn restore(&mut self, module: &str, value: Value) -> Result<(), StoreError> {
        match module {
            MainState::NAME => Ok(self.main.restore(value)?),
            LoginState::NAME => Ok(self.login.restore(value)?),
            BetsState::NAME => Ok(self.bets.restore(value)?),
            other => Err(StoreError::UnknownModule(other.to_string())),
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        self.main.verify()?;
        self.login.verify()?;
        self.bets.verify()
    }
}

pub type AppStore = Store<AppState>;

/// Build the app store.
///
/// Each module is rehydrated from its cookie in `jar` and written back
/// after every commit. Missing, expired or unreadable cookies leave the
/// module at its default state.
pub fn create_store(jar: CookieJar, config: &StoreConfig) -> AppStore {
    let mut builder = Store::builder(AppState::default()).strict(config.strict);

    if config.log_mutations {
        builder = builder.middleware(MutationLogger::new());
    }

    let persistence = &config.persistence;
    if persistence.enabled {
        let storage = CookieStorage::with_options(jar, persistence.cookie_options());
        let mut plugin = PersistedState::new(storage).overwrite(persistence.overwrite);
        if let Some(paths) = &persistence.paths {
            plugin = plugin.paths(paths.iter().cloned());
        }
        builder = builder.middleware(plugin);
    }

    let store = builder.build();
    info!(
        modules = ?store.modules(),
        persisted = persistence.enabled,
        strict = config.strict,
        "app store ready"
    );
    store
}
