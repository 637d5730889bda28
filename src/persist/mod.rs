//! Persistence of module state into cookies.
//!
//! [`PersistedState`] is a store middleware that rehydrates modules on
//! install and saves them after every commit through a [`StateStorage`].
//! [`CookieStorage`] writes one JSON cookie per module into a
//! [`CookieJar`] whose expiry follows a [`Clock`].

mod clock;
mod cookie_jar;
mod merge;
mod plugin;
mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cookie_jar::{CookieJar, MAX_COOKIE_SIZE};
pub use merge::merge;
pub use plugin::PersistedState;
pub use storage::{CookieOptions, CookieStorage, StateStorage};
