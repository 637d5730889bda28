use super::clock::{Clock, SystemClock};
use crate::error::StorageError;
use cookie::time::OffsetDateTime;
use cookie::Cookie;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Largest `name=value` pair a browser keeps, in bytes.
pub const MAX_COOKIE_SIZE: usize = 4096;

/// An in-memory browser cookie jar.
///
/// Cookies past their `Expires` time are invisible and purged lazily.
/// Cookies without an expiry live as long as the jar. Clones share the
/// same cookies.
#[derive(Clone)]
pub struct CookieJar {
    inner: Arc<RwLock<JarInner>>,
    clock: Arc<dyn Clock>,
}

#[derive(Default)]
struct JarInner {
    cookies: BTreeMap<String, Cookie<'static>>,
    disabled: bool,
}

impl CookieJar {
    /// An empty jar driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// An empty jar driven by `clock`.
    pub fn with_clock<C>(clock: C) -> Self
    where
        C: Clock + 'static,
    {
        Self {
            inner: Arc::new(RwLock::new(JarInner::default())),
            clock: Arc::new(clock),
        }
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Refuse all writes, like a browser with cookies turned off.
    pub fn set_disabled(&self, disabled: bool) {
        self.inner.write().disabled = disabled;
    }

    pub fn is_disabled(&self) -> bool {
        self.inner.read().disabled
    }

    /// Store a cookie, replacing any cookie with the same name.
    ///
    /// A cookie that is already expired deletes the existing one instead.
    pub fn set(&self, cookie: Cookie<'static>) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        if inner.disabled {
            return Err(StorageError::Disabled);
        }

        let size = cookie.encoded().stripped().to_string().len();
        if size > MAX_COOKIE_SIZE {
            return Err(StorageError::CookieTooLarge {
                name: cookie.name().to_string(),
                size,
                limit: MAX_COOKIE_SIZE,
            });
        }

        let name = cookie.name().to_string();
        if is_expired(&cookie, self.clock.now()) {
            trace!(cookie = %name, "expired on write, deleting");
            inner.cookies.remove(&name);
        } else {
            trace!(cookie = %name, size, "cookie stored");
            inner.cookies.insert(name, cookie);
        }
        Ok(())
    }

    /// The value of a live cookie.
    pub fn get(&self, name: &str) -> Option<String> {
        self.cookie(name).map(|cookie| cookie.value().to_string())
    }

    /// A live cookie with all of its attributes.
    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.purge_expired();
        self.inner.read().cookies.get(name).cloned()
    }

    /// Delete a cookie. Returns `false` if there was none.
    pub fn remove(&self, name: &str) -> bool {
        self.inner.write().cookies.remove(name).is_some()
    }

    /// Names of all live cookies.
    pub fn names(&self) -> Vec<String> {
        self.purge_expired();
        self.inner.read().cookies.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.purge_expired();
        self.inner.read().cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live cookies as a `Cookie` request header: `a=1; b=2`.
    pub fn header(&self) -> String {
        self.purge_expired();
        self.inner
            .read()
            .cookies
            .values()
            .map(|cookie| cookie.encoded().stripped().to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Live cookies as `Set-Cookie` header values, attributes included.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.purge_expired();
        self.inner
            .read()
            .cookies
            .values()
            .map(|cookie| cookie.encoded().to_string())
            .collect()
    }

    fn purge_expired(&self) {
        let now = self.clock.now();
        let mut inner = self.inner.write();
        inner.cookies.retain(|name, cookie| {
            let keep = !is_expired(cookie, now);
            if !keep {
                trace!(cookie = %name, "cookie expired");
            }
            keep
        });
    }
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("CookieJar")
            .field("cookies", &inner.cookies.keys().collect::<Vec<_>>())
            .field("disabled", &inner.disabled)
            .finish()
    }
}

fn is_expired(cookie: &Cookie<'_>, now: OffsetDateTime) -> bool {
    match cookie.expires_datetime() {
        Some(expires) => expires <= now,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::ManualClock;
    use cookie::time::Duration;

    fn jar() -> (CookieJar, ManualClock) {
        let clock = ManualClock::default();
        (CookieJar::with_clock(clock.clone()), clock)
    }

    fn expiring(name: &str, value: &str, at: OffsetDateTime) -> Cookie<'static> {
        Cookie::build((name.to_string(), value.to_string()))
            .expires(at)
            .path("/")
            .build()
    }

    #[test]
    fn cookie_expires_on_time() {
        let (jar, clock) = jar();
        jar.set(expiring("token", "abc", clock.now() + Duration::days(1)))
            .unwrap();

        clock.advance(Duration::hours(23));
        assert_eq!(jar.get("token").as_deref(), Some("abc"));

        clock.advance(Duration::hours(1));
        assert_eq!(jar.get("token"), None);
        assert!(jar.is_empty());
    }

    #[test]
    fn session_cookie_never_expires() {
        let (jar, clock) = jar();
        jar.set(Cookie::new("session", "1")).unwrap();

        clock.advance(Duration::days(365));
        assert_eq!(jar.get("session").as_deref(), Some("1"));
    }

    #[test]
    fn expired_write_deletes() {
        let (jar, clock) = jar();
        jar.set(Cookie::new("main", "{}")).unwrap();
        jar.set(expiring("main", "", clock.now() - Duration::seconds(1)))
            .unwrap();

        assert_eq!(jar.get("main"), None);
    }

    #[test]
    fn disabled_jar_rejects_writes() {
        let (jar, _) = jar();
        jar.set_disabled(true);

        let err = jar.set(Cookie::new("bets", "[]")).unwrap_err();
        assert!(matches!(err, StorageError::Disabled));
        assert!(jar.is_empty());
    }

    #[test]
    fn oversized_cookie_is_rejected() {
        let (jar, _) = jar();
        let err = jar
            .set(Cookie::new("huge", "x".repeat(MAX_COOKIE_SIZE)))
            .unwrap_err();

        assert!(matches!(
            err,
            StorageError::CookieTooLarge { ref name, .. } if name == "huge"
        ));
    }

    #[test]
    fn header_is_percent_encoded() {
        let (jar, _) = jar();
        jar.set(Cookie::new("login", r#"{"user":"ann lee"}"#)).unwrap();
        jar.set(Cookie::new("bets", "1")).unwrap();

        let header = jar.header();
        assert!(header.starts_with("bets=1; login="));
        assert_eq!(header.matches(' ').count(), 1);
        assert!(header.contains("%22"));
        assert!(!header.contains('"'));
        assert_eq!(jar.get("login").as_deref(), Some(r#"{"user":"ann lee"}"#));
    }

    #[test]
    fn remove_reports_presence() {
        let (jar, _) = jar();
        jar.set(Cookie::new("main", "{}")).unwrap();

        assert!(jar.remove("main"));
        assert!(!jar.remove("main"));
        assert_eq!(jar.names(), Vec::<String>::new());
    }
}
