//! Admin access token cache.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Seconds shaved off the advertised token lifetime when caching.
const LIFETIME_MARGIN_SECS: i64 = 60;

/// A cached token is reused only while it stays valid this much longer.
const REFRESH_AHEAD_SECS: i64 = 30;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Holds the most recent admin token.
#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    current: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token if it is still usable at `now`.
    pub(crate) fn get(&self, now: DateTime<Utc>) -> Option<String> {
        self.current
            .lock()
            .as_ref()
            .filter(|cached| cached.expires_at > now + Duration::seconds(REFRESH_AHEAD_SECS))
            .map(|cached| cached.token.clone())
    }

    /// Caches a token issued at `now` with lifetime `expires_in` seconds.
    pub(crate) fn store(&self, token: String, expires_in: i64, now: DateTime<Utc>) {
        let expires_at = now + Duration::seconds(expires_in - LIFETIME_MARGIN_SECS);
        *self.current.lock() = Some(CachedToken { token, expires_at });
    }

    pub(crate) fn clear(&self) {
        *self.current.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache() {
        assert!(TokenCache::new().get(Utc::now()).is_none());
    }

    #[test]
    fn test_token_reused_until_refresh_window() {
        let cache = TokenCache::new();
        let issued = Utc::now();
        cache.store("t1".to_string(), 300, issued);

        // Cached for 240s, reused while more than 30s remain.
        assert_eq!(cache.get(issued).as_deref(), Some("t1"));
        assert_eq!(
            cache.get(issued + Duration::seconds(209)).as_deref(),
            Some("t1")
        );
        assert!(cache.get(issued + Duration::seconds(210)).is_none());
    }

    #[test]
    fn test_short_lived_token_is_never_reused() {
        let cache = TokenCache::new();
        let issued = Utc::now();
        cache.store("t1".to_string(), 60, issued);
        assert!(cache.get(issued).is_none());
    }

    #[test]
    fn test_clear() {
        let cache = TokenCache::new();
        let now = Utc::now();
        cache.store("t1".to_string(), 300, now);
        cache.clear();
        assert!(cache.get(now).is_none());
    }
}
