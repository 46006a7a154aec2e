//! Token storage and expiry tracking

use chrono::{DateTime, Duration, Utc};

/// Upper bound on a token lifetime; larger `expires_in` values are clamped.
const MAX_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// Cached bearer token. The token and its expiry only ever exist together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn new(token: String, issued_at: DateTime<Utc>, expires_in_secs: u64) -> Self {
        let secs = match i64::try_from(expires_in_secs) {
            Ok(secs) if secs <= MAX_LIFETIME_SECS => secs,
            _ => {
                tracing::warn!(
                    "Token lifetime of {}s exceeds one year, capping at {}s",
                    expires_in_secs,
                    MAX_LIFETIME_SECS
                );
                MAX_LIFETIME_SECS
            }
        };
        let lifetime = Duration::seconds(secs);
        Self {
            token,
            issued_at,
            expires_at: issued_at + lifetime,
        }
    }

    /// True when `now` is within `margin` of the expiry (or past it).
    pub fn is_expired_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }

    pub fn is_expired(&self, margin: Duration) -> bool {
        self.is_expired_at(Utc::now(), margin)
    }
}

/// In-memory token cache owned by the token manager.
#[derive(Debug, Default)]
pub struct TokenCache {
    current: Option<StoredToken>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&StoredToken> {
        self.current.as_ref()
    }

    pub fn set(&mut self, token: StoredToken) -> &StoredToken {
        self.current.insert(token)
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Token that is still usable given the safety margin.
    pub fn valid(&self, margin: Duration) -> Option<&StoredToken> {
        self.current.as_ref().filter(|t| !t.is_expired(margin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_expiry_is_issue_time_plus_lifetime() {
        let token = StoredToken::new("t".into(), at(0), 28_800);
        assert_eq!(token.expires_at - token.issued_at, Duration::seconds(28_800));
        assert_eq!(token.expires_at, at(28_800));
    }

    #[test]
    fn test_huge_lifetime_capped_at_one_year() {
        for lifetime in [MAX_LIFETIME_SECS as u64 + 1, u64::MAX] {
            let token = StoredToken::new("t".into(), at(0), lifetime);
            assert_eq!(token.expires_at - token.issued_at, Duration::days(365));
        }
        let token = StoredToken::new("t".into(), at(0), MAX_LIFETIME_SECS as u64);
        assert_eq!(token.expires_at - token.issued_at, Duration::days(365));
    }

    #[test]
    fn test_margin_applies_before_expiry() {
        let token = StoredToken::new("t".into(), at(0), 3600);
        let margin = Duration::seconds(300);
        assert!(!token.is_expired_at(at(3299), margin));
        assert!(token.is_expired_at(at(3300), margin));
        assert!(token.is_expired_at(at(4000), margin));
        assert!(!token.is_expired_at(at(3599), Duration::zero()));
    }

    #[test]
    fn test_cache_set_and_clear() {
        let mut cache = TokenCache::new();
        assert!(cache.get().is_none());

        cache.set(StoredToken::new("abc".into(), Utc::now(), 3600));
        assert_eq!(cache.valid(Duration::seconds(300)).map(|t| t.token.as_str()), Some("abc"));

        cache.clear();
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_cache_hides_expired_token() {
        let mut cache = TokenCache::new();
        cache.set(StoredToken::new("old".into(), Utc::now() - Duration::hours(2), 3600));
        assert!(cache.get().is_some());
        assert!(cache.valid(Duration::zero()).is_none());
    }
}
