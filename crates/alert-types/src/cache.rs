//! Generic TTL-bearing cache entry.

use chrono::{DateTime, Utc};

/// A cached value plus its expiry instant. Consulted only while
/// `now < expires_at`.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: chrono::Duration) -> Self {
        Self {
            value,
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_after_ttl() {
        let entry = CacheEntry::new(42, chrono::Duration::milliseconds(-1));
        assert!(entry.is_expired());
    }

    #[test]
    fn not_expired_within_ttl() {
        let entry = CacheEntry::new(42, chrono::Duration::seconds(60));
        assert!(!entry.is_expired());
    }
}
