use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::utils::age_display;

/// Persisted cache record. The payload is kept as raw JSON so the entry can
/// be read back without knowing the module's payload type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_key: String,
    pub payload: serde_json::Value,
    pub fetched_at_ms: i64,
}

impl CacheEntry {
    pub fn new(cache_key: &str, payload: serde_json::Value, fetched_at_ms: i64) -> Self {
        Self {
            cache_key: cache_key.to_string(),
            payload,
            fetched_at_ms,
        }
    }

    /// An entry is valid while `now - fetched_at < ttl`. A zero TTL is never
    /// valid.
    pub fn is_valid(&self, ttl: Duration, now_ms: i64) -> bool {
        if ttl <= Duration::zero() {
            return false;
        }
        now_ms - self.fetched_at_ms < ttl.num_milliseconds()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.fetched_at_ms)
    }

    pub fn age_minutes(&self, now_ms: i64) -> i64 {
        (now_ms - self.fetched_at_ms) / 60_000
    }

    pub fn age_display(&self, now_ms: i64) -> String {
        age_display(self.age_minutes(now_ms))
    }

    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.payload)
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HOUR_MS: i64 = 3_600_000;

    #[test]
    fn test_entry_validity_window() {
        let entry = CacheEntry::new("k", json!([1]), 0);
        let ttl = Duration::hours(24);
        assert!(entry.is_valid(ttl, 0));
        assert!(entry.is_valid(ttl, 23 * HOUR_MS));
        assert!(!entry.is_valid(ttl, 24 * HOUR_MS));
        assert!(!entry.is_valid(ttl, 25 * HOUR_MS));
    }

    #[test]
    fn test_zero_ttl_never_valid() {
        let entry = CacheEntry::new("k", json!([1]), 1_000);
        assert!(!entry.is_valid(Duration::zero(), 1_000));
    }

    #[test]
    fn test_entry_bytes_and_decode() {
        let entry = CacheEntry::new("verses", json!({"verses": ["John 3:16"]}), 42);
        let restored = CacheEntry::from_bytes(&entry.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.cache_key, "verses");
        assert_eq!(restored.fetched_at_ms, 42);

        #[derive(Deserialize)]
        struct Verses {
            verses: Vec<String>,
        }
        let decoded: Verses = restored.decode().unwrap();
        assert_eq!(decoded.verses, vec!["John 3:16".to_string()]);
    }

    #[test]
    fn test_entry_age_display() {
        let entry = CacheEntry::new("k", json!(null), 0);
        assert_eq!(entry.age_display(5 * 60_000), "5m ago");
        assert_eq!(entry.age_display(3 * HOUR_MS), "3h ago");
    }
}
