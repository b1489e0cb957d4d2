use dashmap::DashMap;
use reqwest::Method;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::metrics::CACHE_SIZE;

// Cache entry with its expiry
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub value: Value,
    pub expires_at: Instant,
}

// Create a cache signature (hash of method + full url)
pub fn cache_signature(method: &Method, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_str());
    hasher.update(b" ");
    hasher.update(url);
    format!("{:x}", hasher.finalize())
}

/// TTL cache for GET response bodies.
///
/// Expired entries are dropped when they are read; there is no sweeper and no
/// size bound.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();

        // the read guard has to be gone before we remove
        let hit = match self.entries.get(key) {
            Some(entry) if now < entry.expires_at => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if hit {
            self.entries.remove_if(key, |_, entry| now >= entry.expires_at);
            CACHE_SIZE.set(self.entries.len() as f64);
        }
        None
    }

    pub fn put(&self, key: String, value: Value, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.entries.insert(key, CacheEntry { value, expires_at });
        CACHE_SIZE.set(self.entries.len() as f64);
    }

    pub fn clear(&self) {
        self.entries.clear();
        CACHE_SIZE.set(0.0);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockClock;
    use serde_json::json;

    fn cache() -> (ResponseCache, MockClock) {
        let clock = MockClock::default();
        (ResponseCache::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn signature_depends_on_method_and_url() {
        let a = cache_signature(&Method::GET, "https://api.test/rooms?page=1");
        let b = cache_signature(&Method::GET, "https://api.test/rooms?page=2");
        let c = cache_signature(&Method::POST, "https://api.test/rooms?page=1");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, cache_signature(&Method::GET, "https://api.test/rooms?page=1"));
    }

    #[test]
    fn hit_before_expiry() {
        let (cache, clock) = cache();
        cache.put("k".into(), json!({"id": 1}), Duration::from_secs(30));

        clock.advance(Duration::from_secs(29));
        assert_eq!(cache.get("k"), Some(json!({"id": 1})));
    }

    #[test]
    fn expired_entry_is_a_miss_and_gets_evicted() {
        let (cache, clock) = cache();
        cache.put("k".into(), json!([1, 2, 3]), Duration::from_secs(30));

        clock.advance(Duration::from_secs(30));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn put_overwrites_and_extends() {
        let (cache, clock) = cache();
        cache.put("k".into(), json!(1), Duration::from_secs(10));
        clock.advance(Duration::from_secs(8));
        cache.put("k".into(), json!(2), Duration::from_secs(10));
        clock.advance(Duration::from_secs(8));

        assert_eq!(cache.get("k"), Some(json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn never_returns_expired_values() {
        let (cache, clock) = cache();
        for i in 0..20u64 {
            cache.put(format!("k{}", i), json!(i), Duration::from_secs(i));
        }
        for step in 0..25u64 {
            for i in 0..20u64 {
                if let Some(v) = cache.get(&format!("k{}", i)) {
                    assert!(step < i, "k{} returned at t={}s", i, step);
                    assert_eq!(v, json!(i));
                }
            }
            clock.advance(Duration::from_secs(1));
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let (cache, _clock) = cache();
        cache.put("a".into(), json!(1), Duration::from_secs(60));
        cache.put("b".into(), json!(2), Duration::from_secs(60));
        cache.clear();
        assert!(cache.get("a").is_none());
        assert_eq!(cache.len(), 0);
    }
}
