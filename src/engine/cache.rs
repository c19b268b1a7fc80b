//! Two-tier query cache: in-process map in front of an external store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

/// External cache store collaborator. Eviction and expiry are the store's
/// business; the engine never invalidates entries, not even on writes.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str, cache_name: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value, cache_name: &str);
}

/// The in-process tier answers first; the external tier engages only when a
/// non-empty cache name is resolved for the endpoint.
#[derive(Default)]
pub(crate) struct QueryCache {
    local: HashMap<String, Value>,
    store: Option<Arc<dyn CacheStore>>,
}

impl QueryCache {
    pub fn set_store(&mut self, store: Arc<dyn CacheStore>) {
        self.store = Some(store);
    }

    pub async fn get(&self, key: &str, cache_name: Option<&str>) -> Option<Value> {
        if let Some(hit) = self.local.get(key) {
            trace!("local cache hit");
            return Some(hit.clone());
        }
        match (&self.store, cache_name) {
            (Some(store), Some(name)) if !name.is_empty() => store.get(key, name).await,
            _ => None,
        }
    }

    pub async fn set(&mut self, key: &str, value: Value, cache_name: Option<&str>) {
        self.local.insert(key.to_string(), value.clone());
        if let (Some(store), Some(name)) = (&self.store, cache_name) {
            if !name.is_empty() {
                store.set(key, value, name).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        entries: Mutex<HashMap<(String, String), Value>>,
    }

    #[async_trait]
    impl CacheStore for MemoryStore {
        async fn get(&self, key: &str, cache_name: &str) -> Option<Value> {
            self.entries
                .lock()
                .unwrap()
                .get(&(key.to_string(), cache_name.to_string()))
                .cloned()
        }

        async fn set(&self, key: &str, value: Value, cache_name: &str) {
            self.entries
                .lock()
                .unwrap()
                .insert((key.to_string(), cache_name.to_string()), value);
        }
    }

    #[tokio::test]
    async fn test_round_trip_populates_both_tiers() {
        let store = Arc::new(MemoryStore::default());
        let mut cache = QueryCache::default();
        cache.set_store(store.clone());

        cache.set("k", json!([1, 2]), Some("queries")).await;
        assert_eq!(cache.get("k", Some("queries")).await, Some(json!([1, 2])));
        assert_eq!(store.get("k", "queries").await, Some(json!([1, 2])));
    }

    #[tokio::test]
    async fn test_external_tier_needs_cache_name() {
        let store = Arc::new(MemoryStore::default());
        let mut cache = QueryCache::default();
        cache.set_store(store.clone());

        cache.set("k", json!(1), None).await;
        assert!(store.entries.lock().unwrap().is_empty());
        // the local tier still answers
        assert_eq!(cache.get("k", None).await, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_external_tier_answers_on_local_miss() {
        let store = Arc::new(MemoryStore::default());
        store.set("k", json!("warm"), "queries").await;
        let mut cache = QueryCache::default();
        cache.set_store(store);
        assert_eq!(cache.get("k", Some("queries")).await, Some(json!("warm")));
    }
}
