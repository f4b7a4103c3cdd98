use crate::cache::{CacheResult, CacheStore};
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Read cache in front of a slower store (usually SQLite).
///
/// Writes go to the inner store first and then refresh the read cache, so
/// the inner store stays authoritative.
pub struct ReadThroughStore {
    /// Underlying store implementation
    inner: Arc<dyn CacheStore>,
    /// Raw values by key, including known-missing keys
    read_cache: Cache<String, Option<String>>,
}

impl ReadThroughStore {
    pub fn new(inner: Arc<dyn CacheStore>, max_entries: u64, time_to_live: Duration) -> Self {
        let read_cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(time_to_live)
            .build();

        Self { inner, read_cache }
    }
}

#[async_trait]
impl CacheStore for ReadThroughStore {
    async fn init(&self) -> CacheResult<()> {
        self.inner.init().await
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        if let Some(cached) = self.read_cache.get(key).await {
            return Ok(cached);
        }

        let value = self.inner.get(key).await?;
        self.read_cache.insert(key.to_string(), value.clone()).await;

        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> CacheResult<()> {
        self.inner.set(key, value.clone()).await?;
        self.read_cache.insert(key.to_string(), Some(value)).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        let removed = self.inner.remove(key).await?;
        self.read_cache.invalidate(key).await;
        Ok(removed)
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        self.inner.keys().await
    }

    async fn clear(&self) -> CacheResult<()> {
        self.inner.clear().await?;
        self.read_cache.invalidate_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;

    #[tokio::test]
    async fn test_reads_are_served_from_cache_after_first_lookup() {
        let inner = Arc::new(MemoryStore::new());
        let store = ReadThroughStore::new(inner.clone(), 100, Duration::from_secs(60));

        store.set("k", "v1".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v1"));

        // A write that bypasses the wrapper is not visible until invalidation
        inner.set("k", "v2".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v1"));

        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(inner.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_empties_both_layers() {
        let inner = Arc::new(MemoryStore::new());
        let store = ReadThroughStore::new(inner.clone(), 100, Duration::from_secs(60));

        store.set("a", "1".to_string()).await.unwrap();
        store.set("b", "2".to_string()).await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec!["a", "b"]);

        store.clear().await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
        assert_eq!(store.get("a").await.unwrap(), None);
    }
}
