use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to serialize cache entry: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Raw string key-value store backing the dashboard cache.
///
/// Values are opaque strings so a store can hold corrupt data; interpreting
/// them is the job of [`crate::cache::CacheManager`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Initialize the store (create tables, etc.)
    async fn init(&self) -> CacheResult<()> {
        Ok(())
    }

    /// Get the raw value stored under `key`
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value` under `key`, replacing anything already there
    async fn set(&self, key: &str, value: String) -> CacheResult<()>;

    /// Remove `key`. Returns whether something was removed.
    async fn remove(&self, key: &str) -> CacheResult<bool>;

    /// List every key currently stored
    async fn keys(&self) -> CacheResult<Vec<String>>;

    /// Remove everything
    async fn clear(&self) -> CacheResult<()>;
}
