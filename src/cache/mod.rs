pub mod cached;
pub mod manager;
pub mod memory;
pub mod sqlite;
pub mod trait_def;

pub use cached::ReadThroughStore;
pub use manager::{CacheEntry, CacheManager, EntryState, DEFAULT_FRESHNESS_SECS};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use trait_def::{CacheError, CacheResult, CacheStore};

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{CacheBackend, CacheConfig};

/// Build the configured cache store and make sure it is ready for use
pub async fn build_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Memory => {
            info!("Using in-memory dashboard cache");
            Arc::new(MemoryStore::new())
        }
        CacheBackend::Sqlite => {
            info!("Using SQLite dashboard cache: {}", config.database_url);
            let sqlite = SqliteStore::new(&config.database_url, config.max_connections)
                .await
                .with_context(|| format!("failed to open cache database {}", config.database_url))?;
            Arc::new(ReadThroughStore::new(
                Arc::new(sqlite),
                config.read_capacity,
                Duration::from_secs(config.read_ttl_secs.max(1)),
            ))
        }
    };

    store.init().await.context("failed to initialize cache store")?;
    Ok(store)
}
