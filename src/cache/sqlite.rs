use crate::cache::{CacheResult, CacheStore};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Cache persisted in a local SQLite file so it survives restarts
pub struct SqliteStore {
    pool: Arc<SqlitePool>,
}

impl SqliteStore {
    pub async fn new(database_url: &str, max_connections: u32) -> CacheResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn init(&self) -> CacheResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache_key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM cache_entries WHERE cache_key = ?")
                .bind(key)
                .fetch_optional(self.pool.as_ref())
                .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> CacheResult<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO cache_entries (cache_key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(cache_key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE cache_key = ?")
            .bind(key)
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        let keys: Vec<String> =
            sqlx::query_scalar("SELECT cache_key FROM cache_entries ORDER BY cache_key")
                .fetch_all(self.pool.as_ref())
                .await?;
        Ok(keys)
    }

    async fn clear(&self) -> CacheResult<()> {
        sqlx::query("DELETE FROM cache_entries")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
