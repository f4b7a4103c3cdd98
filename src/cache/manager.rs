//! Freshness and date-range checks on top of a raw [`CacheStore`]

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{CacheResult, CacheStore};
use crate::range::DateRange;

/// Default freshness window: 24 hours
pub const DEFAULT_FRESHNESS_SECS: i64 = 24 * 60 * 60;

/// Stored layout of one cached page payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub start_date: String,
    pub end_date: String,
    pub data: Value,
}

impl CacheEntry {
    fn matches(&self, range: &DateRange) -> bool {
        self.start_date == range.start_str() && self.end_date == range.end_str()
    }
}

/// What is currently stored under a key, for inspection tools
#[derive(Debug)]
pub enum EntryState {
    Missing,
    Corrupt(String),
    Present { entry: CacheEntry, fresh: bool },
}

pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    freshness: Duration,
}

impl CacheManager {
    pub fn new(store: Arc<dyn CacheStore>, freshness: Duration) -> Self {
        Self { store, freshness }
    }

    pub fn with_default_freshness(store: Arc<dyn CacheStore>) -> Self {
        Self::new(store, Duration::seconds(DEFAULT_FRESHNESS_SECS))
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Cached payload for `key`, if it is younger than the freshness window
    /// and was stored for exactly `range`.
    ///
    /// Unreadable or malformed entries are treated as a miss.
    pub async fn read(&self, key: &str, range: &DateRange, now: DateTime<Utc>) -> Option<Value> {
        self.read_entry(key, range, now).await.map(|entry| entry.data)
    }

    /// Same as [`CacheManager::read`] but keeps the entry's write timestamp
    pub async fn read_entry(
        &self,
        key: &str,
        range: &DateRange,
        now: DateTime<Utc>,
    ) -> Option<CacheEntry> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache miss for '{}': no entry", key);
                return None;
            }
            Err(e) => {
                warn!("Cache read for '{}' failed, refetching: {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding malformed cache entry '{}': {}", key, e);
                return None;
            }
        };

        if now - entry.timestamp >= self.freshness {
            debug!("Cache miss for '{}': entry from {} is stale", key, entry.timestamp);
            return None;
        }

        if !entry.matches(range) {
            debug!(
                "Cache miss for '{}': cached {}..{}, requested {}..{}",
                key,
                entry.start_date,
                entry.end_date,
                range.start_str(),
                range.end_str()
            );
            return None;
        }

        debug!("Cache hit for '{}'", key);
        Some(entry)
    }

    /// Store `payload` for `range`, overwriting whatever was under `key`
    pub async fn write<T: Serialize>(
        &self,
        key: &str,
        range: &DateRange,
        payload: &T,
        now: DateTime<Utc>,
    ) -> CacheResult<()> {
        let entry = CacheEntry {
            timestamp: now,
            start_date: range.start_str(),
            end_date: range.end_str(),
            data: serde_json::to_value(payload)?,
        };

        self.store.set(key, serde_json::to_string(&entry)?).await
    }

    /// Remove the given keys regardless of freshness. Returns how many existed.
    pub async fn purge<S: AsRef<str>>(&self, keys: &[S]) -> CacheResult<usize> {
        let mut removed = 0;
        for key in keys {
            if self.store.remove(key.as_ref()).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub async fn keys(&self) -> CacheResult<Vec<String>> {
        self.store.keys().await
    }

    pub async fn inspect(&self, key: &str, now: DateTime<Utc>) -> CacheResult<EntryState> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(EntryState::Missing);
        };

        Ok(match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => {
                let fresh = now - entry.timestamp < self.freshness;
                EntryState::Present { entry, fresh }
            }
            Err(e) => EntryState::Corrupt(e.to_string()),
        })
    }
}
