use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::cache::DEFAULT_FRESHNESS_SECS;
use crate::sources::SourceKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_server: ServerConfig,
    pub cache: CacheConfig,
    pub sources: SourcesConfig,
    pub insights: Option<InsightsConfig>,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Sqlite,
}

impl CacheBackend {
    /// Whether other processes, such as the admin CLI, see the same entries
    pub fn is_shared(&self) -> bool {
        matches!(self, CacheBackend::Sqlite)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub database_url: String,
    pub max_connections: u32,
    /// Maximum age of a cached page before it is refetched
    pub freshness_secs: i64,
    /// Entries held by the in-process read cache in front of SQLite
    pub read_capacity: u64,
    /// How long the read cache may serve a value without asking SQLite
    pub read_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Sources without an explicit endpoint are reached at `{base_url}/{source}`
    pub base_url: Option<String>,
    pub endpoints: HashMap<SourceKind, String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// `None` allows any origin
    pub allow_origin: Option<String>,
}

impl SourcesConfig {
    const fn default_timeout_secs() -> u64 {
        20
    }
}

impl InsightsConfig {
    const fn default_timeout_secs() -> u64 {
        60
    }

    fn default_model() -> String {
        "gpt-4o-mini".to_string()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let backend = match std::env::var("CACHE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "sqlite" => CacheBackend::Sqlite,
            "memory" => CacheBackend::Memory,
            other => {
                tracing::warn!(
                    "Unknown CACHE_BACKEND '{other}', falling back to 'memory'. Supported values: memory, sqlite"
                );
                CacheBackend::Memory
            }
        };

        let database_url = std::env::var("CACHE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./marketlens-cache.db?mode=rwc".to_string());

        let max_connections = std::env::var("CACHE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);

        let freshness_secs = std::env::var("CACHE_FRESHNESS_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_FRESHNESS_SECS);

        let read_capacity = std::env::var("CACHE_READ_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(256);

        let read_ttl_secs = std::env::var("CACHE_READ_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(30);

        let base_url = std::env::var("SOURCE_BASE_URL").ok().filter(|v| !v.is_empty());

        let endpoints = SourceKind::ALL
            .into_iter()
            .filter_map(|kind| {
                std::env::var(kind.env_key())
                    .ok()
                    .filter(|v| !v.is_empty())
                    .map(|url| (kind, url))
            })
            .collect();

        let source_timeout_secs = std::env::var("SOURCE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(SourcesConfig::default_timeout_secs);

        let insights = match std::env::var("INSIGHTS_URL").ok().filter(|v| !v.is_empty()) {
            Some(url) => Some(InsightsConfig {
                url,
                api_key: std::env::var("INSIGHTS_API_KEY").ok(),
                model: std::env::var("INSIGHTS_MODEL")
                    .unwrap_or_else(|_| InsightsConfig::default_model()),
                timeout_secs: std::env::var("INSIGHTS_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or_else(InsightsConfig::default_timeout_secs),
            }),
            None => None,
        };

        let allow_origin = std::env::var("CORS_ALLOW_ORIGIN").ok().filter(|v| !v.is_empty());

        Ok(Config {
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            cache: CacheConfig {
                backend,
                database_url,
                max_connections,
                freshness_secs,
                read_capacity,
                read_ttl_secs,
            },
            sources: SourcesConfig {
                base_url,
                endpoints,
                timeout_secs: source_timeout_secs,
            },
            insights,
            cors: CorsConfig { allow_origin },
        })
    }
}
