//! Upstream marketing and commerce sources
//!
//! Each source is reached through a [`SourceClient`]. Raw upstream JSON is
//! validated into the typed payloads in [`schema`] at this boundary; nothing
//! past it sees untyped vendor data.

pub mod http;
pub mod placeholder;
pub mod schema;

pub use http::{HttpSourceClient, OfflineSource};
pub use placeholder::placeholder;
pub use schema::SourcePayload;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::SourcesConfig;
use crate::range::DateRange;

/// One upstream platform
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    WebAnalytics,
    SearchAds,
    SocialAds,
    Email,
    Ecommerce,
    Subscriptions,
}

impl SourceKind {
    pub const ALL: [SourceKind; 6] = [
        SourceKind::WebAnalytics,
        SourceKind::SearchAds,
        SourceKind::SocialAds,
        SourceKind::Email,
        SourceKind::Ecommerce,
        SourceKind::Subscriptions,
    ];

    /// Path segment and placeholder file stem
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::WebAnalytics => "web_analytics",
            SourceKind::SearchAds => "search_ads",
            SourceKind::SocialAds => "social_ads",
            SourceKind::Email => "email",
            SourceKind::Ecommerce => "ecommerce",
            SourceKind::Subscriptions => "subscriptions",
        }
    }

    /// Name shown to users in fallback notices
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::WebAnalytics => "Web Analytics",
            SourceKind::SearchAds => "Search Ads",
            SourceKind::SocialAds => "Social Ads",
            SourceKind::Email => "Email Marketing",
            SourceKind::Ecommerce => "E-commerce",
            SourceKind::Subscriptions => "Subscriptions",
        }
    }

    /// Suffix of the per-source endpoint override, e.g. `SOURCE_SEARCH_ADS_URL`
    pub fn env_key(&self) -> String {
        format!("SOURCE_{}_URL", self.as_str().to_uppercase())
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Why a source could not provide data. Every variant is recovered by
/// substituting placeholder data for that source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} has no endpoint configured")]
    NotConfigured(SourceKind),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    #[error("upstream reported an error: {0}")]
    Upstream(String),
    #[error("response did not match the {kind} schema: {message}")]
    Schema { kind: SourceKind, message: String },
}

/// A backend collaborator that can report one source's data for a date range
#[async_trait]
pub trait SourceClient: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn fetch(&self, range: &DateRange) -> Result<SourcePayload, SourceError>;
}

/// Clients for every source, keyed by kind
#[derive(Clone, Default)]
pub struct SourceRegistry {
    clients: HashMap<SourceKind, Arc<dyn SourceClient>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client` under its own kind, replacing any previous one
    pub fn with(mut self, client: Arc<dyn SourceClient>) -> Self {
        self.clients.insert(client.kind(), client);
        self
    }

    /// Client for `kind`; unregistered sources report themselves as unconfigured
    pub fn get(&self, kind: SourceKind) -> Arc<dyn SourceClient> {
        self.clients
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Arc::new(OfflineSource::new(kind)))
    }

    /// Build HTTP clients from configuration.
    ///
    /// A source without an explicit URL falls back to `{base_url}/{source}`;
    /// without either it stays offline and always serves placeholder data.
    pub fn from_config(config: &SourcesConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("marketlens/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let mut registry = Self::new();
        for kind in SourceKind::ALL {
            let endpoint = config.endpoints.get(&kind).cloned().or_else(|| {
                config
                    .base_url
                    .as_ref()
                    .map(|base| format!("{}/{}", base.trim_end_matches('/'), kind.as_str()))
            });

            match endpoint {
                Some(endpoint) => {
                    info!("{} source endpoint: {}", kind, endpoint);
                    registry = registry.with(Arc::new(HttpSourceClient::new(
                        kind,
                        endpoint,
                        client.clone(),
                    )));
                }
                None => {
                    warn!(
                        "{} source is not configured (set {} or SOURCE_BASE_URL); placeholder data will be served",
                        kind,
                        kind.env_key()
                    );
                }
            }
        }

        Ok(registry)
    }
}
