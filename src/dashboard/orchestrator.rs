//! Per-page data loading: cache check, concurrent source fetch, per-source
//! fallback and cache update.
//!
//! Every `load` takes a generation number. When loads overlap, a result that
//! settles after a newer one has already been applied is returned to its own
//! caller but never written to shared state or cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cache::CacheManager;
use crate::dashboard::page::Page;
use crate::metrics::CampaignRecord;
use crate::range::DateRange;
use crate::sources::{
    placeholder, SourceClient, SourceError, SourceKind, SourcePayload, SourceRegistry,
};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("page has no sources to load")]
    NoSources,
    #[error("no source could be reached: {}", .0.iter().map(|k| k.display_name()).collect::<Vec<_>>().join(", "))]
    AllSourcesFailed(Vec<SourceKind>),
    #[error("source task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Idle,
    Loading,
    Success,
    PartialFailure,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Non-blocking advisory shown alongside the data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceKind>,
}

/// Everything fetched for a page; this is what gets cached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    pub sources: Vec<SourcePayload>,
    /// Sources whose entry in `sources` is bundled placeholder data
    #[serde(default)]
    pub placeholder_sources: Vec<SourceKind>,
}

impl PageData {
    pub fn payload(&self, kind: SourceKind) -> Option<&SourcePayload> {
        self.sources.iter().find(|p| p.kind() == kind)
    }

    /// Campaign records from every campaign-level source on the page
    pub fn campaigns(&self) -> Vec<CampaignRecord> {
        self.sources.iter().flat_map(|p| p.campaigns()).collect()
    }
}

/// Current state of one page, as last applied
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub page: Page,
    pub state: LoadState,
    pub range: Option<DateRange>,
    pub data: Option<Arc<PageData>>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub from_cache: bool,
    pub notices: Vec<Notice>,
}

impl PageSnapshot {
    fn idle(page: Page) -> Self {
        Self {
            page,
            state: LoadState::Idle,
            range: None,
            data: None,
            last_refresh: None,
            from_cache: false,
            notices: Vec::new(),
        }
    }
}

struct Inner {
    snapshot: PageSnapshot,
    /// Generation of the last load whose result was applied
    applied_generation: u64,
}

struct Fetched {
    payloads: Vec<SourcePayload>,
    failed: Vec<SourceKind>,
}

pub struct PageOrchestrator {
    page: Page,
    sources: Vec<Arc<dyn SourceClient>>,
    cache: Arc<CacheManager>,
    inner: RwLock<Inner>,
    next_generation: AtomicU64,
}

impl PageOrchestrator {
    /// Orchestrator for `page` using the registry's client for each of its sources
    pub fn new(page: Page, registry: &SourceRegistry, cache: Arc<CacheManager>) -> Self {
        let sources = page.sources().iter().map(|kind| registry.get(*kind)).collect();
        Self::with_sources(page, sources, cache)
    }

    pub fn with_sources(
        page: Page,
        sources: Vec<Arc<dyn SourceClient>>,
        cache: Arc<CacheManager>,
    ) -> Self {
        Self {
            page,
            sources,
            cache,
            inner: RwLock::new(Inner {
                snapshot: PageSnapshot::idle(page),
                applied_generation: 0,
            }),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub async fn snapshot(&self) -> PageSnapshot {
        self.inner.read().await.snapshot.clone()
    }

    pub async fn load(&self, range: DateRange, force: bool) -> PageSnapshot {
        self.load_at(range, force, Utc::now()).await
    }

    /// Load `range`, from cache when possible unless `force` is set.
    ///
    /// Never fails: source errors become placeholder data and orchestration
    /// errors keep the previously loaded data. The returned snapshot says
    /// which of those happened. A load overtaken by a newer one is returned
    /// to its own caller without being applied.
    pub async fn load_at(&self, range: DateRange, force: bool, now: DateTime<Utc>) -> PageSnapshot {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;

        if !force {
            if let Some((data, written_at)) = self.cached(&range, now).await {
                let notices = if data.placeholder_sources.is_empty() {
                    Vec::new()
                } else {
                    vec![placeholder_notice(&data.placeholder_sources)]
                };
                let snapshot = PageSnapshot {
                    page: self.page,
                    state: LoadState::Success,
                    range: Some(range),
                    data: Some(Arc::new(data)),
                    last_refresh: Some(written_at),
                    from_cache: true,
                    notices,
                };

                let mut inner = self.inner.write().await;
                if generation > inner.applied_generation {
                    inner.applied_generation = generation;
                    inner.snapshot = snapshot.clone();
                }
                return snapshot;
            }
        }

        {
            let mut inner = self.inner.write().await;
            if generation > inner.applied_generation {
                inner.snapshot.state = LoadState::Loading;
            }
        }

        info!("Loading {} page for {}..{}", self.page, range.start_str(), range.end_str());
        let outcome = self.fetch_all(&range).await;

        let mut inner = self.inner.write().await;
        let stale = generation < inner.applied_generation;
        if stale {
            debug!(
                "Not applying stale {} load (generation {} < {})",
                self.page, generation, inner.applied_generation
            );
        } else {
            inner.applied_generation = generation;
        }

        let snapshot = match outcome {
            Ok(fetched) => {
                let data = PageData {
                    sources: fetched.payloads,
                    placeholder_sources: fetched.failed.clone(),
                };

                if !stale {
                    if let Err(e) = self
                        .cache
                        .write(self.page.cache_key(), &range, &data, now)
                        .await
                    {
                        warn!("Failed to cache {} page: {}", self.page, e);
                    }
                }

                let (state, notice) = if fetched.failed.is_empty() {
                    (
                        LoadState::Success,
                        Notice {
                            level: NoticeLevel::Info,
                            message: "Dashboard data refreshed".to_string(),
                            sources: Vec::new(),
                        },
                    )
                } else {
                    (LoadState::PartialFailure, placeholder_notice(&fetched.failed))
                };

                PageSnapshot {
                    page: self.page,
                    state,
                    range: Some(range),
                    data: Some(Arc::new(data)),
                    last_refresh: Some(now),
                    from_cache: false,
                    notices: vec![notice],
                }
            }
            Err(e) => {
                error!("Loading {} page failed: {}", self.page, e);
                // Previous data, range and refresh time stay as they were
                let previous = if stale {
                    PageSnapshot {
                        range: Some(range),
                        ..PageSnapshot::idle(self.page)
                    }
                } else {
                    inner.snapshot.clone()
                };
                PageSnapshot {
                    state: LoadState::Failure,
                    notices: vec![Notice {
                        level: NoticeLevel::Error,
                        message: format!(
                            "Could not refresh dashboard data ({e}); showing last loaded data"
                        ),
                        sources: Vec::new(),
                    }],
                    ..previous
                }
            }
        };

        if !stale {
            inner.snapshot = snapshot.clone();
        }
        snapshot
    }

    async fn cached(&self, range: &DateRange, now: DateTime<Utc>) -> Option<(PageData, DateTime<Utc>)> {
        let entry = self.cache.read_entry(self.page.cache_key(), range, now).await?;

        match serde_json::from_value::<PageData>(entry.data) {
            Ok(data) => Some((data, entry.timestamp)),
            Err(e) => {
                warn!("Cached {} page has an unexpected shape, refetching: {}", self.page, e);
                None
            }
        }
    }

    /// Fetch every source concurrently. A failing source is replaced by its
    /// placeholder. The whole pass fails when a task panics or is cancelled,
    /// or when every configured source is unavailable.
    async fn fetch_all(&self, range: &DateRange) -> Result<Fetched, OrchestratorError> {
        if self.sources.is_empty() {
            return Err(OrchestratorError::NoSources);
        }

        let mut tasks = JoinSet::new();
        for (index, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            let range = *range;
            tasks.spawn(async move {
                let kind = source.kind();
                (index, kind, source.fetch(&range).await)
            });
        }

        let mut slots: Vec<Option<SourcePayload>> = vec![None; self.sources.len()];
        let mut failed = Vec::new();
        let mut configured = 0;
        let mut unavailable = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (index, kind, result) = joined?;
            if !matches!(result, Err(SourceError::NotConfigured(_))) {
                configured += 1;
            }
            let payload = match result {
                Ok(payload) if payload.kind() == kind => payload,
                Ok(payload) => {
                    warn!(
                        "{} source returned {} data, using placeholder",
                        kind,
                        payload.kind()
                    );
                    unavailable.push(kind);
                    failed.push(kind);
                    placeholder(kind)
                }
                Err(SourceError::NotConfigured(_)) => {
                    debug!("{} source not configured, using placeholder", kind);
                    failed.push(kind);
                    placeholder(kind)
                }
                Err(e) => {
                    warn!("{} source unavailable, using placeholder: {}", kind, e);
                    unavailable.push(kind);
                    failed.push(kind);
                    placeholder(kind)
                }
            };
            slots[index] = Some(payload);
        }

        // Report fallbacks in page order, not completion order
        let page_order = |kind: &SourceKind| self.sources.iter().position(|s| s.kind() == *kind);
        failed.sort_by_key(page_order);
        unavailable.sort_by_key(page_order);

        if configured > 0 && unavailable.len() == configured {
            return Err(OrchestratorError::AllSourcesFailed(unavailable));
        }

        Ok(Fetched {
            payloads: slots.into_iter().flatten().collect(),
            failed,
        })
    }
}

fn placeholder_notice(sources: &[SourceKind]) -> Notice {
    let names: Vec<&str> = sources.iter().map(|k| k.display_name()).collect();
    Notice {
        level: NoticeLevel::Warning,
        message: format!("Showing placeholder data for: {}", names.join(", ")),
        sources: sources.to_vec(),
    }
}
