//! Page orchestrator integration tests
//!
//! These drive a page through its load state machine with scripted sources:
//! per-source fallback, cache short-circuiting, failure handling and
//! out-of-order completion of overlapping loads.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use marketlens::cache::{CacheManager, MemoryStore};
use marketlens::dashboard::{LoadState, NoticeLevel, Page, PageOrchestrator};
use marketlens::range::DateRange;
use marketlens::sources::{SourceClient, SourceError, SourceKind, SourcePayload};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

enum Behaviour {
    Succeed,
    Fail,
    /// Like an offline source with no endpoint set
    Unconfigured,
    /// Succeed on the first call, fail every later one
    FailAfterFirst,
    /// Succeed on the first call, panic on every later one
    PanicAfterFirst,
    /// Block fetches of `slow` until `release` is notified
    Gated {
        slow: DateRange,
        started: Arc<Notify>,
        release: Arc<Notify>,
    },
}

struct ScriptedSource {
    kind: SourceKind,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(kind: SourceKind, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Live ad data, tagged with the requested start date so tests can tell loads apart
fn live_ads(kind: SourceKind, range: &DateRange) -> SourcePayload {
    SourcePayload::parse(
        kind,
        json!({
            "campaigns": [
                {
                    "name": format!("Live IE {}", range.start_str()),
                    "status": "ENABLED",
                    "spend": 100,
                    "clicks": 10,
                    "impressions": 1000,
                    "conversions": 2
                },
                {
                    "name": "Live UK Retargeting",
                    "status": "ENABLED",
                    "spend": "50.5",
                    "clicks": "5",
                    "impressions": "400",
                    "conversions": "1"
                }
            ]
        }),
    )
    .unwrap()
}

#[async_trait]
impl SourceClient for ScriptedSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, range: &DateRange) -> Result<SourcePayload, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Succeed => Ok(live_ads(self.kind, range)),
            Behaviour::Fail => Err(SourceError::Status(503)),
            Behaviour::Unconfigured => Err(SourceError::NotConfigured(self.kind)),
            Behaviour::FailAfterFirst => {
                if call > 0 {
                    return Err(SourceError::Status(503));
                }
                Ok(live_ads(self.kind, range))
            }
            Behaviour::PanicAfterFirst => {
                if call > 0 {
                    panic!("scripted source crashed");
                }
                Ok(live_ads(self.kind, range))
            }
            Behaviour::Gated {
                slow,
                started,
                release,
            } => {
                if range == slow {
                    started.notify_one();
                    release.notified().await;
                }
                Ok(live_ads(self.kind, range))
            }
        }
    }
}

fn january() -> DateRange {
    DateRange::parse("2024-01-01", "2024-01-31").unwrap()
}

fn february() -> DateRange {
    DateRange::parse("2024-02-01", "2024-02-29").unwrap()
}

fn cache() -> Arc<CacheManager> {
    Arc::new(CacheManager::with_default_freshness(Arc::new(
        MemoryStore::new(),
    )))
}

fn clients(sources: &[&Arc<ScriptedSource>]) -> Vec<Arc<dyn SourceClient>> {
    sources
        .iter()
        .map(|s| Arc::clone(*s) as Arc<dyn SourceClient>)
        .collect()
}

fn campaign_names(snapshot: &marketlens::dashboard::PageSnapshot) -> Vec<String> {
    snapshot
        .data
        .as_ref()
        .map(|d| d.campaigns().into_iter().map(|c| c.name).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_all_sources_succeed() {
    let cache = cache();
    let search = ScriptedSource::new(SourceKind::SearchAds, Behaviour::Succeed);
    let social = ScriptedSource::new(SourceKind::SocialAds, Behaviour::Succeed);
    let page = PageOrchestrator::with_sources(
        Page::Ads,
        clients(&[&search, &social]),
        Arc::clone(&cache),
    );

    assert_eq!(page.snapshot().await.state, LoadState::Idle);

    let snapshot = page.load(january(), false).await;

    assert_eq!(snapshot.state, LoadState::Success);
    assert!(!snapshot.from_cache);
    assert_eq!(snapshot.range, Some(january()));
    assert!(snapshot.last_refresh.is_some());
    assert_eq!(snapshot.notices.len(), 1);
    assert_eq!(snapshot.notices[0].level, NoticeLevel::Info);

    let data = snapshot.data.as_ref().unwrap();
    assert!(data.placeholder_sources.is_empty());
    // Sources appear in page order regardless of completion order
    let kinds: Vec<SourceKind> = data.sources.iter().map(|p| p.kind()).collect();
    assert_eq!(kinds, vec![SourceKind::SearchAds, SourceKind::SocialAds]);
    assert_eq!(data.campaigns().len(), 4);

    assert!(cache
        .read(Page::Ads.cache_key(), &january(), Utc::now())
        .await
        .is_some());
}

#[tokio::test]
async fn test_failed_source_uses_placeholder() {
    let cache = cache();
    let search = ScriptedSource::new(SourceKind::SearchAds, Behaviour::Succeed);
    let social = ScriptedSource::new(SourceKind::SocialAds, Behaviour::Fail);
    let page =
        PageOrchestrator::with_sources(Page::Ads, clients(&[&search, &social]), Arc::clone(&cache));

    let snapshot = page.load(january(), false).await;

    assert_eq!(snapshot.state, LoadState::PartialFailure);
    let notice = &snapshot.notices[0];
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.sources, vec![SourceKind::SocialAds]);
    assert!(notice.message.contains("Social Ads"));
    assert!(!notice.message.contains("Search Ads"));

    let data = snapshot.data.as_ref().unwrap();
    assert_eq!(data.placeholder_sources, vec![SourceKind::SocialAds]);
    let social_payload = data.payload(SourceKind::SocialAds).unwrap();
    assert_eq!(*social_payload, marketlens::sources::placeholder(SourceKind::SocialAds));

    // Live and placeholder data are cached together
    assert!(cache
        .read(Page::Ads.cache_key(), &january(), Utc::now())
        .await
        .is_some());
}

#[tokio::test]
async fn test_every_source_failing_keeps_previous_data() {
    let cache = cache();
    let search = ScriptedSource::new(SourceKind::SearchAds, Behaviour::FailAfterFirst);
    let social = ScriptedSource::new(SourceKind::SocialAds, Behaviour::FailAfterFirst);
    let page =
        PageOrchestrator::with_sources(Page::Ads, clients(&[&search, &social]), Arc::clone(&cache));

    let t0 = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();
    let good = page.load_at(january(), false, t0).await;
    assert_eq!(good.state, LoadState::Success);

    let failed = page.load_at(january(), true, t0 + Duration::hours(1)).await;

    assert_eq!(failed.state, LoadState::Failure);
    assert_eq!(failed.notices[0].level, NoticeLevel::Error);
    assert!(failed.notices[0].message.contains("Search Ads, Social Ads"));
    assert_eq!(failed.last_refresh, Some(t0));
    assert_eq!(campaign_names(&failed), campaign_names(&good));
    assert!(failed.data.as_ref().unwrap().placeholder_sources.is_empty());

    // The live entry is still the one served from cache
    let cached = page.load_at(january(), false, t0 + Duration::hours(2)).await;
    assert_eq!(search.calls(), 2);
    assert!(cached.from_cache);
    assert_eq!(cached.state, LoadState::Success);
    assert!(cached.notices.is_empty());
    assert!(cached.data.as_ref().unwrap().placeholder_sources.is_empty());
    assert_eq!(campaign_names(&cached), campaign_names(&good));
}

#[tokio::test]
async fn test_every_source_failing_on_first_load() {
    let cache = cache();
    let search = ScriptedSource::new(SourceKind::SearchAds, Behaviour::Fail);
    let social = ScriptedSource::new(SourceKind::SocialAds, Behaviour::Fail);
    let page =
        PageOrchestrator::with_sources(Page::Ads, clients(&[&search, &social]), Arc::clone(&cache));

    let snapshot = page.load(january(), false).await;

    assert_eq!(snapshot.state, LoadState::Failure);
    assert!(snapshot.data.is_none());
    assert!(cache
        .read(Page::Ads.cache_key(), &january(), Utc::now())
        .await
        .is_none());
}

#[tokio::test]
async fn test_unconfigured_sources_serve_placeholders() {
    let search = ScriptedSource::new(SourceKind::SearchAds, Behaviour::Unconfigured);
    let social = ScriptedSource::new(SourceKind::SocialAds, Behaviour::Unconfigured);
    let page = PageOrchestrator::with_sources(Page::Ads, clients(&[&social, &search]), cache());

    let snapshot = page.load(january(), false).await;

    assert_eq!(snapshot.state, LoadState::PartialFailure);
    // Listed in the order the page declares its sources
    assert_eq!(
        snapshot.notices[0].sources,
        vec![SourceKind::SocialAds, SourceKind::SearchAds]
    );
    assert!(!campaign_names(&snapshot).is_empty());
}

#[tokio::test]
async fn test_cached_partial_result_keeps_warning() {
    let search = ScriptedSource::new(SourceKind::SearchAds, Behaviour::Succeed);
    let social = ScriptedSource::new(SourceKind::SocialAds, Behaviour::Fail);
    let page = PageOrchestrator::with_sources(Page::Ads, clients(&[&search, &social]), cache());

    page.load(january(), false).await;
    let cached = page.load(january(), false).await;

    assert!(cached.from_cache);
    assert_eq!(cached.state, LoadState::Success);
    assert_eq!(cached.notices.len(), 1);
    assert_eq!(cached.notices[0].level, NoticeLevel::Warning);
    assert_eq!(cached.notices[0].sources, vec![SourceKind::SocialAds]);
    assert!(cached.notices[0].message.contains("Social Ads"));
}

#[tokio::test]
async fn test_cache_hit_skips_fetch() {
    let cache = cache();
    let search = ScriptedSource::new(SourceKind::SearchAds, Behaviour::Succeed);
    let page =
        PageOrchestrator::with_sources(Page::Ads, clients(&[&search]), Arc::clone(&cache));

    let t0 = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();
    let first = page.load_at(january(), false, t0).await;
    assert_eq!(search.calls(), 1);

    let second = page.load_at(january(), false, t0 + Duration::hours(23)).await;
    assert_eq!(search.calls(), 1);
    assert_eq!(second.state, LoadState::Success);
    assert!(second.from_cache);
    assert!(second.notices.is_empty());
    // Refresh time is when the data was fetched, not when it was read back
    assert_eq!(second.last_refresh, Some(t0));
    assert_eq!(campaign_names(&second), campaign_names(&first));

    // Past the freshness window the page refetches
    let third = page.load_at(january(), false, t0 + Duration::hours(25)).await;
    assert_eq!(search.calls(), 2);
    assert!(!third.from_cache);

    // A different range is a miss even while fresh
    page.load_at(february(), false, t0 + Duration::hours(26)).await;
    assert_eq!(search.calls(), 3);
}

#[tokio::test]
async fn test_force_bypasses_fresh_cache() {
    let search = ScriptedSource::new(SourceKind::SearchAds, Behaviour::Succeed);
    let page = PageOrchestrator::with_sources(Page::Ads, clients(&[&search]), cache());

    page.load(january(), false).await;
    let forced = page.load(january(), true).await;

    assert_eq!(search.calls(), 2);
    assert!(!forced.from_cache);
    assert_eq!(forced.state, LoadState::Success);
}

#[tokio::test]
async fn test_failure_keeps_previous_data_and_cache() {
    let cache = cache();
    let search = ScriptedSource::new(SourceKind::SearchAds, Behaviour::PanicAfterFirst);
    let page =
        PageOrchestrator::with_sources(Page::Ads, clients(&[&search]), Arc::clone(&cache));

    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let good = page.load_at(january(), false, t0).await;
    assert_eq!(good.state, LoadState::Success);

    let failed = page.load_at(february(), false, t0 + Duration::hours(1)).await;

    assert_eq!(search.calls(), 2);
    assert_eq!(failed.state, LoadState::Failure);
    assert_eq!(failed.notices[0].level, NoticeLevel::Error);
    // Last known good data is still shown
    assert_eq!(failed.range, Some(january()));
    assert_eq!(failed.last_refresh, Some(t0));
    assert_eq!(campaign_names(&failed), campaign_names(&good));

    // Nothing was cached for the failed range; the earlier entry survives
    assert!(cache
        .read(Page::Ads.cache_key(), &february(), t0 + Duration::hours(1))
        .await
        .is_none());
    assert!(cache
        .read(Page::Ads.cache_key(), &january(), t0 + Duration::hours(1))
        .await
        .is_some());
}

#[tokio::test]
async fn test_page_without_sources_fails() {
    let page = PageOrchestrator::with_sources(Page::Email, Vec::new(), cache());

    let snapshot = page.load(january(), false).await;

    assert_eq!(snapshot.state, LoadState::Failure);
    assert!(snapshot.data.is_none());
    assert_eq!(snapshot.notices[0].level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_stale_load_is_not_applied() {
    let cache = cache();
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let search = ScriptedSource::new(
        SourceKind::SearchAds,
        Behaviour::Gated {
            slow: january(),
            started: Arc::clone(&started),
            release: Arc::clone(&release),
        },
    );
    let page = Arc::new(PageOrchestrator::with_sources(
        Page::Ads,
        clients(&[&search]),
        Arc::clone(&cache),
    ));

    // Older request: blocks inside the source
    let slow = {
        let page = Arc::clone(&page);
        tokio::spawn(async move { page.load(january(), false).await })
    };
    started.notified().await;

    // Newer request completes first
    let fast = page.load(february(), false).await;
    assert_eq!(fast.state, LoadState::Success);
    assert_eq!(fast.range, Some(february()));

    release.notify_one();
    let late = slow.await.unwrap();

    // The late caller gets its own range back
    assert_eq!(late.state, LoadState::Success);
    assert_eq!(late.range, Some(january()));
    assert!(campaign_names(&late)
        .iter()
        .any(|name| name.contains("2024-01-01")));

    // but it did not overwrite the newer state
    let current = page.snapshot().await;
    assert_eq!(current.range, Some(february()));
    assert!(campaign_names(&current)
        .iter()
        .any(|name| name.contains("2024-02-01")));

    // Nor the cache
    assert!(cache
        .read(Page::Ads.cache_key(), &january(), Utc::now())
        .await
        .is_none());
    assert!(cache
        .read(Page::Ads.cache_key(), &february(), Utc::now())
        .await
        .is_some());
}
