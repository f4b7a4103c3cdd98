//! Client-side view over already-fetched page data
//!
//! Market filtering and comparisons are pure transformations of a
//! [`PageSnapshot`]; changing the market never triggers a fetch.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dashboard::orchestrator::{LoadState, Notice, PageData, PageSnapshot};
use crate::dashboard::page::Page;
use crate::metrics::{
    aggregate, aggregate_by_market, compare, CampaignRecord, CampaignStatus, CompareResult,
    Counters, Market, MarketFilter, MarketTotals, MetricSnapshot, Trend,
};
use crate::range::{relative_time, DateRange};
use crate::sources::schema::{StoreTotals, SubscriptionTotals, TrafficTotals};
use crate::sources::{SourceKind, SourcePayload};

pub const PERIOD_LABEL: &str = "vs previous period";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignView {
    pub name: String,
    pub status: CampaignStatus,
    pub source: SourceKind,
    pub market: Option<Market>,
    /// Currently delivering, per the source's status vocabulary
    pub live: bool,
    #[serde(flatten)]
    pub metrics: MetricSnapshot,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTotals {
    pub source: SourceKind,
    pub campaigns: usize,
    pub metrics: MetricSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub metric: String,
    pub current: f64,
    pub previous: Option<f64>,
    pub change: Option<CompareResult>,
    pub trend: Trend,
}

impl Comparison {
    fn new(metric: &str, current: f64, previous: Option<f64>, inverted: bool) -> Self {
        let change = compare(current, previous, PERIOD_LABEL);
        let trend = Trend::of(change.as_ref(), inverted);
        Self {
            metric: metric.to_string(),
            current,
            previous,
            change,
            trend,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub page: Page,
    pub state: LoadState,
    pub range: Option<DateRange>,
    /// Range the comparisons are measured against
    pub previous_range: Option<DateRange>,
    pub market: MarketFilter,
    pub from_cache: bool,
    pub last_refresh: Option<DateTime<Utc>>,
    /// "updated 5 minutes ago", computed from `last_refresh` at build time
    pub updated: Option<String>,
    pub notices: Vec<Notice>,
    pub placeholder_sources: Vec<SourceKind>,
    /// Totals over the campaigns that pass the market filter
    pub totals: MetricSnapshot,
    pub channels: Vec<ChannelTotals>,
    pub markets: Vec<MarketTotals>,
    pub campaigns: Vec<CampaignView>,
    pub comparisons: Vec<Comparison>,
    pub sources: Vec<SourcePayload>,
}

impl PageView {
    pub fn build(snapshot: &PageSnapshot, market: MarketFilter, now: DateTime<Utc>) -> Self {
        let empty = PageData {
            sources: Vec::new(),
            placeholder_sources: Vec::new(),
        };
        let data = snapshot.data.as_deref().unwrap_or(&empty);

        let all_campaigns = data.campaigns();
        let filtered: Vec<CampaignRecord> = all_campaigns
            .iter()
            .filter(|c| market.matches(c.market()))
            .cloned()
            .collect();

        Self {
            page: snapshot.page,
            state: snapshot.state,
            range: snapshot.range,
            previous_range: snapshot.range.map(|r| r.previous_period()),
            market,
            from_cache: snapshot.from_cache,
            last_refresh: snapshot.last_refresh,
            updated: snapshot.last_refresh.map(|at| relative_time(now, at)),
            notices: snapshot.notices.clone(),
            placeholder_sources: data.placeholder_sources.clone(),
            totals: aggregate(&filtered),
            channels: channel_totals(&filtered),
            // Per-market breakdown always covers every market
            markets: aggregate_by_market(&all_campaigns),
            campaigns: filtered
                .iter()
                .map(|c| CampaignView {
                    name: c.name.clone(),
                    status: c.status,
                    source: c.source,
                    market: c.market(),
                    live: c.status.is_live(),
                    metrics: MetricSnapshot::from_counters(c.counters),
                })
                .collect(),
            comparisons: comparisons(data, market),
            sources: data.sources.clone(),
        }
    }
}

fn channel_totals(campaigns: &[CampaignRecord]) -> Vec<ChannelTotals> {
    SourceKind::ALL
        .into_iter()
        .filter_map(|source| {
            let members: Vec<&CampaignRecord> =
                campaigns.iter().filter(|c| c.source == source).collect();
            if members.is_empty() {
                return None;
            }
            Some(ChannelTotals {
                source,
                campaigns: members.len(),
                metrics: aggregate(members.iter().copied()),
            })
        })
        .collect()
}

/// Period-over-period comparisons for every source that reports a previous
/// period. Ad comparisons use account-level totals, so they are only
/// available when no market filter is applied.
fn comparisons(data: &PageData, market: MarketFilter) -> Vec<Comparison> {
    let mut out = Vec::new();

    if market == MarketFilter::All {
        out.extend(ad_comparisons(data));
    }

    for payload in &data.sources {
        match payload {
            SourcePayload::WebAnalytics(report) => {
                out.extend(traffic_comparisons(&report.current, report.previous.as_ref()))
            }
            SourcePayload::Ecommerce(report) => {
                out.extend(store_comparisons(&report.current, report.previous.as_ref()))
            }
            SourcePayload::Subscriptions(report) => out.extend(subscription_comparisons(
                &report.current,
                report.previous.as_ref(),
            )),
            _ => {}
        }
    }

    out
}

fn ad_comparisons(data: &PageData) -> Vec<Comparison> {
    let mut current = Vec::new();
    let mut previous: Option<Counters> = None;

    for payload in &data.sources {
        if let SourcePayload::SearchAds(report) | SourcePayload::SocialAds(report) = payload {
            current.extend(payload.campaigns());
            if let Some(prev) = report.previous {
                previous.get_or_insert_with(Counters::default).add(&prev.into());
            }
        }
    }

    if current.is_empty() {
        return Vec::new();
    }

    let now = aggregate(&current);
    let before = previous.map(MetricSnapshot::from_counters);

    vec![
        Comparison::new("adSpend", now.spend, before.map(|m| m.spend), false),
        Comparison::new("adClicks", now.clicks, before.map(|m| m.clicks), false),
        Comparison::new(
            "adConversions",
            now.conversions,
            before.map(|m| m.conversions),
            false,
        ),
        Comparison::new("cpc", now.cpc, before.map(|m| m.cpc), true),
        Comparison::new("ctr", now.ctr, before.map(|m| m.ctr), false),
        Comparison::new(
            "costPerConversion",
            now.cost_per_conversion,
            before.map(|m| m.cost_per_conversion),
            true,
        ),
    ]
}

fn traffic_comparisons(now: &TrafficTotals, before: Option<&TrafficTotals>) -> Vec<Comparison> {
    vec![
        Comparison::new("sessions", now.sessions, before.map(|b| b.sessions), false),
        Comparison::new("users", now.users, before.map(|b| b.users), false),
        Comparison::new("pageviews", now.pageviews, before.map(|b| b.pageviews), false),
        Comparison::new(
            "conversionRate",
            now.conversion_rate(),
            before.map(|b| b.conversion_rate()),
            false,
        ),
    ]
}

fn store_comparisons(now: &StoreTotals, before: Option<&StoreTotals>) -> Vec<Comparison> {
    vec![
        Comparison::new("revenue", now.revenue, before.map(|b| b.revenue), false),
        Comparison::new("orders", now.orders, before.map(|b| b.orders), false),
        Comparison::new(
            "averageOrderValue",
            now.average_order_value(),
            before.map(|b| b.average_order_value()),
            false,
        ),
    ]
}

fn subscription_comparisons(
    now: &SubscriptionTotals,
    before: Option<&SubscriptionTotals>,
) -> Vec<Comparison> {
    vec![
        Comparison::new("activeSubscriptions", now.active, before.map(|b| b.active), false),
        Comparison::new("mrr", now.mrr, before.map(|b| b.mrr), false),
        Comparison::new("newSubscriptions", now.new, before.map(|b| b.new), false),
        Comparison::new("churned", now.churned, before.map(|b| b.churned), true),
        Comparison::new(
            "churnRate",
            now.churn_rate(),
            before.map(|b| b.churn_rate()),
            true,
        ),
    ]
}
