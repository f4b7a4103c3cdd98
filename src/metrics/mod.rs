//! Campaign metrics: market attribution, aggregation and period comparison
//!
//! Everything in here is pure and operates on the typed records produced by
//! the source schemas, never on raw upstream JSON.

pub mod aggregator;
pub mod compare;
pub mod market;
pub mod models;

pub use aggregator::{aggregate, aggregate_by_market, MarketTotals};
pub use compare::{compare, CompareResult, Trend};
pub use market::{classify, Market, MarketFilter};
pub use models::{CampaignRecord, CampaignStatus, Counters, HasCounters, MetricSnapshot};
