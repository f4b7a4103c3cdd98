//! Reduces campaign-like records into totals and derived ratios

use serde::Serialize;
use std::collections::BTreeMap;

use crate::metrics::market::Market;
use crate::metrics::models::{CampaignRecord, Counters, HasCounters, MetricSnapshot};

/// Sum the counters of every record and derive CPC, CTR and cost per conversion.
///
/// Ratios are taken over the summed counters, so the result does not depend on
/// the order of `records`. An empty input yields an all-zero snapshot.
pub fn aggregate<'a, I, T>(records: I) -> MetricSnapshot
where
    I: IntoIterator<Item = &'a T>,
    T: HasCounters + 'a,
{
    let totals = records
        .into_iter()
        .fold(Counters::default(), |mut acc, record| {
            acc.add(&record.counters());
            acc
        });

    MetricSnapshot::from_counters(totals)
}

/// Totals for a single market bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketTotals {
    /// `None` is the unclassified bucket
    pub market: Option<Market>,
    pub campaigns: usize,
    pub metrics: MetricSnapshot,
}

/// Group campaigns by inferred market and aggregate each group.
///
/// Every market is always present (possibly with zero campaigns), followed by
/// the unclassified bucket when at least one campaign matched no market.
pub fn aggregate_by_market(records: &[CampaignRecord]) -> Vec<MarketTotals> {
    let mut groups: BTreeMap<Option<Market>, Vec<&CampaignRecord>> = BTreeMap::new();
    for market in Market::ALL {
        groups.insert(Some(market), Vec::new());
    }
    for record in records {
        groups.entry(record.market()).or_default().push(record);
    }

    let mut totals: Vec<MarketTotals> = groups
        .into_iter()
        .map(|(market, members)| MarketTotals {
            market,
            campaigns: members.len(),
            metrics: aggregate(members.iter().copied()),
        })
        .collect();

    // BTreeMap orders None first; the unclassified bucket belongs last
    totals.sort_by_key(|t| (t.market.is_none(), t.market));
    totals
}
