//! Data models for campaign metrics

use serde::{Deserialize, Deserializer, Serialize};

use crate::metrics::market::{classify, Market};
use crate::sources::SourceKind;

/// Raw additive counters. Anything a source omits counts as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub spend: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub clicks: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub impressions: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub conversions: f64,
}

impl Counters {
    pub fn add(&mut self, other: &Counters) {
        self.spend += other.spend;
        self.clicks += other.clicks;
        self.impressions += other.impressions;
        self.conversions += other.conversions;
    }
}

/// Anything that exposes additive counters can be aggregated
pub trait HasCounters {
    fn counters(&self) -> Counters;
}

impl HasCounters for Counters {
    fn counters(&self) -> Counters {
        *self
    }
}

/// Summed counters plus the ratios derived from them.
///
/// Ratios are only ever produced by [`MetricSnapshot::from_counters`], so they
/// cannot drift from the counters they describe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub spend: f64,
    pub clicks: f64,
    pub impressions: f64,
    pub conversions: f64,
    pub cpc: f64,
    pub ctr: f64,
    pub cost_per_conversion: f64,
}

impl MetricSnapshot {
    pub fn from_counters(counters: Counters) -> Self {
        Self {
            spend: counters.spend,
            clicks: counters.clicks,
            impressions: counters.impressions,
            conversions: counters.conversions,
            cpc: ratio(counters.spend, counters.clicks),
            ctr: ratio(counters.clicks, counters.impressions) * 100.0,
            cost_per_conversion: ratio(counters.spend, counters.conversions),
        }
    }
}

/// `numerator / denominator`, or 0 when the denominator is 0
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Campaign lifecycle status across every source's vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum CampaignStatus {
    Active,
    Paused,
    Enabled,
    Disabled,
    Removed,
    Archived,
    Sent,
    Draft,
    #[default]
    Unknown,
}

impl From<String> for CampaignStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "active" => CampaignStatus::Active,
            "paused" => CampaignStatus::Paused,
            "enabled" => CampaignStatus::Enabled,
            "disabled" => CampaignStatus::Disabled,
            "removed" | "deleted" => CampaignStatus::Removed,
            "archived" => CampaignStatus::Archived,
            "sent" | "sending" => CampaignStatus::Sent,
            "draft" | "save" | "schedule" => CampaignStatus::Draft,
            _ => CampaignStatus::Unknown,
        }
    }
}

impl CampaignStatus {
    /// Whether the campaign is currently delivering
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            CampaignStatus::Active | CampaignStatus::Enabled | CampaignStatus::Sent
        )
    }
}

/// A campaign as the dashboard sees it, independent of which source reported it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignRecord {
    pub name: String,
    pub status: CampaignStatus,
    pub source: SourceKind,
    #[serde(flatten)]
    pub counters: Counters,
}

impl CampaignRecord {
    /// Market inferred from the campaign name, recomputed on every call
    pub fn market(&self) -> Option<Market> {
        classify(&self.name)
    }
}

impl HasCounters for CampaignRecord {
    fn counters(&self) -> Counters {
        self.counters
    }
}

/// Accept numbers, numeric strings (some ad APIs send `"12.50"`) and null
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null,
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Null => Ok(0.0),
        Raw::Text(s) if s.trim().is_empty() => Ok(0.0),
        Raw::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("'{s}' is not a number"))),
    }
}
