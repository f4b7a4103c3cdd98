//! Typed per-source payloads
//!
//! Upstream responses are validated into these shapes the moment they arrive.
//! Field aliases absorb the naming differences between vendors (e.g. `cost`
//! vs `spend`); numeric fields accept numbers or numeric strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metrics::models::{lenient_f64, ratio, CampaignRecord, CampaignStatus, Counters};
use crate::sources::{SourceError, SourceKind};

/// One row of an ad network campaign report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdCampaignRow {
    #[serde(alias = "campaign_name", alias = "campaignName")]
    pub name: String,
    #[serde(default)]
    pub status: CampaignStatus,
    #[serde(flatten)]
    pub counters: AdCounters,
}

/// Ad counters, with the alternative field names ad networks use
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdCounters {
    #[serde(default, alias = "cost", deserialize_with = "lenient_f64")]
    pub spend: f64,
    #[serde(default, alias = "link_clicks", deserialize_with = "lenient_f64")]
    pub clicks: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub impressions: f64,
    #[serde(default, alias = "purchases", deserialize_with = "lenient_f64")]
    pub conversions: f64,
}

impl From<AdCounters> for Counters {
    fn from(c: AdCounters) -> Self {
        Counters {
            spend: c.spend,
            clicks: c.clicks,
            impressions: c.impressions,
            conversions: c.conversions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdReport {
    #[serde(default)]
    pub campaigns: Vec<AdCampaignRow>,
    /// Account-level totals for the preceding period, when the network provides them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<AdCounters>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailCampaignRow {
    #[serde(alias = "campaign_name", alias = "title")]
    pub name: String,
    #[serde(default)]
    pub status: CampaignStatus,
    #[serde(default, alias = "emails_sent", deserialize_with = "lenient_f64")]
    pub sent: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub opens: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub clicks: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub conversions: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub revenue: f64,
}

impl EmailCampaignRow {
    pub fn open_rate(&self) -> f64 {
        ratio(self.opens, self.sent) * 100.0
    }

    pub fn click_rate(&self) -> f64 {
        ratio(self.clicks, self.sent) * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailReport {
    #[serde(default)]
    pub campaigns: Vec<EmailCampaignRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficTotals {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sessions: f64,
    #[serde(default, alias = "totalUsers", deserialize_with = "lenient_f64")]
    pub users: f64,
    #[serde(default, alias = "screenPageViews", deserialize_with = "lenient_f64")]
    pub pageviews: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub conversions: f64,
}

impl TrafficTotals {
    pub fn conversion_rate(&self) -> f64 {
        ratio(self.conversions, self.sessions) * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficReport {
    #[serde(flatten)]
    pub current: TrafficTotals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<TrafficTotals>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreTotals {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub orders: f64,
    #[serde(default, alias = "total_sales", deserialize_with = "lenient_f64")]
    pub revenue: f64,
}

impl StoreTotals {
    pub fn average_order_value(&self) -> f64 {
        ratio(self.revenue, self.orders)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreReport {
    #[serde(flatten)]
    pub current: StoreTotals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<StoreTotals>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionTotals {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub active: f64,
    #[serde(default, alias = "new_subscriptions", deserialize_with = "lenient_f64")]
    pub new: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub churned: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mrr: f64,
}

impl SubscriptionTotals {
    /// Churned subscriptions as a share of those active at period start
    pub fn churn_rate(&self) -> f64 {
        let starting = self.active - self.new + self.churned;
        ratio(self.churned, starting) * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionReport {
    #[serde(flatten)]
    pub current: SubscriptionTotals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<SubscriptionTotals>,
}

/// Validated data from one source, tagged with the source it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "data", rename_all = "snake_case")]
pub enum SourcePayload {
    WebAnalytics(TrafficReport),
    SearchAds(AdReport),
    SocialAds(AdReport),
    Email(EmailReport),
    Ecommerce(StoreReport),
    Subscriptions(SubscriptionReport),
}

impl SourcePayload {
    /// Validate raw upstream `data` against the schema of `kind`
    pub fn parse(kind: SourceKind, data: Value) -> Result<Self, SourceError> {
        let schema_error = |e: serde_json::Error| SourceError::Schema {
            kind,
            message: e.to_string(),
        };

        Ok(match kind {
            SourceKind::WebAnalytics => {
                SourcePayload::WebAnalytics(serde_json::from_value(data).map_err(schema_error)?)
            }
            SourceKind::SearchAds => {
                SourcePayload::SearchAds(serde_json::from_value(data).map_err(schema_error)?)
            }
            SourceKind::SocialAds => {
                SourcePayload::SocialAds(serde_json::from_value(data).map_err(schema_error)?)
            }
            SourceKind::Email => {
                SourcePayload::Email(serde_json::from_value(data).map_err(schema_error)?)
            }
            SourceKind::Ecommerce => {
                SourcePayload::Ecommerce(serde_json::from_value(data).map_err(schema_error)?)
            }
            SourceKind::Subscriptions => {
                SourcePayload::Subscriptions(serde_json::from_value(data).map_err(schema_error)?)
            }
        })
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            SourcePayload::WebAnalytics(_) => SourceKind::WebAnalytics,
            SourcePayload::SearchAds(_) => SourceKind::SearchAds,
            SourcePayload::SocialAds(_) => SourceKind::SocialAds,
            SourcePayload::Email(_) => SourceKind::Email,
            SourcePayload::Ecommerce(_) => SourceKind::Ecommerce,
            SourcePayload::Subscriptions(_) => SourceKind::Subscriptions,
        }
    }

    /// Campaign-level records this payload contributes, if any.
    ///
    /// Email campaigns carry no spend; sends count as impressions.
    pub fn campaigns(&self) -> Vec<CampaignRecord> {
        let source = self.kind();
        match self {
            SourcePayload::SearchAds(report) | SourcePayload::SocialAds(report) => report
                .campaigns
                .iter()
                .map(|row| CampaignRecord {
                    name: row.name.clone(),
                    status: row.status,
                    source,
                    counters: row.counters.into(),
                })
                .collect(),
            SourcePayload::Email(report) => report
                .campaigns
                .iter()
                .map(|row| CampaignRecord {
                    name: row.name.clone(),
                    status: row.status,
                    source,
                    counters: Counters {
                        spend: 0.0,
                        clicks: row.clicks,
                        impressions: row.sent,
                        conversions: row.conversions,
                    },
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ad_report_accepts_vendor_variants() {
        let data = json!({
            "campaigns": [
                {"name": "UK Black Friday", "status": "ENABLED", "cost": "250.75", "clicks": 120, "impressions": 9000},
                {"campaign_name": "Spring Sale - IE", "status": "ACTIVE", "spend": 80, "link_clicks": "40", "purchases": 3}
            ]
        });
        let payload = SourcePayload::parse(SourceKind::SocialAds, data).unwrap();
        let campaigns = payload.campaigns();

        assert_eq!(campaigns.len(), 2);
        assert_eq!(campaigns[0].counters.spend, 250.75);
        assert_eq!(campaigns[0].status, CampaignStatus::Enabled);
        assert_eq!(campaigns[1].name, "Spring Sale - IE");
        assert_eq!(campaigns[1].counters.clicks, 40.0);
        assert_eq!(campaigns[1].counters.conversions, 3.0);
        assert!(campaigns.iter().all(|c| c.source == SourceKind::SocialAds));
    }

    #[test]
    fn test_schema_violation_is_reported() {
        let err = SourcePayload::parse(SourceKind::SearchAds, json!({"campaigns": [{"spend": 1}]}))
            .unwrap_err();
        assert!(matches!(
            err,
            SourceError::Schema {
                kind: SourceKind::SearchAds,
                ..
            }
        ));

        let err = SourcePayload::parse(SourceKind::Ecommerce, json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, SourceError::Schema { .. }));
    }

    #[test]
    fn test_payload_is_tagged_by_source() {
        let payload = SourcePayload::parse(
            SourceKind::Ecommerce,
            json!({"orders": 10, "revenue": 500.0, "previous": {"orders": 8, "revenue": 400.0}}),
        )
        .unwrap();

        let stored = serde_json::to_value(&payload).unwrap();
        assert_eq!(stored["source"], "ecommerce");
        assert_eq!(stored["data"]["orders"], 10.0);

        let restored: SourcePayload = serde_json::from_value(stored).unwrap();
        assert_eq!(restored, payload);
    }

    #[test]
    fn test_derived_totals() {
        let store = StoreTotals {
            orders: 4.0,
            revenue: 200.0,
        };
        assert_eq!(store.average_order_value(), 50.0);
        assert_eq!(StoreTotals::default().average_order_value(), 0.0);

        let subs = SubscriptionTotals {
            active: 100.0,
            new: 10.0,
            churned: 10.0,
            mrr: 1000.0,
        };
        assert_eq!(subs.churn_rate(), 10.0);

        let email = EmailCampaignRow {
            name: "IE Newsletter".to_string(),
            status: CampaignStatus::Sent,
            sent: 1000.0,
            opens: 250.0,
            clicks: 30.0,
            conversions: 2.0,
            revenue: 90.0,
        };
        assert_eq!(email.open_rate(), 25.0);
        assert_eq!(email.click_rate(), 3.0);
    }

    #[test]
    fn test_email_campaigns_map_sends_to_impressions() {
        let payload = SourcePayload::parse(
            SourceKind::Email,
            json!({"campaigns": [{"title": "UK Weekly", "status": "sent", "emails_sent": 500, "clicks": 25}]}),
        )
        .unwrap();
        let campaigns = payload.campaigns();

        assert_eq!(campaigns[0].counters.impressions, 500.0);
        assert_eq!(campaigns[0].counters.spend, 0.0);
        assert_eq!(campaigns[0].status, CampaignStatus::Sent);
    }
}
