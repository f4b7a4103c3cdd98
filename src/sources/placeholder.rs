//! Statically bundled fallback payloads, one per source

use rust_embed::RustEmbed;
use serde_json::Value;
use tracing::error;

use crate::sources::schema::{
    AdReport, EmailReport, StoreReport, StoreTotals, SubscriptionReport, SubscriptionTotals,
    TrafficReport, TrafficTotals,
};
use crate::sources::{SourceKind, SourcePayload};

#[derive(RustEmbed)]
#[folder = "placeholders/"]
struct Bundled;

/// Placeholder data substituted when `kind` cannot be fetched
pub fn placeholder(kind: SourceKind) -> SourcePayload {
    let file = format!("{}.json", kind.as_str());

    let parsed = Bundled::get(&file)
        .ok_or_else(|| format!("missing bundled file {file}"))
        .and_then(|content| {
            serde_json::from_slice::<Value>(&content.data).map_err(|e| format!("{file}: {e}"))
        })
        .and_then(|data| SourcePayload::parse(kind, data).map_err(|e| e.to_string()));

    match parsed {
        Ok(payload) => payload,
        Err(e) => {
            error!("Bundled placeholder for {} is unusable: {}", kind, e);
            empty(kind)
        }
    }
}

fn empty(kind: SourceKind) -> SourcePayload {
    match kind {
        SourceKind::WebAnalytics => SourcePayload::WebAnalytics(TrafficReport {
            current: TrafficTotals::default(),
            previous: None,
        }),
        SourceKind::SearchAds => SourcePayload::SearchAds(AdReport {
            campaigns: Vec::new(),
            previous: None,
        }),
        SourceKind::SocialAds => SourcePayload::SocialAds(AdReport {
            campaigns: Vec::new(),
            previous: None,
        }),
        SourceKind::Email => SourcePayload::Email(EmailReport {
            campaigns: Vec::new(),
        }),
        SourceKind::Ecommerce => SourcePayload::Ecommerce(StoreReport {
            current: StoreTotals::default(),
            previous: None,
        }),
        SourceKind::Subscriptions => SourcePayload::Subscriptions(SubscriptionReport {
            current: SubscriptionTotals::default(),
            previous: None,
        }),
    }
}
