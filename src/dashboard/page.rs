use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::sources::SourceKind;

/// A dashboard view. Each page has its own cache key and source set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Overview,
    Ads,
    Email,
    Ecommerce,
    Subscriptions,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::Overview,
        Page::Ads,
        Page::Email,
        Page::Ecommerce,
        Page::Subscriptions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Overview => "overview",
            Page::Ads => "ads",
            Page::Email => "email",
            Page::Ecommerce => "ecommerce",
            Page::Subscriptions => "subscriptions",
        }
    }

    /// Fixed storage key for this page's cached payload
    pub fn cache_key(&self) -> &'static str {
        match self {
            Page::Overview => "overview_dashboard_cache",
            Page::Ads => "ads_dashboard_cache",
            Page::Email => "email_dashboard_cache",
            Page::Ecommerce => "ecommerce_dashboard_cache",
            Page::Subscriptions => "subscriptions_dashboard_cache",
        }
    }

    /// Sources fetched for this page, in display order
    pub fn sources(&self) -> &'static [SourceKind] {
        match self {
            Page::Overview => &SourceKind::ALL,
            Page::Ads => &[SourceKind::SearchAds, SourceKind::SocialAds],
            Page::Email => &[SourceKind::Email],
            Page::Ecommerce => &[SourceKind::Ecommerce, SourceKind::WebAnalytics],
            Page::Subscriptions => &[SourceKind::Subscriptions],
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Page::ALL
            .into_iter()
            .find(|page| page.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("unknown page '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_cache_keys_are_unique() {
        let keys: HashSet<&str> = Page::ALL.iter().map(|p| p.cache_key()).collect();
        assert_eq!(keys.len(), Page::ALL.len());
    }

    #[test]
    fn test_parse() {
        assert_eq!("Ads".parse::<Page>().unwrap(), Page::Ads);
        assert!("settings".parse::<Page>().is_err());
    }
}
