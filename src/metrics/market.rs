//! Market attribution from campaign naming conventions
//!
//! Campaigns carry no country field upstream, so the market is inferred from
//! the campaign name every time it is read. This is a best-effort heuristic:
//! a name that matches nothing is reported as unclassified rather than
//! defaulting to any market.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A country/region segment a campaign can be attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "IE")]
    Ireland,
    #[serde(rename = "UK")]
    UnitedKingdom,
}

impl Market {
    /// Every market, in classification priority order
    pub const ALL: [Market; 2] = [Market::Ireland, Market::UnitedKingdom];

    pub fn code(&self) -> &'static str {
        match self {
            Market::Ireland => "IE",
            Market::UnitedKingdom => "UK",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Market::Ireland => "Ireland",
            Market::UnitedKingdom => "United Kingdom",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Market selection applied to already-fetched campaigns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketFilter {
    #[default]
    All,
    Only(Market),
}

impl MarketFilter {
    /// `All` keeps unclassified campaigns too; a specific market never does.
    pub fn matches(&self, market: Option<Market>) -> bool {
        match self {
            MarketFilter::All => true,
            MarketFilter::Only(wanted) => market == Some(*wanted),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketFilter::All => "all",
            MarketFilter::Only(Market::Ireland) => "ie",
            MarketFilter::Only(Market::UnitedKingdom) => "uk",
        }
    }
}

impl FromStr for MarketFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(MarketFilter::All),
            "ie" | "ireland" => Ok(MarketFilter::Only(Market::Ireland)),
            "uk" | "gb" | "united kingdom" => Ok(MarketFilter::Only(Market::UnitedKingdom)),
            other => Err(format!(
                "unknown market '{other}', expected one of: all, ie, uk"
            )),
        }
    }
}

impl Serialize for MarketFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Pattern blocks in evaluation order. Ireland is checked in full before the
/// United Kingdom, so a name matching both resolves to Ireland.
fn pattern_blocks() -> &'static [(Market, Vec<Regex>)] {
    static BLOCKS: OnceLock<Vec<(Market, Vec<Regex>)>> = OnceLock::new();
    BLOCKS.get_or_init(|| {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns
                .iter()
                .map(|p| Regex::new(p).expect("market pattern is a valid regex"))
                .collect()
        };

        vec![
            (
                Market::Ireland,
                compile(&[r"\bie\b", r"\broi\b", "ireland", "irish", "dublin"]),
            ),
            (
                Market::UnitedKingdom,
                compile(&[
                    r"\buk\b",
                    r"\bgb\b",
                    "united kingdom",
                    "britain",
                    "british",
                    "england",
                    "london",
                ]),
            ),
        ]
    })
}

/// Infer the market a campaign targets from its display name
pub fn classify(campaign_name: &str) -> Option<Market> {
    let name = campaign_name.to_lowercase();

    pattern_blocks()
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(&name)))
        .map(|(market, _)| *market)
}
