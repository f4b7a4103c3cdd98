//! Period-over-period comparison

use serde::Serialize;

/// Signed percentage change between two periods
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResult {
    pub percent_change: f64,
    pub label: String,
}

/// Percent change from `previous` to `current`.
///
/// Returns `None` when there is no prior value or it is exactly zero; a
/// change from zero has no meaningful percentage.
pub fn compare(current: f64, previous: Option<f64>, label: &str) -> Option<CompareResult> {
    let previous = previous.filter(|p| *p != 0.0)?;

    Some(CompareResult {
        percent_change: (current - previous) / previous.abs() * 100.0,
        label: label.to_string(),
    })
}

/// How a change should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Positive,
    Negative,
    Neutral,
}

impl Trend {
    /// `inverted` marks metrics where going up is bad (CPC, churn)
    pub fn of(result: Option<&CompareResult>, inverted: bool) -> Self {
        let change = match result {
            Some(r) => r.percent_change,
            None => return Trend::Neutral,
        };

        let improved = if inverted { change < 0.0 } else { change > 0.0 };
        if change == 0.0 {
            Trend::Neutral
        } else if improved {
            Trend::Positive
        } else {
            Trend::Negative
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_month_over_month() {
        assert_eq!(
            compare(120.0, Some(100.0), "MoM"),
            Some(CompareResult {
                percent_change: 20.0,
                label: "MoM".to_string()
            })
        );
        assert_eq!(
            compare(80.0, Some(100.0), "MoM").map(|r| r.percent_change),
            Some(-20.0)
        );
    }

    #[test]
    fn test_compare_without_usable_previous() {
        for current in [0.0, 1.0, -5.0, 1e9] {
            assert_eq!(compare(current, None, "YoY"), None);
            assert_eq!(compare(current, Some(0.0), "YoY"), None);
        }
    }

    #[test]
    fn test_compare_negative_previous_uses_magnitude() {
        let result = compare(-50.0, Some(-100.0), "MoM").unwrap();
        assert_eq!(result.percent_change, 50.0);
    }

    #[test]
    fn test_trend_respects_inversion() {
        let up = compare(110.0, Some(100.0), "MoM");
        let down = compare(90.0, Some(100.0), "MoM");
        let flat = compare(100.0, Some(100.0), "MoM");

        assert_eq!(Trend::of(up.as_ref(), false), Trend::Positive);
        assert_eq!(Trend::of(up.as_ref(), true), Trend::Negative);
        assert_eq!(Trend::of(down.as_ref(), true), Trend::Positive);
        assert_eq!(Trend::of(flat.as_ref(), false), Trend::Neutral);
        assert_eq!(Trend::of(None, false), Trend::Neutral);
    }
}
