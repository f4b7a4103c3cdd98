//! Reporting date ranges, presets and relative-time display

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RangeError {
    #[error("start date {start} is after end date {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Parse(String),
    #[error("date {0} is outside the supported years {MIN_YEAR} to {MAX_YEAR}")]
    OutOfBounds(NaiveDate),
}

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 9999;

/// Inclusive calendar date range, serialized as `startDate`/`endDate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, RangeError> {
        for date in [start_date, end_date] {
            if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
                return Err(RangeError::OutOfBounds(date));
            }
        }
        if start_date > end_date {
            return Err(RangeError::Inverted {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, RangeError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Number of days covered, both ends included
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// The range of equal length ending the day before this one starts
    pub fn previous_period(&self) -> Self {
        let end_date = self.start_date - Duration::days(1);
        Self {
            start_date: end_date - Duration::days(self.days() - 1),
            end_date,
        }
    }

    pub fn start_str(&self) -> String {
        self.start_date.format("%Y-%m-%d").to_string()
    }

    pub fn end_str(&self) -> String {
        self.end_date.format("%Y-%m-%d").to_string()
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, RangeError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| RangeError::Parse(raw.to_string()))
}

/// Date picker presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Last7Days,
    #[default]
    Last30Days,
    ThisMonth,
    LastMonth,
}

impl Preset {
    /// Resolve against `today`. "Last N days" includes today.
    pub fn resolve(&self, today: NaiveDate) -> DateRange {
        match self {
            Preset::Last7Days => DateRange {
                start_date: today - Duration::days(6),
                end_date: today,
            },
            Preset::Last30Days => DateRange {
                start_date: today - Duration::days(29),
                end_date: today,
            },
            Preset::ThisMonth => DateRange {
                start_date: first_of_month(today),
                end_date: today,
            },
            Preset::LastMonth => {
                let end_date = first_of_month(today) - Duration::days(1);
                DateRange {
                    start_date: first_of_month(end_date),
                    end_date,
                }
            }
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Human "updated ... ago" text, computed at render time from the last refresh
pub fn relative_time(now: DateTime<Utc>, last_refresh: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(last_refresh);
    let seconds = elapsed.num_seconds().max(0);

    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {unit} ago")
        } else {
            format!("{n} {unit}s ago")
        }
    };

    match seconds {
        0..=59 => "just now".to_string(),
        60..=3599 => plural(seconds / 60, "minute"),
        3600..=86_399 => plural(seconds / 3600, "hour"),
        _ => plural(seconds / 86_400, "day"),
    }
}
