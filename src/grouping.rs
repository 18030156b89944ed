//! Temporal grouping of activities
//!
//! Week numbers follow the dashboard's own scheme rather than ISO-8601:
//! `ceil((dayOfYear + weekdayOfJan1 + 1) / 7)` with a 0-based day of year and Sunday as
//! weekday 0. Weeks never roll over into the next year, so late December can be week 53
//! or 54. Month and quarter indices are 0-based.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::Activity;

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Size of a temporal bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Week,
    Month,
    Quarter,
    Year,
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "week" | "weekly" => Ok(Granularity::Week),
            "month" | "monthly" => Ok(Granularity::Month),
            "quarter" | "quarterly" => Ok(Granularity::Quarter),
            "year" | "yearly" => Ok(Granularity::Year),
            _ => Err(format!("Invalid granularity: {}", s)),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::Year => "year",
        };
        f.write_str(name)
    }
}

/// Key of a temporal bucket. Orders by `(year, period)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    pub year: i32,
    /// Week number (1-based), month index (0-11), quarter index (0-3) or 0 for years
    pub period: u32,
}

impl PeriodKey {
    pub fn new(year: i32, period: u32) -> Self {
        PeriodKey { year, period }
    }

    /// Bucket a date falls into
    pub fn for_date(date: NaiveDate, granularity: Granularity) -> Self {
        let period = match granularity {
            Granularity::Week => week_number(date),
            Granularity::Month => month_index(date),
            Granularity::Quarter => quarter_index(date),
            Granularity::Year => 0,
        };
        PeriodKey::new(date.year(), period)
    }

    /// Human readable label, e.g. `2024-W07`, `2024 Mar`, `2024 Q2`
    pub fn label(&self, granularity: Granularity) -> String {
        match granularity {
            Granularity::Week => format!("{}-W{:02}", self.year, self.period),
            Granularity::Month => format!(
                "{} {}",
                self.year,
                MONTH_NAMES.get(self.period as usize).copied().unwrap_or("???")
            ),
            Granularity::Quarter => format!("{} Q{}", self.year, self.period + 1),
            Granularity::Year => self.year.to_string(),
        }
    }
}

/// Weekday of January 1st of `year`, Sunday = 0
fn jan1_weekday(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0)
}

/// Dashboard week number of a date, see module docs
pub fn week_number(date: NaiveDate) -> u32 {
    let day_of_year = date.ordinal0();
    let offset = jan1_weekday(date.year());
    (day_of_year + offset + 1).div_ceil(7)
}

/// Month index, 0 = January
pub fn month_index(date: NaiveDate) -> u32 {
    date.month0()
}

/// Quarter index, 0 = Jan-Mar
pub fn quarter_index(date: NaiveDate) -> u32 {
    date.month0() / 3
}

/// First and last day of a month (`month0` is 0-based)
pub fn month_bounds(year: i32, month0: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)?;
    let next = if month0 == 11 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month0 + 2, 1)?
    };
    Some((first, next.pred_opt()?))
}

/// Week numbers spanned by a month, ascending and contiguous
pub fn weeks_in_month(year: i32, month0: u32) -> Vec<u32> {
    match month_bounds(year, month0) {
        Some((first, last)) => (week_number(first)..=week_number(last)).collect(),
        None => Vec::new(),
    }
}

/// Group activities into temporal buckets, ascending by `(year, period)`.
///
/// Activities keep their input order inside a bucket.
pub fn group_by(activities: &[Activity], granularity: Granularity) -> BTreeMap<PeriodKey, Vec<&Activity>> {
    let mut groups: BTreeMap<PeriodKey, Vec<&Activity>> = BTreeMap::new();

    for activity in activities {
        let key = PeriodKey::for_date(activity.day(), granularity);
        groups.entry(key).or_default().push(activity);
    }

    tracing::debug!(
        activities = activities.len(),
        buckets = groups.len(),
        %granularity,
        "Grouped activities"
    );

    groups
}
