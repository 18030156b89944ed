//! Pace histogram over fixed seconds-per-km bins

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::metrics::mean;
use crate::models::Activity;
use crate::pace::{format_pace_per_km, NO_DATA};

/// Static bin definition. `max_seconds = None` means unbounded above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaceBin {
    pub id: &'static str,
    pub label: &'static str,
    pub min_seconds: u32,
    pub max_seconds: Option<u32>,
}

impl PaceBin {
    /// Half-open `[min, max)` membership
    pub fn contains(&self, seconds: Decimal) -> bool {
        seconds >= Decimal::from(self.min_seconds)
            && self.max_seconds.map_or(true, |max| seconds < Decimal::from(max))
    }
}

pub const PACE_BINS: [PaceBin; 8] = [
    PaceBin { id: "1", label: "< 4'00\"", min_seconds: 0, max_seconds: Some(240) },
    PaceBin { id: "2", label: "4'00\" - 4'30\"", min_seconds: 240, max_seconds: Some(270) },
    PaceBin { id: "3", label: "4'30\" - 5'00\"", min_seconds: 270, max_seconds: Some(300) },
    PaceBin { id: "4", label: "5'00\" - 5'30\"", min_seconds: 300, max_seconds: Some(330) },
    PaceBin { id: "5", label: "5'30\" - 6'00\"", min_seconds: 330, max_seconds: Some(360) },
    PaceBin { id: "6", label: "6'00\" - 6'30\"", min_seconds: 360, max_seconds: Some(390) },
    PaceBin { id: "7", label: "6'30\" - 7'00\"", min_seconds: 390, max_seconds: Some(420) },
    PaceBin { id: "8", label: "> 7'00\"", min_seconds: 420, max_seconds: None },
];

/// A bin together with the activities that fell into it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceRange {
    pub id: String,
    pub label: String,
    pub min_seconds: u32,
    pub max_seconds: Option<u32>,
    pub count: usize,
    pub percentage: Decimal,
    pub activity_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceStats {
    pub fastest: String,
    pub average: String,
    pub slowest: String,
    pub total_activities: usize,
}

impl PaceStats {
    fn no_data() -> Self {
        PaceStats {
            fastest: NO_DATA.to_string(),
            average: NO_DATA.to_string(),
            slowest: NO_DATA.to_string(),
            total_activities: 0,
        }
    }
}

/// One point of the pace-over-time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacePoint {
    pub date: NaiveDate,
    pub pace_seconds: u32,
    pub pace: String,
    pub activity_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceDistribution {
    pub ranges: Vec<PaceRange>,
    pub stats: PaceStats,
    /// Mean pace of valid activities, 0 when there are none
    pub avg_pace_seconds: Decimal,
    /// Index into `ranges` of the bin holding the average pace
    pub highlighted_range: Option<usize>,
    /// Valid activities sorted by date
    pub time_series: Vec<PacePoint>,
}

impl PaceDistribution {
    /// Bin every activity with a parseable pace
    pub fn from_activities(activities: &[Activity]) -> Self {
        let valid: Vec<(&Activity, u32)> = activities
            .iter()
            .filter_map(|a| a.pace_seconds().map(|s| (a, s)))
            .collect();

        let skipped = activities.len() - valid.len();
        if skipped > 0 {
            tracing::debug!(skipped, "Activities without a usable pace left out of distribution");
        }

        let mut ranges: Vec<PaceRange> = PACE_BINS
            .iter()
            .map(|bin| PaceRange {
                id: bin.id.to_string(),
                label: bin.label.to_string(),
                min_seconds: bin.min_seconds,
                max_seconds: bin.max_seconds,
                count: 0,
                percentage: Decimal::ZERO,
                activity_ids: Vec::new(),
            })
            .collect();

        for (activity, seconds) in &valid {
            let seconds = Decimal::from(*seconds);
            if let Some(idx) = PACE_BINS.iter().position(|bin| bin.contains(seconds)) {
                ranges[idx].count += 1;
                ranges[idx].activity_ids.push(activity.id.clone());
            }
        }

        let total = valid.len();
        if total > 0 {
            for range in &mut ranges {
                range.percentage =
                    Decimal::from(range.count) / Decimal::from(total) * Decimal::ONE_HUNDRED;
            }
        }

        let avg_pace_seconds = mean(valid.iter().map(|(_, s)| Decimal::from(*s)).sum(), total);

        let stats = match (
            valid.iter().map(|(_, s)| *s).min(),
            valid.iter().map(|(_, s)| *s).max(),
        ) {
            (Some(fastest), Some(slowest)) => PaceStats {
                fastest: format_pace_per_km(Decimal::from(fastest)),
                average: format_pace_per_km(avg_pace_seconds),
                slowest: format_pace_per_km(Decimal::from(slowest)),
                total_activities: total,
            },
            _ => PaceStats::no_data(),
        };

        let highlighted_range = if total > 0 {
            PACE_BINS.iter().position(|bin| bin.contains(avg_pace_seconds))
        } else {
            None
        };

        let mut time_series: Vec<PacePoint> = valid
            .iter()
            .map(|(activity, seconds)| PacePoint {
                date: activity.day(),
                pace_seconds: *seconds,
                pace: activity.pace.clone(),
                activity_id: activity.id.clone(),
            })
            .collect();
        time_series.sort_by_key(|p| p.date);

        PaceDistribution {
            ranges,
            stats,
            avg_pace_seconds,
            highlighted_range,
            time_series,
        }
    }

    pub fn highlighted(&self) -> Option<&PaceRange> {
        self.highlighted_range.and_then(|idx| self.ranges.get(idx))
    }
}
