//! Per-group metric derivation and chart normalization
//!
//! Averages use 0 as the "no data" sentinel rather than an `Option`, matching what the
//! chart layer expects. Always check [`GroupMetrics::has_pace`] / [`GroupMetrics::has_bpm`]
//! before treating an average as a real value.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::grouping::{group_by, Granularity, PeriodKey};
use crate::models::Activity;
use crate::pace::{format_pace, NO_DATA};

/// Aggregate metrics for one group of activities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GroupMetrics {
    /// Number of activities in the group
    pub count: usize,

    /// Sum of distances in km
    pub total_distance: Decimal,

    /// Mean pace over activities with a valid pace, 0 when none
    pub avg_pace_seconds: Decimal,

    /// Mean heart rate over activities with bpm > 0, 0 when none
    pub avg_bpm: Decimal,

    /// Activities whose pace parsed (the valid pace sample size)
    pub running_day_count: usize,
}

impl GroupMetrics {
    pub fn from_activities<'a, I>(activities: I) -> Self
    where
        I: IntoIterator<Item = &'a Activity>,
    {
        let mut count = 0usize;
        let mut total_distance = Decimal::ZERO;
        let mut pace_sum = Decimal::ZERO;
        let mut pace_samples = 0usize;
        let mut bpm_sum = Decimal::ZERO;
        let mut bpm_samples = 0usize;

        for activity in activities {
            count += 1;
            total_distance += activity.distance;

            if let Some(seconds) = activity.pace_seconds() {
                pace_sum += Decimal::from(seconds);
                pace_samples += 1;
            }

            if let Some(bpm) = activity.heart_rate() {
                bpm_sum += Decimal::from(bpm);
                bpm_samples += 1;
            }
        }

        GroupMetrics {
            count,
            total_distance,
            avg_pace_seconds: mean(pace_sum, pace_samples),
            avg_bpm: mean(bpm_sum, bpm_samples),
            running_day_count: pace_samples,
        }
    }

    pub fn has_pace(&self) -> bool {
        self.avg_pace_seconds > Decimal::ZERO
    }

    pub fn has_bpm(&self) -> bool {
        self.avg_bpm > Decimal::ZERO
    }

    /// Average pace as `M'SS"`, `N/A` without data
    pub fn avg_pace(&self) -> String {
        format_pace(self.avg_pace_seconds)
    }

    /// Average heart rate rounded to whole beats
    pub fn avg_bpm_rounded(&self) -> u16 {
        self.avg_bpm
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u16()
            .unwrap_or(0)
    }
}

pub(crate) fn mean(sum: Decimal, samples: usize) -> Decimal {
    if samples == 0 {
        Decimal::ZERO
    } else {
        sum / Decimal::from(samples)
    }
}

/// Weekly, monthly or quarterly rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodAggregate {
    pub key: PeriodKey,
    pub granularity: Granularity,
    pub label: String,
    pub activities: Vec<Activity>,
    #[serde(flatten)]
    pub metrics: GroupMetrics,
}

impl PeriodAggregate {
    pub fn year(&self) -> i32 {
        self.key.year
    }

    pub fn period(&self) -> u32 {
        self.key.period
    }
}

/// Roll activities up into periods, ascending by `(year, period)`
pub fn aggregate_periods(activities: &[Activity], granularity: Granularity) -> Vec<PeriodAggregate> {
    group_by(activities, granularity)
        .into_iter()
        .map(|(key, members)| PeriodAggregate {
            key,
            granularity,
            label: key.label(granularity),
            metrics: GroupMetrics::from_activities(members.iter().copied()),
            activities: members.into_iter().cloned().collect(),
        })
        .collect()
}

/// Min/max of a metric across groups, ignoring zero (no data) values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl MetricRange {
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = Decimal>,
    {
        values
            .into_iter()
            .filter(|v| !v.is_zero())
            .fold(None, |range, v| match range {
                None => Some(MetricRange { min: v, max: v }),
                Some(r) => Some(MetricRange {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    fn span(&self) -> Decimal {
        let span = self.max - self.min;
        if span.is_zero() {
            Decimal::ONE
        } else {
            span
        }
    }

    /// `(value - min) / (max - min) * 100`, with a zero span treated as 1
    pub fn percent(&self, value: Decimal) -> Decimal {
        (value - self.min) / self.span() * Decimal::ONE_HUNDRED
    }

    /// `(max - value) / (max - min) * 100`; lower values score higher
    pub fn inverted_percent(&self, value: Decimal) -> Decimal {
        (self.max - value) / self.span() * Decimal::ONE_HUNDRED
    }
}

/// One bar group of the pace / heart rate chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub id: String,
    pub key: PeriodKey,
    pub label: String,
    pub running_days: usize,
    pub pace_value: String,
    pub bpm_value: String,
    pub pace_percent: Decimal,
    pub hr_percent: Decimal,
    pub has_pace: bool,
    pub has_bpm: bool,
    pub has_data: bool,
}

/// Normalize period aggregates into chart percentages.
///
/// Pace is inverted so that faster periods draw taller bars. Periods without data for
/// a metric get 0 percent for it.
pub fn normalize_chart(periods: &[PeriodAggregate]) -> Vec<ChartPoint> {
    let pace_range = MetricRange::from_values(periods.iter().map(|p| p.metrics.avg_pace_seconds));
    let bpm_range = MetricRange::from_values(periods.iter().map(|p| p.metrics.avg_bpm));

    periods
        .iter()
        .map(|period| {
            let m = &period.metrics;

            let pace_percent = match (&pace_range, m.has_pace()) {
                (Some(range), true) => range.inverted_percent(m.avg_pace_seconds),
                _ => Decimal::ZERO,
            };
            let hr_percent = match (&bpm_range, m.has_bpm()) {
                (Some(range), true) => range.percent(m.avg_bpm),
                _ => Decimal::ZERO,
            };

            let bpm_value = if m.has_bpm() {
                format!("{} BPM", m.avg_bpm_rounded())
            } else {
                NO_DATA.to_string()
            };

            ChartPoint {
                id: format!("{}-{}-{}", period.granularity, period.key.year, period.key.period),
                key: period.key,
                label: period.label.clone(),
                running_days: m.running_day_count,
                pace_value: m.avg_pace(),
                bpm_value,
                pace_percent,
                hr_percent,
                has_pace: m.has_pace(),
                has_bpm: m.has_bpm(),
                has_data: m.count > 0,
            }
        })
        .collect()
}
