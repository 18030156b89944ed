//! Dashboard stat cards, per-year rollups and personal bests

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::metrics::GroupMetrics;
use crate::models::Activity;
use crate::pace::{format_duration, format_pace_per_km};

/// Headline numbers for a set of activities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityStats {
    /// Total distance in km
    pub distance: Decimal,
    /// Distinct calendar days with at least one activity
    pub days: usize,
    /// Mean pace as `M'SS"/km`, `N/A` without valid paces
    pub avg_pace: String,
    /// Distinct non-empty route labels
    pub routes: usize,
    pub runs: usize,
}

impl ActivityStats {
    pub fn from_activities(activities: &[Activity]) -> Self {
        let metrics = GroupMetrics::from_activities(activities);
        let days: BTreeSet<_> = activities.iter().map(Activity::day).collect();
        let routes: BTreeSet<&str> = activities
            .iter()
            .map(|a| a.route.trim())
            .filter(|r| !r.is_empty())
            .collect();

        ActivityStats {
            distance: metrics.total_distance,
            days: days.len(),
            avg_pace: format_pace_per_km(metrics.avg_pace_seconds),
            routes: routes.len(),
            runs: activities.len(),
        }
    }
}

/// Stats and activities of one calendar year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearData {
    pub year: i32,
    pub stats: ActivityStats,
    pub activities: Vec<Activity>,
}

/// One `YearData` per year present in the input, most recent year first
pub fn yearly_stats(activities: &[Activity]) -> Vec<YearData> {
    let mut by_year: BTreeMap<i32, Vec<Activity>> = BTreeMap::new();
    for activity in activities {
        by_year.entry(activity.year()).or_default().push(activity.clone());
    }

    by_year
        .into_iter()
        .rev()
        .map(|(year, activities)| YearData {
            year,
            stats: ActivityStats::from_activities(&activities),
            activities,
        })
        .collect()
}

/// Race distance window for personal bests, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceDistance {
    FiveK,
    TenK,
    Half,
}

impl RaceDistance {
    pub const ALL: [RaceDistance; 3] = [RaceDistance::FiveK, RaceDistance::TenK, RaceDistance::Half];

    pub fn label(&self) -> &'static str {
        match self {
            RaceDistance::FiveK => "5K",
            RaceDistance::TenK => "10K",
            RaceDistance::Half => "Half",
        }
    }

    pub fn window(&self) -> (Decimal, Decimal) {
        match self {
            RaceDistance::FiveK => (dec!(4.5), dec!(5.5)),
            RaceDistance::TenK => (dec!(9), dec!(11)),
            RaceDistance::Half => (dec!(20), dec!(22)),
        }
    }

    pub fn matches(&self, distance: Decimal) -> bool {
        let (min, max) = self.window();
        distance >= min && distance <= max
    }
}

/// Fastest activity within a race window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalBest {
    pub event: RaceDistance,
    /// `H:MM:SS` or `M:SS`
    pub time: String,
    pub seconds: u32,
    pub activity_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalBests {
    pub best_5k: Option<PersonalBest>,
    pub best_10k: Option<PersonalBest>,
    pub best_half: Option<PersonalBest>,
}

impl PersonalBests {
    pub fn get(&self, event: RaceDistance) -> Option<&PersonalBest> {
        match event {
            RaceDistance::FiveK => self.best_5k.as_ref(),
            RaceDistance::TenK => self.best_10k.as_ref(),
            RaceDistance::Half => self.best_half.as_ref(),
        }
    }
}

/// Shortest recorded duration per race window. Activities without a parseable
/// duration never qualify.
pub fn personal_bests(activities: &[Activity]) -> PersonalBests {
    let best = |event: RaceDistance| {
        activities
            .iter()
            .filter(|a| event.matches(a.distance))
            .filter_map(|a| a.duration_seconds().map(|s| (a, s)))
            .min_by_key(|(_, seconds)| *seconds)
            .map(|(activity, seconds)| PersonalBest {
                event,
                time: format_duration(seconds),
                seconds,
                activity_id: activity.id.clone(),
            })
    };

    PersonalBests {
        best_5k: best(RaceDistance::FiveK),
        best_10k: best(RaceDistance::TenK),
        best_half: best(RaceDistance::Half),
    }
}

/// Most recent activity by date and time of day
pub fn latest_activity(activities: &[Activity]) -> Option<&Activity> {
    activities.iter().max_by(|a, b| a.date.cmp(&b.date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<Activity> {
        vec![
            Activity::new("1", date(2024, 3, 1), dec!(5.02))
                .with_pace("5'00\"/km")
                .with_time("25m 6s")
                .with_route("Riverside"),
            Activity::new("2", date(2024, 3, 1), dec!(4.8))
                .with_pace("6'00\"/km")
                .with_time("24m 30s")
                .with_route("Park"),
            Activity::new("3", date(2024, 3, 9), dec!(10.1))
                .with_pace("N/A")
                .with_time("55m 10s")
                .with_route("Riverside"),
            Activity::new("4", date(2023, 10, 20), dec!(21.1))
                .with_pace("5'40\"/km")
                .with_time("1h 59m 58s"),
        ]
    }

    #[test]
    fn test_activity_stats() {
        let activities = sample();
        let stats = ActivityStats::from_activities(&activities[..3]);
        assert_eq!(stats.distance, dec!(19.92));
        assert_eq!(stats.days, 2);
        assert_eq!(stats.avg_pace, "5'30\"/km");
        assert_eq!(stats.routes, 2);
        assert_eq!(stats.runs, 3);
    }

    #[test]
    fn test_empty_stats() {
        let stats = ActivityStats::from_activities(&[]);
        assert_eq!(stats.distance, Decimal::ZERO);
        assert_eq!(stats.avg_pace, "N/A");
        assert_eq!(stats.days, 0);
    }

    #[test]
    fn test_yearly_stats_descending() {
        let years = yearly_stats(&sample());
        let order: Vec<i32> = years.iter().map(|y| y.year).collect();
        assert_eq!(order, vec![2024, 2023]);
        assert_eq!(years[0].activities.len(), 3);
        assert_eq!(years[1].stats.routes, 0);
        assert_eq!(years[1].stats.avg_pace, "5'40\"/km");
    }

    #[test]
    fn test_personal_bests() {
        let bests = personal_bests(&sample());

        let five = bests.best_5k.as_ref().unwrap();
        assert_eq!(five.activity_id, "2");
        assert_eq!(five.time, "24:30");
        assert_eq!(bests.get(RaceDistance::TenK).unwrap().time, "55:10");
        assert_eq!(bests.best_half.as_ref().unwrap().time, "1:59:58");
    }

    #[test]
    fn test_personal_bests_without_durations() {
        let activities = vec![Activity::new("1", date(2024, 1, 1), dec!(5))];
        assert_eq!(personal_bests(&activities), PersonalBests::default());
        assert!(!RaceDistance::FiveK.matches(dec!(5.6)));
        assert!(RaceDistance::Half.matches(dec!(22)));
    }

    #[test]
    fn test_latest_activity() {
        let activities = sample();
        assert_eq!(latest_activity(&activities).unwrap().id, "3");
        assert!(latest_activity(&[]).is_none());
    }
}
