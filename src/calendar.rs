//! Calendar heatmap: daily distance, intensity levels and Sunday-first grids

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::grouping::{month_bounds, week_number, MONTH_NAMES};
use crate::models::Activity;

/// Highest intensity level
pub const MAX_LEVEL: u8 = 7;

/// Row labels of the week grid, in slot order
pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Map a day's cumulative distance to a heatmap level (0-7)
pub fn intensity_level(distance: Decimal) -> u8 {
    if distance <= Decimal::ZERO {
        0
    } else if distance < dec!(5) {
        1
    } else if distance < dec!(10) {
        2
    } else if distance < dec!(15) {
        3
    } else if distance < dec!(20) {
        4
    } else if distance < dec!(25) {
        5
    } else if distance < dec!(30) {
        6
    } else {
        MAX_LEVEL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// Sum of all activity distances on this day
    pub distance: Decimal,
    pub level: u8,
}

/// One Sunday-first row of the year grid. Days outside the year are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarWeek {
    pub days: [Option<CalendarDay>; 7],
}

/// Columns of the year grid covered by a month header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSpan {
    pub name: String,
    pub start_week: usize,
    /// Exclusive
    pub end_week: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearCalendar {
    pub year: i32,
    /// One entry per day, Jan 1 to Dec 31
    pub days: Vec<CalendarDay>,
    pub weeks: Vec<CalendarWeek>,
    pub months: Vec<MonthSpan>,
    /// Level per week row for each weekday, Sunday first; empty slots are 0
    pub weekday_levels: Vec<Vec<u8>>,
    pub total_distance: Decimal,
    pub active_days: usize,
}

/// Day cell of a single month page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthDay {
    pub day: u32,
    pub date: NaiveDate,
    pub distance: Decimal,
    pub has_activity: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthWeek {
    pub week_number: u32,
    pub days: [Option<MonthDay>; 7],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthPage {
    pub name: String,
    pub month: u32,
    pub weeks: Vec<MonthWeek>,
}

/// Sum distances per calendar day for one year
fn daily_distances(activities: &[Activity], year: i32) -> BTreeMap<NaiveDate, Decimal> {
    let mut per_day: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for activity in activities.iter().filter(|a| a.year() == year) {
        *per_day.entry(activity.day()).or_insert(Decimal::ZERO) += activity.distance;
    }
    per_day
}

fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((NaiveDate::from_ymd_opt(year, 1, 1)?, NaiveDate::from_ymd_opt(year, 12, 31)?))
}

fn add_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(days))
}

impl YearCalendar {
    /// Build the heatmap for `year`. Activities from other years are ignored.
    pub fn build(activities: &[Activity], year: i32) -> Self {
        let per_day = daily_distances(activities, year);

        let mut calendar = YearCalendar {
            year,
            days: Vec::new(),
            weeks: Vec::new(),
            months: Vec::new(),
            weekday_levels: vec![Vec::new(); 7],
            total_distance: per_day.values().copied().sum(),
            active_days: per_day.values().filter(|d| **d > Decimal::ZERO).count(),
        };

        let Some((first, last)) = year_bounds(year) else {
            tracing::warn!(year, "Year outside the supported calendar range");
            return calendar;
        };

        calendar.days = first
            .iter_days()
            .take_while(|d| *d <= last)
            .map(|date| {
                let distance = per_day.get(&date).copied().unwrap_or(Decimal::ZERO);
                CalendarDay {
                    date,
                    distance,
                    level: intensity_level(distance),
                }
            })
            .collect();

        let grid_start = first
            .checked_sub_days(Days::new(u64::from(first.weekday().num_days_from_sunday())))
            .unwrap_or(first);
        let grid_end = add_days(last, u64::from(6 - last.weekday().num_days_from_sunday())).unwrap_or(last);

        let mut week_start = grid_start;
        while week_start <= grid_end {
            let mut days = [None; 7];
            for (offset, slot) in days.iter_mut().enumerate() {
                if let Some(date) = add_days(week_start, offset as u64) {
                    if date.year() == year {
                        *slot = calendar.days.get(date.ordinal0() as usize).copied();
                    }
                }
            }
            calendar.weeks.push(CalendarWeek { days });

            match add_days(week_start, 7) {
                Some(next) => week_start = next,
                None => break,
            }
        }

        calendar.months = month_spans(year, grid_start, calendar.weeks.len());

        for (weekday, row) in calendar.weekday_levels.iter_mut().enumerate() {
            *row = calendar
                .weeks
                .iter()
                .map(|w| w.days[weekday].map_or(0, |d| d.level))
                .collect();
        }

        tracing::debug!(
            year,
            active_days = calendar.active_days,
            weeks = calendar.weeks.len(),
            "Built year calendar"
        );

        calendar
    }

    pub fn day(&self, date: NaiveDate) -> Option<&CalendarDay> {
        if date.year() != self.year {
            return None;
        }
        self.days.get(date.ordinal0() as usize)
    }

    pub fn is_leap_year(&self) -> bool {
        self.days.len() == 366
    }
}

/// Header spans of each month over the grid rows starting at `grid_start`
fn month_spans(year: i32, grid_start: NaiveDate, week_count: usize) -> Vec<MonthSpan> {
    let mut spans = Vec::with_capacity(12);

    for (month0, name) in MONTH_NAMES.iter().enumerate() {
        let Some((month_start, month_end)) = month_bounds(year, month0 as u32) else {
            continue;
        };

        let mut start_week = None;
        let mut end_week = None;
        for idx in 0..week_count {
            let Some(row_start) = add_days(grid_start, 7 * idx as u64) else {
                break;
            };
            let Some(row_end) = add_days(row_start, 6) else {
                break;
            };

            if start_week.is_none() && row_end >= month_start {
                start_week = Some(idx);
            }
            if start_week.is_some() && row_start <= month_end {
                end_week = Some(idx + 1);
            }
        }

        if let Some(start) = start_week {
            spans.push(MonthSpan {
                name: name.to_string(),
                start_week: start,
                end_week: end_week.unwrap_or(start + 1).max(start + 1),
            });
        }
    }

    spans
}

/// Per-month calendar pages: Sunday-first rows padded with `None`, each labeled with
/// the dashboard week number of its first day.
pub fn month_pages(activities: &[Activity], year: i32) -> Vec<MonthPage> {
    let per_day = daily_distances(activities, year);

    (0..12u32)
        .filter_map(|month0| {
            let (first, last) = month_bounds(year, month0)?;
            let mut weeks = Vec::new();
            let mut row: [Option<MonthDay>; 7] = [None; 7];
            let mut slot = first.weekday().num_days_from_sunday() as usize;
            let mut row_week = week_number(first);

            for date in first.iter_days().take_while(|d| *d <= last) {
                let distance = per_day.get(&date).copied().unwrap_or(Decimal::ZERO);
                row[slot] = Some(MonthDay {
                    day: date.day(),
                    date,
                    distance,
                    has_activity: per_day.contains_key(&date),
                });
                slot += 1;

                if slot == 7 {
                    weeks.push(MonthWeek {
                        week_number: row_week,
                        days: row,
                    });
                    row = [None; 7];
                    slot = 0;
                    row_week = date.succ_opt().map_or(row_week, week_number);
                }
            }

            if slot > 0 {
                weeks.push(MonthWeek {
                    week_number: row_week,
                    days: row,
                });
            }

            Some(MonthPage {
                name: MONTH_NAMES[month0 as usize].to_string(),
                month: month0,
                weeks,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_intensity_levels() {
        assert_eq!(intensity_level(dec!(0)), 0);
        assert_eq!(intensity_level(dec!(0.1)), 1);
        assert_eq!(intensity_level(dec!(4.99)), 1);
        assert_eq!(intensity_level(dec!(5)), 2);
        assert_eq!(intensity_level(dec!(14.9)), 3);
        assert_eq!(intensity_level(dec!(15)), 4);
        assert_eq!(intensity_level(dec!(24.99)), 5);
        assert_eq!(intensity_level(dec!(29.99)), 6);
        assert_eq!(intensity_level(dec!(30)), 7);
        assert_eq!(intensity_level(dec!(42.2)), 7);
    }

    #[test]
    fn test_same_day_distances_sum() {
        let activities = vec![
            Activity::new("a", date(2024, 6, 1), dec!(3)),
            Activity::new("b", date(2024, 6, 1), dec!(7)),
        ];
        let calendar = YearCalendar::build(&activities, 2024);
        let day = calendar.day(date(2024, 6, 1)).unwrap();
        assert_eq!(day.distance, dec!(10));
        assert_eq!(day.level, 2);
        assert_eq!(calendar.active_days, 1);
        assert_eq!(calendar.total_distance, dec!(10));
    }

    #[test]
    fn test_leap_and_common_years() {
        assert_eq!(YearCalendar::build(&[], 2024).days.len(), 366);
        assert!(YearCalendar::build(&[], 2024).is_leap_year());
        assert_eq!(YearCalendar::build(&[], 2023).days.len(), 365);
    }

    #[test]
    fn test_other_years_ignored() {
        let activities = vec![Activity::new("a", date(2023, 12, 31), dec!(12))];
        let calendar = YearCalendar::build(&activities, 2024);
        assert!(calendar.days.iter().all(|d| d.level == 0));
        assert_eq!(calendar.day(date(2023, 12, 31)), None);
    }

    #[test]
    fn test_week_grid_alignment() {
        // 2024-01-01 is a Monday, 2024-12-31 a Tuesday
        let calendar = YearCalendar::build(&[], 2024);
        let first = &calendar.weeks[0];
        assert!(first.days[0].is_none());
        assert_eq!(first.days[1].unwrap().date, date(2024, 1, 1));

        let last = calendar.weeks.last().unwrap();
        assert_eq!(last.days[2].unwrap().date, date(2024, 12, 31));
        assert!(last.days[3..].iter().all(Option::is_none));

        assert_eq!(calendar.weeks.len(), 53);
        let filled: usize = calendar
            .weeks
            .iter()
            .map(|w| w.days.iter().filter(|d| d.is_some()).count())
            .sum();
        assert_eq!(filled, 366);
    }

    #[test]
    fn test_month_spans() {
        let calendar = YearCalendar::build(&[], 2024);
        assert_eq!(calendar.months.len(), 12);
        assert_eq!(calendar.months[0], MonthSpan { name: "Jan".into(), start_week: 0, end_week: 5 });
        // Feb 1 2024 is a Thursday in row 4
        assert_eq!(calendar.months[1].start_week, 4);
        assert_eq!(calendar.months[11].end_week, calendar.weeks.len());
    }

    #[test]
    fn test_weekday_levels() {
        let activities = vec![Activity::new("a", date(2024, 1, 7), dec!(21))];
        let calendar = YearCalendar::build(&activities, 2024);
        assert_eq!(calendar.weekday_levels.len(), 7);
        assert_eq!(calendar.weekday_levels[0].len(), calendar.weeks.len());
        // Jan 7 2024 is the Sunday opening row 1
        assert_eq!(calendar.weekday_levels[0][1], 5);
        assert_eq!(calendar.weekday_levels[0][0], 0);
    }

    #[test]
    fn test_month_pages() {
        let activities = vec![Activity::new("a", date(2023, 2, 14), dec!(6))];
        let pages = month_pages(&activities, 2023);
        assert_eq!(pages.len(), 12);

        let feb = &pages[1];
        assert_eq!(feb.name, "Feb");
        // Feb 1 2023 is a Wednesday
        assert!(feb.weeks[0].days[..3].iter().all(Option::is_none));
        assert_eq!(feb.weeks[0].days[3].unwrap().day, 1);
        let numbers: Vec<u32> = feb.weeks.iter().map(|w| w.week_number).collect();
        assert_eq!(numbers, vec![5, 6, 7, 8, 9]);
        assert!(feb.weeks.iter().all(|w| w.days.len() == 7));

        let valentine = feb.weeks[2].days[2].unwrap();
        assert_eq!(valentine.day, 14);
        assert!(valentine.has_activity);
        assert_eq!(valentine.distance, dec!(6));
    }

    proptest! {
        #[test]
        fn test_calendar_shape(year in 1990i32..2100) {
            let calendar = YearCalendar::build(&[], year);
            let expected = if NaiveDate::from_ymd_opt(year, 2, 29).is_some() { 366 } else { 365 };
            prop_assert_eq!(calendar.days.len(), expected);
            prop_assert!(calendar.days.iter().all(|d| d.level <= MAX_LEVEL));
            prop_assert!(calendar.weeks.iter().all(|w| w.days.len() == 7));
            prop_assert!(calendar.weeks[0].days[0].is_none() || calendar.weeks[0].days[0].unwrap().date.ordinal() == 1);
        }
    }
}
