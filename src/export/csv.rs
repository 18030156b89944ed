use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

use super::ExportError;
use crate::calendar::CalendarDay;
use crate::distribution::PaceRange;
use crate::metrics::PeriodAggregate;

#[derive(Serialize)]
struct PeriodRow<'a> {
    year: i32,
    period: u32,
    label: &'a str,
    runs: usize,
    distance_km: Decimal,
    avg_pace: String,
    avg_pace_seconds: Decimal,
    avg_bpm: Decimal,
    running_days: usize,
}

/// One row per period aggregate, ascending
pub fn write_period_aggregates<W: Write>(
    periods: &[PeriodAggregate],
    writer: W,
) -> Result<(), ExportError> {
    let mut csv = ::csv::Writer::from_writer(writer);

    if periods.is_empty() {
        csv.write_record([
            "year",
            "period",
            "label",
            "runs",
            "distance_km",
            "avg_pace",
            "avg_pace_seconds",
            "avg_bpm",
            "running_days",
        ])?;
    }

    for period in periods {
        let m = &period.metrics;
        csv.serialize(PeriodRow {
            year: period.year(),
            period: period.period(),
            label: &period.label,
            runs: m.count,
            distance_km: m.total_distance,
            avg_pace: m.avg_pace(),
            avg_pace_seconds: m.avg_pace_seconds.round_dp(1),
            avg_bpm: m.avg_bpm.round_dp(1),
            running_days: m.running_day_count,
        })?;
    }

    csv.flush()?;
    Ok(())
}

/// One row per day of the year with its cumulative distance and level
pub fn write_calendar_days<W: Write>(days: &[CalendarDay], writer: W) -> Result<(), ExportError> {
    let mut csv = ::csv::Writer::from_writer(writer);
    csv.write_record(["date", "distance_km", "level"])?;

    for day in days {
        csv.write_record([
            day.date.format("%Y-%m-%d").to_string(),
            day.distance.to_string(),
            day.level.to_string(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// One row per pace bin
pub fn write_pace_ranges<W: Write>(ranges: &[PaceRange], writer: W) -> Result<(), ExportError> {
    let mut csv = ::csv::Writer::from_writer(writer);
    csv.write_record(["id", "label", "min_seconds", "max_seconds", "count", "percentage"])?;

    for range in ranges {
        csv.write_record([
            range.id.clone(),
            range.label.clone(),
            range.min_seconds.to_string(),
            range.max_seconds.map_or(String::new(), |s| s.to_string()),
            range.count.to_string(),
            range.percentage.round_dp(1).to_string(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::YearCalendar;
    use crate::distribution::PaceDistribution;
    use crate::grouping::Granularity;
    use crate::metrics::aggregate_periods;
    use crate::models::Activity;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn render<F>(write: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<(), ExportError>,
    {
        let mut buffer = Vec::new();
        write(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn sample() -> Vec<Activity> {
        let day = |m, d| NaiveDate::from_ymd_opt(2024, m, d).unwrap();
        vec![
            Activity::new("1", day(1, 3), dec!(5)).with_pace("5'00\"/km").with_bpm(140),
            Activity::new("2", day(1, 20), dec!(7.5)).with_pace("6'00\"/km"),
            Activity::new("3", day(3, 2), dec!(3)).with_route("Track, lane 1"),
        ]
    }

    #[test]
    fn test_monthly_csv() {
        let months = aggregate_periods(&sample(), Granularity::Month);
        let content = render(|w| write_period_aggregates(&months, w));
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(
            lines[0],
            "year,period,label,runs,distance_km,avg_pace,avg_pace_seconds,avg_bpm,running_days"
        );
        assert_eq!(lines[1], "2024,0,2024 Jan,2,12.5,\"5'30\"\"\",330,140,2");
        assert_eq!(lines[2], "2024,2,2024 Mar,1,3,N/A,0,0,0");
    }

    #[test]
    fn test_empty_periods_still_have_header() {
        let content = render(|w| write_period_aggregates(&[], w));
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_calendar_csv() {
        let calendar = YearCalendar::build(&sample(), 2024);
        let content = render(|w| write_calendar_days(&calendar.days, w));
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines.len(), 367);
        assert_eq!(lines[3], "2024-01-03,5,2");
        assert_eq!(lines[1], "2024-01-01,0,0");
    }

    #[test]
    fn test_pace_csv() {
        let distribution = PaceDistribution::from_activities(&sample());
        let content = render(|w| write_pace_ranges(&distribution.ranges, w));
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines.len(), 9);
        assert!(lines[4].starts_with("4,"));
        assert!(lines[4].contains(",300,330,1,50"));
        assert!(lines[8].contains(",420,,0,"));
    }
}
