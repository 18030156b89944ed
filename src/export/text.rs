use std::io::Write;

use super::{DashboardReport, ExportError};
use crate::summary::RaceDistance;

/// Longest histogram bar in characters
const BAR_WIDTH: usize = 30;

/// Export the dashboard report in a human-readable text format
pub fn write_report<W: Write>(report: &DashboardReport, mut out: W) -> Result<(), ExportError> {
    // Header
    writeln!(out, "{:=<60}", "")?;
    match report.year {
        Some(year) => writeln!(out, "RUNNING DASHBOARD {}", year)?,
        None => writeln!(out, "RUNNING DASHBOARD")?,
    }
    writeln!(out, "{:=<60}", "")?;
    writeln!(out, "Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(out)?;

    // Stat cards
    writeln!(out, "SUMMARY")?;
    writeln!(out, "{:-<60}", "")?;
    writeln!(out, "Runs: {}", report.stats.runs)?;
    writeln!(out, "Distance: {:.1} km", report.stats.distance)?;
    writeln!(out, "Active Days: {}", report.stats.days)?;
    writeln!(out, "Average Pace: {}", report.stats.avg_pace)?;
    writeln!(out, "Routes: {}", report.stats.routes)?;
    if let Some(latest) = &report.latest {
        writeln!(out, "Latest Run: {} ({} km, {})", latest.date, latest.distance, latest.pace)?;
    }
    writeln!(out)?;

    if !report.monthly.is_empty() {
        writeln!(out, "MONTHLY SUMMARIES")?;
        writeln!(out, "{:-<60}", "")?;
        writeln!(out, "{:<12} {:>6} {:>14} {:>10} {:>8}", "Month", "Runs", "Distance (km)", "Avg Pace", "Avg HR")?;

        for month in &report.monthly {
            let m = &month.metrics;
            let bpm = if m.has_bpm() {
                m.avg_bpm_rounded().to_string()
            } else {
                "-".to_string()
            };
            writeln!(
                out,
                "{:<12} {:>6} {:>14.1} {:>10} {:>8}",
                month.label,
                m.count,
                m.total_distance,
                m.avg_pace(),
                bpm
            )?;
        }
        writeln!(out)?;
    }

    writeln!(out, "PACE DISTRIBUTION")?;
    writeln!(out, "{:-<60}", "")?;
    let largest = report.pace.ranges.iter().map(|r| r.count).max().unwrap_or(0);
    for (idx, range) in report.pace.ranges.iter().enumerate() {
        let bar_len = if largest == 0 { 0 } else { range.count * BAR_WIDTH / largest };
        let marker = if report.pace.highlighted_range == Some(idx) { '*' } else { ' ' };
        writeln!(
            out,
            "{}{:<16} {:>4} {:>6.1}% {}",
            marker,
            range.label,
            range.count,
            range.percentage,
            "#".repeat(bar_len)
        )?;
    }
    writeln!(
        out,
        "Fastest: {}  Average: {}  Slowest: {}",
        report.pace.stats.fastest, report.pace.stats.average, report.pace.stats.slowest
    )?;
    writeln!(out)?;

    writeln!(out, "PERSONAL BESTS")?;
    writeln!(out, "{:-<60}", "")?;
    for event in RaceDistance::ALL {
        let time = report
            .bests
            .get(event)
            .map_or("--:--".to_string(), |best| best.time.clone());
        writeln!(out, "{:<6} {}", event.label(), time)?;
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Activity;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_report_sections() {
        let day = |m, d| NaiveDate::from_ymd_opt(2024, m, d).unwrap();
        let activities = vec![
            Activity::new("1", day(4, 6), dec!(5.1))
                .with_pace("4'50\"/km")
                .with_bpm(162)
                .with_time("24m 39s"),
            Activity::new("2", day(5, 12), dec!(12)).with_pace("5'40\"/km"),
        ];
        let report = DashboardReport::build(&activities, Some(2024));

        let mut buffer = Vec::new();
        write_report(&report, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("RUNNING DASHBOARD 2024"));
        assert!(text.contains("Runs: 2"));
        assert!(text.contains("Distance: 17.1 km"));
        assert!(text.contains("2024 Apr"));
        assert!(text.contains("5K     24:39"));
        assert!(text.contains("10K    --:--"));
        assert!(text.contains("Fastest: 4'50\"/km"));
        // Average of 290 and 340 is 315, in the 5'00"-5'30" bin
        assert!(text.contains("*5'00\" - 5'30\""));
    }

    #[test]
    fn test_empty_report() {
        let report = DashboardReport::build(&[], None);
        let mut buffer = Vec::new();
        write_report(&report, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("Average Pace: N/A"));
        assert!(!text.contains("MONTHLY SUMMARIES"));
        assert!(text.contains("Half   --:--"));
    }
}
