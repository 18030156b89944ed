use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::calendar::{month_pages, YearCalendar};
use crate::distribution::PaceDistribution;
use crate::grouping::Granularity;
use crate::hierarchy::{Hierarchy, HierarchyLayout};
use crate::metrics::{aggregate_periods, normalize_chart, PeriodAggregate};
use crate::models::Activity;
use crate::route::{route_sketches, ViewBox};
use crate::summary::{latest_activity, personal_bests, ActivityStats, PersonalBests};

pub use crate::error::ExportError;

pub mod csv;
pub mod json;
pub mod text;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "txt",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "text" | "txt" => Ok(ExportFormat::Text),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "text",
        })
    }
}

/// Derived view to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportView {
    Stats,
    Weekly,
    Monthly,
    Quarterly,
    Chart,
    Hierarchy,
    Pace,
    Calendar,
    Bests,
    Routes,
    /// Everything the dashboard shows for one year
    Report,
}

impl ExportView {
    pub const ALL: [ExportView; 11] = [
        ExportView::Stats,
        ExportView::Weekly,
        ExportView::Monthly,
        ExportView::Quarterly,
        ExportView::Chart,
        ExportView::Hierarchy,
        ExportView::Pace,
        ExportView::Calendar,
        ExportView::Bests,
        ExportView::Routes,
        ExportView::Report,
    ];

    /// Granularity of the period views
    pub fn granularity(&self) -> Option<Granularity> {
        match self {
            ExportView::Weekly => Some(Granularity::Week),
            ExportView::Monthly => Some(Granularity::Month),
            ExportView::Quarterly => Some(Granularity::Quarter),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportView::Stats => "stats",
            ExportView::Weekly => "weekly",
            ExportView::Monthly => "monthly",
            ExportView::Quarterly => "quarterly",
            ExportView::Chart => "chart",
            ExportView::Hierarchy => "hierarchy",
            ExportView::Pace => "pace",
            ExportView::Calendar => "calendar",
            ExportView::Bests => "bests",
            ExportView::Routes => "routes",
            ExportView::Report => "report",
        }
    }

    /// Whether `format` can represent this view
    pub fn supports(&self, format: ExportFormat) -> bool {
        match format {
            ExportFormat::Json => true,
            ExportFormat::Csv => matches!(
                self,
                ExportView::Weekly
                    | ExportView::Monthly
                    | ExportView::Quarterly
                    | ExportView::Calendar
                    | ExportView::Pace
            ),
            ExportFormat::Text => matches!(self, ExportView::Report),
        }
    }
}

impl std::str::FromStr for ExportView {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        ExportView::ALL
            .into_iter()
            .find(|view| view.name() == lowered)
            .ok_or_else(|| ExportError::UnsupportedView {
                format: "any".to_string(),
                view: s.to_string(),
            })
    }
}

impl fmt::Display for ExportView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Export configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub view: ExportView,
    /// Year label for reports; activities are expected to be filtered already
    pub year: Option<i32>,
    /// Shape of the hierarchy view
    pub layout: HierarchyLayout,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            format: ExportFormat::Json,
            view: ExportView::Report,
            year: None,
            layout: HierarchyLayout::MonthWeek,
        }
    }
}

/// Everything the dashboard page shows for a year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub year: Option<i32>,
    pub generated_at: DateTime<Utc>,
    pub stats: ActivityStats,
    pub monthly: Vec<PeriodAggregate>,
    pub pace: PaceDistribution,
    pub bests: PersonalBests,
    pub latest: Option<Activity>,
}

impl DashboardReport {
    pub fn build(activities: &[Activity], year: Option<i32>) -> Self {
        DashboardReport {
            year,
            generated_at: Utc::now(),
            stats: ActivityStats::from_activities(activities),
            monthly: aggregate_periods(activities, Granularity::Month),
            pace: PaceDistribution::from_activities(activities),
            bests: personal_bests(activities),
            latest: latest_activity(activities).cloned(),
        }
    }
}

/// Year used by year-shaped views when none was given
fn calendar_year(activities: &[Activity], options: &ExportOptions) -> Option<i32> {
    options
        .year
        .or_else(|| activities.iter().map(Activity::year).max())
}

/// Write `options.view` of `activities` in `options.format` to `writer`
pub fn export_to_writer<W: Write>(
    activities: &[Activity],
    options: &ExportOptions,
    writer: W,
) -> Result<(), ExportError> {
    if !options.view.supports(options.format) {
        return Err(ExportError::UnsupportedView {
            format: options.format.to_string(),
            view: options.view.to_string(),
        });
    }

    match (options.format, options.view) {
        (ExportFormat::Json, view) => json_view(activities, options, view, writer),
        (ExportFormat::Csv, ExportView::Calendar) => match calendar_year(activities, options) {
            Some(year) => csv::write_calendar_days(&YearCalendar::build(activities, year).days, writer),
            None => csv::write_calendar_days(&[], writer),
        },
        (ExportFormat::Csv, ExportView::Pace) => {
            csv::write_pace_ranges(&PaceDistribution::from_activities(activities).ranges, writer)
        }
        (ExportFormat::Csv, view) => {
            let granularity = view.granularity().ok_or_else(|| ExportError::UnsupportedView {
                format: options.format.to_string(),
                view: view.to_string(),
            })?;
            csv::write_period_aggregates(&aggregate_periods(activities, granularity), writer)
        }
        (ExportFormat::Text, _) => {
            text::write_report(&DashboardReport::build(activities, options.year), writer)
        }
    }
}

fn json_view<W: Write>(
    activities: &[Activity],
    options: &ExportOptions,
    view: ExportView,
    writer: W,
) -> Result<(), ExportError> {
    match view {
        ExportView::Stats => json::write_json(&ActivityStats::from_activities(activities), writer),
        ExportView::Weekly | ExportView::Monthly | ExportView::Quarterly => {
            let granularity = view.granularity().unwrap_or(Granularity::Month);
            json::write_json(&aggregate_periods(activities, granularity), writer)
        }
        ExportView::Chart => {
            let weeks = aggregate_periods(activities, Granularity::Week);
            json::write_json(&normalize_chart(&weeks), writer)
        }
        ExportView::Hierarchy => json::write_json(&Hierarchy::build(activities, options.layout), writer),
        ExportView::Pace => json::write_json(&PaceDistribution::from_activities(activities), writer),
        ExportView::Calendar => {
            // No year given and no activities to infer one from: empty sections
            let year = calendar_year(activities, options);
            json::write_json(
                &serde_json::json!({
                    "calendar": year.map(|y| YearCalendar::build(activities, y)),
                    "months": year.map(|y| month_pages(activities, y)).unwrap_or_default(),
                }),
                writer,
            )
        }
        ExportView::Bests => json::write_json(&personal_bests(activities), writer),
        ExportView::Routes => json::write_json(&route_sketches(activities, ViewBox::default()), writer),
        ExportView::Report => json::write_json(&DashboardReport::build(activities, options.year), writer),
    }
}

/// Write a view to `output_path`, creating or truncating the file
pub fn export<P: AsRef<Path>>(
    activities: &[Activity],
    options: &ExportOptions,
    output_path: P,
) -> Result<(), ExportError> {
    let path = output_path.as_ref();
    if !options.view.supports(options.format) {
        return Err(ExportError::UnsupportedView {
            format: options.format.to_string(),
            view: options.view.to_string(),
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    export_to_writer(activities, options, &mut writer)?;
    writer.flush()?;

    tracing::info!(
        path = %path.display(),
        view = %options.view,
        format = %options.format,
        activities = activities.len(),
        "Exported view"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn sample() -> Vec<Activity> {
        let day = |d| NaiveDate::from_ymd_opt(2024, 2, d).unwrap();
        vec![
            Activity::new("1", day(3), dec!(5)).with_pace("5'00\"/km").with_time("25m 0s"),
            Activity::new("2", day(10), dec!(10)).with_pace("6'00\"/km").with_bpm(150),
        ]
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(_))
        ));
        assert_eq!("hierarchy".parse::<ExportView>().unwrap(), ExportView::Hierarchy);
        assert!("heatmap".parse::<ExportView>().is_err());
    }

    #[test]
    fn test_support_matrix() {
        assert!(ExportView::ALL.iter().all(|v| v.supports(ExportFormat::Json)));
        assert!(ExportView::Monthly.supports(ExportFormat::Csv));
        assert!(!ExportView::Hierarchy.supports(ExportFormat::Csv));
        assert!(ExportView::Report.supports(ExportFormat::Text));
        assert!(!ExportView::Stats.supports(ExportFormat::Text));
    }

    #[test]
    fn test_unsupported_combination() {
        let options = ExportOptions {
            format: ExportFormat::Csv,
            view: ExportView::Hierarchy,
            ..ExportOptions::default()
        };
        let err = export_to_writer(&sample(), &options, Vec::new()).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedView { .. }));
    }

    #[test]
    fn test_every_json_view_serializes() {
        for view in ExportView::ALL {
            let options = ExportOptions {
                view,
                ..ExportOptions::default()
            };
            let mut buffer = Vec::new();
            export_to_writer(&sample(), &options, &mut buffer).unwrap();
            let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
            assert!(!parsed.is_null(), "{view} exported null");
        }
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("monthly.csv");
        let options = ExportOptions {
            format: ExportFormat::Csv,
            view: ExportView::Monthly,
            year: Some(2024),
            ..ExportOptions::default()
        };

        export(&sample(), &options, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("year,period,label"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_calendar_without_year_is_empty() {
        let json_options = ExportOptions {
            view: ExportView::Calendar,
            ..ExportOptions::default()
        };
        let mut buffer = Vec::new();
        export_to_writer(&[], &json_options, &mut buffer).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert!(parsed["calendar"].is_null());
        assert_eq!(parsed["months"], serde_json::json!([]));

        let csv_options = ExportOptions {
            format: ExportFormat::Csv,
            ..json_options.clone()
        };
        let mut buffer = Vec::new();
        export_to_writer(&[], &csv_options, &mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "date,distance_km,level\n");

        // An explicit year still yields a full, empty calendar
        let with_year = ExportOptions {
            year: Some(2021),
            ..csv_options
        };
        let mut buffer = Vec::new();
        export_to_writer(&[], &with_year, &mut buffer).unwrap();
        let content = String::from_utf8(buffer).unwrap();
        assert_eq!(content.lines().count(), 366);
        assert!(content.contains("2021-01-01,0,0"));
    }

    #[test]
    fn test_report_contents() {
        let report = DashboardReport::build(&sample(), Some(2024));
        assert_eq!(report.stats.runs, 2);
        assert_eq!(report.monthly.len(), 1);
        assert_eq!(report.latest.as_ref().unwrap().id, "2");
        assert!(report.bests.best_5k.is_some());
    }
}
