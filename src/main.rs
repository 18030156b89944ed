use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use runboard::calendar::{month_pages, YearCalendar, MAX_LEVEL, WEEKDAY_LABELS};
use runboard::config::{AppConfig, WeekStart};
use runboard::error::ErrorSeverity;
use runboard::export::{self, json::write_json, ExportFormat, ExportOptions, ExportView};
use runboard::hierarchy::{Hierarchy, HierarchyLayout, NestedNode};
use runboard::logging::{init_logging, LogFormat};
use runboard::{
    aggregate_periods, normalize_chart, personal_bests, yearly_stats, Activity, ActivityQuery,
    ActivityStats, ActivityStore, ActivityType, Granularity, PaceDistribution, RunboardError,
};

/// runboard - running activity dashboard
///
/// Loads a JSON file of running activities and prints the derived dashboard views:
/// period rollups, pace distribution, calendar heatmap and distance hierarchies.
#[derive(Parser)]
#[command(name = "runboard")]
#[command(version)]
#[command(about = "Running activity dashboard CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format (pretty, json, compact)
    #[arg(long, value_name = "FORMAT", global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

/// Data selection shared by every data command
#[derive(Args, Clone)]
struct DataArgs {
    /// Activity JSON file (defaults to the configured path)
    #[arg(short, long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// Year to show (defaults to the configured year, then the latest year in the data)
    #[arg(short, long)]
    year: Option<i32>,

    /// Only include one calendar month (1-12)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    /// Only include one activity type (run, workout, cycling, other)
    #[arg(long = "type", value_name = "TYPE")]
    activity_type: Option<ActivityType>,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the years present in the data with their totals
    Years {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Show the dashboard stat cards for a year
    Stats {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Weekly, monthly or quarterly rollups
    Periods {
        #[command(flatten)]
        data: DataArgs,

        /// Period size (week, month, quarter)
        #[arg(short, long, default_value = "month")]
        by: Granularity,
    },

    /// Pace and heart rate chart, normalized per period
    Chart {
        #[command(flatten)]
        data: DataArgs,

        /// Period size (week, month, quarter)
        #[arg(short, long, default_value = "week")]
        by: Granularity,
    },

    /// Distance hierarchy for treemap and sunburst views
    Hierarchy {
        #[command(flatten)]
        data: DataArgs,

        /// Tree shape (month-week, quarter-month, quarter-month-week)
        #[arg(short, long, default_value = "month-week")]
        layout: HierarchyLayout,
    },

    /// Pace distribution histogram
    Pace {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Calendar heatmap of daily distance
    Calendar {
        #[command(flatten)]
        data: DataArgs,

        /// Print one page per month with week numbers instead of the year grid
        #[arg(short, long)]
        months: bool,
    },

    /// Personal bests for 5K, 10K and half marathon
    Bests {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Export a derived view to a file
    Export {
        #[command(flatten)]
        data: DataArgs,

        /// View to export (stats, weekly, monthly, quarterly, chart, hierarchy, pace,
        /// calendar, bests, routes, report)
        #[arg(long, default_value = "report")]
        view: ExportView,

        /// Export format (json, csv, text)
        #[arg(short = 'f', long, default_value = "json")]
        format: ExportFormat,

        /// Tree shape for the hierarchy view
        #[arg(short, long, default_value = "month-week")]
        layout: HierarchyLayout,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show or create the configuration file
    Config {
        /// Print the effective configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file if none exists
        #[arg(short, long)]
        init: bool,
    },
}

/// Activities selected for one command run
struct Selection {
    store: ActivityStore,
    year: Option<i32>,
    activities: Vec<Activity>,
    json: bool,
}

impl Selection {
    fn year_label(&self) -> String {
        self.year.map_or_else(|| "-".to_string(), |y| y.to_string())
    }

    /// Print the empty-state message when there is nothing to show
    fn print_empty_state(&self) -> bool {
        if self.activities.is_empty() && !self.json {
            println!(
                "{}",
                format!("No activities for {}", self.year_label()).yellow()
            );
            return true;
        }
        false
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(cli.config.as_deref());

    let mut log_config = config.logging.clone().with_verbosity(cli.verbose);
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    init_logging(&log_config)?;

    if !config.display.color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Years { data } => {
            let selection = select(&config, &data)?;
            show_years(&selection)
        }
        Commands::Stats { data } => show_stats(&select(&config, &data)?),
        Commands::Periods { data, by } => show_periods(&select(&config, &data)?, by),
        Commands::Chart { data, by } => show_chart(&select(&config, &data)?, by),
        Commands::Hierarchy { data, layout } => show_hierarchy(&select(&config, &data)?, layout),
        Commands::Pace { data } => show_pace(&select(&config, &data)?),
        Commands::Calendar { data, months } => {
            let selection = select(&config, &data)?;
            if months {
                show_month_pages(&selection)
            } else {
                show_calendar(&selection, config.display.week_start)
            }
        }
        Commands::Bests { data } => show_bests(&select(&config, &data)?),
        Commands::Export {
            data,
            view,
            format,
            layout,
            output,
        } => run_export(&select(&config, &data)?, view, format, layout, &output),
        Commands::Config { show, init } => run_config(&config, cli.config.as_deref(), show, init),
    }
}

/// Log a library error at its severity and turn it into a user-facing message
fn report(error: RunboardError) -> anyhow::Error {
    match error.severity() {
        ErrorSeverity::Critical | ErrorSeverity::Error => tracing::error!(error = %error, "Command failed"),
        ErrorSeverity::Warning => tracing::warn!(error = %error, "Command failed"),
        ErrorSeverity::Info => tracing::info!(error = %error, "Command failed"),
    }
    anyhow!(error.user_message())
}

/// Load the activity file and pick the year to show
fn select(config: &AppConfig, args: &DataArgs) -> Result<Selection> {
    let path = args
        .data
        .clone()
        .unwrap_or_else(|| config.data.activities_path.clone());

    let store = ActivityStore::load(&path).map_err(report)?;

    let year = args
        .year
        .or(config.data.default_year)
        .or_else(|| store.latest_year());
    let activities = match year {
        Some(year) => store.query(&ActivityQuery {
            year: Some(year),
            month: args.month,
            activity_type: args.activity_type,
        }),
        None => Vec::new(),
    };

    tracing::debug!(
        year = ?year,
        month = ?args.month,
        activity_type = ?args.activity_type,
        activities = activities.len(),
        "Selected activities"
    );

    Ok(Selection {
        store,
        year,
        activities,
        json: args.json || config.display.json,
    })
}

fn print_json<T: serde::Serialize + ?Sized>(data: &T) -> Result<()> {
    write_json(data, std::io::stdout().lock()).map_err(|e| report(e.into()))
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

fn heading(title: &str, selection: &Selection) {
    println!(
        "{} {}",
        title.cyan().bold(),
        selection.year_label().bold()
    );
}

fn bar(percent: Decimal, width: usize) -> String {
    let filled = (percent * Decimal::from(width) / Decimal::ONE_HUNDRED)
        .round()
        .to_usize()
        .unwrap_or(0)
        .min(width);
    "#".repeat(filled)
}

#[derive(Tabled)]
struct YearRow {
    #[tabled(rename = "Year")]
    year: i32,
    #[tabled(rename = "Runs")]
    runs: usize,
    #[tabled(rename = "Distance (km)")]
    distance: String,
    #[tabled(rename = "Days")]
    days: usize,
    #[tabled(rename = "Avg Pace")]
    avg_pace: String,
    #[tabled(rename = "Routes")]
    routes: usize,
}

fn show_years(selection: &Selection) -> Result<()> {
    let years = yearly_stats(selection.store.activities());

    if selection.json {
        let summary: Vec<_> = years
            .iter()
            .map(|y| serde_json::json!({ "year": y.year, "stats": y.stats }))
            .collect();
        return print_json(&summary);
    }

    if years.is_empty() {
        println!("{}", "No activities found".yellow());
        return Ok(());
    }

    print_table(
        years
            .into_iter()
            .map(|y| YearRow {
                year: y.year,
                runs: y.stats.runs,
                distance: format!("{:.1}", y.stats.distance),
                days: y.stats.days,
                avg_pace: y.stats.avg_pace,
                routes: y.stats.routes,
            })
            .collect(),
    );
    Ok(())
}

fn show_stats(selection: &Selection) -> Result<()> {
    let stats = ActivityStats::from_activities(&selection.activities);
    if selection.json {
        return print_json(&stats);
    }
    if selection.print_empty_state() {
        return Ok(());
    }

    heading("Stats", selection);
    println!("  {:<12} {}", "Runs".dimmed(), stats.runs.to_string().bold());
    println!("  {:<12} {} km", "Distance".dimmed(), format!("{:.1}", stats.distance).bold());
    println!("  {:<12} {}", "Days".dimmed(), stats.days.to_string().bold());
    println!("  {:<12} {}", "Avg Pace".dimmed(), stats.avg_pace.bold());
    println!("  {:<12} {}", "Routes".dimmed(), stats.routes.to_string().bold());
    Ok(())
}

#[derive(Tabled)]
struct PeriodRow {
    #[tabled(rename = "Period")]
    label: String,
    #[tabled(rename = "Runs")]
    runs: usize,
    #[tabled(rename = "Distance (km)")]
    distance: String,
    #[tabled(rename = "Avg Pace")]
    avg_pace: String,
    #[tabled(rename = "Avg HR")]
    avg_bpm: String,
}

fn show_periods(selection: &Selection, by: Granularity) -> Result<()> {
    let periods = aggregate_periods(&selection.activities, by);
    if selection.json {
        return print_json(&periods);
    }
    if selection.print_empty_state() {
        return Ok(());
    }

    heading(&format!("{} rollup", by), selection);
    print_table(
        periods
            .iter()
            .map(|p| PeriodRow {
                label: p.label.clone(),
                runs: p.metrics.count,
                distance: format!("{:.1}", p.metrics.total_distance),
                avg_pace: p.metrics.avg_pace(),
                avg_bpm: if p.metrics.has_bpm() {
                    p.metrics.avg_bpm_rounded().to_string()
                } else {
                    "-".to_string()
                },
            })
            .collect(),
    );
    Ok(())
}

fn show_chart(selection: &Selection, by: Granularity) -> Result<()> {
    let chart = normalize_chart(&aggregate_periods(&selection.activities, by));
    if selection.json {
        return print_json(&chart);
    }
    if selection.print_empty_state() {
        return Ok(());
    }

    heading("Pace / heart rate", selection);
    for point in &chart {
        println!(
            "{:<10} {:>8} {:<20} {:>8} {}",
            point.label,
            point.pace_value,
            bar(point.pace_percent, 20).green(),
            point.bpm_value,
            bar(point.hr_percent, 20).red()
        );
    }
    Ok(())
}

fn print_node(node: &NestedNode, depth: usize) {
    let line = format!(
        "{}{:<12} {:>8} km {:>4} runs {:>8}",
        "  ".repeat(depth),
        node.name,
        format!("{:.1}", node.value),
        node.count,
        node.avg_pace
    );
    if node.count == 0 {
        println!("{}", line.dimmed());
    } else {
        println!("{}", line);
    }
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

fn show_hierarchy(selection: &Selection, layout: HierarchyLayout) -> Result<()> {
    let hierarchy = Hierarchy::build(&selection.activities, layout);
    if selection.json {
        return print_json(&hierarchy);
    }
    if selection.print_empty_state() {
        return Ok(());
    }

    heading(&format!("Hierarchy ({})", layout), selection);
    print_node(&hierarchy.to_nested(), 0);
    Ok(())
}

fn show_pace(selection: &Selection) -> Result<()> {
    let distribution = PaceDistribution::from_activities(&selection.activities);
    if selection.json {
        return print_json(&distribution);
    }
    if selection.print_empty_state() {
        return Ok(());
    }

    heading("Pace distribution", selection);
    for (idx, range) in distribution.ranges.iter().enumerate() {
        let line = format!(
            "{:<16} {:>4} {:>6.1}% {}",
            range.label,
            range.count,
            range.percentage,
            bar(range.percentage, 30)
        );
        if distribution.highlighted_range == Some(idx) {
            println!("{}", line.yellow().bold());
        } else {
            println!("{}", line);
        }
    }
    let stats = &distribution.stats;
    println!(
        "Fastest {}  Average {}  Slowest {}  ({} runs)",
        stats.fastest.green(),
        stats.average.yellow(),
        stats.slowest.red(),
        stats.total_activities
    );
    Ok(())
}

/// One character per intensity level, empty to hardest
const LEVEL_GLYPHS: [char; (MAX_LEVEL + 1) as usize] = ['.', '1', '2', '3', '4', '5', '6', '7'];

fn show_calendar(selection: &Selection, week_start: WeekStart) -> Result<()> {
    let Some(year) = selection.year else {
        println!("{}", "No activities found".yellow());
        return Ok(());
    };
    let calendar = YearCalendar::build(&selection.activities, year);
    if selection.json {
        return print_json(&calendar);
    }

    heading("Calendar", selection);

    let mut header = vec![' '; calendar.weeks.len()];
    for span in &calendar.months {
        for (offset, ch) in span.name.chars().enumerate() {
            if let Some(slot) = header.get_mut(span.start_week + offset) {
                *slot = ch;
            }
        }
    }
    println!("    {}", header.into_iter().collect::<String>());

    let mut order: Vec<usize> = (0..7).collect();
    if week_start == WeekStart::Monday {
        order.rotate_left(1);
    }
    for weekday in order {
        let row: String = calendar.weekday_levels[weekday]
            .iter()
            .map(|level| LEVEL_GLYPHS[usize::from(*level).min(LEVEL_GLYPHS.len() - 1)])
            .collect();
        println!("{} {}", WEEKDAY_LABELS[weekday].dimmed(), row.green());
    }
    println!(
        "{} active days, {:.1} km",
        calendar.active_days, calendar.total_distance
    );
    Ok(())
}

fn show_month_pages(selection: &Selection) -> Result<()> {
    let Some(year) = selection.year else {
        println!("{}", "No activities found".yellow());
        return Ok(());
    };
    let pages = month_pages(&selection.activities, year);
    if selection.json {
        return print_json(&pages);
    }

    for page in &pages {
        println!("{} {}", page.name.cyan().bold(), year);
        println!("{}", "  W  Su Mo Tu We Th Fr Sa".dimmed());
        for week in &page.weeks {
            let mut line = format!("{:>3} ", week.week_number);
            for slot in &week.days {
                match slot {
                    Some(day) if day.has_activity => {
                        line.push_str(&format!("{:>2} ", day.day).green().bold().to_string())
                    }
                    Some(day) => line.push_str(&format!("{:>2} ", day.day)),
                    None => line.push_str("   "),
                }
            }
            println!("{}", line.trim_end());
        }
        println!();
    }
    Ok(())
}

#[derive(Tabled)]
struct BestRow {
    #[tabled(rename = "Event")]
    event: &'static str,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Activity")]
    activity: String,
}

fn show_bests(selection: &Selection) -> Result<()> {
    let bests = personal_bests(&selection.activities);
    if selection.json {
        return print_json(&bests);
    }
    if selection.print_empty_state() {
        return Ok(());
    }

    heading("Personal bests", selection);
    print_table(
        runboard::summary::RaceDistance::ALL
            .into_iter()
            .map(|event| {
                let best = bests.get(event);
                BestRow {
                    event: event.label(),
                    time: best.map_or("--:--".to_string(), |b| b.time.clone()),
                    activity: best.map_or("-".to_string(), |b| b.activity_id.clone()),
                }
            })
            .collect(),
    );
    Ok(())
}

fn run_export(
    selection: &Selection,
    view: ExportView,
    format: ExportFormat,
    layout: HierarchyLayout,
    output: &Path,
) -> Result<()> {
    let options = ExportOptions {
        format,
        view,
        year: selection.year,
        layout,
    };

    export::export(&selection.activities, &options, output).map_err(|e| report(e.into()))?;

    println!(
        "{} {} ({}) to {}",
        "✓ Exported".green().bold(),
        options.view,
        options.format,
        output.display()
    );
    Ok(())
}

fn run_config(config: &AppConfig, path: Option<&Path>, show: bool, init: bool) -> Result<()> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::default_config_path);

    if init {
        if AppConfig::init_at(&config_path)? {
            println!("{} {}", "✓ Created".green().bold(), config_path.display());
        } else {
            println!(
                "{} {}",
                "Config already exists:".yellow(),
                config_path.display()
            );
        }
    }

    if show || !init {
        let content = toml::to_string_pretty(config).context("Failed to render configuration")?;
        println!("{} {}", "#".dimmed(), config_path.display().to_string().dimmed());
        println!("{}", content);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_args_are_typed() {
        let cli = Cli::try_parse_from([
            "runboard", "export", "--view", "calendar", "-f", "csv", "-o", "calendar.csv",
        ])
        .unwrap();
        match cli.command {
            Commands::Export { view, format, .. } => {
                assert_eq!(view, ExportView::Calendar);
                assert_eq!(format, ExportFormat::Csv);
            }
            _ => panic!("expected the export command"),
        }

        assert!(Cli::try_parse_from(["runboard", "export", "-f", "xml", "-o", "out"]).is_err());
        assert!(Cli::try_parse_from(["runboard", "export", "--view", "heatmap", "-o", "out"]).is_err());
    }

    #[test]
    fn test_month_and_type_flags() {
        let cli = Cli::try_parse_from(["runboard", "stats", "--month", "3", "--type", "workout"]).unwrap();
        match cli.command {
            Commands::Stats { data } => {
                assert_eq!(data.month, Some(3));
                assert_eq!(data.activity_type, Some(ActivityType::Workout));
            }
            _ => panic!("expected the stats command"),
        }

        assert!(Cli::try_parse_from(["runboard", "stats", "--month", "13"]).is_err());
        assert!(Cli::try_parse_from(["runboard", "stats", "--type", "hike"]).is_err());
    }
}
