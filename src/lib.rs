// Library interface for runboard modules
// The CLI, integration tests and benches all go through these

pub mod calendar;
pub mod config;
pub mod distribution;
pub mod error;
pub mod export;
pub mod grouping;
pub mod hierarchy;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pace;
pub mod route;
pub mod store;
pub mod summary;

// Re-export commonly used types for convenience
pub use calendar::{intensity_level, month_pages, YearCalendar};
pub use config::AppConfig;
pub use distribution::{PaceDistribution, PACE_BINS};
pub use error::{ExportError, LoadError, Result, RunboardError};
pub use export::{DashboardReport, ExportFormat, ExportOptions, ExportView};
pub use grouping::{group_by, week_number, Granularity, PeriodKey};
pub use hierarchy::{Direction, Hierarchy, HierarchyLayout, HierarchyNode, NodeId, NodeLevel};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use metrics::{aggregate_periods, normalize_chart, ChartPoint, GroupMetrics, PeriodAggregate};
pub use models::{Activity, ActivityDate, ActivityType, Coordinate};
pub use pace::{format_pace, parse_pace};
pub use store::{ActivityQuery, ActivityStore};
pub use summary::{latest_activity, personal_bests, yearly_stats, ActivityStats, PersonalBests, YearData};
