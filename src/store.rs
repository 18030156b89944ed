//! Activity store: loads the static activity file and answers simple queries

use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use crate::error::{LoadError, Result};
use crate::models::{Activity, ActivityType};

/// Accept a bare array or an object wrapping it under `activities`
fn activity_list(document: Value) -> std::result::Result<Value, LoadError> {
    match document {
        Value::Array(_) => Ok(document),
        Value::Object(mut map) => map.remove("activities").ok_or_else(|| LoadError::Parse {
            reason: "expected an array or an object with an `activities` field".to_string(),
        }),
        other => Err(LoadError::Parse {
            reason: format!("expected an array of activities, found {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Year, month and activity-type filter over the store. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityQuery {
    pub year: Option<i32>,
    /// Calendar month, 1 = January
    pub month: Option<u32>,
    pub activity_type: Option<ActivityType>,
}

impl ActivityQuery {
    pub fn year(year: i32) -> Self {
        ActivityQuery {
            year: Some(year),
            ..Default::default()
        }
    }

    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn with_type(mut self, activity_type: ActivityType) -> Self {
        self.activity_type = Some(activity_type);
        self
    }

    pub fn matches(&self, activity: &Activity) -> bool {
        self.year.map_or(true, |y| activity.year() == y)
            && self.month.map_or(true, |m| activity.month() == m)
            && self.activity_type.map_or(true, |t| activity.activity_type == t)
    }
}

/// Immutable collection of validated activities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityStore {
    activities: Vec<Activity>,
}

impl ActivityStore {
    /// Validate and wrap a list of activities
    /// Blank paces are filled from duration and distance.
    pub fn from_activities(mut activities: Vec<Activity>) -> Result<Self> {
        let derived = activities
            .iter_mut()
            .map(Activity::fill_missing_pace)
            .filter(|filled| *filled)
            .count();
        if derived > 0 {
            tracing::debug!(derived, "Filled missing paces from duration and distance");
        }

        let mut seen = HashSet::new();
        for activity in &activities {
            if activity.distance < Decimal::ZERO {
                return Err(LoadError::InvalidRecord {
                    id: activity.id.clone(),
                    reason: format!("negative distance {}", activity.distance),
                }
                .into());
            }
            if !seen.insert(activity.id.as_str()) {
                tracing::warn!(id = %activity.id, "Duplicate activity id");
            }
            if !activity.pace.is_empty() && !activity.has_valid_pace() {
                tracing::debug!(id = %activity.id, pace = %activity.pace, "Pace will be ignored in aggregates");
            }
        }

        Ok(ActivityStore { activities })
    }

    /// Parse a JSON array of activities or a `{ "activities": [...] }` object
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: Value =
            serde_json::from_str(json).map_err(|e| LoadError::Parse { reason: e.to_string() })?;
        let activities: Vec<Activity> = serde_json::from_value(activity_list(document)?)
            .map_err(|e| LoadError::Parse { reason: e.to_string() })?;
        Self::from_activities(activities)
    }

    /// Load the activity file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LoadError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = fs::read_to_string(path)?;
        let store = Self::from_json_str(&content)?;

        tracing::info!(
            path = %path.display(),
            activities = store.len(),
            years = store.available_years().len(),
            "Loaded activities"
        );

        Ok(store)
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Activities of one calendar year, in file order
    pub fn filter_year(&self, year: i32) -> Vec<Activity> {
        self.activities
            .iter()
            .filter(|a| a.year() == year)
            .cloned()
            .collect()
    }

    /// Activities of one calendar month (1 = January) across all years
    pub fn filter_month(&self, month: u32) -> Vec<Activity> {
        self.query(&ActivityQuery {
            month: Some(month),
            ..Default::default()
        })
    }

    pub fn filter_type(&self, activity_type: ActivityType) -> Vec<Activity> {
        self.query(&ActivityQuery {
            activity_type: Some(activity_type),
            ..Default::default()
        })
    }

    /// Activities matching every set field of `query`, in file order
    pub fn query(&self, query: &ActivityQuery) -> Vec<Activity> {
        self.activities
            .iter()
            .filter(|a| query.matches(a))
            .cloned()
            .collect()
    }

    /// Years with at least one activity, most recent first
    pub fn available_years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.activities.iter().map(Activity::year).collect();
        years.into_iter().rev().collect()
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.activities.iter().map(Activity::year).max()
    }

    /// Activities sorted by date, newest first. Ties keep file order.
    pub fn most_recent_first(&self) -> Vec<Activity> {
        let mut sorted = self.activities.clone();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
        sorted
    }

    pub fn find(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }
}
