use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::pace;

/// Activity types recorded by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    #[default]
    Run,
    Workout,
    Cycling,
    #[serde(other)]
    Other,
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "run" => Ok(ActivityType::Run),
            "workout" => Ok(ActivityType::Workout),
            "cycling" => Ok(ActivityType::Cycling),
            "other" => Ok(ActivityType::Other),
            _ => Err(format!("Unknown activity type: {}. Use run, workout, cycling or other", s)),
        }
    }
}

/// A single GPS track point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// Calendar date of an activity with an optional start time.
///
/// Serialized as `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`. Grouping only ever looks at
/// the calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActivityDate {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

impl ActivityDate {
    pub fn new(date: NaiveDate) -> Self {
        ActivityDate { date, time: None }
    }

    pub fn with_time(date: NaiveDate, time: NaiveTime) -> Self {
        ActivityDate {
            date,
            time: Some(time),
        }
    }
}

impl fmt::Display for ActivityDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time {
            Some(time) => write!(f, "{}T{}", self.date.format("%Y-%m-%d"), time.format("%H:%M:%S")),
            None => write!(f, "{}", self.date.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for ActivityDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(ActivityDate::new(date));
        }

        // Offsets and zone designators are dropped; dates are taken as local.
        let local = s
            .trim_end_matches('Z')
            .split('+')
            .next()
            .unwrap_or(s);
        let local = match local.rfind('-') {
            Some(idx) if idx > 10 => &local[..idx],
            _ => local,
        };

        for format in [
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S",
        ] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(local, format) {
                return Ok(ActivityDate::with_time(dt.date(), dt.time()));
            }
        }

        Err(format!("Invalid activity date: {}", s))
    }
}

impl Serialize for ActivityDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ActivityDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Core activity record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique identifier for the activity
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    /// Date (and optionally time) of the activity
    pub date: ActivityDate,

    /// Distance covered in kilometers
    pub distance: Decimal,

    /// Pace as recorded, e.g. `5'20"/km`
    #[serde(default, deserialize_with = "null_as_default")]
    pub pace: String,

    /// Average heart rate, 0 when not recorded
    #[serde(default, deserialize_with = "null_as_default")]
    pub bpm: u16,

    /// Duration as recorded, e.g. `1h 21m 38s`
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: String,

    /// Route label
    #[serde(default, deserialize_with = "null_as_default")]
    pub route: String,

    #[serde(default, rename = "type")]
    pub activity_type: ActivityType,

    /// GPS track, absent for indoor or unlogged activities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Vec<Coordinate>>,
}

impl Activity {
    /// Minimal record, mostly useful for tests and fixtures
    pub fn new(id: impl Into<String>, date: NaiveDate, distance: Decimal) -> Self {
        Activity {
            id: id.into(),
            date: ActivityDate::new(date),
            distance,
            pace: String::new(),
            bpm: 0,
            time: String::new(),
            route: String::new(),
            activity_type: ActivityType::Run,
            coordinates: None,
        }
    }

    pub fn with_pace(mut self, pace: impl Into<String>) -> Self {
        self.pace = pace.into();
        self
    }

    pub fn with_bpm(mut self, bpm: u16) -> Self {
        self.bpm = bpm;
        self
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = time.into();
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    pub fn with_coordinates(mut self, coordinates: Vec<Coordinate>) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn with_type(mut self, activity_type: ActivityType) -> Self {
        self.activity_type = activity_type;
        self
    }

    /// Calendar day of the activity
    pub fn day(&self) -> NaiveDate {
        self.date.date
    }

    pub fn year(&self) -> i32 {
        self.date.date.year()
    }

    /// Calendar month, 1 = January
    pub fn month(&self) -> u32 {
        self.date.date.month()
    }

    /// Parsed pace in seconds per km, `None` when missing or malformed
    pub fn pace_seconds(&self) -> Option<u32> {
        pace::parse_pace(&self.pace)
    }

    pub fn has_valid_pace(&self) -> bool {
        self.pace_seconds().is_some()
    }

    /// Heart rate when recorded
    pub fn heart_rate(&self) -> Option<u16> {
        (self.bpm > 0).then_some(self.bpm)
    }

    /// Parsed duration in seconds
    pub fn duration_seconds(&self) -> Option<u32> {
        pace::parse_duration(&self.time)
    }

    pub fn has_track(&self) -> bool {
        self.coordinates.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Pace computed from duration and distance, `None` unless both are usable
    pub fn derived_pace(&self) -> Option<String> {
        let seconds = self.duration_seconds().filter(|s| *s > 0)?;
        if self.distance <= Decimal::ZERO {
            return None;
        }
        Some(pace::format_pace_per_km(Decimal::from(seconds) / self.distance))
    }

    /// Fill a blank pace from duration and distance. An explicit `N/A` is kept.
    /// Returns whether the pace was filled.
    pub fn fill_missing_pace(&mut self) -> bool {
        if !self.pace.trim().is_empty() {
            return false;
        }
        match self.derived_pace() {
            Some(pace) => {
                self.pace = pace;
                true
            }
            None => false,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_activity_deserialization() {
        let json = r#"{
            "id": "1",
            "date": "2026-01-15",
            "distance": 10.5,
            "pace": "5'20\"/km",
            "bpm": 145,
            "time": "56m 00s",
            "route": "Morning Run",
            "type": "run",
            "coordinates": [{"lat": 31.23, "lng": 121.47}, {"lat": 31.24, "lng": 121.48}]
        }"#;

        let activity: Activity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.id, "1");
        assert_eq!(activity.day(), NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        assert_eq!(activity.distance, dec!(10.5));
        assert_eq!(activity.pace_seconds(), Some(320));
        assert_eq!(activity.heart_rate(), Some(145));
        assert_eq!(activity.duration_seconds(), Some(3360));
        assert!(activity.has_track());
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{"id": 7, "date": "2025-06-01T07:30:00", "distance": 3, "bpm": null}"#;
        let activity: Activity = serde_json::from_str(json).unwrap();

        assert_eq!(activity.id, "7");
        assert_eq!(activity.date.time, NaiveTime::from_hms_opt(7, 30, 0));
        assert_eq!(activity.bpm, 0);
        assert_eq!(activity.heart_rate(), None);
        assert_eq!(activity.pace_seconds(), None);
        assert_eq!(activity.activity_type, ActivityType::Run);
        assert!(!activity.has_track());
    }

    #[test]
    fn test_unknown_activity_type() {
        let json = r#"{"id": "x", "date": "2025-06-01", "distance": 1, "type": "hike"}"#;
        let activity: Activity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.activity_type, ActivityType::Other);
    }

    #[test]
    fn test_activity_date_parsing() {
        let plain: ActivityDate = "2024-03-05".parse().unwrap();
        assert_eq!(plain.time, None);
        assert_eq!(plain.to_string(), "2024-03-05");

        let zoned: ActivityDate = "2024-03-05T23:10:00Z".parse().unwrap();
        assert_eq!(zoned.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(zoned.to_string(), "2024-03-05T23:10:00");

        let offset: ActivityDate = "2024-03-05T06:00:00-05:00".parse().unwrap();
        assert_eq!(offset.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());

        assert!("March 5th".parse::<ActivityDate>().is_err());
    }

    #[test]
    fn test_activity_serialization_round_trip() {
        let activity = Activity::new("a", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), dec!(5.2))
            .with_pace("5'45\"/km")
            .with_bpm(138);

        let json = serde_json::to_string(&activity).unwrap();
        assert!(json.contains("\"date\":\"2024-01-02\""));
        assert!(json.contains("\"type\":\"run\""));
        assert!(!json.contains("coordinates"));

        let back: Activity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, activity);
    }

    #[test]
    fn test_activity_type_parsing() {
        assert_eq!("workout".parse::<ActivityType>().unwrap(), ActivityType::Workout);
        assert_eq!(" Run ".parse::<ActivityType>().unwrap(), ActivityType::Run);
        assert!("hike".parse::<ActivityType>().is_err());
    }

    #[test]
    fn test_missing_pace_from_duration() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();

        let mut blank = Activity::new("a", day, dec!(10)).with_time("52m 30s");
        assert!(blank.fill_missing_pace());
        assert_eq!(blank.pace, "5'15\"/km");
        assert_eq!(blank.pace_seconds(), Some(315));

        // 26:41 over 5 km is 320.2 s/km
        let mut rounded = Activity::new("b", day, dec!(5)).with_time("26m 41s");
        assert!(rounded.fill_missing_pace());
        assert_eq!(rounded.pace, "5'20\"/km");

        let mut explicit = Activity::new("c", day, dec!(10)).with_pace("N/A").with_time("52m 30s");
        assert!(!explicit.fill_missing_pace());
        assert_eq!(explicit.pace, "N/A");

        let mut no_time = Activity::new("d", day, dec!(10));
        assert!(!no_time.fill_missing_pace());
        assert!(Activity::new("e", day, dec!(0)).with_time("10m").derived_pace().is_none());
    }
}
