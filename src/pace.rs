//! Pace and duration string handling
//!
//! Paces are stored as the strings the tracker produced (`5'20"/km`). Everything that
//! needs a number goes through [`parse_pace`], which returns `None` for anything that is
//! not a well formed, non-zero pace. Callers filter on that before averaging so that a
//! bad record can never leak into aggregate math.

use regex::Regex;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::sync::LazyLock;

/// Display value used wherever a pace or statistic has no data
pub const NO_DATA: &str = "N/A";

static PACE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"^(\d+)'(\d{1,2})"(?:/km)?$"#).ok());

static DURATION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+)h)?\s*(?:(\d+)m)?\s*(?:(\d+)s)?$").ok());

/// Parse a `M'SS"` or `M'SS"/km` pace into seconds per km.
///
/// Returns `None` for malformed strings, `N/A`, seconds above 59 and zero paces.
pub fn parse_pace(pace: &str) -> Option<u32> {
    let captures = PACE_PATTERN.as_ref()?.captures(pace.trim())?;
    let minutes: u32 = captures.get(1)?.as_str().parse().ok()?;
    let seconds: u32 = captures.get(2)?.as_str().parse().ok()?;

    if seconds >= 60 {
        return None;
    }

    let total = minutes.checked_mul(60)?.checked_add(seconds)?;
    (total > 0).then_some(total)
}

/// Sentinel form of [`parse_pace`]: 0 means "no data"
pub fn pace_seconds(pace: &str) -> u32 {
    parse_pace(pace).unwrap_or(0)
}

/// Split seconds per km into whole minutes and rounded seconds.
///
/// Seconds are rounded half away from zero; a rounded 60 carries into the minutes.
fn split_minutes(seconds: Decimal) -> (u64, u64) {
    let minutes = (seconds / dec_60()).floor();
    let remainder = (seconds - minutes * dec_60())
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    let mut minutes = minutes.to_u64().unwrap_or(0);
    let mut secs = remainder.to_u64().unwrap_or(0);
    if secs >= 60 {
        minutes += 1;
        secs -= 60;
    }
    (minutes, secs)
}

fn dec_60() -> Decimal {
    Decimal::from(60)
}

/// Format seconds per km as `M'SS"`. Zero or negative input formats as `N/A`.
pub fn format_pace(seconds: Decimal) -> String {
    if seconds <= Decimal::ZERO {
        return NO_DATA.to_string();
    }
    let (minutes, secs) = split_minutes(seconds);
    format!("{}'{:02}\"", minutes, secs)
}

/// Format seconds per km as `M'SS"/km`. Zero or negative input formats as `N/A`.
pub fn format_pace_per_km(seconds: Decimal) -> String {
    if seconds <= Decimal::ZERO {
        return NO_DATA.to_string();
    }
    format!("{}/km", format_pace(seconds))
}

/// Parse a `1h 23m 45s` style duration. Each field is optional, but at least one
/// must be present.
pub fn parse_duration(time: &str) -> Option<u32> {
    let trimmed = time.trim();
    if trimmed.is_empty() {
        return None;
    }

    let captures = DURATION_PATTERN.as_ref()?.captures(trimmed)?;
    let field = |idx: usize| -> Option<u32> {
        captures.get(idx).and_then(|m| m.as_str().parse().ok())
    };

    let (hours, minutes, seconds) = (field(1), field(2), field(3));
    if hours.is_none() && minutes.is_none() && seconds.is_none() {
        return None;
    }

    Some(
        hours
            .unwrap_or(0)
            .saturating_mul(3600)
            .saturating_add(minutes.unwrap_or(0).saturating_mul(60))
            .saturating_add(seconds.unwrap_or(0)),
    )
}

/// Format a duration as `H:MM:SS`, or `M:SS` when under an hour
pub fn format_duration(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_pace() {
        assert_eq!(parse_pace("5'20\"/km"), Some(320));
        assert_eq!(parse_pace("5'20\""), Some(320));
        assert_eq!(parse_pace(" 4'05\" "), Some(245));
        assert_eq!(parse_pace("12'7\""), Some(727));
    }

    #[test]
    fn test_parse_pace_rejects_malformed() {
        assert_eq!(parse_pace("N/A"), None);
        assert_eq!(parse_pace(""), None);
        assert_eq!(parse_pace("5:20"), None);
        assert_eq!(parse_pace("5'75\""), None);
        assert_eq!(parse_pace("0'00\""), None);
        assert_eq!(parse_pace("5'20"), None);
        assert_eq!(pace_seconds("garbage"), 0);
    }

    #[test]
    fn test_format_pace() {
        assert_eq!(format_pace(dec!(330)), "5'30\"");
        assert_eq!(format_pace(dec!(245)), "4'05\"");
        assert_eq!(format_pace(dec!(330.5)), "5'31\"");
        assert_eq!(format_pace(dec!(330.4)), "5'30\"");
        assert_eq!(format_pace(dec!(359.7)), "6'00\"");
        assert_eq!(format_pace(Decimal::ZERO), NO_DATA);
        assert_eq!(format_pace_per_km(dec!(320)), "5'20\"/km");
        assert_eq!(format_pace_per_km(Decimal::ZERO), NO_DATA);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1h 21m 38s"), Some(4898));
        assert_eq!(parse_duration("56m 00s"), Some(3360));
        assert_eq!(parse_duration("29m 54s"), Some(1794));
        assert_eq!(parse_duration("1h 05m"), Some(3900));
        assert_eq!(parse_duration("45s"), Some(45));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("fast"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(4898), "1:21:38");
        assert_eq!(format_duration(1794), "29:54");
        assert_eq!(format_duration(45), "0:45");
    }

    proptest! {
        #[test]
        fn test_pace_round_trip(minutes in 0u32..30, seconds in 0u32..60) {
            prop_assume!(minutes > 0 || seconds > 0);
            let raw = format!("{}'{:02}\"/km", minutes, seconds);

            let parsed = parse_pace(&raw);
            prop_assert_eq!(parsed, Some(minutes * 60 + seconds));

            let formatted = format_pace(Decimal::from(parsed.unwrap()));
            prop_assert_eq!(parse_pace(&formatted), parsed);
        }

        #[test]
        fn test_parse_pace_never_panics(raw in ".{0,16}") {
            let _ = parse_pace(&raw);
            let _ = parse_duration(&raw);
        }
    }
}
