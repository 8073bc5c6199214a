//! Time-of-day codec
//!
//! Parses and formats "HH:MM" wall-clock strings. Internally a time of day is
//! the number of minutes since midnight, always in `[0, 1440)`.

use chrono::{FixedOffset, Offset, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use super::error::{ClockError, ClockResult};

/// Minutes in one day
pub const MINUTES_PER_DAY: i64 = 1440;

/// Minutes in one hour
pub const MINUTES_PER_HOUR: i64 = 60;

fn time_regex() -> Option<&'static Regex> {
    static TIME_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    TIME_REGEX
        .get_or_init(|| Regex::new(r"^([01]?[0-9]|2[0-3]):[0-5][0-9]$").ok())
        .as_ref()
}

/// A wall-clock time, stored as minutes since midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Midnight
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    /// Parse an "HH:MM" string (single-digit hours accepted)
    pub fn parse(text: &str) -> ClockResult<Self> {
        if !time_regex().is_some_and(|re| re.is_match(text)) {
            return Err(ClockError::InvalidTimeFormat(text.to_string()));
        }

        let (hours, minutes) = text
            .split_once(':')
            .ok_or_else(|| ClockError::InvalidTimeFormat(text.to_string()))?;
        let hours: u16 = hours
            .parse()
            .map_err(|_| ClockError::InvalidTimeFormat(text.to_string()))?;
        let minutes: u16 = minutes
            .parse()
            .map_err(|_| ClockError::InvalidTimeFormat(text.to_string()))?;

        Ok(TimeOfDay(hours * 60 + minutes))
    }

    /// Build from any minute count, wrapping into a single day
    pub fn from_minutes_wrapping(minutes: i64) -> Self {
        TimeOfDay(minutes.rem_euclid(MINUTES_PER_DAY) as u16)
    }

    /// Minutes since midnight
    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Add (or subtract) minutes, wrapping around midnight
    pub fn add_minutes(self, delta: i64) -> Self {
        Self::from_minutes_wrapping(i64::from(self.0) + delta.rem_euclid(MINUTES_PER_DAY))
    }

    /// Signed difference `self - other` in minutes, without wraparound
    pub fn minutes_since(self, other: TimeOfDay) -> i32 {
        i32::from(self.0) - i32::from(other.0)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeOfDay::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        TimeOfDay::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Parse "HH:MM" into minutes since midnight
pub fn parse_time(text: &str) -> ClockResult<u16> {
    TimeOfDay::parse(text).map(TimeOfDay::minutes)
}

/// Format any minute count as "HH:MM", wrapping negative and overlong values
pub fn format_time(minutes: i64) -> String {
    TimeOfDay::from_minutes_wrapping(minutes).to_string()
}

/// Signed difference `a - b` in minutes
pub fn time_difference(a: &str, b: &str) -> ClockResult<i32> {
    Ok(TimeOfDay::parse(a)?.minutes_since(TimeOfDay::parse(b)?))
}

/// Human-readable signed difference ("synchronized", "+5 minutes", "-1 minute")
pub fn format_difference(difference: i32) -> String {
    if difference == 0 {
        return "synchronized".to_string();
    }

    let sign = if difference > 0 { "+" } else { "" };
    format!("{}{} {}", sign, difference, minute_word(difference.unsigned_abs()))
}

/// "minute" or "minutes" for an exact count
pub fn minute_word(count: u32) -> &'static str {
    if count == 1 {
        "minute"
    } else {
        "minutes"
    }
}

/// Current wall-clock time at a fixed UTC offset
pub fn current_time(utc_offset_minutes: i32) -> TimeOfDay {
    let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix());
    let now = Utc::now().with_timezone(&offset);
    let minutes = i64::from(now.hour()) * MINUTES_PER_HOUR + i64::from(now.minute());
    TimeOfDay::from_minutes_wrapping(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_times() {
        assert_eq!(parse_time("00:00").unwrap(), 0);
        assert_eq!(parse_time("15:30").unwrap(), 930);
        assert_eq!(parse_time("23:59").unwrap(), 1439);
        assert_eq!(parse_time("9:05").unwrap(), 545);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for bad in ["25:00", "12:60", "abc", "", "24:00", "1:5", "12:5a", " 12:00", "123:00"] {
            assert!(
                matches!(parse_time(bad), Err(ClockError::InvalidTimeFormat(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_round_trip_every_minute() {
        for minutes in 0..MINUTES_PER_DAY {
            let text = format_time(minutes);
            assert_eq!(i64::from(parse_time(&text).unwrap()), minutes);
            assert_eq!(format_time(i64::from(parse_time(&text).unwrap())), text);
        }
    }

    #[test]
    fn test_format_wraps() {
        assert_eq!(format_time(1440), "00:00");
        assert_eq!(format_time(-15), "23:45");
        assert_eq!(format_time(1505), "01:05");
        assert_eq!(format_time(-1440 * 3 + 61), "01:01");
    }

    #[test]
    fn test_difference_sign() {
        assert_eq!(time_difference("15:05", "15:00").unwrap(), 5);
        assert_eq!(time_difference("14:40", "15:00").unwrap(), -20);
        assert_eq!(time_difference("23:59", "00:00").unwrap(), 1439);
        assert!(time_difference("15:00", "nope").is_err());
    }

    #[test]
    fn test_add_minutes_wraps() {
        let t = TimeOfDay::parse("23:50").unwrap();
        assert_eq!(t.add_minutes(15).to_string(), "00:05");
        assert_eq!(TimeOfDay::MIDNIGHT.add_minutes(-1).to_string(), "23:59");
        assert_eq!(TimeOfDay::MIDNIGHT.add_minutes(3 * 1440 + 5).to_string(), "00:05");
    }

    #[test]
    fn test_format_difference() {
        assert_eq!(format_difference(0), "synchronized");
        assert_eq!(format_difference(1), "+1 minute");
        assert_eq!(format_difference(5), "+5 minutes");
        assert_eq!(format_difference(-1), "-1 minute");
        assert_eq!(format_difference(-20), "-20 minutes");
    }

    #[test]
    fn test_serde_as_string() {
        let t = TimeOfDay::parse("7:05").unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"07:05\"");

        let back: TimeOfDay = serde_json::from_str("\"14:45\"").unwrap();
        assert_eq!(back.minutes(), 885);

        assert!(serde_json::from_str::<TimeOfDay>("\"24:00\"").is_err());
        assert!(serde_json::from_str::<TimeOfDay>("900").is_err());
    }

    #[test]
    fn test_current_time_in_range() {
        let now = current_time(330);
        assert!(now.minutes() < 1440);
    }

    #[test]
    fn test_add_minutes_extreme_deltas() {
        let t = TimeOfDay::parse("12:00").unwrap();
        // i64::MAX wraps to +1087 minutes, i64::MIN to +352
        assert_eq!(t.add_minutes(i64::MAX).to_string(), "06:07");
        assert_eq!(t.add_minutes(i64::MIN).to_string(), "17:52");
        assert_eq!(TimeOfDay::MIDNIGHT.add_minutes(i64::MIN).to_string(), "05:52");
    }
}
