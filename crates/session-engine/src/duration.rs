//! Start/end time and duration reconciliation.
//!
//! Sessions store a start time and a fractional-hour duration. The end time
//! is always derived from those two; it is never read back from storage.

use chrono::{NaiveTime, Timelike};
use serde_json::Value;

use crate::error::{Result, ScheduleError};

const MINUTES_PER_DAY: u64 = 24 * 60;

/// Start-time shapes accepted from storage and callers.
const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

/// Compute the `HH:MM` end time of a session.
///
/// The duration is split into whole hours (floor) and remainder minutes
/// (rounded). Minute overflow carries into the hour, and the hour wraps at 24:
/// no day rollover is recorded.
///
/// Returns an empty string when `start` is blank or unreadable, or when the
/// duration is zero, negative or not finite. That is a no-op, not an error.
///
/// # Examples
///
/// ```
/// use session_engine::duration::end_time;
///
/// assert_eq!(end_time("14:00", 1.5), "15:30");
/// assert_eq!(end_time("22:45", 1.5), "00:15");
/// assert_eq!(end_time("14:00", 0.0), "");
/// ```
pub fn end_time(start: &str, duration_hours: f64) -> String {
    if !duration_hours.is_finite() || duration_hours <= 0.0 {
        return String::new();
    }
    let Ok(start) = parse_start_time(start) else {
        return String::new();
    };

    let whole_hours = duration_hours.floor();
    let extra_minutes = ((duration_hours - whole_hours) * 60.0).round() as u64;
    let whole_hours = (whole_hours as u64) % 24;

    let mut hour = start.hour() as u64 + whole_hours;
    let mut minute = start.minute() as u64 + extra_minutes;
    if minute >= 60 {
        hour += minute / 60;
        minute %= 60;
    }

    format!("{:02}:{:02}", hour % 24, minute)
}

/// Parse a stored start time into a [`NaiveTime`].
///
/// Accepts `HH:MM`, `HH:MM:SS` (database `time` columns) and 12-hour
/// `h:MM AM` forms.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidTime`] for blank or unrecognized input.
pub fn parse_start_time(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ScheduleError::InvalidTime("empty time".to_string()));
    }
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| ScheduleError::InvalidTime(format!("'{s}'")))
}

/// Format a time as canonical `HH:MM`.
pub fn format_hh_mm(t: NaiveTime) -> String {
    format!("{:02}:{:02}", t.hour(), t.minute())
}

/// Hours from `start` to `end`, wrapping past midnight.
///
/// `None` if either side is unreadable or both are equal.
pub fn duration_between(start: &str, end: &str) -> Option<f64> {
    let start = parse_start_time(start).ok()?;
    let end = parse_start_time(end).ok()?;

    let start_min = (start.hour() * 60 + start.minute()) as u64;
    let end_min = (end.hour() * 60 + end.minute()) as u64;
    let diff = (end_min + MINUTES_PER_DAY - start_min) % MINUTES_PER_DAY;
    if diff == 0 {
        return None;
    }
    Some(diff as f64 / 60.0)
}

/// Parse a stored duration in hours. Never fails: anything unreadable is `0.0`.
pub fn parse_duration(value: &Value) -> f64 {
    parse_number(value)
}

/// Defensive numeric parse for cost and duration columns.
///
/// Numbers pass through; strings contribute their leading numeric prefix
/// (`"1.5 hrs"` is `1.5`). Null, empty, non-numeric and non-finite inputs
/// are `0.0`.
pub fn parse_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    };
    n.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Longest `[+-]?digits[.digits]` prefix of a trimmed string.
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let mut seen_digit = false;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }
    s[..end].trim_end_matches('.').parse().ok()
}
