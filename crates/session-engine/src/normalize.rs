//! Date normalization for stored class dates.
//!
//! Storage and the change feed deliver dates in several shapes: native
//! values, ISO strings, US-style `MM/dd/yyyy`, month names, and date+time
//! composites. Everything here treats the input as a wall-clock reading.
//! Offsets are discarded rather than applied, so a date-only value can never
//! drift to the neighbouring day.
//!
//! The primitives return [`ScheduleError::InvalidDate`] instead of guessing.
//! Substituting "now" is a caller decision, made explicitly through
//! [`normalize_or`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ScheduleError};

/// A date as it arrives from storage, the change feed, or a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
}

impl From<NaiveDate> for DateInput {
    fn from(d: NaiveDate) -> Self {
        DateInput::Date(d)
    }
}

impl From<NaiveDateTime> for DateInput {
    fn from(dt: NaiveDateTime) -> Self {
        DateInput::DateTime(dt)
    }
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        DateInput::Text(s.to_string())
    }
}

impl From<String> for DateInput {
    fn from(s: String) -> Self {
        DateInput::Text(s)
    }
}

/// Anything that identifies a local calendar day.
///
/// Time-of-day is dropped, never rounded.
pub trait LocalDay {
    fn local_day(&self) -> NaiveDate;
}

impl LocalDay for NaiveDate {
    fn local_day(&self) -> NaiveDate {
        *self
    }
}

impl LocalDay for NaiveDateTime {
    fn local_day(&self) -> NaiveDate {
        self.date()
    }
}

impl<T: LocalDay + ?Sized> LocalDay for &T {
    fn local_day(&self) -> NaiveDate {
        (**self).local_day()
    }
}

// ── Candidate formats ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Candidate {
    /// A date-only pattern, parsed as local midnight.
    Date(&'static str),
    /// A pattern carrying an offset; the wall-clock part is kept.
    WithOffset(&'static str),
}

/// Tried in order after the ISO pass fails.
const CANDIDATES: &[Candidate] = &[
    Candidate::Date("%Y-%m-%d"),
    Candidate::Date("%m/%d/%Y"),
    Candidate::Date("%-m/%-d/%Y"),
    Candidate::Date("%b %d, %Y"),
    Candidate::Date("%B %d, %Y"),
    Candidate::WithOffset("%Y-%m-%dT%H:%M:%S%.f%z"),
];

/// Naive ISO-8601 shapes accepted on the first pass.
const ISO_NAIVE: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Offset-bearing shapes that show up as database text (`2025-06-10 00:00:00+00`).
const ISO_OFFSET: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

// ── Public API ──────────────────────────────────────────────────────────────

/// Normalize any [`DateInput`] to a local wall-clock datetime.
///
/// Date-only inputs come back at midnight.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidDate`] if a text input matches neither the
/// ISO shapes nor any candidate format.
///
/// # Examples
///
/// ```
/// use session_engine::normalize::{normalize, DateInput};
///
/// let dt = normalize(&DateInput::from("06/10/2025")).unwrap();
/// assert_eq!(dt.to_string(), "2025-06-10 00:00:00");
/// ```
pub fn normalize(input: &DateInput) -> Result<NaiveDateTime> {
    match input {
        DateInput::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
        DateInput::DateTime(dt) => Ok(*dt),
        DateInput::Text(s) => parse_date_str(s),
    }
}

/// Parse a date string: ISO first, then each candidate format in order.
pub fn parse_date_str(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ScheduleError::InvalidDate("empty date".to_string()));
    }

    try_iso(s)
        .or_else(|| try_candidates(s))
        .ok_or_else(|| ScheduleError::InvalidDate(format!("'{s}'")))
}

/// Strict day-level normalization: any time component is ignored.
pub fn normalize_day(input: &DateInput) -> Result<NaiveDate> {
    normalize(input).map(|dt| dt.date())
}

/// Whether `input` falls on the same local calendar day as `day`.
///
/// Compares year, month and day only. Unparseable input is never a match.
pub fn same_local_day(input: &DateInput, day: impl LocalDay) -> bool {
    normalize_day(input)
        .map(|d| d == day.local_day())
        .unwrap_or(false)
}

/// Normalize, substituting `fallback` when the input is unreadable.
///
/// This is the edge-of-core fallback: the substitution is logged because a
/// corrupt date treated as "now" will surface in today's views.
pub fn normalize_or(input: &DateInput, fallback: NaiveDateTime) -> NaiveDateTime {
    match normalize(input) {
        Ok(dt) => dt,
        Err(e) => {
            warn!(error = %e, fallback = %fallback, "unparseable date, substituting fallback");
            fallback
        }
    }
}

/// Canonical storage form of a date (`yyyy-MM-dd`).
pub fn format_date(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

// ── Internal helpers ────────────────────────────────────────────────────────

fn try_iso(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in ISO_NAIVE {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in ISO_OFFSET {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_local());
        }
    }
    None
}

fn try_candidates(s: &str) -> Option<NaiveDateTime> {
    CANDIDATES.iter().find_map(|candidate| match candidate {
        Candidate::Date(fmt) => NaiveDate::parse_from_str(s, fmt)
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN)),
        Candidate::WithOffset(fmt) => DateTime::parse_from_str(s, fmt)
            .ok()
            .map(|dt| dt.naive_local()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        ymd(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    // ── ISO shapes ──────────────────────────────────────────────────────

    #[test]
    fn test_iso_date_only_is_local_midnight() {
        let dt = parse_date_str("2025-06-10").unwrap();
        assert_eq!(dt, at(2025, 6, 10, 0, 0));
    }

    #[test]
    fn test_iso_naive_datetime() {
        assert_eq!(
            parse_date_str("2025-06-10T14:30:00").unwrap(),
            at(2025, 6, 10, 14, 30)
        );
        assert_eq!(
            parse_date_str("2025-06-10T14:30").unwrap(),
            at(2025, 6, 10, 14, 30)
        );
        assert_eq!(
            parse_date_str("2025-06-10 09:05:00.123").unwrap().date(),
            ymd(2025, 6, 10)
        );
    }

    #[test]
    fn test_rfc3339_keeps_wall_clock() {
        // Late-evening negative offset: converting to UTC would move to June 11.
        let dt = parse_date_str("2025-06-10T23:30:00-05:00").unwrap();
        assert_eq!(dt, at(2025, 6, 10, 23, 30));
        // UTC midnight must not drift to June 9 either.
        let dt = parse_date_str("2025-06-10T00:00:00Z").unwrap();
        assert_eq!(dt.date(), ymd(2025, 6, 10));
    }

    #[test]
    fn test_database_timestamp_with_short_offset() {
        let dt = parse_date_str("2025-06-10 00:00:00+00").unwrap();
        assert_eq!(dt.date(), ymd(2025, 6, 10));
    }

    // ── Candidate formats ───────────────────────────────────────────────

    #[test]
    fn test_us_padded() {
        assert_eq!(parse_date_str("06/10/2025").unwrap().date(), ymd(2025, 6, 10));
    }

    #[test]
    fn test_us_unpadded() {
        assert_eq!(parse_date_str("6/1/2025").unwrap().date(), ymd(2025, 6, 1));
    }

    #[test]
    fn test_short_month_name() {
        assert_eq!(parse_date_str("Jun 10, 2025").unwrap().date(), ymd(2025, 6, 10));
        assert_eq!(parse_date_str("Jun 1, 2025").unwrap().date(), ymd(2025, 6, 1));
    }

    #[test]
    fn test_long_month_name() {
        assert_eq!(
            parse_date_str("September 3, 2025").unwrap().date(),
            ymd(2025, 9, 3)
        );
    }

    #[test]
    fn test_millis_with_compact_offset() {
        let dt = parse_date_str("2025-06-10T14:00:00.000+0200").unwrap();
        assert_eq!(dt, at(2025, 6, 10, 14, 0));
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(parse_date_str("  2025-06-10 ").unwrap().date(), ymd(2025, 6, 10));
    }

    // ── Failures ────────────────────────────────────────────────────────

    #[test]
    fn test_garbage_is_an_error() {
        let err = parse_date_str("not-a-date").unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidDate(_)));
    }

    #[test]
    fn test_empty_is_an_error() {
        assert!(parse_date_str("").is_err());
        assert!(parse_date_str("   ").is_err());
    }

    #[test]
    fn test_impossible_calendar_date_is_an_error() {
        assert!(parse_date_str("2025-02-30").is_err());
        assert!(parse_date_str("13/01/2025").is_err());
    }

    #[test]
    fn test_leap_day() {
        assert_eq!(parse_date_str("02/29/2024").unwrap().date(), ymd(2024, 2, 29));
        assert!(parse_date_str("02/29/2025").is_err());
    }

    // ── Native inputs ───────────────────────────────────────────────────

    #[test]
    fn test_native_inputs_pass_through() {
        let d = ymd(2025, 6, 10);
        assert_eq!(normalize(&d.into()).unwrap(), at(2025, 6, 10, 0, 0));
        let dt = at(2025, 6, 10, 18, 45);
        assert_eq!(normalize(&dt.into()).unwrap(), dt);
    }

    // ── Same-day comparator ─────────────────────────────────────────────

    #[test]
    fn test_same_day_ignores_time_component() {
        let input = DateInput::from("2025-06-10T23:59:59");
        assert!(same_local_day(&input, ymd(2025, 6, 10)));
        assert!(same_local_day(&input, at(2025, 6, 10, 0, 1)));
        assert!(!same_local_day(&input, ymd(2025, 6, 11)));
    }

    #[test]
    fn test_same_day_is_false_for_garbage() {
        assert!(!same_local_day(&DateInput::from("soon"), ymd(2025, 6, 10)));
    }

    // ── Fallback ────────────────────────────────────────────────────────

    #[test]
    fn test_normalize_or_uses_fallback_only_on_failure() {
        let now = at(2026, 1, 5, 8, 0);
        assert_eq!(normalize_or(&"bogus".into(), now), now);
        assert_eq!(
            normalize_or(&"2025-06-10".into(), now),
            at(2025, 6, 10, 0, 0)
        );
    }

    #[test]
    fn test_date_input_deserializes_untagged() {
        let d: DateInput = serde_json::from_str("\"2025-06-10\"").unwrap();
        assert_eq!(d, DateInput::Date(ymd(2025, 6, 10)));
        let t: DateInput = serde_json::from_str("\"June 10, 2025\"").unwrap();
        assert_eq!(t, DateInput::Text("June 10, 2025".to_string()));
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(ymd(2025, 1, 2)), "2025-01-02");
    }
}
