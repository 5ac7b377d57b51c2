//! Session placement: which sessions fall on a day, in a window, or in a month.
//!
//! Every function takes the reference day as a parameter and reads no clock.
//! Inputs are snapshots; callers re-run these whenever the list changes.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, NaiveTime};

use crate::normalize::LocalDay;
use crate::session::ClassSession;

/// Length of the default "upcoming" window, in days.
pub const DEFAULT_UPCOMING_DAYS: u32 = 7;

/// Sessions that fall on the local calendar day of `date` (day view).
///
/// Only year, month and day are compared; a time component on `date` is
/// ignored. Input order is preserved.
pub fn sessions_on_date(sessions: &[ClassSession], date: impl LocalDay) -> Vec<&ClassSession> {
    let day = date.local_day();
    sessions.iter().filter(|s| s.date == day).collect()
}

/// Whether any session falls on the local day of `date` (month-cell marking).
pub fn has_session_on_date(sessions: &[ClassSession], date: impl LocalDay) -> bool {
    let day = date.local_day();
    sessions.iter().any(|s| s.date == day)
}

/// Sessions in `[today, today + days_to_show)`, soonest first.
///
/// Inclusion is decided on whole days, so anything on `today` is included
/// whatever its start time. Ordering is by date, then start time; sessions
/// without a readable start time sort first within their day, and full ties
/// keep input order.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use session_engine::placement::{upcoming_sessions, DEFAULT_UPCOMING_DAYS};
///
/// let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
/// assert!(upcoming_sessions(&[], today, DEFAULT_UPCOMING_DAYS).is_empty());
/// ```
pub fn upcoming_sessions(
    sessions: &[ClassSession],
    today: impl LocalDay,
    days_to_show: u32,
) -> Vec<&ClassSession> {
    let start = today.local_day();
    let end = start
        .checked_add_days(Days::new(days_to_show as u64))
        .unwrap_or(NaiveDate::MAX);
    sessions_between(sessions, start, end)
}

/// Sessions with `start <= date < end`, ordered like [`upcoming_sessions`].
pub fn sessions_between(
    sessions: &[ClassSession],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<&ClassSession> {
    let mut hits: Vec<&ClassSession> = sessions
        .iter()
        .filter(|s| s.date >= start && s.date < end)
        .collect();
    hits.sort_by_key(|s| sort_key(s));
    hits
}

/// Days of `month` in `year` that carry at least one session.
///
/// Returns an empty set for an invalid month.
pub fn month_markers(sessions: &[ClassSession], year: i32, month: u32) -> BTreeSet<u32> {
    sessions
        .iter()
        .filter(|s| s.date.year() == year && s.date.month() == month)
        .map(|s| s.date.day())
        .collect()
}

fn sort_key(session: &ClassSession) -> (NaiveDate, NaiveTime) {
    (session.date, session.start().unwrap_or(NaiveTime::MIN))
}
