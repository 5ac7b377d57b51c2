//! Recurring-series policy: classification, scheduling, and mutation scope.
//!
//! A recurring class is stored one row per occurrence. `recurring_days` is
//! carried metadata for display; nothing here expands it into dates. The
//! caller picks the occurrence dates when scheduling, and the caller says
//! whether a delete targets one occurrence or the whole series.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::duration::{end_time, format_hh_mm, parse_start_time};
use crate::error::Result;
use crate::normalize::{normalize_day, DateInput};
use crate::session::{Attendance, ClassSession, SessionStatus};

/// How a session repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Recurrence {
    OneShot,
    Recurring { days: Vec<Weekday> },
}

/// Classify a session. `recurring == true` is the only criterion.
pub fn classify(session: &ClassSession) -> Recurrence {
    if session.recurring {
        Recurrence::Recurring {
            days: session.recurring_days.clone(),
        }
    } else {
        Recurrence::OneShot
    }
}

// ── Weekday metadata ────────────────────────────────────────────────────────

/// Parse a weekday name (case-insensitive, full or abbreviated).
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Order weekdays Monday-first and drop duplicates.
pub fn normalize_days(days: impl IntoIterator<Item = Weekday>) -> Vec<Weekday> {
    let mut days: Vec<Weekday> = days.into_iter().collect();
    days.sort_by_key(|d| d.num_days_from_monday());
    days.dedup();
    days
}

// ── Delete scope ────────────────────────────────────────────────────────────

/// Which occurrences a delete request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeleteScope {
    /// Only the targeted occurrence.
    Single,
    /// Every occurrence of the targeted series.
    AllRecurring,
}

impl DeleteScope {
    /// Map the caller's "delete all recurring" flag to a scope.
    pub fn from_flag(is_recurring: bool) -> Self {
        if is_recurring {
            DeleteScope::AllRecurring
        } else {
            DeleteScope::Single
        }
    }
}

/// Ids of the sessions a delete of `target_id` with `scope` should remove.
///
/// For [`DeleteScope::AllRecurring`], siblings are matched by `series_id`
/// when the target carries one. Rows without a series id fall back to the
/// legacy rule: every recurring session with the same title. Two unrelated
/// series sharing a title are conflated by that fallback.
///
/// The scope alone decides: a non-recurring target under
/// [`DeleteScope::AllRecurring`] selects its recurring namesakes but not
/// itself.
///
/// Returns an empty list when `target_id` is not in `sessions`.
pub fn delete_targets(sessions: &[ClassSession], target_id: &str, scope: DeleteScope) -> Vec<String> {
    let Some(target) = sessions.iter().find(|s| s.id == target_id) else {
        return Vec::new();
    };
    sessions
        .iter()
        .filter(|s| in_scope(s, target, scope))
        .map(|s| s.id.clone())
        .collect()
}

/// Apply a delete to a snapshot, returning the removed sessions.
pub fn remove_sessions(
    sessions: &mut Vec<ClassSession>,
    target_id: &str,
    scope: DeleteScope,
) -> Vec<ClassSession> {
    let Some(target) = sessions.iter().find(|s| s.id == target_id).cloned() else {
        return Vec::new();
    };
    let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(sessions)
        .into_iter()
        .partition(|s| in_scope(s, &target, scope));
    *sessions = kept;
    removed
}

fn in_scope(candidate: &ClassSession, target: &ClassSession, scope: DeleteScope) -> bool {
    match scope {
        DeleteScope::Single => candidate.id == target.id,
        DeleteScope::AllRecurring if !candidate.recurring => false,
        DeleteScope::AllRecurring => match &target.series_id {
            Some(series) => candidate.series_id.as_ref() == Some(series),
            None => {
                let hit = candidate.title == target.title;
                if hit && candidate.id != target.id {
                    debug!(
                        title = %target.title,
                        id = %candidate.id,
                        "recurring delete matched by title"
                    );
                }
                hit
            }
        },
    }
}

// ── Scheduling ──────────────────────────────────────────────────────────────

/// Everything needed to schedule a class, minus the dates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassDraft {
    pub title: String,
    pub subject_id: String,
    pub tutor_name: String,
    pub student_name: String,
    pub start_time: String,
    pub duration: f64,
    pub zoom_link: Option<String>,
    pub recurring: bool,
    pub recurring_days: Vec<Weekday>,
    pub class_cost: f64,
    pub tutor_cost: f64,
}

/// Create one session per date in `dates`.
///
/// A recurring draft mints a single series id shared by every occurrence.
/// Each occurrence gets its own id, and the end time is derived.
pub fn schedule(draft: &ClassDraft, dates: &[NaiveDate]) -> Vec<ClassSession> {
    let series_id = draft.recurring.then(|| Uuid::new_v4().to_string());
    let recurring_days = if draft.recurring {
        normalize_days(draft.recurring_days.iter().copied())
    } else {
        Vec::new()
    };
    let start_time = canonical_start(&draft.start_time);

    dates
        .iter()
        .map(|date| ClassSession {
            id: Uuid::new_v4().to_string(),
            title: draft.title.clone(),
            subject_id: draft.subject_id.clone(),
            tutor_name: draft.tutor_name.clone(),
            student_name: draft.student_name.clone(),
            date: *date,
            end_time: end_time(&start_time, draft.duration),
            start_time: start_time.clone(),
            duration: draft.duration,
            zoom_link: draft.zoom_link.clone(),
            recurring: draft.recurring,
            recurring_days: recurring_days.clone(),
            series_id: series_id.clone(),
            class_cost: draft.class_cost,
            tutor_cost: draft.tutor_cost,
            status: SessionStatus::Scheduled,
            attendance: Attendance::Pending,
        })
        .collect()
}

fn canonical_start(s: &str) -> String {
    parse_start_time(s).map(format_hh_mm).unwrap_or_default()
}

// ── Single-record edits ─────────────────────────────────────────────────────

/// A partial update to one session. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionPatch {
    pub title: Option<String>,
    pub subject_id: Option<String>,
    pub tutor_name: Option<String>,
    pub student_name: Option<String>,
    pub date: Option<DateInput>,
    pub start_time: Option<String>,
    pub duration: Option<f64>,
    pub zoom_link: Option<String>,
    pub recurring: Option<bool>,
    pub recurring_days: Option<Vec<Weekday>>,
    pub status: Option<SessionStatus>,
    pub attendance: Option<Attendance>,
}

/// Apply `patch` to a copy of `session`.
///
/// Only the one session changes. The end time is re-derived, and clearing
/// `recurring` drops the weekday list and the series id. An empty
/// `zoom_link` removes the link.
///
/// # Errors
///
/// Returns [`crate::ScheduleError::InvalidDate`] or
/// [`crate::ScheduleError::InvalidTime`] when the patched date or start time
/// cannot be read.
pub fn apply_edit(session: &ClassSession, patch: &SessionPatch) -> Result<ClassSession> {
    let mut next = session.clone();

    if let Some(title) = &patch.title {
        next.title = title.clone();
    }
    if let Some(subject) = &patch.subject_id {
        next.subject_id = subject.clone();
    }
    if let Some(tutor) = &patch.tutor_name {
        next.tutor_name = tutor.clone();
    }
    if let Some(student) = &patch.student_name {
        next.student_name = student.clone();
    }
    if let Some(date) = &patch.date {
        next.date = normalize_day(date)?;
    }
    if let Some(start) = &patch.start_time {
        next.start_time = if start.trim().is_empty() {
            String::new()
        } else {
            format_hh_mm(parse_start_time(start)?)
        };
    }
    if let Some(duration) = patch.duration {
        next.duration = if duration.is_finite() { duration } else { 0.0 };
    }
    if let Some(link) = &patch.zoom_link {
        next.zoom_link = Some(link.trim().to_string()).filter(|l| !l.is_empty());
    }
    if let Some(recurring) = patch.recurring {
        next.recurring = recurring;
    }
    if let Some(days) = &patch.recurring_days {
        next.recurring_days = normalize_days(days.iter().copied());
    }
    if !next.recurring {
        next.recurring_days.clear();
        next.series_id = None;
    }
    if let Some(status) = patch.status {
        next.status = status;
    }
    if let Some(attendance) = patch.attendance {
        next.attendance = attendance;
    }

    next.end_time = end_time(&next.start_time, next.duration);
    Ok(next)
}

/// Copy a session as a new one-shot class on the same date.
///
/// The copy is never recurring: the flag, weekday list and series id are
/// cleared. Lifecycle fields start over.
pub fn duplicate(session: &ClassSession, new_id: impl Into<String>) -> ClassSession {
    ClassSession {
        id: new_id.into(),
        recurring: false,
        recurring_days: Vec::new(),
        series_id: None,
        status: SessionStatus::Scheduled,
        attendance: Attendance::Pending,
        end_time: end_time(&session.start_time, session.duration),
        ..session.clone()
    }
}
