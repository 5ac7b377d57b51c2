//! Storage rows to canonical sessions.
//!
//! Two row layouts exist in storage: the legacy sheet-import columns
//! (`"Class Number"`, `"Tutor Name"`, `"Time (hrs)"`, ...) and the snake_case
//! columns (`class_number`, `tutor_name`, `time_hrs`, ...). Each layout is one
//! [`RecordAdapter`]; the first adapter whose sniff keys appear in a row wins.
//!
//! Mapping is total. A row that cannot be read becomes a sentinel session
//! with `"Error Loading"` placeholders and [`SessionStatus::Error`], so one
//! bad row never takes a list view down with it.

use chrono::{NaiveDateTime, Weekday};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::duration::{
    duration_between, end_time, format_hh_mm, parse_duration, parse_number, parse_start_time,
};
use crate::error::{Result, ScheduleError};
use crate::normalize::{format_date, normalize_day, DateInput};
use crate::recurrence::{normalize_days, parse_weekday};
use crate::session::{Attendance, ClassSession, SessionStatus};

/// Placeholder text for fields of an unreadable row.
pub const ERROR_PLACEHOLDER: &str = "Error Loading";

/// A storage row, as delivered by the query or change-feed layer.
pub type StorageRecord = Map<String, Value>;

/// Translates one row layout into a [`ClassSession`].
pub trait RecordAdapter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether `raw` looks like this adapter's layout.
    fn matches(&self, raw: &StorageRecord) -> bool;

    /// Read `raw` into a session.
    ///
    /// # Errors
    ///
    /// Any field that cannot be read fails the whole row.
    fn adapt(&self, raw: &StorageRecord) -> Result<ClassSession>;
}

/// Column names for one row layout. Each field lists candidates in priority order.
#[derive(Debug, Clone, Copy)]
pub struct ColumnLayout {
    pub name: &'static str,
    pub sniff: &'static [&'static str],
    pub id: &'static [&'static str],
    pub title: &'static [&'static str],
    pub class_number: &'static [&'static str],
    pub subject: &'static [&'static str],
    pub tutor: &'static [&'static str],
    pub student: &'static [&'static str],
    pub date: &'static [&'static str],
    pub start_time: &'static [&'static str],
    pub end_time: &'static [&'static str],
    pub duration: &'static [&'static str],
    pub class_cost: &'static [&'static str],
    pub tutor_cost: &'static [&'static str],
    pub zoom_link: &'static [&'static str],
    pub recurring: &'static [&'static str],
    pub recurring_days: &'static [&'static str],
    pub series_id: &'static [&'static str],
    pub status: &'static [&'static str],
    pub attendance: &'static [&'static str],
}

/// Capitalized free-text columns from the original sheet import.
pub const LEGACY_LAYOUT: ColumnLayout = ColumnLayout {
    name: "legacy",
    sniff: &["Class Number", "Tutor Name", "Student Name", "Time (hrs)", "Date"],
    id: &["id", "ID", "Class ID"],
    title: &["Title", "Class Title", "Class Name"],
    class_number: &["Class Number"],
    subject: &["Subject ID", "Subject"],
    tutor: &["Tutor Name"],
    student: &["Student Name"],
    date: &["Date", "Class Date"],
    start_time: &["Start Time"],
    end_time: &["End Time"],
    duration: &["Time (hrs)"],
    class_cost: &["Class Cost"],
    tutor_cost: &["Tutor Cost"],
    zoom_link: &["Zoom Link"],
    recurring: &["Recurring", "Is Recurring"],
    recurring_days: &["Recurring Days"],
    series_id: &["Series ID"],
    status: &["Status"],
    attendance: &["Attendance"],
};

/// snake_case columns of the current schema.
pub const SNAKE_LAYOUT: ColumnLayout = ColumnLayout {
    name: "snake_case",
    sniff: &["class_number", "tutor_name", "student_name", "time_hrs", "date", "start_time"],
    id: &["id"],
    title: &["title", "class_title", "class_name"],
    class_number: &["class_number"],
    subject: &["subject_id", "subject"],
    tutor: &["tutor_name"],
    student: &["student_name"],
    date: &["date", "class_date"],
    start_time: &["start_time"],
    end_time: &["end_time"],
    duration: &["time_hrs", "duration"],
    class_cost: &["class_cost"],
    tutor_cost: &["tutor_cost"],
    zoom_link: &["zoom_link"],
    recurring: &["is_recurring", "recurring"],
    recurring_days: &["recurring_days"],
    series_id: &["series_id"],
    status: &["status"],
    attendance: &["attendance"],
};

/// The built-in layouts, tried in order.
pub const BUILTIN_LAYOUTS: &[ColumnLayout] = &[LEGACY_LAYOUT, SNAKE_LAYOUT];

impl RecordAdapter for ColumnLayout {
    fn name(&self) -> &'static str {
        self.name
    }

    fn matches(&self, raw: &StorageRecord) -> bool {
        self.sniff.iter().any(|key| raw.contains_key(*key))
    }

    fn adapt(&self, raw: &StorageRecord) -> Result<ClassSession> {
        let id = lookup(raw, self.id)
            .and_then(scalar_text)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ScheduleError::InvalidRecord("missing id".to_string()))?;

        let date_value = lookup(raw, self.date)
            .ok_or_else(|| ScheduleError::InvalidDate("missing date".to_string()))?;
        let date_text = scalar_text(date_value)
            .ok_or_else(|| ScheduleError::InvalidDate(format!("not a date value: {date_value}")))?;
        let date = normalize_day(&DateInput::Text(date_text))?;

        let start_time = match lookup(raw, self.start_time).and_then(scalar_text) {
            Some(s) if !s.trim().is_empty() => format_hh_mm(parse_start_time(&s)?),
            _ => String::new(),
        };

        let mut duration = lookup(raw, self.duration).map(parse_duration).unwrap_or(0.0);
        if duration <= 0.0 {
            // Rows that kept only an end time still carry a recoverable duration.
            if let Some(stored_end) = lookup(raw, self.end_time).and_then(scalar_text) {
                duration = duration_between(&start_time, &stored_end).unwrap_or(0.0);
            }
        }

        let class_number = lookup(raw, self.class_number).and_then(scalar_text);
        let subject_id = lookup(raw, self.subject).and_then(scalar_text).unwrap_or_default();
        let title = lookup(raw, self.title)
            .and_then(scalar_text)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| class_number.map(|n| format!("Class {n}")))
            .unwrap_or_else(|| subject_id.clone());

        let recurring = lookup(raw, self.recurring).map(parse_flag).unwrap_or(false);
        let recurring_days = if recurring {
            lookup(raw, self.recurring_days)
                .map(parse_days)
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        Ok(ClassSession {
            id,
            title,
            subject_id,
            tutor_name: text_or_empty(raw, self.tutor),
            student_name: text_or_empty(raw, self.student),
            date,
            end_time: end_time(&start_time, duration),
            start_time,
            duration,
            zoom_link: lookup(raw, self.zoom_link)
                .and_then(scalar_text)
                .filter(|s| !s.trim().is_empty()),
            recurring,
            recurring_days,
            series_id: lookup(raw, self.series_id)
                .and_then(scalar_text)
                .filter(|s| !s.is_empty()),
            class_cost: lookup(raw, self.class_cost).map(parse_number).unwrap_or(0.0),
            tutor_cost: lookup(raw, self.tutor_cost).map(parse_number).unwrap_or(0.0),
            status: lookup(raw, self.status)
                .and_then(scalar_text)
                .map(|s| SessionStatus::parse(&s))
                .unwrap_or_default(),
            attendance: lookup(raw, self.attendance)
                .and_then(scalar_text)
                .map(|s| Attendance::parse(&s))
                .unwrap_or_default(),
        })
    }
}

// ── Mapper ──────────────────────────────────────────────────────────────────

/// A set of adapters tried in order.
pub struct RecordMapper {
    adapters: Vec<Box<dyn RecordAdapter>>,
}

impl Default for RecordMapper {
    fn default() -> Self {
        Self {
            adapters: BUILTIN_LAYOUTS
                .iter()
                .map(|layout| Box::new(*layout) as Box<dyn RecordAdapter>)
                .collect(),
        }
    }
}

impl RecordMapper {
    /// A mapper with no adapters; every row becomes a sentinel until one is added.
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Append an adapter. Earlier adapters win when several match.
    pub fn with_adapter(mut self, adapter: impl RecordAdapter + 'static) -> Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    /// Map one raw row. Never fails; see [`to_class_event`].
    pub fn map(&self, raw: &Value, now: NaiveDateTime) -> ClassSession {
        let result = raw
            .as_object()
            .ok_or_else(|| ScheduleError::InvalidRecord("row is not an object".to_string()))
            .and_then(|record| {
                let adapter = self
                    .adapters
                    .iter()
                    .find(|a| a.matches(record))
                    .ok_or_else(|| {
                        ScheduleError::InvalidRecord("unrecognized row layout".to_string())
                    })?;
                debug!(adapter = adapter.name(), "mapping storage row");
                adapter.adapt(record)
            });

        match result {
            Ok(session) => session,
            Err(e) => {
                let id = raw.as_object().and_then(readable_id);
                warn!(
                    error = %e,
                    id = id.as_deref().unwrap_or("<none>"),
                    "storage row could not be mapped, using sentinel dated now"
                );
                sentinel(id, now)
            }
        }
    }

    /// Map a whole result set, preserving order.
    pub fn map_all<'a>(
        &self,
        rows: impl IntoIterator<Item = &'a Value>,
        now: NaiveDateTime,
    ) -> Vec<ClassSession> {
        rows.into_iter().map(|row| self.map(row, now)).collect()
    }
}

/// Map one raw row with the built-in layouts.
///
/// Total: an unreadable row comes back as a sentinel with
/// [`SessionStatus::Error`], dated on `now`'s calendar day.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use serde_json::json;
/// use session_engine::mapper::to_class_event;
///
/// let now = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let row = json!({"id": "7", "date": "2025-06-10", "start_time": "14:00", "time_hrs": "1.5"});
/// let session = to_class_event(&row, now);
/// assert_eq!(session.end_time, "15:30");
/// ```
pub fn to_class_event(raw: &Value, now: NaiveDateTime) -> ClassSession {
    RecordMapper::default().map(raw, now)
}

/// Map a whole result set with the built-in layouts.
pub fn to_class_events(rows: &[Value], now: NaiveDateTime) -> Vec<ClassSession> {
    RecordMapper::default().map_all(rows, now)
}

/// The snake_case row to persist for `session`.
///
/// The date is written as `yyyy-MM-dd` and the end time is re-derived.
pub fn to_storage_record(session: &ClassSession) -> Value {
    let days: Vec<String> = session
        .recurring_days
        .iter()
        .map(|d| weekday_name(*d).to_string())
        .collect();
    json!({
        "id": session.id,
        "title": session.title,
        "subject_id": session.subject_id,
        "tutor_name": session.tutor_name,
        "student_name": session.student_name,
        "date": format_date(session.date),
        "start_time": session.start_time,
        "end_time": end_time(&session.start_time, session.duration),
        "time_hrs": session.duration,
        "class_cost": session.class_cost,
        "tutor_cost": session.tutor_cost,
        "zoom_link": session.zoom_link,
        "is_recurring": session.recurring,
        "recurring_days": days,
        "series_id": session.series_id,
        "status": session.status,
        "attendance": session.attendance,
    })
}

/// Best-effort id of a raw row, whatever its layout.
pub(crate) fn readable_id(raw: &StorageRecord) -> Option<String> {
    BUILTIN_LAYOUTS
        .iter()
        .find_map(|layout| lookup(raw, layout.id).and_then(scalar_text))
        .filter(|s| !s.is_empty())
}

fn sentinel(id: Option<String>, now: NaiveDateTime) -> ClassSession {
    ClassSession {
        id: id.unwrap_or_else(|| format!("error-{}", Uuid::new_v4())),
        title: ERROR_PLACEHOLDER.to_string(),
        subject_id: String::new(),
        tutor_name: ERROR_PLACEHOLDER.to_string(),
        student_name: ERROR_PLACEHOLDER.to_string(),
        date: now.date(),
        start_time: String::new(),
        end_time: String::new(),
        duration: 0.0,
        zoom_link: None,
        recurring: false,
        recurring_days: Vec::new(),
        series_id: None,
        class_cost: 0.0,
        tutor_cost: 0.0,
        status: SessionStatus::Error,
        attendance: Attendance::Pending,
    }
}

// ── Field helpers ───────────────────────────────────────────────────────────

/// First non-null value among `keys`.
fn lookup<'a>(raw: &'a StorageRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|v| !v.is_null())
}

/// Strings and numbers as text; anything else is not a scalar.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_or_empty(raw: &StorageRecord, keys: &[&str]) -> String {
    lookup(raw, keys).and_then(scalar_text).unwrap_or_default()
}

fn parse_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        ),
        _ => false,
    }
}

/// Weekday list from a JSON array, a comma list, or a Postgres array literal.
fn parse_days(value: &Value) -> Vec<Weekday> {
    let names: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        Value::String(s) => s
            .split(|c: char| c == ',' || c == '{' || c == '}' || c == '[' || c == ']' || c == '"')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    };

    let days = names.iter().filter_map(|name| {
        let day = parse_weekday(name);
        if day.is_none() {
            debug!(name = %name, "skipping unknown weekday name");
        }
        day
    });
    normalize_days(days)
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
