//! The canonical in-memory class session.
//!
//! Every raw storage row, change-feed payload, and scheduling draft ends up
//! as a [`ClassSession`] before placement or recurrence logic looks at it.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::duration::parse_start_time;

/// Lifecycle state of a session. Informational only: placement never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    /// The source record could not be parsed; the session is a sentinel.
    Error,
}

impl SessionStatus {
    /// Lenient parse of a stored status column. Unknown values map to `Scheduled`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "completed" | "complete" | "done" => SessionStatus::Completed,
            "cancelled" | "canceled" => SessionStatus::Cancelled,
            "error" => SessionStatus::Error,
            _ => SessionStatus::Scheduled,
        }
    }
}

/// Attendance marking for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attendance {
    #[default]
    Pending,
    Present,
    Absent,
}

impl Attendance {
    /// Lenient parse of a stored attendance column. Unknown values map to `Pending`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "present" | "attended" => Attendance::Present,
            "absent" | "no-show" | "no show" => Attendance::Absent,
            _ => Attendance::Pending,
        }
    }
}

/// One scheduled occurrence of a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    pub id: String,
    pub title: String,
    pub subject_id: String,
    pub tutor_name: String,
    pub student_name: String,
    /// Local calendar date, no time-of-day.
    pub date: NaiveDate,
    /// `HH:MM`, 24-hour wall clock. Empty when unknown.
    pub start_time: String,
    /// Always derived from `start_time` + `duration`.
    pub end_time: String,
    /// Fractional hours.
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom_link: Option<String>,
    pub recurring: bool,
    /// Monday-first, no duplicates. Empty unless `recurring`.
    #[serde(default)]
    pub recurring_days: Vec<Weekday>,
    /// Shared by every occurrence of one recurring series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(default)]
    pub class_cost: f64,
    #[serde(default)]
    pub tutor_cost: f64,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub attendance: Attendance,
}

impl ClassSession {
    /// Parsed start time, if the session has a usable one.
    pub fn start(&self) -> Option<NaiveTime> {
        parse_start_time(&self.start_time).ok()
    }

    /// True for sentinel sessions produced from unreadable records.
    pub fn is_error(&self) -> bool {
        self.status == SessionStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_lenient() {
        assert_eq!(SessionStatus::parse("Completed"), SessionStatus::Completed);
        assert_eq!(SessionStatus::parse(" canceled "), SessionStatus::Cancelled);
        assert_eq!(SessionStatus::parse("ERROR"), SessionStatus::Error);
        assert_eq!(SessionStatus::parse("whatever"), SessionStatus::Scheduled);
        assert_eq!(SessionStatus::parse(""), SessionStatus::Scheduled);
    }

    #[test]
    fn test_attendance_parse_is_lenient() {
        assert_eq!(Attendance::parse("Present"), Attendance::Present);
        assert_eq!(Attendance::parse("no-show"), Attendance::Absent);
        assert_eq!(Attendance::parse(""), Attendance::Pending);
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let session = ClassSession {
            id: "s1".to_string(),
            title: "Algebra".to_string(),
            subject_id: "7".to_string(),
            tutor_name: "Tutor".to_string(),
            student_name: "Student".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            start_time: "14:00".to_string(),
            end_time: "15:30".to_string(),
            duration: 1.5,
            zoom_link: None,
            recurring: true,
            recurring_days: vec![Weekday::Tue],
            series_id: None,
            class_cost: 0.0,
            tutor_cost: 0.0,
            status: SessionStatus::Scheduled,
            attendance: Attendance::Pending,
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["startTime"], "14:00");
        assert_eq!(json["date"], "2025-06-10");
        assert_eq!(json["status"], "scheduled");
        assert!(json.get("zoomLink").is_none());
        assert_eq!(session.start(), NaiveTime::from_hms_opt(14, 0, 0));
    }
}
