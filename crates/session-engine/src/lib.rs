//! # session-engine
//!
//! Scheduling core for a tutoring marketplace.
//!
//! The session engine decides which class sessions appear on a calendar day,
//! which fall in the rolling "upcoming" window, how end times and durations
//! are reconciled, and which occurrences a recurring delete touches. All
//! functions are pure: the caller passes "today" or "now" explicitly and
//! re-runs them on each new snapshot of the session list.
//!
//! ## Modules
//!
//! - [`normalize`] — Heterogeneous date strings → local calendar dates, no timezone shifts
//! - [`duration`] — End time from start + fractional hours, defensive number parsing
//! - [`placement`] — Day view, upcoming window, month markers
//! - [`recurrence`] — One-shot vs. recurring, scheduling, edit/duplicate/delete scope
//! - [`mapper`] — Legacy and snake_case storage rows → [`ClassSession`]
//! - [`feed`] — Apply realtime insert/update/delete payloads to a snapshot
//! - [`session`] — The canonical session type
//! - [`error`] — Error types

pub mod duration;
pub mod error;
pub mod feed;
pub mod mapper;
pub mod normalize;
pub mod placement;
pub mod recurrence;
pub mod session;

pub use duration::{duration_between, end_time, parse_duration, parse_number, parse_start_time};
pub use error::ScheduleError;
pub use feed::{apply_change, ChangeEvent, ChangeOutcome};
pub use mapper::{
    to_class_event, to_class_events, to_storage_record, RecordAdapter, RecordMapper,
    StorageRecord, ERROR_PLACEHOLDER,
};
pub use normalize::{
    normalize, normalize_day, normalize_or, parse_date_str, same_local_day, DateInput, LocalDay,
};
pub use placement::{
    has_session_on_date, month_markers, sessions_between, sessions_on_date, upcoming_sessions,
    DEFAULT_UPCOMING_DAYS,
};
pub use recurrence::{
    apply_edit, classify, delete_targets, duplicate, remove_sessions, schedule, ClassDraft,
    DeleteScope, Recurrence, SessionPatch,
};
pub use session::{Attendance, ClassSession, SessionStatus};
