//! Merging realtime change-feed payloads into a session snapshot.
//!
//! Delivery belongs to the realtime layer. This module only takes a payload
//! that has already arrived, runs it through the mapper, and applies it to
//! the caller's list.

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::mapper::{readable_id, RecordMapper};
use crate::session::ClassSession;

/// One realtime notification, in either row layout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "eventType", rename_all = "UPPERCASE")]
pub enum ChangeEvent {
    Insert {
        new: Value,
    },
    Update {
        new: Value,
        #[serde(default)]
        old: Value,
    },
    Delete {
        old: Value,
    },
}

/// What [`apply_change`] did to the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    Inserted(String),
    Replaced(String),
    Removed(String),
    Ignored,
}

/// Apply one change to `sessions` using the built-in row layouts.
///
/// Inserts append (or replace a session with the same id), updates replace
/// by id (or append when the id is unknown), deletes remove by the old row's
/// id. Unreadable rows are merged as sentinels, like any other mapped row.
pub fn apply_change(
    sessions: &mut Vec<ClassSession>,
    change: &ChangeEvent,
    now: NaiveDateTime,
) -> ChangeOutcome {
    apply_change_with(&RecordMapper::default(), sessions, change, now)
}

/// [`apply_change`] with a caller-supplied mapper.
pub fn apply_change_with(
    mapper: &RecordMapper,
    sessions: &mut Vec<ClassSession>,
    change: &ChangeEvent,
    now: NaiveDateTime,
) -> ChangeOutcome {
    match change {
        ChangeEvent::Insert { new } | ChangeEvent::Update { new, .. } => {
            let session = mapper.map(new, now);
            let id = session.id.clone();
            match sessions.iter_mut().find(|s| s.id == id) {
                Some(existing) => {
                    debug!(id = %id, "feed replaced session");
                    *existing = session;
                    ChangeOutcome::Replaced(id)
                }
                None => {
                    debug!(id = %id, "feed inserted session");
                    sessions.push(session);
                    ChangeOutcome::Inserted(id)
                }
            }
        }
        ChangeEvent::Delete { old } => {
            let Some(id) = old.as_object().and_then(readable_id) else {
                warn!("feed delete without a readable id, ignoring");
                return ChangeOutcome::Ignored;
            };
            let before = sessions.len();
            sessions.retain(|s| s.id != id);
            if sessions.len() == before {
                debug!(id = %id, "feed delete for unknown session");
                ChangeOutcome::Ignored
            } else {
                ChangeOutcome::Removed(id)
            }
        }
    }
}
