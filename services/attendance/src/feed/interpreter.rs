//! Change event interpretation.
//!
//! Turns raw field-path updates from the change feed into semantic
//! [`EntryObserved`] signals. Each changed path is handled on its own; a bad
//! path is logged and skipped without affecting the rest of the event.

use rollcall_model::{AttendanceEntry, ChangeEvent, ChangeOperation, EntryPath, StudentId};
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::FeedError;

/// A new attendance entry observed on the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryObserved {
    pub student_id: StudentId,
    pub semester: String,
    pub subject: String,
    /// Position of the entry within the subject's list.
    pub index: usize,
    pub entry: AttendanceEntry,
}

/// Picks the newly added element of a replaced subject list.
///
/// Assumes the list only ever grows by appending, so the tail is the newest
/// entry. A reorder or a batch append breaks this assumption.
pub fn latest_appended(entries: &[Value]) -> Option<(usize, &Value)> {
    entries.len().checked_sub(1).map(|index| (index, &entries[index]))
}

/// Interprets every changed path of an event.
pub fn interpret(event: &ChangeEvent) -> Vec<EntryObserved> {
    if event.operation != ChangeOperation::Update {
        debug!(
            student_id = %event.document_key,
            operation = ?event.operation,
            "Ignoring non-update change event"
        );
        return Vec::new();
    }

    event
        .changed_paths
        .iter()
        .filter_map(|(path, value)| {
            let Some(location) = EntryPath::parse(path) else {
                trace!(student_id = %event.document_key, path = %path, "Ignoring unrelated path");
                return None;
            };

            match interpret_path(&event.document_key, location, value) {
                Ok(signal) => signal,
                Err(e) => {
                    warn!(
                        error = %e,
                        student_id = %event.document_key,
                        path = %path,
                        "Skipping uninterpretable change"
                    );
                    None
                }
            }
        })
        .collect()
}

fn interpret_path(
    student_id: &StudentId,
    location: EntryPath,
    value: &Value,
) -> Result<Option<EntryObserved>, FeedError> {
    let (index, raw_entry) = match location.index {
        Some(index) => (index, value),
        None => {
            let Some(entries) = value.as_array() else {
                return Ok(None);
            };
            match latest_appended(entries) {
                Some(found) => found,
                None => return Ok(None),
            }
        }
    };

    let entry = AttendanceEntry::from_json(raw_entry)?;

    Ok(Some(EntryObserved {
        student_id: student_id.clone(),
        semester: location.semester,
        subject: location.subject,
        index,
        entry,
    }))
}
