//! Change-feed events emitted by the attendance store.
//!
//! A [`ChangeEvent`] describes one atomic mutation of a student document as a
//! set of dotted field paths and their new values. Paths under the
//! `attendance` field are parsed into a typed [`EntryPath`] before anything
//! branches on their shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::student_id::StudentId;

/// Top-level document field holding the attendance record.
pub const ATTENDANCE_FIELD: &str = "attendance";

/// Kind of mutation carried by a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    Insert,
    #[default]
    Update,
    Replace,
    Delete,
}

/// One mutation observed on the attendance store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// The mutated student document.
    pub document_key: StudentId,

    #[serde(default)]
    pub operation: ChangeOperation,

    /// Dotted field path to new value.
    #[serde(default)]
    pub changed_paths: Map<String, Value>,
}

impl ChangeEvent {
    /// Builds an update event from `(path, value)` pairs.
    pub fn update<I, K>(document_key: impl Into<StudentId>, paths: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            document_key: document_key.into(),
            operation: ChangeOperation::Update,
            changed_paths: paths.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Location of a change inside an attendance record.
///
/// `attendance.<semester>.<subject>` addresses a subject's whole entry list;
/// `attendance.<semester>.<subject>.<index>` addresses a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPath {
    pub semester: String,
    pub subject: String,
    pub index: Option<usize>,
}

impl EntryPath {
    /// Parses a dotted feed path. Returns `None` for any other shape.
    pub fn parse(path: &str) -> Option<Self> {
        let mut segments = path.split('.');
        if segments.next()? != ATTENDANCE_FIELD {
            return None;
        }

        let rest: Vec<&str> = segments.collect();
        if rest.iter().any(|segment| segment.is_empty()) {
            return None;
        }

        match rest.as_slice() {
            [semester, subject] => Some(Self {
                semester: semester.to_string(),
                subject: subject.to_string(),
                index: None,
            }),
            [semester, subject, index] => {
                if !index.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                Some(Self {
                    semester: semester.to_string(),
                    subject: subject.to_string(),
                    index: Some(index.parse().ok()?),
                })
            }
            _ => None,
        }
    }
}
