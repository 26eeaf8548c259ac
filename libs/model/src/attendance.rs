//! Attendance entries and per-student attendance records.
//!
//! A student's record is a nested mapping:
//!
//! ```text
//! attendance
//!   └─ <semester>
//!        └─ <subject>
//!             └─ [entry, entry, ...]   (append order)
//! ```
//!
//! Stored documents are schema-less, so [`AttendanceRecord::from_json`] loads
//! this shape leniently: anything that does not fit is logged and skipped.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::error::ModelError;
use crate::student_id::StudentId;

/// Whether a student attended a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    /// Canonical lowercase form.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, AttendanceStatus::Present)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = ModelError;

    /// Parses a status case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("present") {
            Ok(AttendanceStatus::Present)
        } else if s.eq_ignore_ascii_case("absent") {
            Ok(AttendanceStatus::Absent)
        } else {
            Err(ModelError::InvalidStatus(s.to_string()))
        }
    }
}

impl Serialize for AttendanceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttendanceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One recorded class attendance.
///
/// `date` and `time` are kept as stored; date interpretation happens where
/// entries are filtered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub teacher: String,
    pub date: String,
    pub time: String,
    pub status: AttendanceStatus,
}

impl AttendanceEntry {
    /// Parses a single entry from a stored JSON value.
    pub fn from_json(value: &Value) -> Result<Self, ModelError> {
        if !value.is_object() {
            return Err(ModelError::MalformedEntry(format!(
                "expected an object, got {}",
                json_kind(value)
            )));
        }
        Ok(Self::deserialize(value)?)
    }
}

type SubjectEntries = BTreeMap<String, Vec<AttendanceEntry>>;

/// A student's attendance, keyed by semester then subject code.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttendanceRecord(BTreeMap<String, SubjectEntries>);

impl AttendanceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a record from a stored JSON document, skipping malformed parts.
    pub fn from_json(value: &Value) -> Self {
        let mut record = Self::new();

        let Some(semesters) = value.as_object() else {
            if !value.is_null() {
                warn!(kind = json_kind(value), "Attendance root is not an object, ignoring");
            }
            return record;
        };

        for (semester, subjects_value) in semesters {
            let Some(subjects) = subjects_value.as_object() else {
                warn!(
                    semester = %semester,
                    kind = json_kind(subjects_value),
                    "Semester is not an object, skipping"
                );
                continue;
            };

            for (subject, entries_value) in subjects {
                let Some(raw_entries) = entries_value.as_array() else {
                    warn!(
                        semester = %semester,
                        subject = %subject,
                        kind = json_kind(entries_value),
                        "Subject entries are not a list, skipping"
                    );
                    continue;
                };

                let entries = raw_entries
                    .iter()
                    .enumerate()
                    .filter_map(|(index, raw)| match AttendanceEntry::from_json(raw) {
                        Ok(entry) => Some(entry),
                        Err(e) => {
                            warn!(
                                semester = %semester,
                                subject = %subject,
                                index = index,
                                error = %e,
                                "Skipping malformed attendance entry"
                            );
                            None
                        }
                    })
                    .collect();

                record.insert_entries(semester.clone(), subject.clone(), entries);
            }
        }

        record
    }

    /// Returns the entries for a semester and subject, empty if either level is absent.
    pub fn entries(&self, semester: &str, subject: &str) -> &[AttendanceEntry] {
        self.0
            .get(semester)
            .and_then(|subjects| subjects.get(subject))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns true if the record has any entries under `semester`.
    pub fn has_entries_for(&self, semester: &str) -> bool {
        self.0
            .get(semester)
            .is_some_and(|subjects| subjects.values().any(|entries| !entries.is_empty()))
    }

    /// Iterates over the semester keys.
    pub fn semesters(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Sets the entry list for a semester and subject.
    pub fn insert_entries(
        &mut self,
        semester: impl Into<String>,
        subject: impl Into<String>,
        entries: Vec<AttendanceEntry>,
    ) {
        self.0
            .entry(semester.into())
            .or_default()
            .insert(subject.into(), entries);
    }
}

impl<'de> Deserialize<'de> for AttendanceRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

/// A student's stored attendance document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDocument {
    #[serde(rename = "_id", alias = "id")]
    pub id: StudentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub attendance: AttendanceRecord,
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
