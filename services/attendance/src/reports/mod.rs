//! Attendance reports.
//!
//! The [`ReportService`] selects students from the attendance store, narrows
//! each student's entries for one semester and subject to a date window, and
//! returns one [`ReportRow`] per student with decoded identity fields and
//! statistics. Rows come back in store order.
//!
//! Reports are read-only snapshots taken at query time.

pub mod dates;

use std::sync::Arc;

use chrono::NaiveDate;
use rollcall_model::{AttendanceEntry, Statistics, StudentDocument, StudentId, StudentIdentity};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::db::{AttendanceStore, DbError, StudentQuery};
use dates::parse_calendar_date;

/// Name shown for students without one on record.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Errors from report generation.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The selection criteria are missing or invalid.
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The requested student does not exist.
    #[error("student not found: {0}")]
    NotFound(StudentId),

    /// The store failed while serving the request.
    #[error("store error: {0}")]
    Store(#[from] DbError),
}

impl ReportError {
    fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ReportError::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Selection criteria for a multi-student report, as received from callers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCriteria {
    pub subject: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub student_ids: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_optional_key")]
    pub semester: Option<String>,
    /// Accepted for compatibility with existing clients; does not narrow the selection.
    pub division: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyScalar {
    Text(String),
    Number(serde_json::Number),
}

/// Reads an optional record key sent either as a string or as a bare number
/// (`"semester": 3` and `"semester": "3"` address the same key).
pub fn deserialize_optional_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<KeyScalar>::deserialize(deserializer)?.map(|key| match key {
            KeyScalar::Text(text) => text,
            KeyScalar::Number(number) => number.to_string(),
        }),
    )
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug)]
struct ValidatedCriteria {
    subject: String,
    window: DateWindow,
    semester: Option<String>,
    selection: StudentQuery,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ReportCriteria {
    fn validate(&self) -> Result<ValidatedCriteria, ReportError> {
        let subject = non_blank(&self.subject)
            .ok_or_else(|| ReportError::validation("subject", "Subject code is required"))?;

        let (Some(start_raw), Some(end_raw)) = (non_blank(&self.start_date), non_blank(&self.end_date))
        else {
            let field = if non_blank(&self.start_date).is_none() {
                "startDate"
            } else {
                "endDate"
            };
            return Err(ReportError::validation(field, "Date range is required"));
        };

        let start = parse_calendar_date(start_raw).ok_or_else(|| {
            ReportError::validation("startDate", format!("Invalid start date: {start_raw}"))
        })?;
        let end = parse_calendar_date(end_raw).ok_or_else(|| {
            ReportError::validation("endDate", format!("Invalid end date: {end_raw}"))
        })?;

        let semester = non_blank(&self.semester).map(str::to_string);
        let student_ids: Vec<StudentId> = self
            .student_ids
            .iter()
            .flatten()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(StudentId::from)
            .collect();

        let selection = if !student_ids.is_empty() {
            StudentQuery::ByIds(student_ids)
        } else if let Some(semester) = &semester {
            StudentQuery::HavingSemester(semester.clone())
        } else {
            return Err(ReportError::validation(
                "studentIds",
                "Either student IDs or semester must be provided",
            ));
        };

        Ok(ValidatedCriteria {
            subject: subject.to_string(),
            window: DateWindow { start, end },
            semester,
            selection,
        })
    }
}

/// One student's line in a report. Field names are part of the wire contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub student_id: StudentId,
    pub name: String,
    #[serde(flatten)]
    pub identity: Option<StudentIdentity>,
    pub attendance_records: Vec<AttendanceEntry>,
    pub statistics: Statistics,
}

impl ReportRow {
    fn new(document: StudentDocument, records: Vec<AttendanceEntry>) -> Self {
        let statistics = Statistics::from_entries(&records);
        Self {
            identity: document.id.decode(),
            student_id: document.id,
            name: document.name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            attendance_records: records,
            statistics,
        }
    }
}

/// Keeps entries dated inside `window`, dropping entries with unreadable dates.
pub fn entries_in_window(
    student_id: &StudentId,
    entries: &[AttendanceEntry],
    window: DateWindow,
) -> Vec<AttendanceEntry> {
    entries
        .iter()
        .filter(|entry| match parse_calendar_date(&entry.date) {
            Some(date) => window.contains(date),
            None => {
                warn!(
                    student_id = %student_id,
                    date = %entry.date,
                    "Skipping attendance entry with unparsable date"
                );
                false
            }
        })
        .cloned()
        .collect()
}

/// Builds attendance reports from the attendance store.
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn AttendanceStore>,
}

impl ReportService {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }

    /// Report for every selected student over a date window.
    pub async fn report(&self, criteria: &ReportCriteria) -> Result<Vec<ReportRow>, ReportError> {
        let criteria = criteria.validate()?;
        debug!(selection = ?criteria.selection, "Running attendance report");

        let students = self.store.query(&criteria.selection).await?;
        info!(
            count = students.len(),
            subject = %criteria.subject,
            start = %criteria.window.start,
            end = %criteria.window.end,
            "Found students matching report criteria"
        );

        let rows = students
            .into_iter()
            .map(|document| {
                let entries: &[AttendanceEntry] = match criteria.semester.as_deref() {
                    Some(semester) => document.attendance.entries(semester, &criteria.subject),
                    None => &[],
                };
                let records = entries_in_window(&document.id, entries, criteria.window);
                debug!(
                    student_id = %document.id,
                    raw = entries.len(),
                    kept = records.len(),
                    "Filtered attendance entries"
                );
                ReportRow::new(document, records)
            })
            .collect();

        Ok(rows)
    }

    /// Report for one student's full history in a semester and subject.
    pub async fn student_report(
        &self,
        student_id: &str,
        semester: &str,
        subject: &str,
    ) -> Result<ReportRow, ReportError> {
        let student_id = student_id.trim();
        let semester = semester.trim();
        let subject = subject.trim();
        if student_id.is_empty() || semester.is_empty() || subject.is_empty() {
            let field = if student_id.is_empty() {
                "studentId"
            } else if semester.is_empty() {
                "semester"
            } else {
                "subject"
            };
            return Err(ReportError::validation(
                field,
                "Student ID, semester and subject are required",
            ));
        }

        let student_id = StudentId::new(student_id);
        let document = self
            .store
            .find_by_id(&student_id)
            .await?
            .ok_or_else(|| ReportError::NotFound(student_id.clone()))?;

        let records = document.attendance.entries(semester, subject).to_vec();
        debug!(
            student_id = %student_id,
            semester = %semester,
            subject = %subject,
            count = records.len(),
            "Loaded student attendance"
        );

        Ok(ReportRow::new(document, records))
    }
}
