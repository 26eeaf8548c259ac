//! Student identifiers and their positional decoding.
//!
//! Student IDs use a fixed positional layout:
//!
//! ```text
//! [degree:1][year:2][department:2][roll number:rest]
//!   u        23       cs            1042
//! ```
//!
//! Decoding never fails: unmapped degree or department codes resolve to
//! [`UNKNOWN`], and short IDs simply yield shorter segments.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label used for degree or department codes with no mapping.
pub const UNKNOWN: &str = "Unknown";

/// A student identifier, also the key of the student's attendance document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    /// Wraps a raw identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the positional fields of this identifier.
    pub fn decode(&self) -> Option<StudentIdentity> {
        decode(&self.0)
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StudentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for StudentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for StudentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Fields decoded from a [`StudentId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentIdentity {
    pub degree: String,
    pub year: String,
    pub department: String,
    pub roll_number: String,
}

fn degree_name(code: char) -> Option<&'static str> {
    match code.to_ascii_lowercase() {
        'u' => Some("B.Tech"),
        'p' => Some("M.Tech"),
        'i' => Some("Integrated"),
        'm' => Some("MBA"),
        'd' => Some("Ph.D"),
        _ => None,
    }
}

fn department_name(code: &str) -> Option<&'static str> {
    match code {
        "cs" => Some("Computer Science and Engineering"),
        "ai" => Some("Artificial Intelligence"),
        "ec" => Some("Electrical Engineering"),
        "me" => Some("Mechanical Engineering"),
        "ce" => Some("Civil Engineering"),
        _ => None,
    }
}

/// Decodes a raw student identifier.
///
/// Returns `None` for an empty identifier. Positions are counted in
/// characters and clamp at the end of the string.
pub fn decode(id: &str) -> Option<StudentIdentity> {
    let chars: Vec<char> = id.chars().collect();
    let first = *chars.first()?;

    let segment = |start: usize, end: usize| -> String {
        let end = end.min(chars.len());
        let start = start.min(end);
        chars[start..end].iter().collect()
    };

    let department_code = segment(3, 5).to_lowercase();

    Some(StudentIdentity {
        degree: degree_name(first).unwrap_or(UNKNOWN).to_string(),
        year: format!("20{}", segment(1, 3)),
        department: department_name(&department_code)
            .unwrap_or(UNKNOWN)
            .to_string(),
        roll_number: segment(5, chars.len()),
    })
}
