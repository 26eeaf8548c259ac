//! Attendance statistics over a sequence of entries.

use serde::{Deserialize, Serialize};

use crate::attendance::AttendanceEntry;

/// Summary counts for a set of attendance entries.
///
/// `absent` is always `total_classes - present`, and `percentage` is the
/// present ratio rounded to two decimals (0 when there are no classes).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_classes: usize,
    pub present: usize,
    pub absent: usize,
    pub percentage: f64,
}

impl Statistics {
    /// Computes statistics for the given entries.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a AttendanceEntry>,
    {
        let (total_classes, present) = entries
            .into_iter()
            .fold((0usize, 0usize), |(total, present), entry| {
                (total + 1, present + usize::from(entry.status.is_present()))
            });

        Self::from_counts(total_classes, present)
    }

    fn from_counts(total_classes: usize, present: usize) -> Self {
        let percentage = if total_classes == 0 {
            0.0
        } else {
            round_to_hundredths(present as f64 / total_classes as f64 * 100.0)
        };

        Self {
            total_classes,
            present,
            absent: total_classes - present,
            percentage,
        }
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
