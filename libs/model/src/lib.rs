//! # rollcall-model
//!
//! Domain types shared by the rollcall services.
//!
//! ## Design Principles
//!
//! - Attendance data is append-only; nothing here mutates stored entries
//! - Entry status is normalized into a two-value enum at the data boundary
//! - The nested `semester -> subject -> entries` shape is explicit and typed
//! - Malformed stored data is skipped, never fatal
//!
//! ## Modules
//!
//! - [`student_id`]: positional decoding of structured student identifiers
//! - [`attendance`]: entries, per-student records, and student documents
//! - [`stats`]: attendance statistics over an entry sequence
//! - [`change`]: change-feed events and typed feed paths

pub mod attendance;
pub mod change;
mod error;
pub mod stats;
pub mod student_id;

pub use attendance::{AttendanceEntry, AttendanceRecord, AttendanceStatus, StudentDocument};
pub use change::{ChangeEvent, ChangeOperation, EntryPath};
pub use error::ModelError;
pub use stats::Statistics;
pub use student_id::{StudentId, StudentIdentity};
