//! Change feed consumption.
//!
//! The attendance store publishes a single ordered stream of mutations. The
//! [`ChangeFeedWorker`] consumes it sequentially, the [`interpreter`] turns
//! each mutation into zero or more [`EntryObserved`] signals, and every signal
//! is handed to the notification dispatcher without waiting for delivery.

pub mod interpreter;
pub mod worker;

pub use interpreter::{interpret, latest_appended, EntryObserved};
pub use worker::{ChangeFeedWorker, FeedWorkerConfig};

use rollcall_model::ModelError;

/// Errors interpreting a single changed path.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("invalid attendance entry: {0}")]
    InvalidEntry(#[from] ModelError),
}
