//! Push notifications for newly observed attendance entries.
//!
//! The [`NotificationDispatcher`] resolves a student's push token and hands a
//! [`PushMessage`] to a [`PushGateway`]. Delivery is fire-and-forget: failures
//! are logged and never propagated, and nothing is retried or deduplicated.

mod dispatcher;
mod expo;

pub use dispatcher::{DeliveryOutcome, NotificationDispatcher};
pub use expo::{ExpoPushClient, ExpoPushConfig, DEFAULT_EXPO_PUSH_URL};

use async_trait::async_trait;
use serde::Serialize;

use crate::feed::EntryObserved;

/// Errors from a push gateway.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("push transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("push gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("push gateway rejected message: {0}")]
    Rejected(String),
}

/// Routing metadata attached to a push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMetadata {
    pub subject: String,
    pub semester: String,
}

/// A message for one device, in the push gateway's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    #[serde(rename = "to")]
    pub destination: String,
    pub sound: String,
    pub title: String,
    pub body: String,
    #[serde(rename = "data")]
    pub metadata: PushMetadata,
}

impl PushMessage {
    /// Builds the "attendance marked" notification for an observed entry.
    pub fn attendance_marked(token: impl Into<String>, signal: &EntryObserved) -> Self {
        let entry = &signal.entry;
        Self {
            destination: token.into(),
            sound: "default".to_string(),
            title: format!("Attendance Marked - {}", signal.subject),
            body: format!(
                "You were marked {} on {} at {} by {}.",
                entry.status.as_str().to_uppercase(),
                entry.date,
                entry.time,
                entry.teacher
            ),
            metadata: PushMetadata {
                subject: signal.subject.clone(),
                semester: signal.semester.clone(),
            },
        }
    }
}

/// Delivers messages to a third-party push service.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError>;
}
