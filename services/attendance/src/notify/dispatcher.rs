//! Notification dispatcher.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{PushGateway, PushMessage};
use crate::db::UserDirectory;
use crate::feed::EntryObserved;

/// What happened to one observed entry's notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The gateway accepted the message.
    Delivered,
    /// The student has no registered push token.
    NoToken,
    /// The token lookup failed.
    LookupFailed,
    /// The gateway failed or rejected the message.
    DeliveryFailed,
}

/// Resolves recipients and sends "attendance marked" notifications.
///
/// `dispatch` never returns an error; every failure is logged and reported
/// as a [`DeliveryOutcome`] so one bad delivery cannot stop the next.
#[derive(Clone)]
pub struct NotificationDispatcher {
    users: Arc<dyn UserDirectory>,
    gateway: Arc<dyn PushGateway>,
}

impl NotificationDispatcher {
    pub fn new(users: Arc<dyn UserDirectory>, gateway: Arc<dyn PushGateway>) -> Self {
        Self { users, gateway }
    }

    pub async fn dispatch(&self, signal: &EntryObserved) -> DeliveryOutcome {
        let token = match self.users.push_token(&signal.student_id).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!(
                    student_id = %signal.student_id,
                    "No push token registered, skipping notification"
                );
                return DeliveryOutcome::NoToken;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    student_id = %signal.student_id,
                    "Failed to look up push token"
                );
                return DeliveryOutcome::LookupFailed;
            }
        };

        let message = PushMessage::attendance_marked(token, signal);

        match self.gateway.send(&message).await {
            Ok(()) => {
                info!(
                    student_id = %signal.student_id,
                    semester = %signal.semester,
                    subject = %signal.subject,
                    "Attendance notification sent"
                );
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                warn!(
                    error = %e,
                    student_id = %signal.student_id,
                    semester = %signal.semester,
                    subject = %signal.subject,
                    "Failed to deliver attendance notification"
                );
                DeliveryOutcome::DeliveryFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryUsers;
    use crate::notify::PushError;
    use async_trait::async_trait;
    use rollcall_model::{AttendanceEntry, AttendanceStatus, StudentId};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingGateway {
        sent: Mutex<Vec<PushMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl PushGateway for RecordingGateway {
        async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
            self.sent.lock().unwrap().push(message.clone());
            if self.fail {
                return Err(PushError::Rejected("DeviceNotRegistered".to_string()));
            }
            Ok(())
        }
    }

    fn signal(student: &str) -> EntryObserved {
        EntryObserved {
            student_id: StudentId::new(student),
            semester: "3".to_string(),
            subject: "CS101".to_string(),
            index: 0,
            entry: AttendanceEntry {
                teacher: "T".to_string(),
                date: "2024-03-01".to_string(),
                time: "09:00".to_string(),
                status: AttendanceStatus::Present,
            },
        }
    }

    #[tokio::test]
    async fn delivers_to_registered_token() {
        let users = Arc::new(MemoryUsers::with_tokens([("u23cs001", "tok-1")]));
        let gateway = Arc::new(RecordingGateway::default());
        let dispatcher = NotificationDispatcher::new(users, gateway.clone());

        assert_eq!(dispatcher.dispatch(&signal("u23cs001")).await, DeliveryOutcome::Delivered);

        let sent = gateway.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination, "tok-1");
    }

    #[tokio::test]
    async fn missing_token_makes_no_gateway_call() {
        let users = Arc::new(MemoryUsers::new());
        let gateway = Arc::new(RecordingGateway::default());
        let dispatcher = NotificationDispatcher::new(users, gateway.clone());

        assert_eq!(dispatcher.dispatch(&signal("u23cs001")).await, DeliveryOutcome::NoToken);
        assert!(gateway.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookup_failure_is_contained() {
        let users = Arc::new(MemoryUsers::with_tokens([("u23cs001", "tok-1")]));
        users.set_unavailable(true);
        let gateway = Arc::new(RecordingGateway::default());
        let dispatcher = NotificationDispatcher::new(users, gateway.clone());

        assert_eq!(
            dispatcher.dispatch(&signal("u23cs001")).await,
            DeliveryOutcome::LookupFailed
        );
        assert!(gateway.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_does_not_stop_later_deliveries() {
        let users = Arc::new(MemoryUsers::with_tokens([
            ("u23cs001", "tok-1"),
            ("u23cs002", "tok-2"),
        ]));
        let gateway = Arc::new(RecordingGateway {
            fail: true,
            ..Default::default()
        });
        let dispatcher = NotificationDispatcher::new(users, gateway.clone());

        assert_eq!(
            dispatcher.dispatch(&signal("u23cs001")).await,
            DeliveryOutcome::DeliveryFailed
        );
        assert_eq!(
            dispatcher.dispatch(&signal("u23cs002")).await,
            DeliveryOutcome::DeliveryFailed
        );
        assert_eq!(gateway.sent.lock().unwrap().len(), 2);
    }
}
