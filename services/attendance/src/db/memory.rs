//! In-memory attendance store and user directory.
//!
//! Used by tests and local runs without Postgres. The change feed is a
//! single-consumer channel: events handed to [`MemoryStore::publish`] are
//! delivered in order to whoever subscribed first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::StreamExt;
use rollcall_model::{ChangeEvent, StudentDocument, StudentId};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{AttendanceStore, ChangeFeed, DbError, StudentQuery, UserDirectory};

/// Attendance store held in memory, in insertion order.
pub struct MemoryStore {
    students: RwLock<Vec<StudentDocument>>,
    feed_tx: mpsc::UnboundedSender<ChangeEvent>,
    feed_rx: Mutex<Option<mpsc::UnboundedReceiver<ChangeEvent>>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_students(Vec::new())
    }

    pub fn with_students(students: Vec<StudentDocument>) -> Self {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        Self {
            students: RwLock::new(students),
            feed_tx,
            feed_rx: Mutex::new(Some(feed_rx)),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Insert a document, replacing any existing one with the same id.
    pub async fn upsert(&self, document: StudentDocument) {
        let mut students = self.students.write().await;
        match students.iter_mut().find(|doc| doc.id == document.id) {
            Some(existing) => *existing = document,
            None => students.push(document),
        }
    }

    /// Push an event onto the change feed.
    pub fn publish(&self, event: ChangeEvent) -> Result<(), DbError> {
        self.feed_tx
            .send(event)
            .map_err(|_| DbError::Feed("change feed closed".to_string()))
    }

    /// Make every read fail, simulating an unreachable store.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("memory store marked unavailable".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn query(&self, query: &StudentQuery) -> Result<Vec<StudentDocument>, DbError> {
        self.check_available()?;
        let students = self.students.read().await;

        let matches = students
            .iter()
            .filter(|doc| match query {
                StudentQuery::ByIds(ids) => ids.contains(&doc.id),
                StudentQuery::HavingSemester(semester) => doc.attendance.has_entries_for(semester),
            })
            .cloned()
            .collect();

        Ok(matches)
    }

    async fn find_by_id(&self, id: &StudentId) -> Result<Option<StudentDocument>, DbError> {
        self.check_available()?;
        let students = self.students.read().await;
        Ok(students.iter().find(|doc| &doc.id == id).cloned())
    }

    async fn subscribe(&self) -> Result<ChangeFeed, DbError> {
        let receiver = self
            .feed_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| DbError::Feed("change feed already has a subscriber".to_string()))?;

        Ok(UnboundedReceiverStream::new(receiver).map(Ok).boxed())
    }

    async fn health_check(&self) -> Result<(), DbError> {
        self.check_available()
    }
}

/// Push token registry held in memory.
#[derive(Default)]
pub struct MemoryUsers {
    tokens: RwLock<HashMap<StudentId, String>>,
    unavailable: AtomicBool,
}

impl MemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry with `(user, token)` pairs.
    pub fn with_tokens<I, K, V>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<StudentId>,
        V: Into<String>,
    {
        Self {
            tokens: RwLock::new(
                tokens
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every lookup fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserDirectory for MemoryUsers {
    async fn push_token(&self, user_id: &StudentId) -> Result<Option<String>, DbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("user directory marked unavailable".to_string()));
        }
        Ok(self.tokens.read().await.get(user_id).cloned())
    }

    async fn save_push_token(&self, user_id: &StudentId, token: &str) -> Result<(), DbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("user directory marked unavailable".to_string()));
        }
        self.tokens
            .write()
            .await
            .insert(user_id.clone(), token.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_model::AttendanceRecord;
    use serde_json::json;

    fn student(id: &str, attendance: serde_json::Value) -> StudentDocument {
        StudentDocument {
            id: StudentId::new(id),
            name: None,
            attendance: AttendanceRecord::from_json(&attendance),
        }
    }

    #[tokio::test]
    async fn query_by_semester_requires_entries() {
        let entry = json!({"teacher": "T", "date": "2024-01-01", "time": "09:00", "status": "present"});
        let store = MemoryStore::with_students(vec![
            student("u23cs001", json!({"3": {"CS101": [entry]}})),
            student("u23cs002", json!({"3": {"CS101": []}})),
            student("u23cs003", json!({"4": {"CS101": [entry]}})),
        ]);

        let docs = store
            .query(&StudentQuery::HavingSemester("3".to_string()))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id.as_str(), "u23cs001");
    }

    #[tokio::test]
    async fn feed_allows_a_single_subscriber() {
        let store = MemoryStore::new();
        assert!(store.subscribe().await.is_ok());
        assert!(matches!(store.subscribe().await, Err(DbError::Feed(_))));
    }

    #[tokio::test]
    async fn published_events_arrive_in_order() {
        let store = MemoryStore::new();
        let mut feed = store.subscribe().await.unwrap();
        store.publish(ChangeEvent::update("a", Vec::<(String, _)>::new())).unwrap();
        store.publish(ChangeEvent::update("b", Vec::<(String, _)>::new())).unwrap();

        assert_eq!(feed.next().await.unwrap().unwrap().document_key.as_str(), "a");
        assert_eq!(feed.next().await.unwrap().unwrap().document_key.as_str(), "b");
    }

    #[tokio::test]
    async fn save_token_replaces_existing() {
        let users = MemoryUsers::with_tokens([("u23cs001", "ExponentPushToken[old]")]);
        let id = StudentId::new("u23cs001");
        users.save_push_token(&id, "ExponentPushToken[new]").await.unwrap();
        assert_eq!(
            users.push_token(&id).await.unwrap().as_deref(),
            Some("ExponentPushToken[new]")
        );
    }
}
