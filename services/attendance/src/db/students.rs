//! Postgres-backed attendance store.
//!
//! Student documents live in the `students` table with the nested attendance
//! record as JSONB. A trigger on that table publishes change events on
//! [`CHANGE_CHANNEL`], which [`PgAttendanceStore::subscribe`] consumes through
//! a dedicated `LISTEN` connection.

use async_trait::async_trait;
use futures_util::StreamExt;
use rollcall_model::{AttendanceRecord, ChangeEvent, StudentDocument, StudentId};
use sqlx::{
    postgres::{PgListener, PgPool, PgRow},
    Row,
};
use tracing::{debug, info};

use super::{AttendanceStore, ChangeFeed, DbError, StudentQuery};

/// Notification channel the change trigger publishes on.
pub const CHANGE_CHANNEL: &str = "attendance_changes";

struct StudentRow(StudentDocument);

impl<'r> sqlx::FromRow<'r, PgRow> for StudentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let name: Option<String> = row.try_get("name")?;
        let attendance: serde_json::Value = row.try_get("attendance")?;

        Ok(Self(StudentDocument {
            id: StudentId::new(id),
            name,
            attendance: AttendanceRecord::from_json(&attendance),
        }))
    }
}

/// Attendance store over Postgres.
#[derive(Clone)]
pub struct PgAttendanceStore {
    pool: PgPool,
}

impl PgAttendanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for PgAttendanceStore {
    async fn query(&self, query: &StudentQuery) -> Result<Vec<StudentDocument>, DbError> {
        let rows = match query {
            StudentQuery::ByIds(ids) => {
                let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                sqlx::query_as::<_, StudentRow>(
                    r#"
                    SELECT id, name, attendance
                    FROM students
                    WHERE id = ANY($1)
                    ORDER BY id
                    "#,
                )
                .bind(ids)
                .fetch_all(&self.pool)
                .await
            }
            StudentQuery::HavingSemester(semester) => {
                sqlx::query_as::<_, StudentRow>(
                    r#"
                    SELECT id, name, attendance
                    FROM students
                    WHERE EXISTS (
                        SELECT 1
                        FROM jsonb_each(
                            CASE WHEN jsonb_typeof(attendance -> $1) = 'object'
                                 THEN attendance -> $1
                                 ELSE '{}'::jsonb
                            END
                        ) AS s(subject, entries)
                        WHERE jsonb_typeof(s.entries) = 'array'
                          AND jsonb_array_length(s.entries) > 0
                      )
                    ORDER BY id
                    "#,
                )
                .bind(semester)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(DbError::Query)?;

        debug!(count = rows.len(), "Queried student documents");
        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    async fn find_by_id(&self, id: &StudentId) -> Result<Option<StudentDocument>, DbError> {
        let row = sqlx::query_as::<_, StudentRow>(
            r#"
            SELECT id, name, attendance
            FROM students
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?;

        Ok(row.map(|row| row.0))
    }

    async fn subscribe(&self) -> Result<ChangeFeed, DbError> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| DbError::Feed(e.to_string()))?;
        listener
            .listen(CHANGE_CHANNEL)
            .await
            .map_err(|e| DbError::Feed(e.to_string()))?;

        info!(channel = CHANGE_CHANNEL, "Subscribed to attendance change feed");

        let feed = listener
            .into_stream()
            .map(|notification| -> Result<ChangeEvent, DbError> {
                let notification = notification.map_err(|e| DbError::Feed(e.to_string()))?;
                let event: ChangeEvent = serde_json::from_str(notification.payload())?;
                Ok(event)
            });

        Ok(feed.boxed())
    }

    async fn health_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(())
    }
}
