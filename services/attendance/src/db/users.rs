//! Postgres-backed push token registry.

use async_trait::async_trait;
use rollcall_model::StudentId;
use sqlx::{postgres::PgPool, Row};

use super::{DbError, UserDirectory};

/// User directory over the `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn push_token(&self, user_id: &StudentId) -> Result<Option<String>, DbError> {
        let row = sqlx::query(
            r#"
            SELECT expo_push_token
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?;

        match row {
            Some(row) => row.try_get("expo_push_token").map_err(DbError::Query),
            None => Ok(None),
        }
    }

    async fn save_push_token(&self, user_id: &StudentId, token: &str) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, expo_push_token, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (id)
            DO UPDATE SET expo_push_token = EXCLUDED.expo_push_token, updated_at = now()
            "#,
        )
        .bind(user_id.as_str())
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(DbError::Query)?;

        Ok(())
    }
}
