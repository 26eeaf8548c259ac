//! Database error types.

use thiserror::Error;

/// Attendance store and user directory errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Failed to execute a query.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// Migration directory not found in the current environment.
    #[error("migration directory not found; tried {tried}. Last error: {last_error}. Run from repo root or services/attendance.")]
    MigrationDirNotFound { tried: String, last_error: String },

    /// The store cannot serve requests right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The change feed subscription failed or was lost.
    #[error("change feed error: {0}")]
    Feed(String),

    /// A change feed notification could not be decoded.
    #[error("malformed change notification: {0}")]
    Serialization(#[from] serde_json::Error),
}
