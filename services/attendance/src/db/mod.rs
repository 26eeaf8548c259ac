//! Attendance store layer.
//!
//! This module provides:
//! - Connection pool management
//! - The [`AttendanceStore`] abstraction (query, find-by-id, change feed)
//! - The [`UserDirectory`] abstraction (push token lookup and registration)
//! - Postgres implementations backed by JSONB documents and LISTEN/NOTIFY
//! - In-memory implementations for tests and local runs
//!
//! Components receive these abstractions explicitly; nothing here is a
//! process-wide handle.

mod error;
mod memory;
mod students;
mod users;

pub use error::DbError;
pub use memory::{MemoryStore, MemoryUsers};
pub use students::{PgAttendanceStore, CHANGE_CHANNEL};
pub use users::PgUserDirectory;

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use rollcall_model::{ChangeEvent, StudentDocument, StudentId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// Stream of change events from the attendance store.
pub type ChangeFeed = BoxStream<'static, Result<ChangeEvent, DbError>>;

/// Which students a report should consider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentQuery {
    /// Exactly these students (unknown ids are simply absent from the result).
    ByIds(Vec<StudentId>),

    /// Every student with at least one entry under the semester.
    HavingSemester(String),
}

/// Read access to student attendance documents.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Return the documents matching `query`, in store order.
    async fn query(&self, query: &StudentQuery) -> Result<Vec<StudentDocument>, DbError>;

    /// Look up a single document.
    async fn find_by_id(&self, id: &StudentId) -> Result<Option<StudentDocument>, DbError>;

    /// Subscribe to the mutation feed.
    async fn subscribe(&self) -> Result<ChangeFeed, DbError>;

    /// Check that the store is reachable.
    async fn health_check(&self) -> Result<(), DbError> {
        Ok(())
    }
}

/// Push token registry keyed by student id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Return the registered push token, if any.
    async fn push_token(&self, user_id: &StudentId) -> Result<Option<String>, DbError>;

    /// Register or replace the push token for a user.
    async fn save_push_token(&self, user_id: &StudentId, token: &str) -> Result<(), DbError>;
}

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of idle connections.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub acquire_timeout: Duration,

    /// Idle connection timeout.
    pub idle_timeout: Duration,

    /// Maximum lifetime of a connection.
    pub max_lifetime: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/rollcall".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/rollcall".to_string());

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let min_connections = std::env::var("DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        Self {
            database_url,
            max_connections,
            min_connections,
            ..Default::default()
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.database_url)
            .await
            .map_err(DbError::Connect)?;

        info!("Database connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations.
    ///
    /// In production, migrations run as part of deployment; this is for dev mode.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        info!("Running database migrations");

        let candidates = vec![
            std::path::PathBuf::from("./migrations"),
            std::path::PathBuf::from("services/attendance/migrations"),
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        ];
        let mut last_error: Option<sqlx::migrate::MigrateError> = None;

        for dir in &candidates {
            match sqlx::migrate::Migrator::new(dir.clone()).await {
                Ok(migrator) => {
                    info!(migrations_dir = %dir.display(), "Loaded migrations");
                    migrator.run(&self.pool).await.map_err(DbError::Migration)?;
                    info!("Database migrations complete");
                    return Ok(());
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        let tried = candidates
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Err(DbError::MigrationDirNotFound {
            tried,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    /// Get an attendance store handle.
    pub fn attendance_store(&self) -> PgAttendanceStore {
        PgAttendanceStore::new(self.pool.clone())
    }

    /// Get a user directory handle.
    pub fn user_directory(&self) -> PgUserDirectory {
        PgUserDirectory::new(self.pool.clone())
    }
}
