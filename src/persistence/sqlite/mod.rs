//! SQLite-backed implementations of the repository traits.

use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    SqlitePool,
};

mod entities;
mod heartbeats;
mod metrics;

pub use entities::SqliteEntityRepository;
pub use heartbeats::SqliteHeartbeatRepository;
pub use metrics::SqliteMetricsRepository;

use crate::persistence::error::PersistenceError;

/// Owns the SQLite connection pool and the schema lifecycle. The individual
/// repositories clone the pool out of it.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects to the database at `database_url`, creating the file if it
    /// does not exist. WAL journaling and a busy timeout keep the
    /// single-writer, many-reader split workable.
    #[tracing::instrument(level = "info")]
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        tracing::debug!(database_url, "connecting to SQLite database");
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PersistenceError::InvalidInput(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(500));
        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            PersistenceError::OperationFailed(format!("failed to connect to database: {e}"))
        })?;
        tracing::info!(database_url, "connected to SQLite database");
        Ok(Self { pool })
    }

    /// Runs the embedded database migrations.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "failed to run database migrations");
            PersistenceError::MigrationError(e.to_string())
        })?;
        tracing::info!("database migrations completed");
        Ok(())
    }

    /// Access to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the connection pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Resolves a canonical ID to its integer entity key.
pub(crate) async fn entity_key(
    pool: &SqlitePool,
    canonical_id: &str,
) -> Result<i64, PersistenceError> {
    sqlx::query_scalar::<_, i64>("select id from entities where canonical_id = ?")
        .bind(canonical_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| PersistenceError::OperationFailed(e.to_string()))?
        .ok_or_else(|| PersistenceError::NotFound(format!("entity '{canonical_id}'")))
}

#[cfg(test)]
pub(crate) async fn setup_test_store() -> SqliteStore {
    let store = SqliteStore::new("sqlite::memory:")
        .await
        .expect("failed to connect to in-memory db");
    store.run_migrations().await.expect("failed to run migrations");
    store
}
