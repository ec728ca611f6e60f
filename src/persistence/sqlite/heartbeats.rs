//! SQLite implementation of the heartbeat repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::entity_key;
use crate::{
    models::Heartbeat,
    persistence::{
        error::PersistenceError,
        traits::{HeartbeatFilter, HeartbeatRepository, DEFAULT_LIST_LIMIT},
    },
};

/// Heartbeat persistence over a SQLite pool.
pub struct SqliteHeartbeatRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct HeartbeatRow {
    ts: DateTime<Utc>,
    error: Option<String>,
    canonical_id: String,
}

impl SqliteHeartbeatRepository {
    /// Creates a repository over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HeartbeatRepository for SqliteHeartbeatRepository {
    async fn insert_heartbeat(&self, heartbeat: &Heartbeat) -> Result<(), PersistenceError> {
        let entity_id = entity_key(&self.pool, &heartbeat.monitor_id).await?;

        sqlx::query(
            "insert into heartbeat (entity_id, ts, successful, error) values (?, ?, ?, ?)",
        )
        .bind(entity_id)
        .bind(heartbeat.timestamp)
        .bind(heartbeat.successful())
        .bind(&heartbeat.error)
        .execute(&self.pool)
        .await
        .map_err(|e| PersistenceError::OperationFailed(e.to_string()))?;

        Ok(())
    }

    async fn list_heartbeats(
        &self,
        filter: &HeartbeatFilter,
    ) -> Result<Vec<Heartbeat>, PersistenceError> {
        let limit = if filter.limit > 0 { filter.limit } else { DEFAULT_LIST_LIMIT };

        let rows = sqlx::query_as::<_, HeartbeatRow>(
            r#"
            select h.ts, h.error, e.canonical_id
            from heartbeat h
            join entities e on h.entity_id = e.id
            where (e.canonical_id = ?1 or ?1 is null)
              and (h.ts >= ?2 or ?2 is null)
              and (h.ts <= ?3 or ?3 is null)
              and (h.successful = ?4 or ?4 is null)
            order by h.ts desc
            limit ?5 offset ?6
            "#,
        )
        .bind(&filter.entity_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.successful)
        .bind(limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PersistenceError::OperationFailed(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| Heartbeat::new(row.canonical_id, row.ts, row.error))
            .collect())
    }
}
