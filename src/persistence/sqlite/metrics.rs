//! SQLite implementation of the metrics repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::entity_key;
use crate::{
    identity::EntityID,
    models::{MetricKind, Sample},
    persistence::{
        error::PersistenceError,
        traits::{MetricsRepository, SampleFilter, DEFAULT_LIST_LIMIT},
    },
};

/// Metric sample persistence over a SQLite pool.
pub struct SqliteMetricsRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct SampleRow {
    ts: DateTime<Utc>,
    name: String,
    #[sqlx(rename = "type")]
    kind: String,
    value: f64,
    labels: String,
    canonical_id: String,
}

impl SqliteMetricsRepository {
    /// Creates a repository over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TryFrom<SampleRow> for Sample {
    type Error = PersistenceError;

    fn try_from(row: SampleRow) -> Result<Self, Self::Error> {
        let entity_id = EntityID::parse(&row.canonical_id)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;
        let kind: MetricKind =
            row.kind.parse().map_err(PersistenceError::SerializationError)?;
        let labels: HashMap<String, String> = serde_json::from_str(&row.labels)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;

        Ok(Sample { entity_id, timestamp: row.ts, kind, name: row.name, value: row.value, labels })
    }
}

#[async_trait]
impl MetricsRepository for SqliteMetricsRepository {
    async fn insert_sample(&self, sample: &Sample) -> Result<(), PersistenceError> {
        let entity_id = entity_key(&self.pool, &sample.entity_id.canonical()).await?;

        let labels = serde_json::to_string(&sample.labels)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;

        sqlx::query(
            "insert into metrics (entity_id, ts, name, type, value, labels) values (?, ?, ?, ?, ?, ?)",
        )
        .bind(entity_id)
        .bind(sample.timestamp)
        .bind(&sample.name)
        .bind(sample.kind.as_str())
        .bind(sample.value)
        .bind(labels)
        .execute(&self.pool)
        .await
        .map_err(|e| PersistenceError::OperationFailed(e.to_string()))?;

        Ok(())
    }

    async fn list_samples(&self, filter: &SampleFilter) -> Result<Vec<Sample>, PersistenceError> {
        let limit = if filter.limit > 0 { filter.limit } else { DEFAULT_LIST_LIMIT };

        let rows = sqlx::query_as::<_, SampleRow>(
            r#"
            select m.ts, m.name, m.type, m.value, m.labels, e.canonical_id
            from metrics m
            join entities e on m.entity_id = e.id
            where (e.canonical_id = ?1 or ?1 is null)
              and (m.ts >= ?2 or ?2 is null)
              and (m.ts <= ?3 or ?3 is null)
              and (m.name = ?4 or ?4 is null)
              and (m.type = ?5 or ?5 is null)
            order by m.ts desc
            limit ?6 offset ?7
            "#,
        )
        .bind(&filter.entity_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(&filter.name)
        .bind(filter.kind.map(MetricKind::as_str))
        .bind(limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PersistenceError::OperationFailed(e.to_string()))?;

        rows.into_iter().map(Sample::try_from).collect()
    }
}
