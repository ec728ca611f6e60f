//! Repository traits the lifecycle engine and the API layer depend on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

use super::error::PersistenceError;
use crate::models::{Entity, Heartbeat, MetricKind, Sample};

/// Default page size for list queries when the caller passes no limit.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Optional filters for heartbeat queries.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatFilter {
    /// Restrict to one entity by canonical ID.
    pub entity_id: Option<String>,
    /// Inclusive lower bound on the timestamp.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the timestamp.
    pub to: Option<DateTime<Utc>>,
    /// Restrict by outcome.
    pub successful: Option<bool>,
    /// Page size; `0` means the default of [`DEFAULT_LIST_LIMIT`].
    pub limit: i64,
    /// Page offset.
    pub offset: i64,
}

/// Optional filters for metric sample queries.
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    /// Restrict to one entity by canonical ID.
    pub entity_id: Option<String>,
    /// Inclusive lower bound on the timestamp.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the timestamp.
    pub to: Option<DateTime<Utc>>,
    /// Restrict by metric name.
    pub name: Option<String>,
    /// Restrict by metric kind.
    pub kind: Option<MetricKind>,
    /// Page size; `0` means the default of [`DEFAULT_LIST_LIMIT`].
    pub limit: i64,
    /// Page offset.
    pub offset: i64,
}

/// Registration and lookup of entity rows keyed by canonical ID.
///
/// Registration is idempotent get-or-create from the caller's perspective:
/// the scheduler looks up the ID first and inserts only on
/// [`PersistenceError::NotFound`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Returns the integer key for a canonical ID.
    async fn get_id(&self, canonical_id: &str) -> Result<i64, PersistenceError>;

    /// Inserts a new entity row and returns its integer key.
    async fn insert_entity(&self, canonical_id: &str) -> Result<i64, PersistenceError>;

    /// Returns the canonical ID for an integer key.
    async fn get_canonical_id(&self, id: i64) -> Result<String, PersistenceError>;

    /// Lists every registered entity.
    async fn list_entities(&self) -> Result<Vec<Entity>, PersistenceError>;

    /// Returns the full entity row for a canonical ID.
    async fn get_entity(&self, canonical_id: &str) -> Result<Entity, PersistenceError>;
}

/// Persistence of monitor tick outcomes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HeartbeatRepository: Send + Sync {
    /// Appends one heartbeat row. The referenced entity must already be
    /// registered.
    async fn insert_heartbeat(&self, heartbeat: &Heartbeat) -> Result<(), PersistenceError>;

    /// Queries heartbeats, newest first.
    async fn list_heartbeats(
        &self,
        filter: &HeartbeatFilter,
    ) -> Result<Vec<Heartbeat>, PersistenceError>;
}

/// Persistence of metric samples.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetricsRepository: Send + Sync {
    /// Appends one sample row. The referenced entity must already be
    /// registered.
    async fn insert_sample(&self, sample: &Sample) -> Result<(), PersistenceError>;

    /// Queries samples, newest first.
    async fn list_samples(&self, filter: &SampleFilter) -> Result<Vec<Sample>, PersistenceError>;
}
