//! Outcome routing: what happens to the result of one probe tick.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    identity::EntityID,
    models::Heartbeat,
    persistence::traits::HeartbeatRepository,
    probe::ProbeError,
};

/// Receives the outcome of each non-cancelled probe tick.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    /// Records one tick outcome. Must not fail: persistence problems are the
    /// sink's to log and swallow, because the scheduler's liveness takes
    /// priority over any single row.
    async fn record(&self, id: &EntityID, outcome: Result<(), ProbeError>);
}

/// Routes monitor outcomes into the heartbeat repository.
pub struct HeartbeatSink {
    repo: Arc<dyn HeartbeatRepository>,
}

impl HeartbeatSink {
    /// Creates a sink over the given repository.
    pub fn new(repo: Arc<dyn HeartbeatRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl OutcomeSink for HeartbeatSink {
    async fn record(&self, id: &EntityID, outcome: Result<(), ProbeError>) {
        let heartbeat =
            Heartbeat::new(id.canonical(), Utc::now(), outcome.err().map(|e| e.to_string()));

        if let Err(e) = self.repo.insert_heartbeat(&heartbeat).await {
            tracing::warn!(
                monitor_id = %heartbeat.monitor_id,
                error = %e,
                "failed to record heartbeat, dropping it"
            );
        }
    }
}

/// Outcome sink for metric probes, which publish their samples themselves;
/// the tick outcome only carries failure information worth logging.
pub struct DiscardSink;

#[async_trait]
impl OutcomeSink for DiscardSink {
    async fn record(&self, id: &EntityID, outcome: Result<(), ProbeError>) {
        if let Err(e) = outcome {
            tracing::warn!(metric_id = %id.canonical(), error = %e, "metric tick failed");
        }
    }
}
