//! CPU load metric: samples the 1-minute load average once per tick and
//! publishes a gauge named `cpu_loadavg`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::value::RawValue;
use tokio_util::sync::CancellationToken;

use super::{error_path, Probe, ProbeConfig, ProbeError, Sink, SystemReader};
use crate::{
    identity::EntityID,
    models::{MetricKind, Sample},
    validation::ConfigError,
};

/// A metric probe reading the host load average.
pub struct CpuProbe {
    id: Option<EntityID>,
    sink: Arc<dyn Sink>,
    reader: Arc<dyn SystemReader>,
}

impl CpuProbe {
    /// Creates an unconfigured probe with its emission and reading
    /// dependencies.
    pub fn new(sink: Arc<dyn Sink>, reader: Arc<dyn SystemReader>) -> Self {
        Self { id: None, sink, reader }
    }
}

#[async_trait]
impl Probe for CpuProbe {
    fn configure(&mut self, id: &EntityID, raw: &RawValue) -> Result<(), ConfigError> {
        // No fields beyond the common header.
        serde_json::from_str::<ProbeConfig>(raw.get()).map_err(|e| {
            ConfigError::validation(
                [("config".to_string(), format!("invalid config: {e}"))].into_iter().collect(),
                error_path(id),
            )
        })?;

        self.id = Some(id.clone());
        Ok(())
    }

    async fn run(&self, cancel: &CancellationToken) -> Result<(), ProbeError> {
        let id = self
            .id
            .as_ref()
            .ok_or_else(|| ProbeError::System("probe is not configured".to_string()))?;

        let value = tokio::select! {
            biased;

            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            value = self.reader.read_loadavg() => {
                value.map_err(|e| ProbeError::System(e.to_string()))?
            }
        };

        let sample = Sample::new(
            id.clone(),
            Utc::now(),
            MetricKind::Gauge,
            "cpu_loadavg",
            value,
            [("span", "1m")],
        );

        self.sink.emit(sample).await?;
        Ok(())
    }

    fn eq(&self, _raw: &RawValue) -> bool {
        // Beyond the common header the config carries nothing, so any reload
        // is equivalent.
        true
    }
}
