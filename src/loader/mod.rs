//! The configuration loader: turns one instance document into per-service
//! reconciliation calls against every registered scheduler.

use std::{collections::HashMap, sync::Arc, time::Duration};

use serde_json::value::RawValue;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::{
    identity::EntityID,
    models::InstanceConfig,
    scheduler::{Scheduler, SchedulerError},
    validation::ConfigError,
};

/// Errors surfaced by configuration loading.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The document is not valid JSON of the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A structural validation failure, with its accumulated path.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A service sub-document could not be decoded.
    #[error("failed to parse config for service '{service}': {source}")]
    ServiceParse {
        /// The service being decoded.
        service: String,
        /// The underlying decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// A scheduler rejected a service load for a non-validation reason.
    #[error("failed to load {kind}s for service '{service}': {source}")]
    Scheduler {
        /// The scheduler's probe kind.
        kind: String,
        /// The service being loaded.
        service: String,
        /// The underlying scheduler failure.
        #[source]
        source: SchedulerError,
    },
}

/// Applies instance documents to the schedulers and retains the last-applied
/// document for read-back.
pub struct ConfigLoader {
    schedulers: Vec<Arc<Scheduler>>,
    /// Serialises concurrent load_config calls.
    load_lock: Mutex<()>,
    /// The last successfully parsed document, readable concurrently.
    current: RwLock<Option<String>>,
}

impl ConfigLoader {
    /// Creates a loader fanning out to the given schedulers.
    pub fn new(schedulers: Vec<Arc<Scheduler>>) -> Self {
        Self { schedulers, load_lock: Mutex::new(()), current: RwLock::new(None) }
    }

    /// Parses and applies one instance document.
    ///
    /// Services are processed in document order; the first failure returns
    /// early with a path-qualified error. State already applied to
    /// schedulers by earlier services remains in place — callers re-load a
    /// known-good document after fixing the error.
    #[tracing::instrument(skip_all)]
    pub async fn load_config(&self, raw: &str) -> Result<(), LoaderError> {
        let cfg: InstanceConfig = serde_json::from_str(raw)?;

        let problems = cfg.validate();
        if !problems.is_empty() {
            return Err(ConfigError::validation(problems, [cfg.name.as_str()]).into());
        }

        let _guard = self.load_lock.lock().await;

        *self.current.write().await = Some(raw.to_string());

        for (i, service) in cfg.services.iter().enumerate() {
            let fields: HashMap<String, Box<RawValue>> = serde_json::from_str(service.get())
                .map_err(|e| LoaderError::ServiceParse { service: i.to_string(), source: e })?;

            let name = match fields
                .get("name")
                .and_then(|raw_name| serde_json::from_str::<String>(raw_name.get()).ok())
            {
                Some(name) if !name.is_empty() => name,
                _ => {
                    let mut err = ConfigError::no_name([cfg.name.as_str()]);
                    err.set_index(i);
                    return Err(err.into());
                }
            };

            let service_id = EntityID::service(&cfg.name, &name);

            for scheduler in &self.schedulers {
                let Some(raw_probes) = fields.get(scheduler.kind().config_key()) else {
                    continue;
                };

                let probe_list: Vec<Box<RawValue>> = serde_json::from_str(raw_probes.get())
                    .map_err(|e| LoaderError::ServiceParse { service: name.clone(), source: e })?;

                match scheduler.load_service(&service_id, &probe_list).await {
                    Ok(()) => {}
                    Err(SchedulerError::Config(mut config_err)) => {
                        config_err.prepend_path(&cfg.name);
                        return Err(config_err.into());
                    }
                    Err(e) => {
                        return Err(LoaderError::Scheduler {
                            kind: scheduler.kind().as_str().to_string(),
                            service: name.clone(),
                            source: e,
                        });
                    }
                }
            }

            tracing::debug!(service = %name, "service configuration applied");
        }

        tracing::info!(instance = %cfg.name, services = cfg.services.len(), "configuration loaded");
        Ok(())
    }

    /// Returns the last-applied document, if any.
    pub async fn get_config(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    /// Stops every registered scheduler in parallel, each bounded by
    /// `timeout`. The first error wins.
    pub async fn stop(&self, timeout: Duration) -> Result<(), SchedulerError> {
        let results = futures::future::join_all(
            self.schedulers.iter().map(|scheduler| scheduler.stop(timeout)),
        )
        .await;

        results.into_iter().collect()
    }
}
