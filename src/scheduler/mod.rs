//! The per-kind probe lifecycle engine.
//!
//! A [`Scheduler`] owns every running probe of one kind ("monitor" or
//! "metric"). [`Scheduler::load_service`] reconciles the probes attributed
//! to one service against a freshly decoded config list: entities are
//! registered before any tick can fire, removed probes are cancelled,
//! changed or new probes are (re)started, and each probe ticks on its own
//! interval in a dedicated task with independent cancellation rooted at the
//! scheduler.

mod outcome;

use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::FutureExt;
use serde_json::value::RawValue;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

pub use outcome::{DiscardSink, HeartbeatSink, OutcomeSink};

use crate::{
    identity::EntityID,
    persistence::{traits::EntityRepository, PersistenceError},
    probe::{Probe, ProbeConfig, ProbeError, ProbeKind, ProbeRegistry},
    validation::ConfigError,
};

/// Errors surfaced by scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A config entry failed validation; carries the accumulated path.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A config entry could not be decoded at all.
    #[error("invalid probe config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Entity registration failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Outstanding tick tasks did not wind down before the shutdown
    /// deadline. Cancellation has still been delivered; the tasks terminate
    /// once they observe it.
    #[error("shutdown wait expired before all probe tasks finished")]
    ShutdownTimeout,
}

/// A live probe task and the state needed to manage it.
pub struct ProbeInstance {
    /// The probe's stable identity.
    pub id: EntityID,
    /// The configured probe implementation.
    pub probe: Arc<dyn Probe>,
    /// Parsed common header, read for the tick interval.
    pub cfg: ProbeConfig,
    /// Original config bytes, retained for equality checks against future
    /// configs.
    pub raw: Box<RawValue>,
    cancel: CancellationToken,
    running: bool,
}

/// Per-service bookkeeping: which probe IDs are currently attributed to a
/// service, so a reload knows what to drop.
struct ServiceEntry {
    probe_ids: Vec<String>,
}

#[derive(Default)]
struct SchedulerState {
    /// Canonical probe ID to live instance.
    probes: HashMap<String, ProbeInstance>,
    /// Canonical service ID to its probe attribution.
    services: HashMap<String, ServiceEntry>,
}

/// Runs and reconciles every probe of one kind.
pub struct Scheduler {
    kind: ProbeKind,
    registry: ProbeRegistry,
    entities: Arc<dyn EntityRepository>,
    outcome: Arc<dyn OutcomeSink>,
    state: tokio::sync::Mutex<SchedulerState>,
    root: CancellationToken,
    tracker: TaskTracker,
}

impl Scheduler {
    /// Creates a scheduler for the given probe kind.
    pub fn new(
        kind: ProbeKind,
        registry: ProbeRegistry,
        entities: Arc<dyn EntityRepository>,
        outcome: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self {
            kind,
            registry,
            entities,
            outcome,
            state: tokio::sync::Mutex::new(SchedulerState::default()),
            root: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// The probe kind this scheduler drives.
    pub fn kind(&self) -> ProbeKind {
        self.kind
    }

    /// Reconciles the probes belonging to one service against a new ordered
    /// list of raw probe configs.
    ///
    /// On success every ID derivable from `raw_list` is ticking with its new
    /// config, every previously attributed ID not in the list has been
    /// cancelled, and the entity row for each desired ID exists. On failure
    /// nothing has changed. Validation errors come back with their path
    /// anchored at the service name.
    #[tracing::instrument(skip(self, raw_list), fields(kind = %self.kind, service = %service_id.canonical()))]
    pub async fn load_service(
        &self,
        service_id: &EntityID,
        raw_list: &[Box<RawValue>],
    ) -> Result<(), SchedulerError> {
        let desired = self.build_desired(service_id, raw_list)?;
        let desired_ids: Vec<String> = desired.keys().cloned().collect();

        let mut state = self.state.lock().await;

        // Entity rows must exist before the first tick, so outcome writes
        // never dangle.
        for canonical in desired.keys() {
            match self.entities.get_id(canonical).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    self.entities.insert_entity(canonical).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Drop probes the new config no longer mentions.
        if let Some(entry) = state.services.get(&service_id.canonical()) {
            for old_id in entry.probe_ids.clone() {
                if !desired.contains_key(&old_id) {
                    tracing::info!(probe_id = %old_id, "removing probe dropped from config");
                    Self::stop_instance_locked(&mut state, &old_id);
                    state.probes.remove(&old_id);
                }
            }
        }

        // Install the new set. Reload is stop+start: a probe already running
        // under a desired ID is cancelled before its replacement starts, so
        // no two tick tasks ever share an ID.
        for (canonical, mut instance) in desired {
            if state.probes.contains_key(&canonical) {
                Self::stop_instance_locked(&mut state, &canonical);
            }

            instance.cancel = self.root.child_token();
            instance.running = true;
            self.spawn_tick(&instance);
            state.probes.insert(canonical, instance);
        }

        state
            .services
            .insert(service_id.canonical(), ServiceEntry { probe_ids: desired_ids });

        Ok(())
    }

    /// Cancels every probe and waits up to `timeout` for outstanding tick
    /// tasks to observe cancellation and return.
    pub async fn stop(&self, timeout: Duration) -> Result<(), SchedulerError> {
        tracing::info!(kind = %self.kind, "stopping scheduler");
        self.root.cancel();
        self.tracker.close();

        tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .map_err(|_| SchedulerError::ShutdownTimeout)
    }

    /// Canonical IDs of the probes currently running.
    pub async fn running_ids(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut ids: Vec<String> = state
            .probes
            .iter()
            .filter(|(_, instance)| instance.running)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Decodes and validates each raw entry in order, building the desired
    /// probe set. Runs without the scheduler lock.
    fn build_desired(
        &self,
        service_id: &EntityID,
        raw_list: &[Box<RawValue>],
    ) -> Result<HashMap<String, ProbeInstance>, SchedulerError> {
        let service_name = service_id.label("name").unwrap_or_default().to_string();
        let mut desired = HashMap::new();

        for (i, raw) in raw_list.iter().enumerate() {
            let cfg: ProbeConfig = serde_json::from_str(raw.get())?;

            if cfg.name.is_empty() {
                let mut err = ConfigError::no_name([service_name.as_str()]);
                err.set_index(i);
                return Err(err.into());
            }

            let problems = cfg.validate();
            if !problems.is_empty() {
                return Err(ConfigError::validation(
                    problems,
                    [service_name.as_str(), cfg.name.as_str()],
                )
                .into());
            }

            let mut probe = self.registry.build(&cfg.probe_type).ok_or_else(|| {
                ConfigError::validation(
                    [(
                        "type".to_string(),
                        format!("unknown {} type: {}", self.kind, cfg.probe_type),
                    )]
                    .into_iter()
                    .collect(),
                    [service_name.as_str(), cfg.name.as_str()],
                )
            })?;

            let id =
                EntityID::probe(self.kind.entity_kind(), service_id, &cfg.probe_type, &cfg.name);
            probe.configure(&id, raw)?;

            let canonical = id.canonical();
            if desired.contains_key(&canonical) {
                return Err(ConfigError::duplicate([service_name.clone(), i.to_string()]).into());
            }

            desired.insert(
                canonical,
                ProbeInstance {
                    id,
                    probe: Arc::from(probe),
                    cfg,
                    raw: raw.clone(),
                    cancel: CancellationToken::new(),
                    running: false,
                },
            );
        }

        Ok(desired)
    }

    /// Cancels a running instance. Caller holds the state lock.
    fn stop_instance_locked(state: &mut SchedulerState, canonical: &str) {
        if let Some(instance) = state.probes.get_mut(canonical) {
            if instance.running {
                instance.cancel.cancel();
                instance.running = false;
            }
        }
    }

    /// Spawns the periodic tick task for an installed instance. The task
    /// reads only the fields captured here and never takes the scheduler
    /// lock; it learns about its own removal through the cancellation token.
    fn spawn_tick(&self, instance: &ProbeInstance) {
        let probe = Arc::clone(&instance.probe);
        let token = instance.cancel.clone();
        let id = instance.id.clone();
        let interval = instance.cfg.interval;
        let outcome = Arc::clone(&self.outcome);

        self.tracker.spawn(async move {
            // First tick one interval after start; if a tick overruns its
            // interval the next one fires as soon as the previous returns,
            // with no backlog beyond that.
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => return,
                    _ = ticker.tick() => {
                        let result =
                            match AssertUnwindSafe(probe.run(&token)).catch_unwind().await {
                                Ok(result) => result,
                                Err(_) => {
                                    tracing::error!(probe_id = %id.canonical(), "probe tick panicked");
                                    continue;
                                }
                            };

                        if matches!(result, Err(ProbeError::Cancelled)) {
                            // Shutdown or reload in progress; emit nothing.
                            continue;
                        }

                        outcome.record(&id, result).await;
                    }
                }
            }
        });
    }
}
