//! The probe capability and its registry.
//!
//! A probe is anything that can be configured from raw bytes, perform
//! exactly one observation per tick, and judge whether a candidate new
//! config is semantically equivalent to its current one. Monitors (`tcp`,
//! `http`) report their outcome through the scheduler; metrics (`cpu`)
//! publish samples themselves through a [`Sink`].

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::value::RawValue;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

mod cpu;
mod http;
mod system;
mod tcp;

pub use cpu::CpuProbe;
pub use http::HttpProbe;
pub use system::{ProcSystemReader, SystemReader};
pub use tcp::TcpProbe;

#[cfg(test)]
pub use system::MockSystemReader;

use crate::{
    config::helpers::duration_from_secs,
    identity::{EntityID, EntityKind},
    models::Sample,
    persistence::{traits::MetricsRepository, PersistenceError},
    validation::{ConfigError, Problems},
};

/// The probe kind a scheduler drives, determining the entity kind of its
/// probes and the config document key it consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Health probes persisting heartbeats.
    Monitor,
    /// Sampling probes emitting metrics.
    Metric,
}

impl ProbeKind {
    /// Singular lowercase name, used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeKind::Monitor => "monitor",
            ProbeKind::Metric => "metric",
        }
    }

    /// The entity kind probes of this kind are registered under.
    pub fn entity_kind(self) -> EntityKind {
        match self {
            ProbeKind::Monitor => EntityKind::Monitor,
            ProbeKind::Metric => EntityKind::Metric,
        }
    }

    /// The key under which a service document lists probes of this kind.
    pub fn config_key(self) -> &'static str {
        match self {
            ProbeKind::Monitor => "monitors",
            ProbeKind::Metric => "metrics",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure modes of a single probe tick.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The tick was aborted by cancellation. The scheduler emits no outcome
    /// for this variant.
    #[error("cancelled")]
    Cancelled,

    /// The probe's own per-run timeout elapsed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// A transport-level failure (dial error, read error).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An HTTP round-trip failed before a status could be observed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response status did not match the configured expectation.
    #[error("expected status {expected}, got {got}")]
    UnexpectedStatus {
        /// The exact status the config demands.
        expected: u16,
        /// The status actually observed.
        got: u16,
    },

    /// The response status fell outside the default 2xx window.
    #[error("expected status in 200-299 range, got {0}")]
    StatusOutOfRange(u16),

    /// A host-level reading could not be taken or parsed.
    #[error("{0}")]
    System(String),

    /// The sample sink rejected an emission.
    #[error(transparent)]
    Sink(#[from] PersistenceError),
}

/// The common header every probe config carries.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Names a registered probe implementation.
    #[serde(rename = "type", default)]
    pub probe_type: String,

    /// Unique within its parent service and kind.
    #[serde(default)]
    pub name: String,

    /// Tick interval; an integer number of seconds on the wire.
    #[serde(default, deserialize_with = "duration_from_secs")]
    pub interval: Duration,
}

impl ProbeConfig {
    /// Validates the header fields other than `name`, which the scheduler
    /// reports as a positional missing-name error instead.
    pub fn validate(&self) -> Problems {
        let mut problems = Problems::new();

        if self.probe_type.is_empty() {
            problems.insert("type".to_string(), "'type' is required".to_string());
        }

        if self.interval.is_zero() {
            problems.insert(
                "interval".to_string(),
                "interval should be more than zero".to_string(),
            );
        }

        problems
    }
}

/// A live probe implementation.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Consumes raw configuration bytes, validates them and initialises
    /// internal state. Validation errors are anchored at
    /// `<service>.<name>` derived from the entity ID's labels.
    fn configure(&mut self, id: &EntityID, raw: &RawValue) -> Result<(), ConfigError>;

    /// Performs exactly one tick, honouring `cancel` and the probe's own
    /// per-run timeout. Returns [`ProbeError::Cancelled`] when aborted.
    async fn run(&self, cancel: &CancellationToken) -> Result<(), ProbeError>;

    /// True iff applying `raw` would be semantically equivalent to the
    /// probe's current state, matching the normalisation done in
    /// [`Probe::configure`].
    fn eq(&self, raw: &RawValue) -> bool;
}

/// Path segments for a probe validation error: `<service>.<name>`.
pub(crate) fn error_path(id: &EntityID) -> [String; 2] {
    [
        id.label("service").unwrap_or_default().to_string(),
        id.label("name").unwrap_or_default().to_string(),
    ]
}

type Constructor = Box<dyn Fn() -> Box<dyn Probe> + Send + Sync>;

/// Maps a probe `type` discriminator to a constructor. Constructors capture
/// their dependencies, so a freshly built probe only needs `configure`.
pub struct ProbeRegistry {
    constructors: HashMap<&'static str, Constructor>,
}

impl ProbeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { constructors: HashMap::new() }
    }

    /// The registry of monitor probe types.
    pub fn monitors(client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register("tcp", || Box::new(TcpProbe::default()));
        registry.register("http", move || Box::new(HttpProbe::new(client.clone())));
        registry
    }

    /// The registry of metric probe types.
    pub fn metrics(sink: Arc<dyn Sink>, reader: Arc<dyn SystemReader>) -> Self {
        let mut registry = Self::new();
        registry.register("cpu", move || {
            Box::new(CpuProbe::new(Arc::clone(&sink), Arc::clone(&reader)))
        });
        registry
    }

    /// Registers a constructor for a probe type.
    pub fn register<F>(&mut self, probe_type: &'static str, constructor: F)
    where
        F: Fn() -> Box<dyn Probe> + Send + Sync + 'static,
    {
        self.constructors.insert(probe_type, Box::new(constructor));
    }

    /// Builds an unconfigured probe of the given type, or `None` when the
    /// type is not registered.
    pub fn build(&self, probe_type: &str) -> Option<Box<dyn Probe>> {
        self.constructors.get(probe_type).map(|ctor| ctor())
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The write-only interface a metric probe uses to publish a sample.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Publishes one sample.
    async fn emit(&self, sample: Sample) -> Result<(), PersistenceError>;
}

/// A [`Sink`] that writes samples straight to the metrics repository.
pub struct DbSink {
    repo: Arc<dyn MetricsRepository>,
}

impl DbSink {
    /// Creates a sink over the given repository.
    pub fn new(repo: Arc<dyn MetricsRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Sink for DbSink {
    async fn emit(&self, sample: Sample) -> Result<(), PersistenceError> {
        self.repo.insert_sample(&sample).await
    }
}
