use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::EntityID;

/// The kind of a metric sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// A point-in-time value.
    Gauge,
    /// A monotonically increasing value.
    Counter,
    /// A distribution observation.
    Histogram,
}

impl MetricKind {
    /// Returns the lowercase wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            "histogram" => Ok(MetricKind::Histogram),
            other => Err(format!("unknown metric kind: {other}")),
        }
    }
}

/// One observed metric value, attributed to an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Identity of the metric probe that produced the sample.
    pub entity_id: EntityID,
    /// When the sample was taken.
    pub timestamp: DateTime<Utc>,
    /// The sample's metric kind.
    pub kind: MetricKind,
    /// Metric name, e.g. `cpu_loadavg`.
    pub name: String,
    /// Observed value.
    pub value: f64,
    /// Free-form dimension labels.
    pub labels: HashMap<String, String>,
}

impl Sample {
    /// Creates a sample.
    pub fn new<K, V>(
        entity_id: EntityID,
        timestamp: DateTime<Utc>,
        kind: MetricKind,
        name: &str,
        value: f64,
        labels: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entity_id,
            timestamp,
            kind,
            name: name.to_string(),
            value,
            labels: labels.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
