use chrono::{DateTime, Utc};
use serde::Serialize;

/// The persisted outcome of one monitor tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heartbeat {
    /// Canonical ID of the monitor that produced the outcome.
    pub monitor_id: String,
    /// When the tick completed.
    pub timestamp: DateTime<Utc>,
    /// Failure description, absent on success.
    pub error: Option<String>,
}

impl Heartbeat {
    /// Creates a heartbeat for a monitor tick outcome.
    pub fn new(monitor_id: String, timestamp: DateTime<Utc>, error: Option<String>) -> Self {
        Self { monitor_id, timestamp, error }
    }

    /// True iff the tick completed without error.
    pub fn successful(&self) -> bool {
        self.error.is_none()
    }
}
