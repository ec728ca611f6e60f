//! Serde helpers shared by configuration types.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Deserializes a [`Duration`] from an integer number of seconds, the wire
/// format probe intervals use.
pub fn duration_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}
