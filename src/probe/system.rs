//! Host-level readings consumed by metric probes.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// Reads host metrics. Injected into metric probes so tests can substitute
/// a mock.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SystemReader: Send + Sync {
    /// Returns the 1-minute load average.
    async fn read_loadavg(&self) -> Result<f64, std::io::Error>;
}

/// A [`SystemReader`] backed by `/proc/loadavg`.
pub struct ProcSystemReader;

const LOADAVG_PATH: &str = "/proc/loadavg";

#[async_trait]
impl SystemReader for ProcSystemReader {
    async fn read_loadavg(&self) -> Result<f64, std::io::Error> {
        let contents = tokio::fs::read_to_string(LOADAVG_PATH).await?;

        let first = contents.split_whitespace().next().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid format in {LOADAVG_PATH}"),
            )
        })?;

        first.parse::<f64>().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("failed to parse load average: {e}"),
            )
        })
    }
}
