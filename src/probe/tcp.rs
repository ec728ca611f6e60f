//! TCP dial monitor: success iff the three-way handshake completes within
//! the configured timeout.

use std::{sync::LazyLock, time::Duration};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::value::RawValue;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use super::{error_path, Probe, ProbeError};
use crate::{
    identity::EntityID,
    validation::{ConfigError, Problems},
};

static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(([a-zA-Z]|[a-zA-Z][a-zA-Z0-9\-]*[a-zA-Z0-9])\.)*([A-Za-z]|[A-Za-z][A-Za-z0-9\-]*[A-Za-z0-9])$",
    )
    .expect("hostname regex is valid")
});

static IP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])$",
    )
    .expect("ip regex is valid")
});

/// TCP monitor configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// DNS label or dotted-quad address to dial.
    pub hostname: String,
    /// Port, kept as the wire string and parsed during validation.
    pub port: String,
    /// Dial timeout in milliseconds.
    pub timeout: i64,
}

impl TcpConfig {
    fn validate(&self) -> Problems {
        let mut problems = Problems::new();

        if !HOSTNAME_RE.is_match(&self.hostname) && !IP_RE.is_match(&self.hostname) {
            problems.insert("hostname".to_string(), "invalid hostname or ip address".to_string());
        }

        match self.port.parse::<i64>() {
            Err(e) => {
                problems
                    .insert("port".to_string(), format!("port should be a valid number: {e}"));
            }
            Ok(port) if port < 0 => {
                problems.insert("port".to_string(), "cannot be less than zero".to_string());
            }
            Ok(port) if port > 65_535 => {
                problems.insert("port".to_string(), "cannot be greater than 65,535".to_string());
            }
            Ok(_) => {}
        }

        if self.timeout < 0 {
            problems.insert("timeout".to_string(), "cannot be less than zero".to_string());
        }

        problems
    }
}

/// A monitor that dials a TCP endpoint once per tick.
#[derive(Debug, Default)]
pub struct TcpProbe {
    cfg: TcpConfig,
}

#[async_trait]
impl Probe for TcpProbe {
    fn configure(&mut self, id: &EntityID, raw: &RawValue) -> Result<(), ConfigError> {
        let cfg: TcpConfig = serde_json::from_str(raw.get()).map_err(|e| {
            ConfigError::validation(
                [("config".to_string(), format!("invalid config: {e}"))].into_iter().collect(),
                error_path(id),
            )
        })?;

        let problems = cfg.validate();
        if !problems.is_empty() {
            return Err(ConfigError::validation(problems, error_path(id)));
        }

        self.cfg = cfg;
        Ok(())
    }

    async fn run(&self, cancel: &CancellationToken) -> Result<(), ProbeError> {
        let timeout = Duration::from_millis(self.cfg.timeout.max(0) as u64);
        let addr = format!("{}:{}", self.cfg.hostname, self.cfg.port);

        tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            dialed = tokio::time::timeout(timeout, TcpStream::connect(&addr)) => {
                match dialed {
                    Ok(Ok(_stream)) => Ok(()),
                    Ok(Err(e)) => Err(ProbeError::Io(e)),
                    Err(_) => Err(ProbeError::Timeout(timeout)),
                }
            }
        }
    }

    fn eq(&self, raw: &RawValue) -> bool {
        match serde_json::from_str::<TcpConfig>(raw.get()) {
            Ok(cfg) => cfg == self.cfg,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::value::RawValue;

    use super::*;
    use crate::identity::EntityKind;

    fn monitor_id() -> EntityID {
        EntityID::probe(EntityKind::Monitor, &EntityID::service("i", "s"), "tcp", "c")
    }

    fn raw(json: &str) -> Box<RawValue> {
        RawValue::from_string(json.to_string()).unwrap()
    }

    #[test]
    fn configure_accepts_hostname_and_ip() {
        for hostname in ["localhost", "db.internal.example.com", "127.0.0.1"] {
            let mut probe = TcpProbe::default();
            let cfg = format!(
                r#"{{"type":"tcp","name":"c","interval":1,"hostname":"{hostname}","port":"5432","timeout":100}}"#
            );
            probe.configure(&monitor_id(), &raw(&cfg)).unwrap();
        }
    }

    #[test]
    fn configure_rejects_bad_hostname_and_port() {
        let mut probe = TcpProbe::default();
        let err = probe
            .configure(
                &monitor_id(),
                &raw(r#"{"hostname":"not valid!","port":"70000","timeout":-1}"#),
            )
            .unwrap_err();

        match err {
            ConfigError::Validation { path, problems } => {
                assert_eq!(path, "s.c");
                assert_eq!(problems.get("hostname").unwrap(), "invalid hostname or ip address");
                assert_eq!(problems.get("port").unwrap(), "cannot be greater than 65,535");
                assert_eq!(problems.get("timeout").unwrap(), "cannot be less than zero");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn configure_rejects_non_numeric_port() {
        let mut probe = TcpProbe::default();
        let err = probe
            .configure(&monitor_id(), &raw(r#"{"hostname":"localhost","port":"http"}"#))
            .unwrap_err();

        match err {
            ConfigError::Validation { problems, .. } => {
                assert!(problems.get("port").unwrap().starts_with("port should be a valid number"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn eq_compares_parsed_configs() {
        let mut probe = TcpProbe::default();
        probe
            .configure(
                &monitor_id(),
                &raw(r#"{"hostname":"localhost","port":"80","timeout":100}"#),
            )
            .unwrap();

        assert!(probe.eq(&raw(r#"{"hostname":"localhost","port":"80","timeout":100}"#)));
        assert!(!probe.eq(&raw(r#"{"hostname":"localhost","port":"81","timeout":100}"#)));
        // Valid JSON of the wrong shape does not decode into a config.
        assert!(!probe.eq(&raw("[]")));
    }

    #[tokio::test]
    async fn run_succeeds_against_listening_socket() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut probe = TcpProbe::default();
        probe
            .configure(
                &monitor_id(),
                &raw(&format!(
                    r#"{{"hostname":"127.0.0.1","port":"{port}","timeout":1000}}"#
                )),
            )
            .unwrap();

        let cancel = CancellationToken::new();
        probe.run(&cancel).await.unwrap();
    }

    #[tokio::test]
    async fn run_fails_against_closed_port() {
        // Bind-then-drop to find a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut probe = TcpProbe::default();
        probe
            .configure(
                &monitor_id(),
                &raw(&format!(
                    r#"{{"hostname":"127.0.0.1","port":"{port}","timeout":500}}"#
                )),
            )
            .unwrap();

        let cancel = CancellationToken::new();
        let err = probe.run(&cancel).await.unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn run_observes_cancellation() {
        let mut probe = TcpProbe::default();
        probe
            .configure(
                &monitor_id(),
                &raw(r#"{"hostname":"127.0.0.1","port":"1","timeout":10000}"#),
            )
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = probe.run(&cancel).await.unwrap_err();
        assert!(matches!(err, ProbeError::Cancelled));
    }
}
