//! HTTP request monitor: issues one request per tick and reports transport
//! failures and status mismatches.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::value::RawValue;
use tokio_util::sync::CancellationToken;

use super::{error_path, Probe, ProbeError};
use crate::{
    identity::EntityID,
    validation::{ConfigError, Problems},
};

const VALID_METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// HTTP monitor configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Target URL; must begin with `http://` or `https://`.
    pub url: String,
    /// Request method; case-insensitive, normalised upper, empty means GET.
    pub method: String,
    /// Request timeout in milliseconds.
    pub timeout: i64,
    /// Zero means "any 2xx"; nonzero demands an exact match.
    #[serde(rename = "expectedStatus")]
    pub expected_status: u16,
}

impl HttpConfig {
    /// Validates the config, normalising `method` in place so that the
    /// parsed struct the caller reads reflects the defaulting and
    /// upper-casing.
    fn validate(&mut self) -> Problems {
        let mut problems = Problems::new();

        if self.url.is_empty() {
            problems.insert("url".to_string(), "url is required".to_string());
        } else if url::Url::parse(&self.url).is_err()
            || !(self.url.starts_with("http://") || self.url.starts_with("https://"))
        {
            problems
                .insert("url".to_string(), "url must start with http:// or https://".to_string());
        }

        self.normalize_method();
        if !VALID_METHODS.contains(&self.method.as_str()) {
            problems.insert("method".to_string(), format!("invalid HTTP method: {}", self.method));
        }

        if self.timeout < 0 {
            problems.insert("timeout".to_string(), "cannot be less than zero".to_string());
        }

        if self.expected_status != 0 && !(100..=599).contains(&self.expected_status) {
            problems.insert(
                "expectedStatus".to_string(),
                "must be a valid HTTP status code (100-599)".to_string(),
            );
        }

        problems
    }

    fn normalize_method(&mut self) {
        if self.method.is_empty() {
            self.method = "GET".to_string();
        } else {
            self.method = self.method.to_uppercase();
        }
    }
}

/// A monitor that performs one HTTP round-trip per tick.
#[derive(Debug)]
pub struct HttpProbe {
    client: reqwest::Client,
    cfg: HttpConfig,
}

impl HttpProbe {
    /// Creates an unconfigured probe sharing the given client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client, cfg: HttpConfig::default() }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn configure(&mut self, id: &EntityID, raw: &RawValue) -> Result<(), ConfigError> {
        let mut cfg: HttpConfig = serde_json::from_str(raw.get()).map_err(|e| {
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
        let method = self
            .cfg
            .method
            .parse::<Method>()
            .map_err(|e| ProbeError::System(format!("invalid method: {e}")))?;

        let request = self.client.request(method, &self.cfg.url).timeout(timeout);

        let response = tokio::select! {
            biased;

            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            response = request.send() => response?,
        };

        let status = response.status().as_u16();
        if self.cfg.expected_status != 0 {
            if status != self.cfg.expected_status {
                return Err(ProbeError::UnexpectedStatus {
                    expected: self.cfg.expected_status,
                    got: status,
                });
            }
        } else if !response.status().is_success() {
            return Err(ProbeError::StatusOutOfRange(status));
        }

        Ok(())
    }

    fn eq(&self, raw: &RawValue) -> bool {
        match serde_json::from_str::<HttpConfig>(raw.get()) {
            Ok(mut cfg) => {
                cfg.normalize_method();
                cfg == self.cfg
            }
            Err(_) => false,
        }
    }
}
