//! Runtime configuration resolved from CLI flags, environment variables and
//! defaults, in that order of precedence.

pub mod helpers;

use thiserror::Error;

/// Errors raised when the runtime configuration is incomplete.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeConfigError {
    /// No API key was provided by flag or environment.
    #[error("API key is required (set VIGIL_API_KEY or use --api-key)")]
    MissingApiKey,

    /// No configuration file path was provided.
    #[error("config file path is required")]
    MissingConfigPath,
}

/// Values the CLI layer hands over before resolution; `None` falls through
/// to the matching environment variable, then to the default.
#[derive(Debug, Default, Clone)]
pub struct RuntimeOverrides {
    /// Path to the instance configuration file.
    pub config_path: String,
    /// Shared API secret.
    pub api_key: Option<String>,
    /// HTTP listen port.
    pub port: Option<u16>,
    /// SQLite database file path.
    pub db_path: Option<String>,
    /// Log level: DEBUG, INFO, WARN or ERROR.
    pub log_level: Option<String>,
    /// Log format: text or json.
    pub log_format: Option<String>,
    /// Log output: stdout, stderr, or a file path.
    pub log_output: Option<String>,
    /// Development mode flag.
    pub dev_mode: bool,
}

/// The resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Path to the instance configuration file.
    pub config_path: String,
    /// Shared API secret matched against the `X-API-Key` header.
    pub api_key: String,
    /// HTTP listen port.
    pub port: u16,
    /// SQLite database file path.
    pub db_path: String,
    /// Log level.
    pub log_level: String,
    /// Log format.
    pub log_format: String,
    /// Log output target.
    pub log_output: String,
    /// Development mode widens the default log filter.
    pub dev_mode: bool,
}

fn string_value(flag: Option<String>, env_key: &str, default: &str) -> String {
    if let Some(value) = flag.filter(|v| !v.is_empty()) {
        return value;
    }
    match std::env::var(env_key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn bool_env(env_key: &str) -> bool {
    matches!(
        std::env::var(env_key).unwrap_or_default().to_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

impl RuntimeConfig {
    /// Resolves the configuration with precedence: CLI flag > environment
    /// variable > default.
    pub fn resolve(overrides: RuntimeOverrides) -> Self {
        let port = overrides
            .port
            .or_else(|| std::env::var("VIGIL_API_PORT").ok().and_then(|v| v.parse().ok()))
            .unwrap_or(8080);

        Self {
            config_path: overrides.config_path,
            api_key: string_value(overrides.api_key, "VIGIL_API_KEY", ""),
            port,
            db_path: string_value(overrides.db_path, "VIGIL_DB_PATH", "observations.db"),
            log_level: string_value(overrides.log_level, "VIGIL_LOG_LEVEL", "INFO"),
            log_format: string_value(overrides.log_format, "VIGIL_LOG_FORMAT", "text"),
            log_output: string_value(overrides.log_output, "VIGIL_LOG_OUTPUT", "stdout"),
            dev_mode: overrides.dev_mode || bool_env("VIGIL_DEV_MODE"),
        }
    }

    /// Checks that required values are present.
    pub fn validate(&self) -> Result<(), RuntimeConfigError> {
        if self.api_key.is_empty() {
            return Err(RuntimeConfigError::MissingApiKey);
        }
        if self.config_path.is_empty() {
            return Err(RuntimeConfigError::MissingConfigPath);
        }
        Ok(())
    }
}
