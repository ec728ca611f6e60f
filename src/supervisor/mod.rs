//! The Supervisor owns the application lifecycle.
//!
//! It wires the store, the repositories, the two schedulers and the config
//! loader together, applies the initial configuration, serves the HTTP API,
//! and orchestrates a bounded graceful shutdown when a termination signal
//! arrives.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    config::RuntimeConfig,
    http_server::{self, ApiState},
    loader::{ConfigLoader, LoaderError},
    persistence::{
        sqlite::{SqliteEntityRepository, SqliteHeartbeatRepository, SqliteMetricsRepository},
        traits::{EntityRepository, HeartbeatRepository, MetricsRepository},
        PersistenceError, SqliteStore,
    },
    probe::{DbSink, ProbeKind, ProbeRegistry, ProcSystemReader},
    scheduler::{DiscardSink, HeartbeatSink, Scheduler, SchedulerError},
};

/// Bound on the graceful shutdown of the server and the probe fleet.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during the supervisor's lifetime.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The instance configuration file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    ConfigRead {
        /// The path that was attempted.
        path: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Preparing persistent storage failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The initial configuration was rejected.
    #[error("failed to load config: {0}")]
    InitialLoad(#[from] LoaderError),

    /// The HTTP listener could not be bound or the server failed.
    #[error("HTTP server error: {0}")]
    Server(#[from] std::io::Error),

    /// The probe fleet did not wind down before the shutdown deadline.
    #[error("shutdown error: {0}")]
    Shutdown(#[from] SchedulerError),
}

/// The primary runtime manager for the application.
pub struct Supervisor {
    config: RuntimeConfig,
}

impl Supervisor {
    /// Creates a supervisor for the given runtime configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    /// Runs the application until a shutdown signal arrives or a fatal
    /// error occurs.
    pub async fn run(self) -> Result<(), SupervisorError> {
        let raw_config =
            tokio::fs::read_to_string(&self.config.config_path).await.map_err(|source| {
                SupervisorError::ConfigRead { path: self.config.config_path.clone(), source }
            })?;

        tracing::debug!(db_path = %self.config.db_path, "preparing storage");
        let store = SqliteStore::new(&format!("sqlite:{}", self.config.db_path)).await?;
        store.run_migrations().await?;

        let entities: Arc<dyn EntityRepository> =
            Arc::new(SqliteEntityRepository::new(store.pool().clone()));
        let heartbeats: Arc<dyn HeartbeatRepository> =
            Arc::new(SqliteHeartbeatRepository::new(store.pool().clone()));
        let metrics: Arc<dyn MetricsRepository> =
            Arc::new(SqliteMetricsRepository::new(store.pool().clone()));

        let monitor_scheduler = Arc::new(Scheduler::new(
            ProbeKind::Monitor,
            ProbeRegistry::monitors(reqwest::Client::new()),
            Arc::clone(&entities),
            Arc::new(HeartbeatSink::new(Arc::clone(&heartbeats))),
        ));
        let metric_scheduler = Arc::new(Scheduler::new(
            ProbeKind::Metric,
            ProbeRegistry::metrics(
                Arc::new(DbSink::new(Arc::clone(&metrics))),
                Arc::new(ProcSystemReader),
            ),
            Arc::clone(&entities),
            Arc::new(DiscardSink),
        ));

        let loader = Arc::new(ConfigLoader::new(vec![monitor_scheduler, metric_scheduler]));

        tracing::info!(config_path = %self.config.config_path, "loading configuration");
        loader.load_config(&raw_config).await?;

        let state = ApiState {
            config: Arc::new(self.config.clone()),
            loader: Arc::clone(&loader),
            entities,
            heartbeats,
            metrics,
        };

        let listener =
            tokio::net::TcpListener::bind(("0.0.0.0", self.config.port)).await?;

        let shutdown = CancellationToken::new();

        // Listen for SIGINT (Ctrl+C) and SIGTERM.
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler")
                    .recv()
                    .await;
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT received, initiating graceful shutdown"),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown"),
            }

            signal_token.cancel();
        });

        let mut server_task =
            tokio::spawn(http_server::run_server(listener, state, shutdown.clone()));

        tracing::info!("vigil started, waiting for shutdown signal");

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {}

            result = &mut server_task => {
                // The server only returns early on failure; take the whole
                // process down cleanly.
                shutdown.cancel();
                let _ = loader.stop(SHUTDOWN_TIMEOUT).await;
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.into()),
                    Err(join_err) => Err(SupervisorError::Server(std::io::Error::other(join_err))),
                };
            }
        }

        // Graceful shutdown: drain the server, then the probe fleet, then
        // the store.
        tracing::info!("starting graceful shutdown");
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut server_task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::warn!(error = %e, "HTTP server shutdown error"),
            Ok(Err(e)) => tracing::warn!(error = %e, "HTTP server task failed"),
            Err(_) => {
                tracing::warn!("HTTP server did not drain in time, abandoning it");
                server_task.abort();
            }
        }

        loader.stop(SHUTDOWN_TIMEOUT).await?;
        store.close().await;

        tracing::info!("graceful shutdown completed");
        Ok(())
    }
}
