//! HTTP server module: the read-only query surface over the store plus the
//! configuration hot-reload endpoint, versioned under `/api/v1` and guarded
//! by an `X-API-Key` middleware.

mod auth;
mod config;
mod entities;
mod error;
mod heartbeats;
mod metrics;

use std::sync::Arc;

use auth::auth;
use axum::{
    middleware,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use config::{get_config, load_config};
use entities::{get_entity, list_entities};
use heartbeats::list_heartbeats;
use metrics::list_samples;
use serde_json::json;
use tokio_util::sync::CancellationToken;

pub use auth::API_KEY_HEADER;
pub use error::ApiError;

use crate::{
    config::RuntimeConfig,
    loader::ConfigLoader,
    persistence::traits::{EntityRepository, HeartbeatRepository, MetricsRepository},
};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct ApiState {
    /// The resolved runtime configuration.
    pub config: Arc<RuntimeConfig>,
    /// The configuration loader, for reload and read-back.
    pub loader: Arc<ConfigLoader>,
    /// Entity lookup.
    pub entities: Arc<dyn EntityRepository>,
    /// Heartbeat queries.
    pub heartbeats: Arc<dyn HeartbeatRepository>,
    /// Metric sample queries.
    pub metrics: Arc<dyn MetricsRepository>,
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Assembles the application router.
pub fn router(state: ApiState) -> Router {
    let api = Router::new()
        .route("/config", get(get_config).post(load_config))
        .route("/entities", get(list_entities))
        .route("/entities/{canonical_id}", get(get_entity))
        .route("/heartbeats", get(list_heartbeats))
        .route("/metrics", get(list_samples))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .with_state(state)
}

/// Serves the API on the given listener until `shutdown` is cancelled.
pub async fn run_server(
    listener: tokio::net::TcpListener,
    state: ApiState,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
