//! Handlers for configuration load and read-back.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::{json, value::RawValue};

use super::{error::ApiError, ApiState};

/// Wrapped request format: `{"config": <document>}`. A body that is not in
/// this shape is treated as the document itself.
#[derive(Deserialize)]
struct WrappedConfig {
    config: Option<Box<RawValue>>,
}

/// `POST /api/v1/config` — applies a new instance document.
pub async fn load_config(
    State(state): State<ApiState>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::BadRequest("request body is required".to_string()));
    }

    let document = match serde_json::from_str::<WrappedConfig>(&body) {
        Ok(WrappedConfig { config: Some(raw) }) => raw.get().to_string(),
        _ => body,
    };

    state.loader.load_config(&document).await.map_err(|e| {
        tracing::warn!(error = %e, "rejected configuration");
        ApiError::BadRequest(format!("failed to load config: {e}"))
    })?;

    tracing::info!("configuration loaded via API");
    Ok((StatusCode::OK, Json(json!({ "status": "ok" }))))
}

/// `GET /api/v1/config` — returns the last applied document.
pub async fn get_config(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let raw = state
        .loader
        .get_config()
        .await
        .ok_or_else(|| ApiError::NotFound("no configuration loaded".to_string()))?;

    let document: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| ApiError::InternalServerError(format!("failed to parse stored config: {e}")))?;

    Ok((StatusCode::OK, Json(document)))
}
