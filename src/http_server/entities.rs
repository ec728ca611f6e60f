//! Handlers for entity lookups.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use super::{error::ApiError, ApiState};

/// `GET /api/v1/entities` — lists every registered entity.
pub async fn list_entities(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let entities = state.entities.list_entities().await?;
    Ok((StatusCode::OK, Json(entities)))
}

/// `GET /api/v1/entities/{canonical_id}` — returns one entity by its
/// canonical ID (percent-encoded in the path).
pub async fn get_entity(
    State(state): State<ApiState>,
    Path(canonical_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let entity = state.entities.get_entity(&canonical_id).await?;
    Ok((StatusCode::OK, Json(entity)))
}
