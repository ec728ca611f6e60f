//! Handlers for heartbeat queries.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{error::ApiError, ApiState};
use crate::{models::Heartbeat, persistence::traits::HeartbeatFilter};

/// Query parameters accepted by the heartbeat listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HeartbeatQuery {
    entity_id: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    successful: Option<bool>,
    limit: i64,
    offset: i64,
}

/// A heartbeat in API responses.
#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    monitor_id: String,
    timestamp: DateTime<Utc>,
    successful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<Heartbeat> for HeartbeatResponse {
    fn from(heartbeat: Heartbeat) -> Self {
        Self {
            monitor_id: heartbeat.monitor_id.clone(),
            timestamp: heartbeat.timestamp,
            successful: heartbeat.successful(),
            error: heartbeat.error,
        }
    }
}

/// `GET /api/v1/heartbeats` — lists heartbeats with optional filtering,
/// newest first, default limit 100.
pub async fn list_heartbeats(
    State(state): State<ApiState>,
    Query(query): Query<HeartbeatQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = HeartbeatFilter {
        entity_id: query.entity_id,
        from: query.from,
        to: query.to,
        successful: query.successful,
        limit: query.limit.max(0),
        offset: query.offset.max(0),
    };

    let heartbeats = state.heartbeats.list_heartbeats(&filter).await?;
    let response: Vec<HeartbeatResponse> =
        heartbeats.into_iter().map(HeartbeatResponse::from).collect();

    Ok((StatusCode::OK, Json(response)))
}
