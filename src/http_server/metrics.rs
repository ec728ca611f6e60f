//! Handlers for metric sample queries.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{error::ApiError, ApiState};
use crate::{
    models::{MetricKind, Sample},
    persistence::traits::SampleFilter,
};

/// Query parameters accepted by the sample listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SampleQuery {
    entity_id: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<MetricKind>,
    limit: i64,
    offset: i64,
}

/// A metric sample in API responses.
#[derive(Debug, Serialize)]
pub struct SampleResponse {
    entity_id: String,
    timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    kind: MetricKind,
    name: String,
    value: f64,
    labels: HashMap<String, String>,
}

impl From<Sample> for SampleResponse {
    fn from(sample: Sample) -> Self {
        Self {
            entity_id: sample.entity_id.canonical(),
            timestamp: sample.timestamp,
            kind: sample.kind,
            name: sample.name,
            value: sample.value,
            labels: sample.labels,
        }
    }
}

/// `GET /api/v1/metrics` — lists samples with optional filtering, newest
/// first, default limit 100.
pub async fn list_samples(
    State(state): State<ApiState>,
    Query(query): Query<SampleQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = SampleFilter {
        entity_id: query.entity_id,
        from: query.from,
        to: query.to,
        name: query.name,
        kind: query.kind,
        limit: query.limit.max(0),
        offset: query.offset.max(0),
    };

    let samples = state.metrics.list_samples(&filter).await?;
    let response: Vec<SampleResponse> = samples.into_iter().map(SampleResponse::from).collect();

    Ok((StatusCode::OK, Json(response)))
}
