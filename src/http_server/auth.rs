//! API-key authentication middleware.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use super::{error::ApiError, ApiState};

/// Header carrying the shared API secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Validates the `X-API-Key` header against the configured key.
pub async fn auth(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if provided.is_empty() || provided != state.config.api_key {
        tracing::warn!(
            path = %request.uri().path(),
            has_api_key = !provided.is_empty(),
            "authentication failed"
        );
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}
