//! Route handlers.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::dispatch::AnalyzeResponse;
use crate::health::HealthStatus;
use crate::http::request::{header_str, X_REQUEST_ID};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::{identity_key, ENGINE_KEY_HEADER, RATE_LIMIT_KEY_HEADER};

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    let start = Instant::now();
    let status = state.dispatcher.health();
    metrics::record_request("health", StatusCode::OK.as_u16(), start);
    Json(status)
}

/// Batch analysis.
/// Authentication and rate limiting run before the body is read, so they
/// take precedence over size and validation errors. The whole exchange is
/// bounded by the listener's request timeout.
pub async fn analyze_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = header_str(&request, X_REQUEST_ID)
        .unwrap_or("unknown")
        .to_string();
    let credential = header_str(&request, ENGINE_KEY_HEADER).map(str::to_string);
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let identity = identity_key(header_str(&request, RATE_LIMIT_KEY_HEADER), peer);

    tracing::debug!(request_id = %request_id, identity = %identity, "Analyze request received");

    let outcome = tokio::time::timeout(
        state.request_timeout,
        analyze(&state, credential.as_deref(), &identity, request.into_body()),
    )
    .await
    .unwrap_or(Err(ApiError::Timeout));

    let response = match outcome {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            log_rejection(&request_id, &identity, &e);
            e.into_response()
        }
    };

    metrics::record_request("analyze", response.status().as_u16(), start);
    response
}

async fn analyze(
    state: &AppState,
    credential: Option<&str>,
    identity: &str,
    body: Body,
) -> Result<AnalyzeResponse, ApiError> {
    state.dispatcher.admit(credential, identity).await?;
    let body = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|_| ApiError::PayloadTooLarge)?;
    state.dispatcher.analyze_body(&body).await
}

fn log_rejection(request_id: &str, identity: &str, error: &ApiError) {
    match error {
        ApiError::AuthNotConfigured | ApiError::AuthWeak | ApiError::ModelUnavailable(_) => {
            tracing::error!(request_id = %request_id, error = %error, "Analyze refused: service misconfigured");
        }
        ApiError::Unauthorized => {
            tracing::warn!(request_id = %request_id, identity = %identity, "Analyze refused: bad credential");
        }
        ApiError::RateLimited
        | ApiError::Validation(_)
        | ApiError::PayloadTooLarge
        | ApiError::Timeout => {
            tracing::info!(request_id = %request_id, identity = %identity, error = %error, "Analyze rejected");
        }
    }
}
