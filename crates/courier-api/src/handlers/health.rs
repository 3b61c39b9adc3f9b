//! Health check endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use courier_core::ApiResponse;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::AppState;

/// Payload of a health response.
#[derive(Debug, Serialize)]
pub struct HealthData {
    /// When the check was answered.
    pub timestamp: DateTime<Utc>,
    /// Service version.
    pub version: &'static str,
}

/// Reports that the service is up.
///
/// Has no dependencies and no failure path.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Response {
    let data = HealthData { timestamp: state.clock.now_utc(), version: env!("CARGO_PKG_VERSION") };

    debug!(timestamp = %data.timestamp, "Health check served");

    (StatusCode::OK, Json(ApiResponse::success("API Service is running").with_data(data)))
        .into_response()
}
