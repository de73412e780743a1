use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::error::HodlError;

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePortfolioRequest {
    pub name: String,
}

/// Acceptance of a strategy request; the order may still fail afterwards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteStrategyResponse {
    pub status: String,
    pub execution_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecutionQuery {
    /// Block until the execution finishes or the configured wait elapses
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ============================================================================
// Error mapping
// ============================================================================

/// `HodlError` rendered as `{"error": ...}` with a status from its category
#[derive(Debug)]
pub struct ApiError(pub HodlError);

impl From<HodlError> for ApiError {
    fn from(e: HodlError) -> Self {
        Self(e)
    }
}

pub fn status_for(e: &HodlError) -> StatusCode {
    if e.is_input_error() {
        StatusCode::BAD_REQUEST
    } else if e.is_lookup_error() {
        StatusCode::NOT_FOUND
    } else if e.is_external_error() {
        StatusCode::BAD_GATEWAY
    } else if matches!(e, HodlError::Timeout(_)) {
        StatusCode::GATEWAY_TIMEOUT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;
