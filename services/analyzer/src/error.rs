use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use modelops::{CatalogError, GenerationFault, ResidencyError};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Residency(#[from] ResidencyError),
    #[error("gave up waiting after {0:?}; the operation keeps running, re-check /models/status")]
    Timeout(Duration),
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        ApiError::Residency(e.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Residency(e) => match e {
                ResidencyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                ResidencyError::UnknownKey(_) => StatusCode::NOT_FOUND,
                ResidencyError::InvalidState(_) => StatusCode::CONFLICT,
                ResidencyError::Generation(g) => match g.fault {
                    GenerationFault::Rejected => StatusCode::BAD_REQUEST,
                    GenerationFault::Runtime => StatusCode::INTERNAL_SERVER_ERROR,
                    GenerationFault::DeviceFault => StatusCode::BAD_GATEWAY,
                },
                ResidencyError::Aborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Timeout(_) => "timeout",
            ApiError::Residency(e) => match e {
                ResidencyError::InvalidRequest(_) => "invalid_request",
                ResidencyError::UnknownKey(_) => "unknown_key",
                ResidencyError::InvalidState(_) => "invalid_state",
                ResidencyError::Generation(g) => match g.fault {
                    GenerationFault::Rejected => "generation_rejected",
                    GenerationFault::Runtime => "generation_failed",
                    GenerationFault::DeviceFault => "device_fault",
                },
                ResidencyError::Aborted(_) => "aborted",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(%status, error = %self, "request failed");
        }
        let body = ErrorBody { error: self.to_string(), kind: self.kind() };
        (status, Json(body)).into_response()
    }
}

/// Stops waiting after `limit`. The spawned residency operation is not
/// cancelled by this.
pub async fn within<T, F>(limit: Duration, fut: F) -> Result<T, ApiError>
where
    F: std::future::Future<Output = Result<T, ResidencyError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(r) => r.map_err(ApiError::from),
        Err(_) => Err(ApiError::Timeout(limit)),
    }
}
