use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use coingraph_core::CoreError;

// ==============================================================================
// Error Type
// ==============================================================================

#[derive(Debug)]
pub(crate) enum AppError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::BadGateway(msg)
            | Self::Internal(msg) => f.write_str(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        map_core_error(err)
    }
}

/// The single place core failures become HTTP statuses.
pub(super) fn map_core_error(err: CoreError) -> AppError {
    match err {
        CoreError::Validation(message) => AppError::BadRequest(message),
        CoreError::NotFound(missing) => AppError::NotFound(missing.to_string()),
        CoreError::Remote { .. } | CoreError::Transport(_) => {
            tracing::warn!(error = %err, "node call failed");
            AppError::BadGateway(format!("bitcoin rpc error: {err}"))
        }
        CoreError::Decode(_) => {
            tracing::warn!(error = %err, "node answer could not be decoded");
            AppError::BadGateway(format!("bitcoin rpc error: {err}"))
        }
        CoreError::Config(message) => AppError::Internal(message),
    }
}
