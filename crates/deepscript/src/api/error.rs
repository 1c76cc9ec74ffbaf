use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

/// Failures surfaced to HTTP clients as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    BadRequest(String),
    InvalidParameter(String),
    ModelNotInitialized,
    RemoteUnavailable(String),
    GenerationFailed,
    Remote(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::ModelNotInitialized | ApiError::RemoteUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::GenerationFailed | ApiError::Remote(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::InvalidParameter(msg) => format!("Invalid parameter: {}", msg),
            ApiError::ModelNotInitialized => "Model not initialized".to_string(),
            ApiError::RemoteUnavailable(reason) => {
                format!("Remote writer not configured: {}", reason)
            }
            ApiError::GenerationFailed => {
                "Failed to generate dialogue. Please try again.".to_string()
            }
            ApiError::Remote(msg) | ApiError::NotFound(msg) | ApiError::Internal(msg) => {
                msg.clone()
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}
