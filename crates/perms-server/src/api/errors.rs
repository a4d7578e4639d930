//! Error responses for the API

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use perms_core::BackendError;
use serde_json::json;
use tracing::{error, warn};

/// API error type, rendered as `{"error": {"code": ..., "message": ...}}`
#[derive(Debug)]
pub enum ApiError {
    /// The request body was not valid JSON of the expected shape
    InvalidBody(JsonRejection),
    /// The storage backend failed
    Backend(BackendError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection)
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        ApiError::Backend(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::InvalidBody(rejection) => write!(f, "Bad Request: {}", rejection.body_text()),
            ApiError::Backend(err) => write!(f, "Backend Error: {}", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::InvalidBody(rejection) => {
                warn!("Rejected request body: {}", rejection.body_text());
                (rejection.status(), "ERR_BAD_REQUEST", rejection.body_text())
            }
            ApiError::Backend(err) => {
                error!(backend = err.backend().unwrap_or("unknown"), "Request failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "ERR_BACKEND", err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;
    use std::io;

    #[tokio::test]
    async fn test_backend_error_is_internal_server_error() {
        let err = BackendError::query("redis", io::Error::new(io::ErrorKind::Other, "boom"));

        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "ERR_BACKEND");
        assert_eq!(body["error"]["message"], "redis query error: boom");
    }
}
