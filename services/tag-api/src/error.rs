//! Error types for the Tag API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pawtag_core::TagError;
use serde::Serialize;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing or malformed bearer token")]
    Unauthorized,

    #[error("Operator token rejected")]
    Forbidden,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Tag(#[from] TagError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Tag(e) => match e {
                TagError::TagNotFound
                | TagError::ProfileNotFound
                | TagError::PeriodNotFound
                | TagError::PhoneNotFound => StatusCode::NOT_FOUND,
                TagError::InvalidInput(_) | TagError::WebhookError(_) => StatusCode::BAD_REQUEST,
                TagError::Exhausted | TagError::Conflict(_) => StatusCode::CONFLICT,
                TagError::Upstream(_) => StatusCode::BAD_GATEWAY,
                TagError::Database(_) | TagError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Tag(e) => match e {
                TagError::TagNotFound => "TAG_NOT_FOUND",
                TagError::ProfileNotFound => "PROFILE_NOT_FOUND",
                TagError::PeriodNotFound => "PERIOD_NOT_FOUND",
                TagError::PhoneNotFound => "PHONE_NOT_FOUND",
                TagError::InvalidInput(_) => "INVALID_INPUT",
                TagError::WebhookError(_) => "WEBHOOK_ERROR",
                TagError::Exhausted => "OUT_OF_STOCK",
                TagError::Conflict(_) => "CONFLICT",
                TagError::Upstream(_) => "UPSTREAM_ERROR",
                TagError::Database(_) | TagError::Internal(_) => "INTERNAL_ERROR",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Log internal errors; client errors stay at debug level
        if status.is_server_error() {
            tracing::error!(error = ?self, "Internal API error");
        }

        // Internal detail never reaches the client
        let message = if status.is_server_error() {
            "Internal error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
