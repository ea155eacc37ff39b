//! Response envelope and error types for the gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use warden_rpc::RpcError;
use warden_types::ValidationErrors;

/// Body of every API response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(status: StatusCode, data: T) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                status: status.as_u16(),
                data: Some(data),
                errors: None,
            }),
        )
    }
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request failed shape validation
    #[error("Bad request")]
    BadRequest(Vec<String>),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    /// Rejected by the users service
    #[error("Request rejected")]
    Rejected(Vec<String>),

    /// Users service could not be reached in time
    #[error("Service unavailable")]
    Unavailable,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Rejected(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn messages(self) -> Vec<String> {
        match self {
            Self::BadRequest(errors) | Self::Rejected(errors) => errors,
            Self::Internal(_) => vec!["Internal server error".to_string()],
            other => vec![other.to_string()],
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::BadRequest(errors.messages())
    }
}

impl From<RpcError> for ApiError {
    fn from(err: RpcError) -> Self {
        if err.is_unavailable() {
            tracing::warn!(error = %err, "Users service unavailable");
            Self::Unavailable
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let Self::Internal(message) = &self {
            tracing::error!(error = %message, "Internal API error");
        }

        let body = ApiResponse::<()> {
            status: status.as_u16(),
            data: None,
            errors: Some(self.messages()),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
