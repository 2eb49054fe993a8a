use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::repositories::RepositoryError;
use crate::gateway::{mask_secrets, GatewayError};
use crate::orchestrator::SignupError;
use crate::validation::{FieldError, ValidationErrors};

/// API error type with HTTP status code, client-facing message and an
/// optional machine-readable per-field detail list
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Vec<FieldError>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Creates a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Creates a 401 Unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Creates a 404 Not Found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Creates a 500 Internal Server Error
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Creates a 502 Bad Gateway error for transient provider failures
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = if self.details.is_empty() {
            Json(json!({ "error": self.message }))
        } else {
            Json(json!({ "error": self.message, "details": self.details }))
        };

        (self.status, body).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "Validation failed".to_string(),
            details: errors.into_fields(),
        }
    }
}

impl From<SignupError> for ApiError {
    fn from(err: SignupError) -> Self {
        // Raw provider/storage detail stays in the server log, masked;
        // clients only ever see sanitized messages.
        tracing::error!("signup error: {}", mask_secrets(&err.to_string()));

        match err {
            SignupError::Gateway(GatewayError::ExpiredArtifact(_)) => Self::bad_request(
                "Your bank connection expired. Please reconnect your bank and try again.",
            ),
            SignupError::Gateway(GatewayError::Validation(_)) => {
                Self::bad_request("The payment provider rejected the request.")
            }
            SignupError::Gateway(GatewayError::Transient(_)) => {
                Self::bad_gateway("The payment provider is temporarily unavailable. Please retry.")
            }
            SignupError::Gateway(GatewayError::Terminal { code, .. }) => {
                Self::bad_request(crate::gateway::decline_message(&code))
            }
            SignupError::ChargeDeclined { message, .. } => Self::bad_request(message),
            SignupError::Persistence(RepositoryError::NotFound(_)) => {
                Self::not_found("Record not found")
            }
            SignupError::Persistence(_) => {
                Self::internal_server_error("A storage error occurred. Please try again.")
            }
            SignupError::RolledBack(_) => Self::internal_server_error(
                "Account setup failed and was rolled back. Please contact support.",
            ),
        }
    }
}
