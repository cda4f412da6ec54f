// Error handling module for the Job Board API
// Provides the closed error taxonomy shared by the auth core and the CRUD handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::auth::error::{StoreError, TokenError};

/// Main error type for the API
/// All handlers and pipeline stages return Result<T, ApiError>
///
/// Every layer classifies its failure into one of these variants at the point
/// where it is detected. Nothing downstream inspects error text.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed input, surfaced with field-level detail
    /// Maps to HTTP 400 Bad Request
    #[error("Validation failed: {0}")]
    ValidationFailed(validator::ValidationErrors),

    /// Maps to HTTP 400 Bad Request
    #[error("Email already registered")]
    DuplicateEmail,

    /// Covers both "no such user" and "wrong password"
    /// Maps to HTTP 401 Unauthorized
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Maps to HTTP 401 Unauthorized
    #[error("Account is deactivated")]
    AccountDeactivated,

    /// Refresh token failed signature or expiry checks
    /// Maps to HTTP 401 Unauthorized
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    /// Refresh token is well-formed but no longer present in the user's sessions
    /// Maps to HTTP 401 Unauthorized
    #[error("Session not found")]
    SessionNotFound,

    /// Maps to HTTP 401 Unauthorized
    #[error("Missing authentication token")]
    MissingToken,

    /// Maps to HTTP 401 Unauthorized
    #[error("Authentication required")]
    Unauthenticated,

    /// Maps to HTTP 403 Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Maps to HTTP 404 Not Found
    #[error("{resource} with id {id} not found")]
    NotFound { resource: String, id: String },

    /// Hashing, signing or persistence fault
    /// Maps to HTTP 500; the detail is logged, never returned
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Consistent error response structure
#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "VALIDATION_FAILED", "FORBIDDEN")
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (field-level validation errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl ApiError {
    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// Logging levels:
    /// - error!: internal faults (500-level), with full detail
    /// - warn!: rejected credentials and authorization failures
    /// - debug!: expected client errors (validation, not found)
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        let status = self.status_code();
        let response = match self {
            ApiError::ValidationFailed(errors) => {
                debug!("Validation error: {:?}", errors);
                ErrorResponse {
                    details: Some(
                        serde_json::to_value(errors).unwrap_or(serde_json::json!({})),
                    ),
                    ..ErrorResponse::new("VALIDATION_FAILED", "Request validation failed")
                }
            }
            ApiError::DuplicateEmail => {
                debug!("Registration rejected: duplicate email");
                ErrorResponse::new("DUPLICATE_EMAIL", "Email already registered")
            }
            ApiError::InvalidCredentials => {
                warn!("Rejected login: invalid credentials");
                ErrorResponse::new("INVALID_CREDENTIALS", "Invalid email or password")
            }
            ApiError::AccountDeactivated => {
                warn!("Rejected login: account deactivated");
                ErrorResponse::new("ACCOUNT_DEACTIVATED", "Account is deactivated")
            }
            ApiError::InvalidOrExpiredToken => {
                warn!("Rejected refresh: invalid or expired token");
                ErrorResponse::new("INVALID_OR_EXPIRED_TOKEN", "Invalid or expired token")
            }
            ApiError::SessionNotFound => {
                warn!("Rejected refresh: session not found");
                ErrorResponse::new("SESSION_NOT_FOUND", "Session not found")
            }
            ApiError::MissingToken => {
                warn!("Missing token in request");
                ErrorResponse::new("MISSING_TOKEN", "Missing authentication token")
            }
            ApiError::Unauthenticated => {
                warn!("Unauthenticated request");
                ErrorResponse::new("UNAUTHENTICATED", "Authentication required")
            }
            ApiError::Forbidden(message) => {
                warn!("Forbidden access attempt: {}", message);
                ErrorResponse::new("FORBIDDEN", message.clone())
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                ErrorResponse::new("NOT_FOUND", format!("{} with id {} not found", resource, id))
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        };
        (status, response)
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationFailed(_) | ApiError::DuplicateEmail => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials
            | ApiError::AccountDeactivated
            | ApiError::InvalidOrExpiredToken
            | ApiError::SessionNotFound
            | ApiError::MissingToken
            | ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        ApiError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    /// Build a single-field validation failure, for checks that live outside
    /// the derive-based validators (e.g. a missing body field).
    pub fn invalid_field(field: &'static str, code: &'static str, message: &'static str) -> Self {
        let mut error = validator::ValidationError::new(code);
        error.message = Some(message.into());
        let mut errors = validator::ValidationErrors::new();
        errors.add(field, error);
        ApiError::ValidationFailed(errors)
    }
}

/// Convert validator errors to ApiError
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationFailed(errors)
    }
}

/// Persistence faults are internal unless the store classified them
impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateEmail => ApiError::DuplicateEmail,
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::from(StoreError::from(error))
    }
}

/// Token failures seen by the pipeline collapse to Unauthenticated;
/// the refresh flow maps them to InvalidOrExpiredToken itself.
impl From<TokenError> for ApiError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Signing(msg) => {
                ApiError::InternalError(format!("Token signing failed: {}", msg))
            }
            TokenError::Expired | TokenError::InvalidSignature => ApiError::Unauthenticated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_http_contract() {
        assert_eq!(ApiError::DuplicateEmail.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::AccountDeactivated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::SessionNotFound.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden("nope".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::not_found("Job", 1).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::InternalError("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_error_does_not_leak_detail() {
        let error = ApiError::InternalError("connection refused at 10.0.0.3".to_string());
        let (status, body) = error.to_error_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error_code, "INTERNAL_ERROR");
        assert!(!body.message.contains("10.0.0.3"));
        assert!(body.details.is_none());
    }

    #[test]
    fn test_store_duplicate_maps_to_duplicate_email() {
        assert!(matches!(
            ApiError::from(StoreError::DuplicateEmail),
            ApiError::DuplicateEmail
        ));
        assert!(matches!(
            ApiError::from(StoreError::Database("timeout".to_string())),
            ApiError::InternalError(_)
        ));
    }

    #[test]
    fn test_token_errors_map_to_unauthenticated() {
        assert!(matches!(ApiError::from(TokenError::Expired), ApiError::Unauthenticated));
        assert!(matches!(
            ApiError::from(TokenError::InvalidSignature),
            ApiError::Unauthenticated
        ));
    }

    #[test]
    fn test_invalid_field_carries_details() {
        let (status, body) =
            ApiError::invalid_field("refresh_token", "required", "Refresh token is required")
                .to_error_response();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let details = body.details.expect("details present");
        assert!(details.get("refresh_token").is_some());
    }
}
