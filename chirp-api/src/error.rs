//! Error Types for the Chirp API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation rendering the failure envelope
//! - Conversions from the core error taxonomy

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chirp_core::{ChirpError, EntityType, OperationError, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401, 403)
    // ========================================================================
    /// Request lacks valid authentication credentials
    Unauthorized,

    /// Request is authenticated but the principal does not own the resource
    Forbidden,

    /// Authentication token is invalid or malformed
    InvalidToken,

    /// Authentication token has expired
    TokenExpired,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    /// Field format is incorrect
    InvalidFormat,

    /// Well-formed request for an operation that is not allowed
    InvalidOperation,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    UserNotFound,

    TweetNotFound,

    MessageNotFound,

    NotificationNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Entity with the same identifier already exists
    EntityAlreadyExists,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Store or cache is temporarily unavailable
    ServiceUnavailable,

    /// Request rate limit exceeded
    TooManyRequests,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::InvalidFormat
            | ErrorCode::InvalidOperation => StatusCode::BAD_REQUEST,

            ErrorCode::EntityNotFound
            | ErrorCode::UserNotFound
            | ErrorCode::TweetNotFound
            | ErrorCode::MessageNotFound
            | ErrorCode::NotificationNotFound => StatusCode::NOT_FOUND,

            ErrorCode::EntityAlreadyExists => StatusCode::CONFLICT,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::Forbidden => "Access forbidden",
            ErrorCode::InvalidToken => "Invalid authentication token",
            ErrorCode::TokenExpired => "Authentication token has expired",

            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::InvalidOperation => "Operation not allowed",

            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::TweetNotFound => "Tweet not found",
            ErrorCode::MessageNotFound => "Message not found",
            ErrorCode::NotificationNotFound => "Notification not found",

            ErrorCode::EntityAlreadyExists => "Entity already exists",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::TooManyRequests => "Too many requests, please try again later",
        }
    }

    /// Wire name, e.g. `TWEET_NOT_FOUND`.
    pub fn as_wire_str(&self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{:?}", self))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error for API operations.
///
/// Returned by every handler on failure and rendered as the failure
/// envelope `{success: false, message, error}`. The WebSocket hub reuses
/// the message for `message:error` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field errors, limits, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn token_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    /// Create an InvalidFormat error.
    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' has invalid format, expected {}", field, expected),
        )
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidOperation, message)
    }

    /// Create an EntityNotFound error.
    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} with id {} not found", entity_type, id),
        )
    }

    pub fn user_not_found() -> Self {
        Self::from_code(ErrorCode::UserNotFound)
    }

    pub fn tweet_not_found() -> Self {
        Self::from_code(ErrorCode::TweetNotFound)
    }

    pub fn message_not_found() -> Self {
        Self::from_code(ErrorCode::MessageNotFound)
    }

    pub fn notification_not_found() -> Self {
        Self::from_code(ErrorCode::NotificationNotFound)
    }

    pub fn entity_already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EntityAlreadyExists, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Create a TooManyRequests error.
    pub fn too_many_requests(retry_after_secs: Option<u64>) -> Self {
        let message = match retry_after_secs {
            Some(secs) => format!(
                "Too many requests, please try again in {} seconds",
                secs
            ),
            None => ErrorCode::TooManyRequests.default_message().to_string(),
        };
        Self::new(ErrorCode::TooManyRequests, message)
    }

    /// Failure envelope body.
    pub fn envelope(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "success": false,
            "message": self.message,
            "error": self.code.as_wire_str(),
        });
        if let (Some(details), Some(map)) = (&self.details, body.as_object_mut()) {
            map.insert("details".to_string(), details.clone());
        }
        body
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = %self.code, message = %self.message, "request failed");
        }
        (status, Json(self.envelope())).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM CORE ERRORS
// ============================================================================

fn not_found_for(entity_type: EntityType) -> ApiError {
    match entity_type {
        EntityType::User => ApiError::user_not_found(),
        EntityType::Tweet => ApiError::tweet_not_found(),
        EntityType::Message => ApiError::message_not_found(),
        EntityType::Notification => ApiError::notification_not_found(),
        EntityType::Comment => ApiError::from_code(ErrorCode::EntityNotFound),
    }
}

impl From<ChirpError> for ApiError {
    fn from(err: ChirpError) -> Self {
        match err {
            ChirpError::Storage(StorageError::NotFound { entity_type, .. })
            | ChirpError::Storage(StorageError::NotFoundByKey { entity_type, .. }) => {
                not_found_for(entity_type)
            }
            ChirpError::Storage(StorageError::InsertFailed { entity_type, reason }) => {
                ApiError::entity_already_exists(format!("{}: {}", entity_type, reason))
            }
            ChirpError::Storage(err @ StorageError::UpdateFailed { .. }) => {
                tracing::error!(error = %err, "storage update failed");
                ApiError::internal_error("Storage operation failed")
            }
            ChirpError::Storage(err) => {
                tracing::error!(error = %err, "graph store unavailable");
                ApiError::service_unavailable("Service temporarily unavailable")
            }
            ChirpError::Cache(err) => {
                tracing::warn!(error = %err, "cache error reached the API layer");
                ApiError::service_unavailable("Service temporarily unavailable")
            }
            ChirpError::Validation(err) => ApiError::validation_failed(err.to_string()),
            ChirpError::Operation(OperationError::NotPermitted { action, .. }) => {
                ApiError::forbidden(format!("Not authorized to {}", action))
            }
            ChirpError::Operation(err) => ApiError::invalid_operation(err.to_string()),
            ChirpError::Config(err) => ApiError::internal_error(err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ChirpError::from(err).into()
    }
}

impl From<OperationError> for ApiError {
    fn from(err: OperationError) -> Self {
        ChirpError::from(err).into()
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

/// Convert from uuid::Error to ApiError.
impl From<uuid::Error> for ApiError {
    fn from(err: uuid::Error) -> Self {
        ApiError::invalid_format("id", &format!("valid UUID: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chirp_core::{CacheError, ValidationError};
    use uuid::Uuid;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::InvalidOperation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::TweetNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::EntityAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::InternalError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::ServiceUnavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorCode::TooManyRequests.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_envelope_shape() {
        let err = ApiError::tweet_not_found();
        let body = err.envelope();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Tweet not found");
        assert_eq!(body["error"], "TWEET_NOT_FOUND");
        assert!(body.get("details").is_none());

        let body = ApiError::validation_failed("bad")
            .with_details(serde_json::json!({"field": "content"}))
            .envelope();
        assert_eq!(body["details"]["field"], "content");
    }

    #[test]
    fn test_taxonomy_mapping_from_core_errors() {
        let not_found: ApiError = ChirpError::Storage(StorageError::NotFound {
            entity_type: EntityType::Message,
            id: Uuid::nil(),
        })
        .into();
        assert_eq!(not_found.code, ErrorCode::MessageNotFound);

        let self_follow: ApiError = ChirpError::from(OperationError::SelfFollow).into();
        assert_eq!(self_follow.code, ErrorCode::InvalidOperation);
        assert_eq!(self_follow.message, "You cannot follow yourself");

        let forbidden: ApiError = ChirpError::from(OperationError::NotPermitted {
            role: "author".into(),
            action: "delete this tweet".into(),
        })
        .into();
        assert_eq!(forbidden.code, ErrorCode::Forbidden);

        let transient: ApiError = ChirpError::from(StorageError::Unavailable {
            reason: "down".into(),
        })
        .into();
        assert_eq!(transient.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let cache: ApiError = ChirpError::from(CacheError::Unavailable {
            reason: "down".into(),
        })
        .into();
        assert_eq!(cache.code, ErrorCode::ServiceUnavailable);

        let validation: ApiError = ChirpError::from(ValidationError::TooLong {
            field: "content".into(),
            max: 280,
        })
        .into();
        assert_eq!(validation.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::unauthorized("Invalid token");
        let json = serde_json::to_string(&err)?;
        assert!(json.contains("UNAUTHORIZED"));
        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }

    #[test]
    fn test_too_many_requests_message() {
        let err = ApiError::too_many_requests(Some(30));
        assert!(err.message.contains("30"));
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
