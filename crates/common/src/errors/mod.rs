//! Error types for Plenário services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - The portal's `{ success, error }` response envelope
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidFormat,
    InvalidTemplate,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidCredentials,
    InvalidToken,
    ExpiredToken,
    TwoFactorRequired,
    InvalidTwoFactorCode,

    // Authorization errors (3xxx)
    Forbidden,
    InsufficientRole,
    TenantMismatch,
    TenantInactive,

    // Resource errors (4xxx)
    NotFound,
    TenantNotFound,

    // Conflict errors (5xxx)
    Conflict,
    Duplicate,
    InvalidTransition,
    VotingClosed,
    ConsultationClosed,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // Internal errors (9xxx)
    InternalError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::InvalidTemplate => 1004,

            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidCredentials => 2002,
            ErrorCode::InvalidToken => 2003,
            ErrorCode::ExpiredToken => 2004,
            ErrorCode::TwoFactorRequired => 2005,
            ErrorCode::InvalidTwoFactorCode => 2006,

            ErrorCode::Forbidden => 3001,
            ErrorCode::InsufficientRole => 3002,
            ErrorCode::TenantMismatch => 3003,
            ErrorCode::TenantInactive => 3004,

            ErrorCode::NotFound => 4001,
            ErrorCode::TenantNotFound => 4002,

            ErrorCode::Conflict => 5001,
            ErrorCode::Duplicate => 5002,
            ErrorCode::InvalidTransition => 5003,
            ErrorCode::VotingClosed => 5004,
            ErrorCode::ConsultationClosed => 5005,

            ErrorCode::RateLimited => 6001,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::InternalError => 9001,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Invalid template: {message}")]
    InvalidTemplate { message: String },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Two-factor authentication required")]
    TwoFactorRequired,

    #[error("Invalid two-factor code")]
    InvalidTwoFactorCode,

    // Authorization errors
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Role {actual} cannot perform this action, requires {required}")]
    InsufficientRole { required: String, actual: String },

    #[error("Tenant mismatch")]
    TenantMismatch,

    #[error("Tenant is inactive: {slug}")]
    TenantInactive { slug: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("No chamber configured for host: {host}")]
    TenantNotFound { host: String },

    // Conflict errors
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Duplicate resource: {message}")]
    Duplicate { message: String },

    #[error("Invalid status transition for {entity}: {from} -> {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    #[error("Voting is not open for agenda item {id}")]
    VotingClosed { id: String },

    #[error("Public consultation {id} is not accepting opinions")]
    ConsultationClosed { id: String },

    // Rate limiting
    #[error("Rate limit exceeded, try again later")]
    RateLimited,

    // Database errors
    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Shorthand for a not-found error
    pub fn not_found(resource_type: &str, id: impl ToString) -> Self {
        AppError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }

    /// Shorthand for a validation error bound to a field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::InvalidTemplate { .. } => ErrorCode::InvalidTemplate,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::TwoFactorRequired => ErrorCode::TwoFactorRequired,
            AppError::InvalidTwoFactorCode => ErrorCode::InvalidTwoFactorCode,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::InsufficientRole { .. } => ErrorCode::InsufficientRole,
            AppError::TenantMismatch => ErrorCode::TenantMismatch,
            AppError::TenantInactive { .. } => ErrorCode::TenantInactive,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::TenantNotFound { .. } => ErrorCode::TenantNotFound,
            AppError::Conflict { .. } => ErrorCode::Conflict,
            AppError::Duplicate { .. } => ErrorCode::Duplicate,
            AppError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            AppError::VotingClosed { .. } => ErrorCode::VotingClosed,
            AppError::ConsultationClosed { .. } => ErrorCode::ConsultationClosed,
            AppError::RateLimited => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::InvalidFormat { .. }
            | AppError::InvalidTemplate { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. }
            | AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::ExpiredToken
            | AppError::TwoFactorRequired
            | AppError::InvalidTwoFactorCode => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::Forbidden { .. }
            | AppError::InsufficientRole { .. }
            | AppError::TenantMismatch
            | AppError::TenantInactive { .. } => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::NotFound { .. } | AppError::TenantNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::Conflict { .. }
            | AppError::Duplicate { .. }
            | AppError::InvalidTransition { .. }
            | AppError::VotingClosed { .. }
            | AppError::ConsultationClosed { .. } => StatusCode::CONFLICT,

            // 429 Too Many Requests
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::Internal { .. }
            | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 503 Service Unavailable
            AppError::DatabaseConnection { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Validation { field: Some(field), .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            AppError::InvalidTransition { from, to, .. } => {
                Some(serde_json::json!({ "from": from, "to": to }))
            }
            _ => None,
        }
    }
}

/// Unique-constraint violations become conflicts, everything else stays a database error
impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message)) => AppError::Duplicate { message },
            Some(SqlErr::ForeignKeyConstraintViolation(message)) => AppError::Conflict { message },
            _ => AppError::Database(err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: errors.to_string(),
            field,
        }
    }
}

/// Error envelope returned by every API route
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Database internals stay in the logs
        let message = match &self {
            AppError::Database(_) => "Database error".to_string(),
            _ => self.to_string(),
        };

        if self.is_server_error() {
            tracing::error!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            success: false,
            error: ErrorDetails {
                code,
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::not_found("parlamentar", "42");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Resource not found: parlamentar with id 42");
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::invalid_field("nome", "Nome é obrigatório");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
        assert_eq!(err.details(), Some(serde_json::json!({ "field": "nome" })));
    }

    #[test]
    fn test_transition_error_is_conflict() {
        let err = AppError::InvalidTransition {
            entity: "pauta".into(),
            from: "CONCLUIDA".into(),
            to: "VOTACAO".into(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code().as_code(), 5003);
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Internal {
            message: "Something went wrong".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }

    #[test]
    fn test_serialization_error_is_internal() {
        let err: AppError = serde_json::from_str::<u32>("\"x\"").unwrap_err().into();
        assert_eq!(err.code(), ErrorCode::SerializationError);
        assert_eq!(err.code().as_code(), 9003);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_plain_db_error_stays_database_error() {
        let err: AppError = DbErr::Custom("boom".into()).into();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_envelope_shape() {
        let body = ErrorResponse {
            success: false,
            error: ErrorDetails {
                code: ErrorCode::TenantNotFound,
                message: "No chamber configured for host: x".into(),
                details: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "TENANT_NOT_FOUND");
        assert!(json["error"].get("details").is_none());
    }
}
