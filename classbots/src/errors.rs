use crate::db::errors::DbError;
use crate::types::{Operation, Resource};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error as ThisError;
use utoipa::ToSchema;

/// Message returned for every failed PIN or password login. Never varies with the cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or PIN";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Login rejected. The message is uniform across unknown users and wrong secrets
    #[error("Invalid credentials")]
    InvalidCredentials { message: String },

    /// Caller lacks the role or ownership required for the operation
    #[error("Insufficient permissions to {action} {resource}")]
    InsufficientPermissions { action: Operation, resource: Resource },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Room code failed format validation
    #[error("Invalid room code format")]
    InvalidRoomCode,

    /// Room exists but has been deactivated by its teacher
    #[error("Room is inactive")]
    RoomInactive,

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Too many attempts inside the current rate limiting window
    #[error("{message}")]
    TooManyRequests { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// Conflict error, e.g., for unique constraint violations
    #[error("Conflict: {message}")]
    Conflict { message: String },
}

/// JSON error body returned by every endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Error {
    /// The uniform login failure
    pub fn invalid_credentials() -> Self {
        Error::InvalidCredentials {
            message: INVALID_CREDENTIALS_MESSAGE.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } | Error::InvalidCredentials { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } | Error::InvalidRoomCode | Error::RoomInactive => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Conflict { .. } => StatusCode::CONFLICT,
        }
    }

    /// Machine readable code included alongside the message, where one applies
    pub fn error_code(&self) -> Option<String> {
        let code = match self {
            Error::Unauthenticated { .. } => "UNAUTHENTICATED",
            Error::InvalidCredentials { .. } => "INVALID_CREDENTIALS",
            Error::InsufficientPermissions { .. } => "FORBIDDEN",
            Error::InvalidRoomCode => "INVALID_ROOM_CODE",
            Error::RoomInactive => "ROOM_INACTIVE",
            Error::NotFound { resource, .. } => {
                return Some(format!("{}_NOT_FOUND", resource.to_uppercase().replace(' ', "_")));
            }
            Error::TooManyRequests { .. } => "RATE_LIMITED",
            Error::Conflict { .. } | Error::Database(DbError::UniqueViolation { .. }) => "CONFLICT",
            Error::BadRequest { .. } | Error::Internal { .. } | Error::Database(_) | Error::Other(_) => return None,
        };
        Some(code.to_string())
    }

    /// Returns the message shown to the caller.
    ///
    /// Authentication failures never reveal which check failed. Everything else
    /// carries its cause.
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::InvalidCredentials { message } => message.clone(),
            Error::InsufficientPermissions { action, resource } => {
                format!("Insufficient permissions to {action} {resource}")
            }
            Error::BadRequest { message } => message.clone(),
            Error::InvalidRoomCode => "Invalid room code format. Room codes are 6 letters or digits.".to_string(),
            Error::RoomInactive => "This room is currently inactive. Please contact your teacher.".to_string(),
            Error::NotFound { resource, .. } => format!("{resource} not found"),
            Error::TooManyRequests { message } => message.clone(),
            Error::Internal { operation } => format!("Failed to {operation}"),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { table, conflicting_value, .. } => match (table.as_deref(), conflicting_value) {
                    (Some("student_profiles"), Some(value)) => format!("The username '{value}' is already taken"),
                    (Some("accounts"), _) => "An account with this email address already exists".to_string(),
                    _ => "Resource already exists".to_string(),
                },
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(err) => format!("Database error: {err}"),
            },
            Error::Other(err) => format!("Internal server error: {err}"),
            Error::Conflict { message } => message.clone(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InvalidCredentials { .. } | Error::InsufficientPermissions { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::TooManyRequests { .. } => {
                tracing::info!("Rate limited: {}", self);
            }
            Error::BadRequest { .. } | Error::InvalidRoomCode | Error::RoomInactive | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Conflict { .. } => {
                tracing::warn!("Conflict error: {}", self);
            }
        }

        let body = ErrorBody {
            error: self.user_message(),
            code: self.error_code(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_code_is_derived_from_resource() {
        let err = Error::NotFound {
            resource: "Room".to_string(),
            id: "AB12CD".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "Room not found");
        assert_eq!(err.error_code().as_deref(), Some("ROOM_NOT_FOUND"));
    }

    #[test]
    fn test_inactive_and_invalid_code_are_distinct_bad_requests() {
        assert_eq!(Error::RoomInactive.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::InvalidRoomCode.status_code(), StatusCode::BAD_REQUEST);
        assert_ne!(Error::RoomInactive.error_code(), Error::InvalidRoomCode.error_code());
    }

    #[test]
    fn test_invalid_credentials_message_is_uniform() {
        let err = Error::invalid_credentials();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.user_message(), INVALID_CREDENTIALS_MESSAGE);
    }

    #[test]
    fn test_internal_errors_surface_cause() {
        let err = Error::Internal {
            operation: "create session".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Failed to create session");
        assert_eq!(err.error_code(), None);
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let err = Error::Database(DbError::UniqueViolation {
            constraint: Some("student_profiles_username_lower_idx".to_string()),
            table: Some("student_profiles".to_string()),
            message: "duplicate key".to_string(),
            conflicting_value: Some("student1".to_string()),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.user_message(), "The username 'student1' is already taken");
    }
}
