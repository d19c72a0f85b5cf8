use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Invalid OTP: {0}")]
    InvalidOtp(String),

    #[error("Ticket not verified: {0}")]
    NotVerified(String),

    #[error("Ticket already checked in")]
    DuplicateCheckIn {
        holder_name: String,
        checked_in_at: Option<DateTime<Utc>>,
    },

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Dependency failure: {0}")]
    DependencyError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyRegistered(_) => StatusCode::CONFLICT,
            AppError::InvalidOtp(_) => StatusCode::BAD_REQUEST,
            AppError::NotVerified(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateCheckIn { .. } => StatusCode::CONFLICT,
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DependencyError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyRegistered(_) => "ALREADY_REGISTERED",
            AppError::InvalidOtp(_) => "INVALID_OTP",
            AppError::NotVerified(_) => "NOT_VERIFIED",
            AppError::DuplicateCheckIn { .. } => "ALREADY_CHECKED_IN",
            AppError::Duplicate(_) => "DUPLICATE",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::DependencyError(_) => "DEPENDENCY_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::AlreadyRegistered(msg)
            | AppError::InvalidOtp(msg)
            | AppError::NotVerified(msg)
            | AppError::Duplicate(msg)
            | AppError::DependencyError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::DuplicateCheckIn { holder_name, .. } => {
                error!(holder_name = %holder_name, "Duplicate check-in rejected");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<&str> = errors.field_errors().keys().copied().collect();
        fields.sort_unstable();
        AppError::ValidationError(format!("Invalid request fields: {}", fields.join(", ")))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::AlreadyRegistered(msg)
            | AppError::InvalidOtp(msg)
            | AppError::NotVerified(msg)
            | AppError::Duplicate(msg)
            | AppError::DependencyError(msg) => msg.clone(),
            AppError::DuplicateCheckIn { .. } => "Ticket already checked in".to_string(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
        };

        // Only the duplicate check-in conflict carries structured details so
        // the scanning UI can show who already used the ticket and when.
        let details: Option<Value> = match &self {
            AppError::DuplicateCheckIn {
                holder_name,
                checked_in_at,
            } => Some(json!({
                "holderName": holder_name,
                "checkedInAt": checked_in_at,
            })),
            _ => None,
        };

        error_response(code, public_message, details, status)
    }
}
