//! Unified Error Handling
//!
//! Provides the application-wide error type and its HTTP mapping.
//!
//! Every error renders as the API's standard failure envelope:
//!
//! ```json
//! {
//!   "success": false,
//!   "message": "Validation failed",
//!   "errors": { "items[0].quantity": "Quantity must be a positive integer" }
//! }
//! ```
//!
//! `errors` is only present for field validation failures. Database and
//! internal errors are logged with their details and reported to the client
//! with a generic message.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::db::repository::RepoError;

/// Standard failure envelope
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Authentication Errors ==========
    #[error("Authentication required")]
    Unauthorized,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    // ========== Business Logic Errors ==========
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("{0}")]
    InsufficientStock(String),

    // ========== System Errors ==========
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            // Authentication errors (401)
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Not authorized to access this route".to_string(),
                None,
            ),
            AppError::TokenExpired => {
                (StatusCode::UNAUTHORIZED, "Token expired".to_string(), None)
            }
            AppError::InvalidToken(_) => {
                (StatusCode::UNAUTHORIZED, "Invalid token".to_string(), None)
            }

            // Not found (404)
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),

            // Conflict (409)
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),

            // Field validation (400) - carries the field -> reason map
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(errors),
            ),

            // Business failure naming the offending product (400)
            AppError::InsufficientStock(msg) => (StatusCode::BAD_REQUEST, msg, None),

            // Invalid request (400)
            AppError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg, None),

            // Database errors (500)
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error".to_string(),
                    None,
                )
            }

            // Internal errors (500)
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorBody {
            success: false,
            message,
            errors,
        });

        (status, body).into_response()
    }
}

// ========== Helper Constructors ==========

impl AppError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized
    }

    pub fn token_expired() -> Self {
        Self::TokenExpired
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(errors: BTreeMap<String, String>) -> Self {
        Self::Validation(errors)
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::Conflict(msg),
            RepoError::InsufficientStock(msg) => AppError::InsufficientStock(msg),
            RepoError::Validation(msg) => AppError::Invalid(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}
