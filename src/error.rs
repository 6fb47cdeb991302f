//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::ledger::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Whether the caller may resubmit the same request
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// HTTP status, machine-readable code and optional details
    fn parts(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 404 Not Found
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, "not_found", Some(what.clone())),

            // 409 Conflict
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),

            // Domain errors - map to appropriate HTTP status
            AppError::Domain(domain_err) => match domain_err {
                DomainError::InvalidTransactionType(t) => (
                    StatusCode::BAD_REQUEST,
                    "invalid_transaction_type",
                    Some(t.clone()),
                ),
                DomainError::InvalidAmount(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_amount", Some(msg.clone()))
                }
                DomainError::AccountNotFound(id) => {
                    (StatusCode::NOT_FOUND, "account_not_found", Some(id.to_string()))
                }
                DomainError::AccountNotActive { status, .. } => (
                    StatusCode::BAD_REQUEST,
                    "account_not_active",
                    Some(status.to_string()),
                ),
                DomainError::InsufficientFunds { .. } => (
                    StatusCode::BAD_REQUEST,
                    "insufficient_funds",
                    Some(domain_err.to_string()),
                ),
            },

            // 503 Service Unavailable: nothing was committed, safe to retry
            AppError::Storage(e) if e.is_retryable() => {
                tracing::error!(error = %e, "Ledger store error");
                (StatusCode::SERVICE_UNAVAILABLE, "storage_error", None)
            }

            // Corrupt rows and rejected values fail identically on resubmission
            AppError::Storage(e) => {
                tracing::error!(error = %e, "Ledger store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = self.parts();

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
            retryable: self.is_retryable(),
        };

        (status, Json(body)).into_response()
    }
}
