// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Remote service error ({service}): {message}")]
    RemoteService {
        service: String,
        /// HTTP status returned by the remote, `None` for transport failures.
        status: Option<u16>,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Build a remote error from a transport failure (no HTTP status).
    pub fn transport(service: &str, err: impl std::fmt::Display) -> Self {
        AppError::RemoteService {
            service: service.to_string(),
            status: None,
            message: err.to_string(),
        }
    }

    /// HTTP status of a failed remote call, if the remote answered at all.
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            AppError::RemoteService { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the remote rejected our credentials (expired or revoked token).
    pub fn is_remote_auth_error(&self) -> bool {
        matches!(self.remote_status(), Some(401) | Some(403))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::InvalidArgument(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_argument",
                Some(msg.clone()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::RemoteService {
                service, message, ..
            } => {
                tracing::warn!(service = %service, error = %message, "Remote service error");
                (StatusCode::BAD_GATEWAY, "remote_service_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Runtime(msg) => {
                tracing::error!(error = %msg, "Runtime error");
                (StatusCode::INTERNAL_SERVER_ERROR, "runtime_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
