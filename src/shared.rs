use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::auth::{PasswordHasher, TokenService};
use crate::user::repository::UserRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub token_service: TokenService,
    pub password_hasher: PasswordHasher,
}

impl AppState {
    pub fn new(
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        token_service: TokenService,
        password_hasher: PasswordHasher,
    ) -> Self {
        Self {
            user_repository,
            token_service,
            password_hasher,
        }
    }
}

/// Application error taxonomy. Every service failure maps to exactly one
/// variant at the request boundary; nothing propagates past it unhandled.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad input shape (malformed email, short password, ...)
    #[error("{0}")]
    Validation(String),

    /// Invariant violation: uniqueness, last-admin protection, wrong current password
    #[error("{0}")]
    Conflict(String),

    /// Missing/invalid/expired token, or a token subject that no longer resolves
    #[error("{0}")]
    Unauthenticated(String),

    /// Valid identity, insufficient role
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Store failure; the detail never reaches the client
    #[error("Database error: {0}")]
    Database(String),

    /// Unexpected failure with a client-safe message
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Collapses unexpected failures into a generic per-operation message for
    /// the client, keeping the detail in the operational log. Taxonomy errors
    /// pass through untouched.
    pub fn or_internal(self, message: &str) -> AppError {
        match self {
            AppError::Database(detail) | AppError::Internal(detail) => {
                error!(detail = %detail, "{message}");
                AppError::Internal(message.to_string())
            }
            other => other,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(msg) | AppError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Database(detail) => {
                error!(detail = %detail, "Unhandled database error at request boundary");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "message": message
        }));

        (status, body).into_response()
    }
}
