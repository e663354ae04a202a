use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::instrument;

use super::{
    service::AuthService,
    types::{LoginRequest, LoginResponse},
};
use crate::shared::{AppError, AppState};

/// HTTP handler for logging in with username and password
///
/// POST /api/v1/auth/login
/// Returns a session token plus a slim user projection
#[instrument(name = "login", skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let service = AuthService::new(
        Arc::clone(&state.user_repository),
        state.password_hasher.clone(),
        state.token_service.clone(),
    );

    let response = service
        .login(&request.username, &request.password)
        .await
        .map_err(|e| e.or_internal("Error during login"))?;

    Ok(Json(response))
}
