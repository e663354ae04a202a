use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::types::Identity;
use crate::shared::{AppError, AppState};
use crate::user::types::RoleName;

/// Bearer-token authentication middleware. Verifies the token, then
/// re-fetches the current user record so role changes and deactivation take
/// effect on the next request rather than living on in stale claims. The
/// resolved identity is attached to request extensions.
///
/// Usage: .route_layer(middleware::from_fn_with_state(state.clone(), auth::verify_token))
#[instrument(skip(state, req, next))]
pub async fn verify_token(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(|| {
            warn!(uri = %req.uri(), "Missing or malformed Authorization header");
            AppError::Unauthenticated("No token provided".to_string())
        })?;

    let claims = state.token_service.verify(token)?;

    // A deactivated record is treated the same as an absent one.
    let resolved = state
        .user_repository
        .find_by_id(claims.sub)
        .await?
        .filter(|found| found.user.is_active);

    let identity = resolved.ok_or_else(|| {
        warn!(user_id = claims.sub, "Token subject not found or deactivated");
        AppError::Unauthenticated("User not found".to_string())
    })?;

    debug!(
        user_id = identity.user.id,
        role = %identity.role.name,
        "Request authenticated, attaching identity"
    );

    req.extensions_mut().insert(Identity(identity));
    Ok(next.run(req).await)
}

/// Role gate for an allow-list fixed at route-registration time. Must be
/// layered inside [`verify_token`]; reaching the gate without an attached
/// identity is a wiring error, reported as an internal error rather than a
/// recoverable runtime condition.
///
/// Usage: .route_layer(middleware::from_fn(|req, next| auth::require_role(&[RoleName::AdminPusat], req, next)))
pub async fn require_role(
    allowed: &'static [RoleName],
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Identity(identity) = req.extensions().get::<Identity>().ok_or_else(|| {
        warn!(uri = %req.uri(), "Role gate reached without an authenticated identity");
        AppError::Internal("Internal server error".to_string())
    })?;

    if !allowed
        .iter()
        .any(|role| role.as_str() == identity.role.name)
    {
        warn!(
            user_id = identity.user.id,
            role = %identity.role.name,
            "Role not in route allow-list"
        );
        return Err(AppError::Forbidden(
            "Not authorized to access this resource".to_string(),
        ));
    }

    Ok(next.run(req).await)
}
