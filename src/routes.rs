use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth;
use crate::shared::AppState;
use crate::user::{handlers, types::RoleName};

/// Allow-lists for the role gates, fixed at route-registration time.
const ADMIN_PUSAT_ONLY: &[RoleName] = &[RoleName::AdminPusat];
const ANY_ADMIN: &[RoleName] = &[RoleName::AdminPusat, RoleName::AdminKabkota];

/// Builds the full application router: a liveness probe at the root and the
/// versioned API under `/api/v1`. Authenticated routes are layered with token
/// verification and, where required, a role gate inside it.
pub fn app_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/:id",
            put(handlers::update_user).delete(handlers::delete_user),
        )
        .route_layer(middleware::from_fn(|req, next| {
            auth::require_role(ADMIN_PUSAT_ONLY, req, next)
        }));

    let read_routes = Router::new()
        .route("/users/:id", get(handlers::get_user))
        .route_layer(middleware::from_fn(|req, next| {
            auth::require_role(ANY_ADMIN, req, next)
        }));

    // Any authenticated identity may hit change-password.
    let self_service_routes = Router::new().route(
        "/users/:id/change-password",
        post(handlers::change_password),
    );

    let protected = admin_routes
        .merge(read_routes)
        .merge(self_service_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::verify_token,
        ));

    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .merge(protected);

    Router::new()
        .route("/", get(|| async { "OK" }))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
