use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use useradmin::auth::{PasswordHasher, TokenService};
use useradmin::config::AppConfig;
use useradmin::routes::app_router;
use useradmin::shared::AppState;
use useradmin::user::repository::{InMemoryUserRepository, PgUserRepository, UserRepository};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "useradmin=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting user administration API server");

    // Configuration is read once here; a missing signing secret is fatal.
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Refusing to start: {e}");
            std::process::exit(1);
        }
    };

    let user_repository: Arc<dyn UserRepository + Send + Sync> = match &config.database_url {
        Some(database_url) => {
            let pool = match sqlx::PgPool::connect(database_url).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("Failed to connect to database: {e}");
                    std::process::exit(1);
                }
            };
            info!("Connected to PostgreSQL");
            Arc::new(PgUserRepository::new(pool))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory store with seeded roles");
            Arc::new(InMemoryUserRepository::with_default_roles())
        }
    };

    let app_state = AppState::new(
        user_repository,
        TokenService::new(config.jwt_secret.clone(), config.token_ttl_hours),
        PasswordHasher::new(),
    );

    let app = app_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap();
    info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app).await.unwrap();
}
