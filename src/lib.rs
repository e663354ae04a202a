// Library crate for the user administration API server
// This file exposes the public API for integration tests

pub mod auth;
pub mod config;
pub mod routes;
pub mod shared;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use auth::{PasswordHasher, TokenService};
pub use routes::app_router;
pub use shared::{AppError, AppState};
pub use user::{models::UserModel, repository::UserRepository};
