// Public API - what other modules can use
pub use handlers::login;
pub use middleware::{require_role, verify_token};
pub use password::PasswordHasher;
pub use service::AuthService;
pub use token::TokenService;
pub use types::{Claims, Identity, LoginRequest, LoginResponse, LoginUser};

// Internal modules
mod handlers;
mod middleware;
mod password;
mod service;
mod token;
mod types;
