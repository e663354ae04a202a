// Public API - what other modules can use
pub use service::UserService;
pub use types::RoleName;

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;
