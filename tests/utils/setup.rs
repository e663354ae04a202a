use std::sync::Arc;

use axum::Router;

use useradmin::auth::{PasswordHasher, TokenService};
use useradmin::routes::app_router;
use useradmin::shared::AppState;
use useradmin::user::models::NewUser;
use useradmin::user::repository::{InMemoryUserRepository, UserRepository};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "secret123";

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub app: Router,
    pub repository: Arc<InMemoryUserRepository>,
    pub token_service: TokenService,
}

impl TestSetup {
    /// Issues a token for a seeded user, claims matching the stored role.
    pub async fn token_for(&self, username: &str) -> String {
        let found = self
            .repository
            .find_by_username(username)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("user {username} not seeded"));
        self.token_service
            .issue(found.user.id, &found.role.name)
            .unwrap()
    }

    pub async fn user_id(&self, username: &str) -> i64 {
        self.repository
            .find_by_username(username)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("user {username} not seeded"))
            .user
            .id
    }
}

pub struct TestSetupBuilder {
    users: Vec<(String, i64)>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self { users: Vec::new() }
    }

    /// Seeds a user with `TEST_PASSWORD` and the given role id.
    pub fn with_user(mut self, username: &str, role_id: i64) -> Self {
        self.users.push((username.to_string(), role_id));
        self
    }

    pub fn with_admin(self, username: &str) -> Self {
        self.with_user(username, 1)
    }

    pub fn with_kabkota_user(self, username: &str) -> Self {
        self.with_user(username, 2)
    }

    pub async fn build(self) -> TestSetup {
        let repository = Arc::new(InMemoryUserRepository::with_default_roles());
        let password_hasher = PasswordHasher::new();
        let token_service = TokenService::new(TEST_SECRET.to_string(), 24);

        for (username, role_id) in &self.users {
            repository
                .insert(NewUser {
                    username: username.clone(),
                    email: format!("{username}@example.com"),
                    password_hash: password_hasher.hash(TEST_PASSWORD).unwrap(),
                    role_id: *role_id,
                    region_id: None,
                    is_active: true,
                })
                .await
                .unwrap();
        }

        let state = AppState::new(
            repository.clone(),
            token_service.clone(),
            password_hasher,
        );

        TestSetup {
            app: app_router(state),
            repository,
            token_service,
        }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
