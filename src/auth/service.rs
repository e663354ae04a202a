use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    password::PasswordHasher,
    token::TokenService,
    types::{LoginResponse, LoginUser},
};
use crate::shared::AppError;
use crate::user::{models::UserWithRole, repository::UserRepository};

/// Service for credential checks and token issuance.
pub struct AuthService {
    repository: Arc<dyn UserRepository + Send + Sync>,
    password_hasher: PasswordHasher,
    token_service: TokenService,
}

impl AuthService {
    pub fn new(
        repository: Arc<dyn UserRepository + Send + Sync>,
        password_hasher: PasswordHasher,
        token_service: TokenService,
    ) -> Self {
        Self {
            repository,
            password_hasher,
            token_service,
        }
    }

    /// Verifies credentials and issues a session token. An unknown username
    /// and a wrong password produce the same rejection, so callers cannot
    /// probe which usernames exist. Records the login timestamp on success.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AppError> {
        let found = self.repository.find_by_username(username).await?;

        let Some(UserWithRole { user, role }) = found else {
            warn!("Login attempt for unknown username");
            return Err(AppError::Unauthenticated("Invalid credentials".to_string()));
        };

        if !self.password_hasher.verify(password, &user.password_hash) {
            warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(AppError::Unauthenticated("Invalid credentials".to_string()));
        }

        let token = self.token_service.issue(user.id, &role.name)?;
        self.repository.record_login(user.id, Utc::now()).await?;

        info!(user_id = user.id, role = %role.name, "Login successful");

        Ok(LoginResponse {
            token,
            user: LoginUser {
                id: user.id,
                username: user.username,
                email: user.email,
                role: role.name,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::models::NewUser;
    use crate::user::repository::InMemoryUserRepository;

    const SECRET: &str = "auth-service-test-secret";

    async fn service_with_user(username: &str, password: &str) -> AuthService {
        let repository = Arc::new(InMemoryUserRepository::with_default_roles());
        let hasher = PasswordHasher::new();
        repository
            .insert(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: hasher.hash(password).unwrap(),
                role_id: 1,
                region_id: None,
                is_active: true,
            })
            .await
            .unwrap();

        AuthService::new(
            repository,
            hasher,
            TokenService::new(SECRET.to_string(), 24),
        )
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token_with_stored_role() {
        let service = service_with_user("admin", "secret123").await;

        let response = service.login("admin", "secret123").await.unwrap();
        assert_eq!(response.user.username, "admin");
        assert_eq!(response.user.role, "admin_pusat");

        let claims = TokenService::new(SECRET.to_string(), 24)
            .verify(&response.token)
            .unwrap();
        assert_eq!(claims.sub, response.user.id);
        assert_eq!(claims.role, "admin_pusat");
    }

    #[tokio::test]
    async fn test_login_updates_last_login() {
        let repository = Arc::new(InMemoryUserRepository::with_default_roles());
        let hasher = PasswordHasher::new();
        let created = repository
            .insert(NewUser {
                username: "admin".to_string(),
                email: "admin@example.com".to_string(),
                password_hash: hasher.hash("secret123").unwrap(),
                role_id: 1,
                region_id: None,
                is_active: true,
            })
            .await
            .unwrap();
        assert!(created.user.last_login.is_none());

        let service = AuthService::new(
            repository.clone(),
            hasher,
            TokenService::new(SECRET.to_string(), 24),
        );
        service.login("admin", "secret123").await.unwrap();

        let after = repository
            .find_by_id(created.user.id)
            .await
            .unwrap()
            .unwrap();
        assert!(after.user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_are_indistinguishable() {
        let service = service_with_user("admin", "secret123").await;

        let wrong_password = service.login("admin", "wrong").await.unwrap_err();
        let unknown_user = service.login("nobody", "secret123").await.unwrap_err();

        let message = |e: AppError| match e {
            AppError::Unauthenticated(msg) => msg,
            other => panic!("expected Unauthenticated, got {other:?}"),
        };
        assert_eq!(message(wrong_password), message(unknown_user));
    }
}
