use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    models::NewUser,
    repository::{DeleteOutcome, UserRepository},
    types::{ChangePasswordRequest, CreateUserRequest, UpdateUserRequest, UserResponse},
};
use crate::auth::PasswordHasher;
use crate::shared::AppError;

/// Service for user management business logic: CRUD plus password change,
/// enforcing the uniqueness and last-admin-protection invariants on top of
/// the repository and the password hasher.
pub struct UserService {
    repository: Arc<dyn UserRepository + Send + Sync>,
    password_hasher: PasswordHasher,
}

impl UserService {
    pub fn new(
        repository: Arc<dyn UserRepository + Send + Sync>,
        password_hasher: PasswordHasher,
    ) -> Self {
        Self {
            repository,
            password_hasher,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserResponse>, AppError> {
        let users = self.repository.list().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i64) -> Result<UserResponse, AppError> {
        self.repository
            .find_by_id(id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Creates a user. The password is hashed before persistence and the
    /// record starts out active.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserResponse, AppError> {
        request.validate()?;

        if self
            .repository
            .username_or_email_taken(&request.username, &request.email, None)
            .await?
        {
            return Err(AppError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }
        if self.repository.find_role(request.role_id).await?.is_none() {
            return Err(AppError::Validation("Invalid role".to_string()));
        }

        let password_hash = self.password_hasher.hash(&request.password)?;
        let created = self
            .repository
            .insert(NewUser {
                username: request.username,
                email: request.email,
                password_hash,
                role_id: request.role_id,
                region_id: request.region_id,
                is_active: true,
            })
            .await?;

        info!(user_id = created.user.id, "User created");
        Ok(UserResponse::from(created))
    }

    /// Applies a partial update. Omitted fields keep their stored values; an
    /// explicit `regionId: null` clears the region. A supplied password is
    /// hashed exactly once here, on the write path; the stored hash is never
    /// re-hashed.
    #[instrument(skip(self, request), fields(user_id = id))]
    pub async fn update_user(
        &self,
        id: i64,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, AppError> {
        request.validate()?;

        let existing = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let mut user = existing.user;

        if request.username.is_some() || request.email.is_some() {
            let username = request.username.as_deref().unwrap_or(&user.username);
            let email = request.email.as_deref().unwrap_or(&user.email);
            if self
                .repository
                .username_or_email_taken(username, email, Some(id))
                .await?
            {
                return Err(AppError::Conflict(
                    "Username or email already exists".to_string(),
                ));
            }
        }
        if let Some(role_id) = request.role_id {
            if self.repository.find_role(role_id).await?.is_none() {
                return Err(AppError::Validation("Invalid role".to_string()));
            }
        }

        if let Some(username) = request.username {
            user.username = username;
        }
        if let Some(email) = request.email {
            user.email = email;
        }
        if let Some(password) = request.password {
            user.password_hash = self.password_hasher.hash(&password)?;
        }
        if let Some(role_id) = request.role_id {
            user.role_id = role_id;
        }
        if let Some(region_id) = request.region_id {
            user.region_id = region_id;
        }
        if let Some(is_active) = request.is_active {
            user.is_active = is_active;
        }

        self.repository.update(&user).await?;
        info!(user_id = id, "User updated");

        // Re-read so the response carries the (possibly changed) role join.
        self.get_user(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        match self.repository.delete_guarding_last_admin(id).await? {
            DeleteOutcome::Deleted => {
                info!(user_id = id, "User deleted");
                Ok(())
            }
            DeleteOutcome::LastAdmin => Err(AppError::Conflict(
                "Cannot delete the last admin user".to_string(),
            )),
            DeleteOutcome::NotFound => Err(AppError::NotFound("User not found".to_string())),
        }
    }

    /// Changes a user's password after verifying the supplied current
    /// password against the stored hash. A mismatch is a 400-class rejection,
    /// not the generic authentication failure.
    #[instrument(skip(self, request), fields(user_id = id))]
    pub async fn change_password(
        &self,
        id: i64,
        request: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        request.validate()?;

        let existing = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let mut user = existing.user;

        if !self
            .password_hasher
            .verify(&request.current_password, &user.password_hash)
        {
            return Err(AppError::Conflict(
                "Current password is incorrect".to_string(),
            ));
        }

        user.password_hash = self.password_hasher.hash(&request.new_password)?;
        self.repository.update(&user).await?;

        info!(user_id = id, "Password updated");
        Ok(())
    }
}
