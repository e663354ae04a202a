use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{NewUser, RoleModel, UserModel, UserWithRole, ADMIN_ROLE_ID};
use crate::shared::AppError;

/// Outcome of a guarded delete. The last-admin check and the removal happen
/// in one storage transition, so two racing deletes cannot both pass the
/// count check.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    LastAdmin,
    NotFound,
}

/// Trait for user store operations. Reads always join the role in; the store
/// is also the backstop for the uniqueness invariant (unique indexes on
/// username and email), since service-level checks are read-then-write.
#[async_trait]
pub trait UserRepository {
    async fn list(&self) -> Result<Vec<UserWithRole>, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<UserWithRole>, AppError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserWithRole>, AppError>;
    /// True when a record other than `exclude_id` already uses the username
    /// or the email (single combined existence query).
    async fn username_or_email_taken(
        &self,
        username: &str,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppError>;
    async fn find_role(&self, role_id: i64) -> Result<Option<RoleModel>, AppError>;
    async fn insert(&self, user: NewUser) -> Result<UserWithRole, AppError>;
    async fn update(&self, user: &UserModel) -> Result<(), AppError>;
    /// Deletes a user unless doing so would leave zero active administrators.
    async fn delete_guarding_last_admin(&self, id: i64) -> Result<DeleteOutcome, AppError>;
    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError>;
}

/// In-memory implementation of UserRepository for development and testing
///
/// This provides a realistic implementation that can be used in development
/// without requiring a real database connection. Data is stored in memory
/// and will be lost when the application restarts. The same uniqueness and
/// last-admin guarantees the PostgreSQL schema enforces are emulated under a
/// single lock.
pub struct InMemoryUserRepository {
    inner: Mutex<Inner>,
}

struct Inner {
    users: HashMap<i64, UserModel>,
    roles: HashMap<i64, RoleModel>,
    next_id: i64,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    /// Creates an empty repository with no roles seeded.
    pub fn new() -> Self {
        Self::with_roles(Vec::new())
    }

    /// Creates a repository seeded with the given role rows.
    pub fn with_roles(roles: Vec<RoleModel>) -> Self {
        let roles = roles.into_iter().map(|role| (role.id, role)).collect();
        Self {
            inner: Mutex::new(Inner {
                users: HashMap::new(),
                roles,
                next_id: 1,
            }),
        }
    }

    /// Creates a repository seeded with the reference role set.
    pub fn with_default_roles() -> Self {
        Self::with_roles(vec![
            RoleModel {
                id: ADMIN_ROLE_ID,
                name: "admin_pusat".to_string(),
                description: Some("Central administrator".to_string()),
            },
            RoleModel {
                id: 2,
                name: "admin_kabkota".to_string(),
                description: Some("Regency/city administrator".to_string()),
            },
        ])
    }

    /// Returns the current number of user records (useful in tests).
    pub fn user_count(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }
}

impl Inner {
    fn join_role(&self, user: &UserModel) -> Result<UserWithRole, AppError> {
        let role = self.roles.get(&user.role_id).cloned().ok_or_else(|| {
            AppError::Database(format!("user {} references missing role {}", user.id, user.role_id))
        })?;
        Ok(UserWithRole {
            user: user.clone(),
            role,
        })
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<UserWithRole>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut users: Vec<&UserModel> = inner.users.values().collect();
        users.sort_by_key(|user| user.id);
        users.into_iter().map(|user| inner.join_role(user)).collect()
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<UserWithRole>, AppError> {
        let inner = self.inner.lock().unwrap();
        match inner.users.get(&id) {
            Some(user) => Ok(Some(inner.join_role(user)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<UserWithRole>, AppError> {
        let inner = self.inner.lock().unwrap();
        match inner.users.values().find(|user| user.username == username) {
            Some(user) => Ok(Some(inner.join_role(user)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn username_or_email_taken(
        &self,
        username: &str,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.values().any(|user| {
            Some(user.id) != exclude_id && (user.username == username || user.email == email)
        }))
    }

    #[instrument(skip(self))]
    async fn find_role(&self, role_id: i64) -> Result<Option<RoleModel>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.roles.get(&role_id).cloned())
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn insert(&self, user: NewUser) -> Result<UserWithRole, AppError> {
        let mut inner = self.inner.lock().unwrap();

        // Emulates the unique indexes the PostgreSQL schema carries.
        if inner
            .users
            .values()
            .any(|existing| existing.username == user.username || existing.email == user.email)
        {
            warn!("Unique constraint violation on insert");
            return Err(AppError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }

        let id = inner.next_id;
        inner.next_id += 1;
        let now = Utc::now();
        let model = UserModel {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role_id: user.role_id,
            region_id: user.region_id,
            is_active: user.is_active,
            last_login: None,
            created_at: now,
            updated_at: now,
        };

        let joined = inner.join_role(&model)?;
        inner.users.insert(id, model);
        debug!(user_id = id, "User created in memory");
        Ok(joined)
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn update(&self, user: &UserModel) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.users.contains_key(&user.id) {
            warn!(user_id = user.id, "User not found for update in memory");
            return Err(AppError::NotFound("User not found".to_string()));
        }
        if inner.users.values().any(|existing| {
            existing.id != user.id
                && (existing.username == user.username || existing.email == user.email)
        }) {
            warn!(user_id = user.id, "Unique constraint violation on update");
            return Err(AppError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }

        let mut updated = user.clone();
        updated.updated_at = Utc::now();
        inner.users.insert(user.id, updated);
        debug!(user_id = user.id, "User updated in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_guarding_last_admin(&self, id: i64) -> Result<DeleteOutcome, AppError> {
        let mut inner = self.inner.lock().unwrap();

        let Some(user) = inner.users.get(&id) else {
            return Ok(DeleteOutcome::NotFound);
        };

        if user.role_id == ADMIN_ROLE_ID {
            let active_admins = inner
                .users
                .values()
                .filter(|candidate| candidate.role_id == ADMIN_ROLE_ID && candidate.is_active)
                .count();
            if active_admins <= 1 {
                warn!(user_id = id, "Refusing to delete the last active admin");
                return Ok(DeleteOutcome::LastAdmin);
            }
        }

        inner.users.remove(&id);
        debug!(user_id = id, "User deleted from memory");
        Ok(DeleteOutcome::Deleted)
    }

    #[instrument(skip(self))]
    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.users.get_mut(&id) {
            Some(user) => {
                user.last_login = Some(at);
                Ok(())
            }
            None => Err(AppError::NotFound("User not found".to_string())),
        }
    }
}

/// PostgreSQL implementation of the user repository
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_WITH_ROLE_COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, u.role_id, \
     u.region_id, u.is_active, u.last_login, u.created_at, u.updated_at, \
     r.name AS role_name, r.description AS role_description";

fn row_to_user_with_role(row: &PgRow) -> UserWithRole {
    UserWithRole {
        user: UserModel {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            role_id: row.get("role_id"),
            region_id: row.get("region_id"),
            is_active: row.get("is_active"),
            last_login: row.get("last_login"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        },
        role: RoleModel {
            id: row.get("role_id"),
            name: row.get("role_name"),
            description: row.get("role_description"),
        },
    }
}

/// Maps a unique-index violation to the Conflict bucket; everything else is a
/// store failure whose detail stays in the log.
fn map_write_error(e: sqlx::Error) -> AppError {
    if let Some(code) = e.as_database_error().and_then(|db| db.code()) {
        if code == "23505" {
            return AppError::Conflict("Username or email already exists".to_string());
        }
    }
    warn!(error = %e, "Database write failed");
    AppError::Database(e.to_string())
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<UserWithRole>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_WITH_ROLE_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id ORDER BY u.id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list users");
            AppError::Database(e.to_string())
        })?;

        Ok(rows.iter().map(row_to_user_with_role).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<UserWithRole>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_WITH_ROLE_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = id, "Failed to fetch user");
            AppError::Database(e.to_string())
        })?;

        Ok(row.as_ref().map(row_to_user_with_role))
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<UserWithRole>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_WITH_ROLE_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch user by username");
            AppError::Database(e.to_string())
        })?;

        Ok(row.as_ref().map(row_to_user_with_role))
    }

    #[instrument(skip(self))]
    async fn username_or_email_taken(
        &self,
        username: &str,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT EXISTS( \
                 SELECT 1 FROM users \
                 WHERE (username = $1 OR email = $2) \
                   AND ($3::BIGINT IS NULL OR id <> $3) \
             ) AS taken",
        )
        .bind(username)
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to run existence query");
            AppError::Database(e.to_string())
        })?;

        Ok(row.get("taken"))
    }

    #[instrument(skip(self))]
    async fn find_role(&self, role_id: i64) -> Result<Option<RoleModel>, AppError> {
        let row = sqlx::query("SELECT id, name, description FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, role_id, "Failed to fetch role");
                AppError::Database(e.to_string())
            })?;

        Ok(row.map(|row| RoleModel {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
        }))
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn insert(&self, user: NewUser) -> Result<UserWithRole, AppError> {
        let row = sqlx::query(
            "INSERT INTO users (username, email, password_hash, role_id, region_id, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
             RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role_id)
        .bind(user.region_id)
        .bind(user.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        let id: i64 = row.get("id");
        debug!(user_id = id, "User created in database");

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database(format!("inserted user {id} could not be read back"))
        })
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn update(&self, user: &UserModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users \
             SET username = $2, email = $3, password_hash = $4, role_id = $5, \
                 region_id = $6, is_active = $7, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role_id)
        .bind(user.region_id)
        .bind(user.is_active)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            warn!(user_id = user.id, "User not found for update");
            return Err(AppError::NotFound("User not found".to_string()));
        }

        debug!(user_id = user.id, "User updated in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_guarding_last_admin(&self, id: i64) -> Result<DeleteOutcome, AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            warn!(error = %e, "Failed to open delete transaction");
            AppError::Database(e.to_string())
        })?;

        let row = sqlx::query("SELECT role_id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = id, "Failed to lock user row");
                AppError::Database(e.to_string())
            })?;

        let Some(row) = row else {
            return Ok(DeleteOutcome::NotFound);
        };

        let role_id: i64 = row.get("role_id");
        if role_id == ADMIN_ROLE_ID {
            let count_row = sqlx::query(
                "SELECT COUNT(*) AS active_admins FROM users WHERE role_id = $1 AND is_active",
            )
            .bind(ADMIN_ROLE_ID)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to count active admins");
                AppError::Database(e.to_string())
            })?;

            let active_admins: i64 = count_row.get("active_admins");
            if active_admins <= 1 {
                warn!(user_id = id, "Refusing to delete the last active admin");
                return Ok(DeleteOutcome::LastAdmin);
            }
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = id, "Failed to delete user");
                AppError::Database(e.to_string())
            })?;

        tx.commit().await.map_err(|e| {
            warn!(error = %e, "Failed to commit delete transaction");
            AppError::Database(e.to_string())
        })?;

        debug!(user_id = id, "User deleted from database");
        Ok(DeleteOutcome::Deleted)
    }

    #[instrument(skip(self))]
    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = id, "Failed to record login time");
                AppError::Database(e.to_string())
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }
}
