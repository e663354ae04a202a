use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use strum_macros::EnumIter;

use super::models::UserWithRole;
use crate::shared::AppError;

/// Minimum accepted password length for create and change-password.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Closed set of roles the route gates dispatch on. Gating on an enum keeps a
/// typo at registration time a compile error instead of a silently
/// unreachable route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum RoleName {
    AdminPusat,
    AdminKabkota,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::AdminPusat => "admin_pusat",
            RoleName::AdminKabkota => "admin_kabkota",
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for RoleName {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "admin_pusat" => Ok(RoleName::AdminPusat),
            "admin_kabkota" => Ok(RoleName::AdminKabkota),
            other => Err(format!("unknown role name: {other}")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role_id: i64,
    pub region_id: Option<i64>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        Ok(())
    }
}

/// Partial update request. A field left out of the body keeps its stored
/// value. The nullable `regionId` needs a second level of `Option` to
/// distinguish "absent" (keep) from an explicit `null` (clear).
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role_id: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub region_id: Option<Option<i64>>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// Validates only the fields that were supplied.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.current_password.is_empty() {
            return Err(AppError::Validation(
                "currentPassword must not be empty".to_string(),
            ));
        }
        if self.new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "newPassword must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleResponse {
    pub name: String,
    pub description: Option<String>,
}

/// Outward projection of a user record with its role joined in. There is no
/// password field on this type, so a hash cannot leak through serialization.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role_id: i64,
    pub region_id: Option<i64>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub role: RoleResponse,
}

impl From<UserWithRole> for UserResponse {
    fn from(found: UserWithRole) -> Self {
        let UserWithRole { user, role } = found;
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role_id: user.role_id,
            region_id: user.region_id,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
            role: RoleResponse {
                name: role.name,
                description: role.description,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

fn validate_username(username: &str) -> Result<(), AppError> {
    if username.trim().is_empty() {
        return Err(AppError::Validation(
            "username must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    if !is_well_formed_email(email) {
        return Err(AppError::Validation(
            "email must be a valid email address".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn is_well_formed_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Deserializes a present-but-possibly-null field into `Some(Option<T>)`;
/// combined with `#[serde(default)]`, an absent field stays `None`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
