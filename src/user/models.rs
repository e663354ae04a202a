use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Identifier of the administrator role (`admin_pusat`), seeded as row 1.
/// Users carrying this role fall under last-admin protection.
pub const ADMIN_ROLE_ID: i64 = 1;

/// Database model for the `users` table.
///
/// Carries the password hash, so it is never serialized into a response;
/// outward projections go through [`UserResponse`](super::types::UserResponse),
/// which has no password field at all.
#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: i64,
    pub region_id: Option<i64>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database model for the externally-seeded, read-only `roles` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RoleModel {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// A user row joined with its role, as read back from the store.
#[derive(Debug, Clone)]
pub struct UserWithRole {
    pub user: UserModel,
    pub role: RoleModel,
}

/// Field set for inserting a new user. The id and timestamps are assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: i64,
    pub region_id: Option<i64>,
    pub is_active: bool,
}
