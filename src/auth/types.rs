use serde::{Deserialize, Serialize};

use crate::user::models::UserWithRole;

/// Signed claim set carried by a session token. The role here is the role at
/// issue time; authorization always re-checks the current record (see
/// [`verify_token`](crate::auth::verify_token)).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: i64,     // user id
    pub role: String, // role name at issue time
    pub iat: usize,   // Issued at timestamp (standard JWT claim)
    pub exp: usize,   // Expiration timestamp (standard JWT claim)
}

/// The resolved, current user record attached to request extensions after
/// successful token verification.
#[derive(Debug, Clone)]
pub struct Identity(pub UserWithRole);

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

/// Slim user projection returned alongside a freshly issued token.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_serialization_round_trip() {
        let claims = Claims {
            sub: 42,
            role: "admin_pusat".to_string(),
            iat: 1234567800,
            exp: 1234567890,
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains("\"sub\":42"));
        assert!(json.contains("admin_pusat"));

        let deserialized: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, claims);
    }

    #[test]
    fn test_login_response_shape() {
        let response = LoginResponse {
            token: "jwt-token-here".to_string(),
            user: LoginUser {
                id: 1,
                username: "admin".to_string(),
                email: "admin@example.com".to_string(),
                role: "admin_pusat".to_string(),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token"], "jwt-token-here");
        assert_eq!(json["user"]["id"], 1);
        assert_eq!(json["user"]["role"], "admin_pusat");
        // The login projection carries no password-related field at all
        assert!(json["user"].get("password").is_none());
        assert!(json["user"].get("passwordHash").is_none());
    }
}
