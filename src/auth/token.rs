use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument};

use super::types::Claims;
use crate::shared::AppError;

/// Issues and verifies signed, time-limited session tokens. Tokens are
/// stateless; there is no server-side revocation list. The signing secret is
/// injected at construction, never read from the environment here.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    ttl_hours: i64,
}

impl TokenService {
    pub fn new(secret: String, ttl_hours: i64) -> Self {
        Self { secret, ttl_hours }
    }

    /// Creates a signed token embedding the user id and role name, expiring
    /// `ttl_hours` after issue.
    #[instrument(skip(self))]
    pub fn issue(&self, user_id: i64, role_name: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role: role_name.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::hours(self.ttl_hours)).timestamp() as usize,
        };

        debug!(
            user_id,
            role = role_name,
            exp = claims.exp,
            "Issuing session token"
        );

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode session token");
            AppError::Internal(e.to_string())
        })
    }

    /// Verifies signature and expiry and returns the claims. Any failure
    /// (bad signature, malformed token, expired) is an unauthenticated
    /// condition, never a server error.
    #[instrument(skip(self, token))]
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(
                user_id = data.claims.sub,
                role = %data.claims.role,
                "Session token verified"
            );
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Session token verification failed");
            AppError::Unauthenticated("Invalid token".to_string())
        })
    }
}
