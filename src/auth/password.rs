use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::{debug, instrument};

use crate::shared::AppError;

/// Salted one-way password hashing (Argon2id). Verification is deterministic;
/// the hash output is not, since a fresh salt is drawn per call. The work
/// factor comes from the Argon2 defaults, which are tuned to be expensive
/// enough to resist offline brute force.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    #[instrument(skip_all)]
    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                debug!(error = %e, "Password hashing failed");
                AppError::Internal(format!("Password hashing failed: {e}"))
            })
    }

    /// Checks a plaintext password against a stored hash. A malformed stored
    /// hash verifies as `false` rather than surfacing a distinct error into
    /// caller logic.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => {
                debug!("Stored password hash is malformed, treating as mismatch");
                false
            }
        }
    }
}
