use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-empty value")]
    MissingJwtSecret,
}

/// Process-wide configuration, read from the environment exactly once at
/// startup and passed explicitly into the components that need it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// When unset the server runs against the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl AppConfig {
    pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

    /// Loads configuration from the environment. A missing or empty
    /// `JWT_SECRET` is a startup error: the server must never sign tokens
    /// with a default key.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|secret| !secret.trim().is_empty())
            .ok_or(ConfigError::MissingJwtSecret)?;

        let token_ttl_hours = std::env::var("TOKEN_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::DEFAULT_TOKEN_TTL_HOURS);

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            jwt_secret,
            token_ttl_hours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so the JWT_SECRET mutations cannot interleave across
    // parallel test threads.
    #[test]
    fn test_from_env_requires_signing_secret() {
        std::env::remove_var("JWT_SECRET");
        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::MissingJwtSecret)
        ));

        std::env::set_var("JWT_SECRET", "   ");
        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::MissingJwtSecret)
        ));

        std::env::set_var("JWT_SECRET", "a-real-secret");
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.jwt_secret, "a-real-secret");
        assert_eq!(config.token_ttl_hours, AppConfig::DEFAULT_TOKEN_TTL_HOURS);
        std::env::remove_var("JWT_SECRET");
    }
}
