use std::env;

use crate::error::ApiError;

/// Runtime configuration, resolved once from the environment by the
/// embedding server.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub session_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ApiError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ApiError::Configuration("DATABASE_URL is not set".to_string()))?;
        let session_secret = env::var("SESSION_SECRET")
            .map_err(|_| ApiError::Configuration("SESSION_SECRET is not set".to_string()))?;

        if session_secret.is_empty() {
            return Err(ApiError::Configuration(
                "SESSION_SECRET must not be empty".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            session_secret,
        })
    }
}

/// Signing key for session tokens. Falls back to an insecure development
/// default when SESSION_SECRET is not exported.
pub fn session_secret() -> Vec<u8> {
    env::var("SESSION_SECRET")
        .map(String::into_bytes)
        .unwrap_or_else(|_| {
            log::warn!("SESSION_SECRET is not set, using development default");
            b"development-secret".to_vec()
        })
}
