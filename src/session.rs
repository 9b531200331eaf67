use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No hay una sesión activa")]
    Missing,
    #[error("La sesión expiró el {0}")]
    Expired(DateTime<Utc>),
}

/// Source of the bearer token attached to authenticated requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, SessionError>;
}

/// Token configured up front (environment or config file).
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, SessionError> {
        if self.token.trim().is_empty() {
            return Err(SessionError::Missing);
        }

        if let Some(expires_at) = token_expiry(&self.token) {
            if expires_at <= Utc::now() {
                return Err(SessionError::Expired(expires_at));
            }
        }

        Ok(self.token.clone())
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Read the `exp` claim of a JWT without verifying it.
/// Returns `None` for opaque tokens.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Claims = serde_json::from_slice(&decoded).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}
