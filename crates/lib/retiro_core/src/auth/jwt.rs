//! Session token minting and validation (HS256 JWT).
//!
//! Tokens are stateless: there is no revocation list, so a token stays valid
//! until it expires or the signing key changes.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{debug, info};

use super::AuthError;
use crate::config::{AuthConfig, Mode};
use crate::models::auth::{Account, SessionClaims};

/// Issues signed session tokens.
#[derive(Clone)]
pub struct SessionMinter {
    key: EncodingKey,
    ttl: Duration,
}

impl SessionMinter {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl: config.session_ttl,
        }
    }

    /// Mint a token for `account`, valid from now for the configured lifetime.
    pub fn mint(&self, account: &Account) -> Result<String, AuthError> {
        self.mint_at(account, Utc::now())
    }

    /// Mint a token as if issued at `issued_at`.
    pub fn mint_at(&self, account: &Account, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: account.id.to_string(),
            label: account.username.clone(),
            role: account.role,
            exp: (issued_at + self.ttl).timestamp(),
            iat: issued_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }
}

/// Verifies session tokens.
#[derive(Clone)]
pub struct SessionValidator {
    key: DecodingKey,
    validation: Validation,
}

impl SessionValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Verify signature and expiry, returning the claims on success.
    ///
    /// Tampered, foreign-key and expired tokens all fail the same way.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, AuthError> {
        decode::<SessionClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "session token rejected");
                AuthError::Unauthenticated
            })
    }
}

/// Resolve the signing key.
///
/// An explicit non-empty key always wins. Without one, development falls back
/// to a generated key persisted under the platform data directory, while
/// production refuses to start.
pub fn resolve_jwt_secret(explicit: Option<&str>, mode: Mode) -> Result<String, AuthError> {
    if let Some(secret) = explicit
        && !secret.is_empty()
    {
        return Ok(secret.to_string());
    }
    if !mode.is_development() {
        return Err(AuthError::Validation(
            "JWT_SECRET is required in production".into(),
        ));
    }

    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new development JWT secret");
    Ok(secret)
}

/// Path to the persisted development JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("retiro")
        .join("jwt-secret")
}
