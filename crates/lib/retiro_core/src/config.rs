//! Process-wide authentication configuration.
//!
//! Loaded once at startup and passed by value into the session minter,
//! validator and the code issuer. Nothing reads it from globals.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;

use crate::auth::AuthError;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Supported bcrypt cost range.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// Default number of digits in a one-time code.
pub const DEFAULT_CODE_DIGITS: u32 = 6;

/// Default one-time code lifetime: 5 minutes.
pub const DEFAULT_CODE_TTL_SECS: i64 = 5 * 60;

/// Default session lifetime: 7 days.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    pub fn is_development(self) -> bool {
        matches!(self, Mode::Development)
    }
}

impl FromStr for Mode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            other => Err(AuthError::Validation(format!("unknown mode '{other}'"))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => f.write_str("development"),
            Mode::Production => f.write_str("production"),
        }
    }
}

/// Authentication settings.
///
/// | Field                     | Effect                                              |
/// |---------------------------|-----------------------------------------------------|
/// | `jwt_secret`              | HS256 signing key for session tokens                |
/// | `bcrypt_cost`             | cost factor for newly hashed passwords (4..=31)     |
/// | `code_digits`             | length of one-time codes (4..=9)                    |
/// | `code_ttl`                | lifetime of a one-time code                         |
/// | `session_ttl`             | lifetime of a session token                         |
/// | `mode`                    | development returns codes inline and allows fallbacks |
/// | `allow_unverified_signup` | whether registration without a code is accepted     |
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub bcrypt_cost: u32,
    pub code_digits: u32,
    pub code_ttl: Duration,
    pub session_ttl: Duration,
    pub mode: Mode,
    pub allow_unverified_signup: bool,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("code_digits", &self.code_digits)
            .field("code_ttl", &self.code_ttl)
            .field("session_ttl", &self.session_ttl)
            .field("mode", &self.mode)
            .field("allow_unverified_signup", &self.allow_unverified_signup)
            .finish()
    }
}

impl AuthConfig {
    /// Defaults for `mode` with the given signing key.
    pub fn new(jwt_secret: impl Into<String>, mode: Mode) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            code_digits: DEFAULT_CODE_DIGITS,
            code_ttl: Duration::seconds(DEFAULT_CODE_TTL_SECS),
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            mode,
            allow_unverified_signup: mode.is_development(),
        }
    }

    /// Reject settings outside their supported range.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.is_empty() {
            return Err(AuthError::Validation("signing key must not be empty".into()));
        }
        if !BCRYPT_COST_RANGE.contains(&self.bcrypt_cost) {
            return Err(AuthError::Validation(format!(
                "bcrypt cost must be between {} and {}",
                BCRYPT_COST_RANGE.start(),
                BCRYPT_COST_RANGE.end()
            )));
        }
        if !(4..=9).contains(&self.code_digits) {
            return Err(AuthError::Validation(
                "code length must be between 4 and 9 digits".into(),
            ));
        }
        if self.code_ttl <= Duration::zero() || self.session_ttl <= Duration::zero() {
            return Err(AuthError::Validation("lifetimes must be positive".into()));
        }
        Ok(())
    }
}
