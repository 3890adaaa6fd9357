//! Authentication domain models.
//!
//! These are internal domain models; the HTTP request/response shapes live in
//! `retiro_api::models`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Ordinary,
    Administrator,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Ordinary => "ordinary",
            Role::Administrator => "administrator",
        }
    }

    /// Whether a holder of `self` may perform an operation requiring `required`.
    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::Ordinary => true,
            Role::Administrator => matches!(self, Role::Administrator),
        }
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ordinary" => Ok(Role::Ordinary),
            "administrator" => Ok(Role::Administrator),
            other => Err(AuthError::Internal(format!("unknown role '{other}'"))),
        }
    }
}

/// What a one-time code may be used for. Codes never cross purposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodePurpose {
    #[default]
    Register,
    Reset,
}

impl CodePurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            CodePurpose::Register => "register",
            CodePurpose::Reset => "reset",
        }
    }
}

impl FromStr for CodePurpose {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "register" => Ok(CodePurpose::Register),
            "reset" => Ok(CodePurpose::Reset),
            other => Err(AuthError::Validation(format!("unknown purpose '{other}'"))),
        }
    }
}

/// An address a one-time code can be delivered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Email(String),
    Phone(String),
}

impl Target {
    /// Classify and normalize a raw address.
    ///
    /// Anything containing `@` is an e-mail address (lowercased). Otherwise the
    /// value must be a phone number: digits with an optional leading `+`;
    /// spaces and dashes are stripped.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthError::Validation("Email or phone number is required".into()));
        }

        if let Some((local, domain)) = raw.split_once('@') {
            if local.is_empty() || domain.is_empty() || domain.contains('@') || raw.contains(' ') {
                return Err(AuthError::Validation("Invalid email address".into()));
            }
            return Ok(Target::Email(raw.to_lowercase()));
        }

        let phone: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        let digits = phone.strip_prefix('+').unwrap_or(&phone);
        if digits.len() < 5 || digits.len() > 20 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(AuthError::Validation("Invalid phone number".into()));
        }
        Ok(Target::Phone(phone))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Target::Email(v) | Target::Phone(v) => v,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Target::Email(v) => Some(v),
            Target::Phone(_) => None,
        }
    }

    pub fn phone(&self) -> Option<&str> {
        match self {
            Target::Phone(v) => Some(v),
            Target::Email(_) => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Demographic and financial inputs owned by an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub gender: i64,
    pub birth_date: Option<String>,
    pub job_type: i64,
    pub location_code: String,
    pub salary: f64,
    pub account_balance: f64,
    pub contribution_years: i64,
    pub contribution_index: f64,
}

/// Partial profile update. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub gender: Option<i64>,
    pub birth_date: Option<String>,
    pub job_type: Option<i64>,
    pub location_code: Option<String>,
    pub salary: Option<f64>,
    pub account_balance: Option<f64>,
    pub contribution_years: Option<i64>,
    pub contribution_index: Option<f64>,
}

/// Domain account. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub verified: bool,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

/// Account with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct AccountWithSecret {
    pub account: Account,
    pub password_hash: String,
}

/// Fields needed to create an account.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub username: &'a str,
    pub target: Option<&'a Target>,
    pub password_hash: &'a str,
    pub role: Role,
    pub verified: bool,
}

/// One-time code record stored in the database.
#[derive(Debug, Clone)]
pub struct VerificationCode {
    pub id: i64,
    pub target: String,
    pub purpose: CodePurpose,
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

/// JWT claims embedded in session tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: account ID (standard JWT `sub` claim).
    pub sub: String,
    /// Username of the account.
    pub label: String,
    pub role: Role,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

impl SessionClaims {
    /// Numeric account ID carried in `sub`.
    pub fn account_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::Unauthenticated)
    }
}
