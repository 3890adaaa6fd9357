//! Authentication and authorization logic.
//!
//! Provides password hashing, one-time verification codes, session tokens,
//! the account registry queries and the role gate shared by `retiro_api`.

pub mod codes;
pub mod gate;
pub mod jwt;
pub mod password;
pub mod queries;

use thiserror::Error;

/// Authentication errors.
///
/// Credential, code and token failures deliberately carry no detail so callers
/// cannot tell a wrong password from a missing account, or an expired code
/// from a used one.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Already exists")]
    Conflict,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired code")]
    InvalidCode,

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
