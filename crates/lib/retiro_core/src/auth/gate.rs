//! Authorization gate: session validation plus a role check.

use super::AuthError;
use super::jwt::SessionValidator;
use crate::models::auth::{Role, SessionClaims};

/// Admit a request carrying `bearer` if its token is valid and its role
/// satisfies `required`.
///
/// A missing, malformed, forged or expired token is `Unauthenticated`; a
/// valid token with too little privilege is `Forbidden`.
pub fn authorize(
    validator: &SessionValidator,
    bearer: Option<&str>,
    required: Role,
) -> Result<SessionClaims, AuthError> {
    let token = bearer
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Unauthenticated)?;
    let claims = validator.validate(token)?;
    if !claims.role.satisfies(required) {
        return Err(AuthError::Forbidden);
    }
    Ok(claims)
}

/// Extract the token from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}
