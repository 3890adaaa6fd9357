//! Password hashing via bcrypt.
//!
//! The cost factor is embedded in every digest, so hashes made under an older
//! cost keep verifying after the configured cost changes.

use std::sync::OnceLock;

use super::AuthError;

/// bcrypt only looks at the first 72 bytes of its input.
const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password with bcrypt at `cost`.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::Validation(format!(
            "Password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash in constant time.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    // Longer inputs can never have been hashed, and would otherwise match on
    // their 72-byte prefix.
    if password.len() > MAX_PASSWORD_BYTES {
        return Ok(false);
    }
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// Stand-in digest checked when no account matched, so a miss costs as much
/// bcrypt work as a wrong password. Hashed once, at the first caller's cost.
static DUMMY_DIGEST: OnceLock<String> = OnceLock::new();

/// Run a full verification against a digest no password matches.
pub fn verify_dummy(password: &str, cost: u32) -> Result<(), AuthError> {
    let digest = match DUMMY_DIGEST.get() {
        Some(digest) => digest,
        None => {
            let digest = hash_password("retiro-no-such-account", cost)?;
            DUMMY_DIGEST.get_or_init(|| digest)
        }
    };
    verify_password(password, digest)?;
    Ok(())
}
