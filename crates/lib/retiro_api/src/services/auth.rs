//! Authentication service: code issuance, registration, login and password
//! reset flows built on `retiro_core::auth`.
//!
//! Registration walks `Unauthenticated → CodeRequested → CodeVerified →
//! AccountCreated → SessionIssued`. A failed code check aborts before any
//! account row is written; a uniqueness failure after the code check leaves
//! the code consumed.

use chrono::Utc;
use retiro_core::auth::jwt::SessionMinter;
use retiro_core::auth::password::{hash_password, verify_dummy, verify_password};
use retiro_core::auth::{AuthError, codes, queries};
use retiro_core::config::AuthConfig;
use retiro_core::delivery::Mailer;
use retiro_core::models::auth::{Account, CodePurpose, NewAccount, Role, Target};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{ResetPasswordResponse, SendCodeResponse, TokenResponse};

/// Build a `TokenResponse` for a freshly minted token.
fn build_token_response(token: String, account: Account, config: &AuthConfig) -> TokenResponse {
    TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: config.session_ttl.num_seconds(),
        account,
    }
}

fn require_target(raw: Option<&str>) -> AppResult<Target> {
    match raw.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => Ok(Target::parse(t)?),
        None => Err(AppError::Validation(
            "Email or phone number is required".into(),
        )),
    }
}

/// Issue a one-time code for `target` and hand it to the mailer.
///
/// Delivery is best effort: `sent` is true as soon as the code is stored,
/// even if the transport failed. The code value is only echoed back in
/// development mode.
pub async fn send_code(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    config: &AuthConfig,
    target: &str,
    purpose: CodePurpose,
) -> AppResult<SendCodeResponse> {
    let target = require_target(Some(target))?;
    let issued = codes::issue_code(pool, mailer, config, &target, purpose, Utc::now()).await?;

    Ok(SendCodeResponse {
        sent: true,
        dev_code: config.mode.is_development().then_some(issued.value),
    })
}

/// Register a new account and issue its first session.
///
/// With a code, the code must be the latest live `register` code for the
/// target and the account is created verified. Without one, the account is
/// created unverified, if `allow_unverified_signup` permits it.
pub async fn register(
    pool: &SqlitePool,
    config: &AuthConfig,
    minter: &SessionMinter,
    username: &str,
    password: &str,
    target: Option<&str>,
    code: Option<&str>,
) -> AppResult<TokenResponse> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".into()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }
    let target = require_target(target)?;
    let pw_hash = hash_password(password, config.bcrypt_cost)?;

    let verified = match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => {
            let consumed =
                codes::try_consume(pool, &target, CodePurpose::Register, code, Utc::now()).await?;
            if consumed.is_none() {
                debug!("registration rejected: code did not validate");
                return Err(AuthError::InvalidCode.into());
            }
            true
        }
        None if config.allow_unverified_signup => false,
        None => {
            return Err(AppError::Validation(
                "Verification code is required".into(),
            ));
        }
    };

    let account = queries::create_account(
        pool,
        &NewAccount {
            username,
            target: Some(&target),
            password_hash: &pw_hash,
            role: Role::Ordinary,
            verified,
        },
        Utc::now(),
    )
    .await?;
    info!(account_id = account.id, verified, "account registered");

    let token = minter.mint(&account)?;
    Ok(build_token_response(token, account, config))
}

/// Authenticate with username, e-mail or phone plus password.
///
/// Unknown identifiers and wrong passwords produce the same error after the
/// same bcrypt work.
pub async fn login(
    pool: &SqlitePool,
    config: &AuthConfig,
    minter: &SessionMinter,
    identifier: &str,
    password: &str,
) -> AppResult<TokenResponse> {
    let identifier = identifier.trim();
    if identifier.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".into(),
        ));
    }

    let Some(found) = queries::find_by_identifier(pool, identifier).await? else {
        verify_dummy(password, config.bcrypt_cost)?;
        return Err(AuthError::InvalidCredentials.into());
    };
    if !verify_password(password, &found.password_hash)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = minter.mint(&found.account)?;
    info!(account_id = found.account.id, "login succeeded");
    Ok(build_token_response(token, found.account, config))
}

/// Replace the password of the account owning `target`, proven by a `reset` code.
///
/// A bad code and an unknown target both yield "invalid or expired code".
pub async fn reset_password(
    pool: &SqlitePool,
    config: &AuthConfig,
    target: &str,
    code: &str,
    password: &str,
) -> AppResult<ResetPasswordResponse> {
    let target = require_target(Some(target))?;
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::Validation("Verification code is required".into()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }
    let pw_hash = hash_password(password, config.bcrypt_cost)?;

    let now = Utc::now();
    if codes::try_consume(pool, &target, CodePurpose::Reset, code, now)
        .await?
        .is_none()
    {
        return Err(AuthError::InvalidCode.into());
    }
    let Some(account) = queries::find_by_target(pool, &target).await? else {
        return Err(AuthError::InvalidCode.into());
    };
    queries::update_password(pool, account.id, &pw_hash, now).await?;
    info!(account_id = account.id, "password reset");

    Ok(ResetPasswordResponse { reset: true })
}
