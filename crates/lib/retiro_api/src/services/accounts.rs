//! Account self-service and administration.

use chrono::Utc;
use retiro_core::auth::password::hash_password;
use retiro_core::auth::{AuthError, queries};
use retiro_core::config::AuthConfig;
use retiro_core::models::auth::{Account, NewAccount, ProfileUpdate, Role, Target};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::AppResult;
use crate::models::DeletedResponse;

/// Fetch the caller's own account.
pub async fn me(pool: &SqlitePool, account_id: i64) -> AppResult<Account> {
    let account = queries::get_account(pool, account_id)
        .await?
        .ok_or(AuthError::NotFound)?;
    Ok(account)
}

/// Apply a partial profile update to the caller's account.
pub async fn update_profile(
    pool: &SqlitePool,
    account_id: i64,
    update: &ProfileUpdate,
) -> AppResult<Account> {
    let account = queries::update_profile(pool, account_id, update, Utc::now())
        .await?
        .ok_or(AuthError::NotFound)?;
    Ok(account)
}

/// Delete the caller's own account.
pub async fn delete_self(pool: &SqlitePool, account_id: i64) -> AppResult<DeletedResponse> {
    if !queries::delete_account(pool, account_id).await? {
        return Err(AuthError::NotFound.into());
    }
    info!(account_id, "account deleted by holder");
    Ok(DeletedResponse { deleted: true })
}

/// List every account.
pub async fn list_accounts(pool: &SqlitePool) -> AppResult<Vec<Account>> {
    Ok(queries::list_accounts(pool).await?)
}

/// Delete any account (administrator operation).
pub async fn delete_account(
    pool: &SqlitePool,
    admin_id: i64,
    account_id: i64,
) -> AppResult<DeletedResponse> {
    if !queries::delete_account(pool, account_id).await? {
        return Err(AuthError::NotFound.into());
    }
    info!(admin_id, account_id, "account deleted by administrator");
    Ok(DeletedResponse { deleted: true })
}

/// Create a verified administrator unless one already exists.
///
/// `contact` is the administrator's e-mail or phone; like every account it
/// must have one. Returns the new account, or `None` when an administrator
/// was present.
pub async fn ensure_admin(
    pool: &SqlitePool,
    config: &AuthConfig,
    username: &str,
    contact: &str,
    password: &str,
) -> AppResult<Option<Account>> {
    if queries::admin_exists(pool).await? {
        return Ok(None);
    }

    let target = Target::parse(contact)?;
    let pw_hash = hash_password(password, config.bcrypt_cost)?;
    let account = queries::create_account(
        pool,
        &NewAccount {
            username,
            target: Some(&target),
            password_hash: &pw_hash,
            role: Role::Administrator,
            verified: true,
        },
        Utc::now(),
    )
    .await?;
    info!(account_id = account.id, username, "administrator account seeded");
    Ok(Some(account))
}
