//! Self-service handlers for the signed-in account.

use axum::extract::State;
use axum::{Extension, Json};
use retiro_core::models::auth::{Account, ProfileUpdate};

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::DeletedResponse;
use crate::services::accounts;

/// `GET /api/auth/me`: the caller's account.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<Account>> {
    let account = accounts::me(&state.pool, user.0.account_id()?).await?;
    Ok(Json(account))
}

/// `PUT /api/auth/profile`: update profile fields; omitted fields are kept.
pub async fn update_profile_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(body): AppJson<ProfileUpdate>,
) -> AppResult<Json<Account>> {
    let account = accounts::update_profile(&state.pool, user.0.account_id()?, &body).await?;
    Ok(Json(account))
}

/// `DELETE /api/auth/account`: delete the caller's account.
pub async fn delete_account_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<DeletedResponse>> {
    let resp = accounts::delete_self(&state.pool, user.0.account_id()?).await?;
    Ok(Json(resp))
}
