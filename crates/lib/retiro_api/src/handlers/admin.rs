//! Administrator request handlers.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use retiro_core::models::auth::Account;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::DeletedResponse;
use crate::services::accounts;

/// `GET /api/admin/users`: list all accounts.
pub async fn list_users_handler(State(state): State<AppState>) -> AppResult<Json<Vec<Account>>> {
    let accounts = accounts::list_accounts(&state.pool).await?;
    Ok(Json(accounts))
}

/// `DELETE /api/admin/users/{id}`: delete an account.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthenticatedUser>,
    Path(account_id): Path<i64>,
) -> AppResult<Json<DeletedResponse>> {
    let resp = accounts::delete_account(&state.pool, admin.0.account_id()?, account_id).await?;
    Ok(Json(resp))
}
