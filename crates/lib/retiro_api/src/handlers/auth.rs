//! Authentication request handlers.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::models::{
    LoginRequest, RegisterRequest, ResetPasswordRequest, ResetPasswordResponse, SendCodeRequest,
    SendCodeResponse, TokenResponse,
};
use crate::services::auth;

/// `POST /api/auth/send-code`: issue a one-time code to an e-mail or phone.
pub async fn send_code_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<SendCodeRequest>,
) -> AppResult<Json<SendCodeResponse>> {
    let resp = auth::send_code(
        &state.pool,
        state.mailer.as_ref(),
        &state.config.auth,
        &body.target,
        body.purpose,
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /api/auth/register`: create a new account.
pub async fn register_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::register(
        &state.pool,
        &state.config.auth,
        &state.minter,
        &body.username,
        &body.password,
        body.target.as_deref(),
        body.code.as_deref(),
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /api/auth/login`: authenticate with username/e-mail/phone + password.
pub async fn login_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login(
        &state.pool,
        &state.config.auth,
        &state.minter,
        &body.identifier,
        &body.password,
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /api/auth/reset-password`: set a new password using a reset code.
pub async fn reset_password_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<ResetPasswordRequest>,
) -> AppResult<Json<ResetPasswordResponse>> {
    let resp = auth::reset_password(
        &state.pool,
        &state.config.auth,
        &body.target,
        &body.code,
        &body.password,
    )
    .await?;
    Ok(Json(resp))
}
