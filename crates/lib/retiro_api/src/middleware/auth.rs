//! Authentication middleware: Bearer token extraction and the role gate.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use retiro_core::auth::gate::{authorize, bearer_token};
use retiro_core::models::auth::{Role, SessionClaims};
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// Key used to store `SessionClaims` in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub SessionClaims);

/// Axum middleware: admits any account with a valid session token and injects
/// `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    admit(&state, request, next, Role::Ordinary).await
}

/// Axum middleware: like [`require_auth`] but rejects non-administrators with 403.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    admit(&state, request, next, Role::Administrator).await
}

async fn admit(
    state: &AppState,
    mut request: Request,
    next: Next,
    required: Role,
) -> Result<Response, AppError> {
    let bearer = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);

    let claims = authorize(&state.validator, bearer, required).inspect_err(|e| {
        debug!(path = %request.uri().path(), error = %e, "request not admitted");
    })?;

    request.extensions_mut().insert(AuthenticatedUser(claims));
    Ok(next.run(request).await)
}
