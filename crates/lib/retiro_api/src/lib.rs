//! # retiro_api
//!
//! HTTP API library for Retiro.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use retiro_core::auth::jwt::{SessionMinter, SessionValidator};
use retiro_core::delivery::Mailer;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{account, admin, auth};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool.
    pub pool: SqlitePool,
    /// API configuration.
    pub config: ApiConfig,
    /// Delivery collaborator for one-time codes.
    pub mailer: Arc<dyn Mailer>,
    pub minter: SessionMinter,
    pub validator: SessionValidator,
}

impl AppState {
    /// Build state, deriving the session minter and validator from `config`.
    pub fn new(pool: SqlitePool, config: ApiConfig, mailer: Arc<dyn Mailer>) -> Self {
        let minter = SessionMinter::new(&config.auth);
        let validator = SessionValidator::new(&config.auth);
        Self {
            pool,
            config,
            mailer,
            minter,
            validator,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `retiro_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    retiro_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_AUTH_SEND_CODE, post(auth::send_code_handler))
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(
            routes::POST_AUTH_RESET_PASSWORD,
            post(auth::reset_password_handler),
        );

    // Protected routes (any signed-in account)
    let protected = Router::new()
        .route(routes::GET_AUTH_ME, get(account::me_handler))
        .route(routes::PUT_AUTH_PROFILE, put(account::update_profile_handler))
        .route(
            routes::DELETE_AUTH_ACCOUNT,
            delete(account::delete_account_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    // Administrator routes
    let admin = Router::new()
        .route(routes::GET_ADMIN_USERS, get(admin::list_users_handler))
        .route(routes::DELETE_ADMIN_USERS_ID, delete(admin::delete_user_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(admin)
        .layer(cors)
        .with_state(state)
}
