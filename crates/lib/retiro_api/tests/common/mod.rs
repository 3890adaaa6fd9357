//! Shared fixtures for router-level integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use retiro_api::{AppState, config::ApiConfig};
use retiro_core::config::{AuthConfig, Mode};
use retiro_core::delivery::{DeliveryError, Mailer};
use retiro_core::models::auth::Target;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

/// Records every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn last_body_for(&self, target: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(t, _)| t == target)
            .map(|(_, body)| body.clone())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, target: &Target, _subject: &str, body: &str) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((target.to_string(), body.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pool: SqlitePool,
    pub mailer: Arc<RecordingMailer>,
}

pub fn auth_config(mode: Mode) -> AuthConfig {
    let mut config = AuthConfig::new("integration-test-key", mode);
    config.bcrypt_cost = 4;
    config
}

pub async fn spawn_app(mode: Mode) -> TestApp {
    spawn_app_with(auth_config(mode)).await
}

pub async fn spawn_app_with(auth: AuthConfig) -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    retiro_api::migrate(&pool).await.expect("migrate");

    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::new(
        pool.clone(),
        ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            auth,
        },
        mailer.clone(),
    );

    TestApp {
        router: retiro_api::router(state.clone()),
        state,
        pool,
        mailer,
    }
}

impl TestApp {
    /// Send a request and decode the JSON response body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.expect("request");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse JSON")
        };
        (status, json)
    }

    /// POST a raw, possibly malformed, JSON body.
    pub async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, None, Some(body)).await
    }

    /// Request a code and return the value echoed in development mode.
    pub async fn dev_code(&self, target: &str, purpose: &str) -> String {
        let (status, json) = self
            .post(
                "/api/auth/send-code",
                serde_json::json!({ "target": target, "purpose": purpose }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        json["devCode"].as_str().expect("devCode").to_string()
    }

    /// Register without a code (development fallback) and return the token.
    pub async fn register_unverified(&self, username: &str, target: &str, password: &str) -> String {
        let (status, json) = self
            .post(
                "/api/auth/register",
                serde_json::json!({ "username": username, "password": password, "target": target }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        json["token"].as_str().expect("token").to_string()
    }
}
