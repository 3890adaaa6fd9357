//! Integration tests: code issuance, registration, login, password reset and
//! self-service endpoints against an in-memory database.

mod common;

use axum::http::{Method, StatusCode};
use common::spawn_app;
use retiro_core::config::Mode;
use retiro_core::models::auth::Role;
use serde_json::json;

#[tokio::test]
async fn send_code_echoes_code_only_in_development() {
    let dev = spawn_app(Mode::Development).await;
    let code = dev.dev_code("a@x.com", "register").await;
    assert_eq!(code.len(), 6);
    assert!(dev.mailer.last_body_for("a@x.com").unwrap().contains(&code));

    let prod = spawn_app(Mode::Production).await;
    let (status, body) = prod
        .post("/api/auth/send-code", json!({ "target": "a@x.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sent"], true);
    assert!(body.get("devCode").is_none());
    assert_eq!(prod.mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn send_code_requires_a_target() {
    let app = spawn_app(Mode::Development).await;
    let (status, body) = app.post("/api/auth/send-code", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn malformed_bodies_get_the_error_envelope() {
    let app = spawn_app(Mode::Development).await;

    for (uri, body) in [
        ("/api/auth/login", "{\"identifier\": \"alice\""),
        ("/api/auth/send-code", "[1, 2, 3]"),
        (
            "/api/auth/send-code",
            "{\"email\": \"a@x.com\", \"phone\": \"13800000000\"}",
        ),
    ] {
        let (status, json) = app.post_raw(uri, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json["error"], "validation_error", "{body}");
        assert!(json["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}

#[tokio::test]
async fn register_with_code_then_reuse_fails() {
    let app = spawn_app(Mode::Development).await;
    let code = app.dev_code("a@x.com", "register").await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({ "username": "alice", "password": "p1", "target": "a@x.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["account"]["verified"], true);
    assert_eq!(body["account"]["email"], "a@x.com");
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 7 * 24 * 60 * 60);

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({ "username": "bob", "password": "p2", "target": "a@x.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_code");
    assert_eq!(body["message"], "Invalid or expired code");
}

#[tokio::test]
async fn register_without_code_in_development_is_unverified() {
    let app = spawn_app(Mode::Development).await;
    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({ "username": "alice", "password": "p1", "target": "alice@x.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["account"]["verified"], false);

    let claims = app
        .state
        .validator
        .validate(body["token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.label, "alice");
    assert_eq!(claims.role, Role::Ordinary);
}

#[tokio::test]
async fn register_without_code_in_production_is_rejected() {
    let app = spawn_app(Mode::Production).await;
    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({ "username": "alice", "password": "p1", "target": "alice@x.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Verification code is required");
}

#[tokio::test]
async fn wrong_code_writes_no_account() {
    let app = spawn_app(Mode::Development).await;
    let code = app.dev_code("a@x.com", "register").await;
    let wrong = if code == "000000" { "000001" } else { "000000" };

    let (status, _) = app
        .post(
            "/api/auth/register",
            json!({ "username": "alice", "password": "p1", "target": "a@x.com", "code": wrong }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/auth/login", json!({ "identifier": "alice", "password": "p1" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The real code is still usable after a wrong guess.
    let (status, _) = app
        .post(
            "/api/auth/register",
            json!({ "username": "alice", "password": "p1", "target": "a@x.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn reset_code_cannot_register() {
    let app = spawn_app(Mode::Development).await;
    let code = app.dev_code("a@x.com", "reset").await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({ "username": "alice", "password": "p1", "target": "a@x.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_code");
}

#[tokio::test]
async fn duplicate_username_conflicts_and_code_stays_consumed() {
    let app = spawn_app(Mode::Development).await;
    app.register_unverified("alice", "alice@x.com", "p1").await;

    let code = app.dev_code("other@x.com", "register").await;
    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({ "username": "alice", "password": "p2", "target": "other@x.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Already exists");

    let (status, _) = app
        .post(
            "/api/auth/register",
            json!({ "username": "carol", "password": "p2", "target": "other@x.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_requires_username_and_target() {
    let app = spawn_app(Mode::Development).await;

    let (status, body) = app
        .post("/api/auth/register", json!({ "password": "p1", "target": "a@x.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Username is required");

    let (status, body) = app
        .post("/api/auth/register", json!({ "username": "alice", "password": "p1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email or phone number is required");
}

#[tokio::test]
async fn login_accepts_username_email_or_phone() {
    let app = spawn_app(Mode::Development).await;
    app.register_unverified("alice", "alice@x.com", "p1").await;
    app.register_unverified("bob", "13800000000", "p2").await;

    for (identifier, password, expected) in [
        ("alice", "p1", "alice"),
        ("alice@x.com", "p1", "alice"),
        ("13800000000", "p2", "bob"),
    ] {
        let (status, body) = app
            .post(
                "/api/auth/login",
                json!({ "identifier": identifier, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{identifier}: {body}");
        assert_eq!(body["account"]["username"], expected);
    }

    // Legacy clients send the identifier as `username`.
    let (status, _) = app
        .post("/api/auth/login", json!({ "username": "alice", "password": "p1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_with_contact_spelled_as_registered() {
    let app = spawn_app(Mode::Development).await;
    app.register_unverified("alice", "Alice@X.com", "p1").await;
    app.register_unverified("bob", "138-0000-0000", "p2").await;

    for (identifier, password, expected) in [
        ("Alice@X.com", "p1", "alice"),
        ("138-0000-0000", "p2", "bob"),
    ] {
        let (status, body) = app
            .post(
                "/api/auth/login",
                json!({ "identifier": identifier, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{identifier}: {body}");
        assert_eq!(body["account"]["username"], expected);
    }
}

#[tokio::test]
async fn wrong_password_and_unknown_account_look_identical() {
    let app = spawn_app(Mode::Development).await;
    app.register_unverified("alice", "alice@x.com", "p1").await;

    let wrong_password = app
        .post("/api/auth/login", json!({ "identifier": "alice", "password": "nope" }))
        .await;
    let unknown_account = app
        .post("/api/auth/login", json!({ "identifier": "mallory", "password": "nope" }))
        .await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_account);
}

#[tokio::test]
async fn password_reset_requires_reset_code() {
    let app = spawn_app(Mode::Development).await;
    app.register_unverified("alice", "alice@x.com", "old-pass").await;

    let register_code = app.dev_code("alice@x.com", "register").await;
    let (status, _) = app
        .post(
            "/api/auth/reset-password",
            json!({ "target": "alice@x.com", "code": register_code, "password": "new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let reset_code = app.dev_code("alice@x.com", "reset").await;
    let (status, body) = app
        .post(
            "/api/auth/reset-password",
            json!({ "target": "alice@x.com", "code": reset_code, "password": "new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["reset"], true);

    let (status, _) = app
        .post("/api/auth/login", json!({ "identifier": "alice", "password": "old-pass" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .post("/api/auth/login", json!({ "identifier": "alice", "password": "new-pass" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn password_reset_for_unknown_target_is_generic() {
    let app = spawn_app(Mode::Development).await;
    let code = app.dev_code("ghost@x.com", "reset").await;
    let (status, body) = app
        .post(
            "/api/auth/reset-password",
            json!({ "target": "ghost@x.com", "code": code, "password": "x" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired code");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = spawn_app(Mode::Development).await;

    let (status, _) = app.call(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/api/auth/me", Some("not.a.token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.register_unverified("alice", "alice@x.com", "p1").await;
    let (status, body) = app.call(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "ordinary");
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn profile_update_and_self_deletion() {
    let app = spawn_app(Mode::Development).await;
    let token = app.register_unverified("alice", "alice@x.com", "p1").await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/auth/profile",
            Some(&token),
            Some(json!({ "salary": 9000.0, "contributionYears": 25 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["profile"]["salary"], 9000.0);
    assert_eq!(body["profile"]["contributionYears"], 25);
    assert_eq!(body["profile"]["locationCode"], "110000");

    let (status, body) = app
        .call(Method::DELETE, "/api/auth/account", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    // The token is still valid but the account is gone.
    let (status, _) = app.call(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
