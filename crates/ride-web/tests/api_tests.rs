//! Account and driver flows through the HTTP API.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use ride_core::{CoreResult, Notification, Notifier};
use serde_json::json;
use tokio::sync::mpsc;

use ride_web::auth::password::hash_password;
use ride_web::config::AdminSeed;
use ride_web::state::AppState;

use common::*;

#[tokio::test]
async fn health() {
    let app = ride_web::app(state());
    let response = send(&app, request("GET", "/api/health", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn register_then_login() {
    let app = ride_web::app(state());
    let (id, _, _) = register(&app, "Ana@Example.com", "rider").await;

    let response = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "correct-horse" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["user"]["id"], id.as_str());
    assert_eq!(body["data"]["tokens"]["token_type"], "Bearer");
    assert_eq!(body["data"]["tokens"]["expires_in"], 900);
    assert!(body["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn bad_credentials_are_indistinguishable() {
    let app = ride_web::app(state());
    register(&app, "bo@example.com", "rider").await;

    for (email, password) in [
        ("bo@example.com", "wrong-password"),
        ("nobody@example.com", "correct-horse"),
    ] {
        let response = send(
            &app,
            request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["reason"], "invalid_credentials");
    }
}

#[tokio::test]
async fn register_rejects_admin_duplicates_and_short_passwords() {
    let app = ride_web::app(state());
    let attempt = |email: &str, password: &str, category: &str| {
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "X",
                "email": email,
                "phone": format!("+9-{email}"),
                "password": password,
                "category": category,
            })),
        )
    };

    let response = send(&app, attempt("root@example.com", "long-enough", "admin")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, attempt("short@example.com", "short", "rider")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    register(&app, "dup@example.com", "rider").await;
    let response = send(&app, attempt("dup@example.com", "long-enough", "rider")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn refresh_issues_new_pair() {
    let app = ride_web::app(state());
    let (id, access, refresh) = register(&app, "cy@example.com", "driver").await;

    let response = send(
        &app,
        request(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["user"]["id"], id.as_str());
    let new_access = body["data"]["tokens"]["access_token"].as_str().unwrap();
    let response = send(&app, request("GET", "/api/users/me", Some(new_access), None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // An access token is not accepted by the refresh flow.
    let response = send(
        &app,
        request(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": access })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["reason"], "kind_mismatch");
}

async fn seeded_admin(state: &AppState) -> String {
    let app = ride_web::app(state.clone());
    let response = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "admin@example.com", "password": "admin-password" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]["tokens"]["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn driver_onboarding_and_verification() {
    let mut config = config(1_000);
    config.admins.push(AdminSeed {
        name: "Admin".to_string(),
        email: "admin@example.com".to_string(),
        phone: "+0".to_string(),
        password_hash: hash_password("admin-password").unwrap(),
    });
    let state = AppState::new(config);
    state.seed_admins().await.unwrap();
    let app = ride_web::app(state.clone());

    let (_, driver, _) = register(&app, "dee@example.com", "driver").await;

    // Nothing onboarded yet.
    let response = send(&app, request("GET", "/api/drivers/profile", Some(&driver), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        request(
            "POST",
            "/api/drivers/verify",
            Some(&driver),
            Some(json!({
                "license_number": "DL-42",
                "vehicle": { "type": "car", "model": "Corolla", "plate_number": "AB-123" },
                "documents": [
                    { "type": "license", "file_url": "https://files.example.com/dl.pdf" },
                    { "type": "insurance", "file_url": "https://files.example.com/ins.pdf" }
                ]
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "pending");
    let driver_id = body["data"]["verification_id"].as_str().unwrap().to_string();

    let availability = |available: bool| {
        request(
            "PUT",
            "/api/drivers/availability",
            Some(&driver),
            Some(json!({ "is_available": available })),
        )
    };

    // Unverified drivers cannot go online.
    let response = send(&app, availability(true)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = seeded_admin(&state).await;
    let response = send(
        &app,
        request(
            "PUT",
            &format!("/api/admin/drivers/{driver_id}/verification"),
            Some(&admin),
            Some(json!({ "verified": true })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["is_verified"], true);

    let response = send(&app, availability(true)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["is_available"], true);

    let response = send(
        &app,
        request(
            "PUT",
            "/api/drivers/location",
            Some(&driver),
            Some(json!({ "latitude": 52.52, "longitude": 13.405 })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        request(
            "PUT",
            "/api/drivers/location",
            Some(&driver),
            Some(json!({ "latitude": 91.0, "longitude": 0.0 })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, request("GET", "/api/drivers/documents", Some(&driver), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);

    let response = send(&app, request("GET", "/api/drivers/profile", Some(&driver), None)).await;
    let profile = body_json(response).await;
    assert_eq!(profile["data"]["license_number"], "DL-42");
    assert_eq!(profile["data"]["current_location"]["latitude"], 52.52);
}

#[tokio::test]
async fn unknown_driver_verification_is_not_found() {
    let mut config = config(1_000);
    config.admins.push(AdminSeed {
        name: "Admin".to_string(),
        email: "admin@example.com".to_string(),
        phone: "+0".to_string(),
        password_hash: hash_password("admin-password").unwrap(),
    });
    let state = AppState::new(config);
    state.seed_admins().await.unwrap();
    let app = ride_web::app(state.clone());
    let admin = seeded_admin(&state).await;

    let response = send(
        &app,
        request(
            "PUT",
            "/api/admin/drivers/missing/verification",
            Some(&admin),
            Some(json!({ "verified": true })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Account lifecycle --------------------------------------------------------

struct ChannelNotifier(mpsc::UnboundedSender<(String, Notification)>);

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, recipient: &str, notification: Notification) -> CoreResult<()> {
        let _ = self.0.send((recipient.to_string(), notification));
        Ok(())
    }
}

async fn next_mail(rx: &mut mpsc::UnboundedReceiver<(String, Notification)>) -> (String, Notification) {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("notification sent")
        .expect("channel open")
}

#[tokio::test]
async fn registration_sends_verification_token() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let state = state().with_notifier(Arc::new(ChannelNotifier(tx)));
    let app = ride_web::app(state.clone());
    register(&app, "Vi@Example.com", "rider").await;

    let stored = state.users.find_by_email("vi@example.com").await.unwrap().unwrap();
    let (recipient, mail) = next_mail(&mut rx).await;
    assert_eq!(recipient, "vi@example.com");
    assert_eq!(
        mail,
        Notification::Verification {
            token: stored.verify_token.unwrap()
        }
    );
}

#[tokio::test]
async fn verify_email_consumes_token() {
    let state = state();
    let app = ride_web::app(state.clone());
    let (id, _, _) = register(&app, "ev@example.com", "rider").await;
    let token = state
        .users
        .find_by_id(&id)
        .await
        .unwrap()
        .unwrap()
        .verify_token
        .unwrap();

    for uri in ["/api/auth/verify-email", "/api/auth/verify-email?token="] {
        let response = send(&app, request("GET", uri, None, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            body_json(response).await["error"],
            "verification token is required"
        );
    }

    let response = send(&app, request("GET", "/api/auth/verify-email?token=bogus", None, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let uri = format!("/api/auth/verify-email?token={token}");
    let response = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["message"], "email verified successfully");

    let stored = state.users.find_by_id(&id).await.unwrap().unwrap();
    assert!(stored.is_email_verified);
    assert!(stored.verify_token.is_none());

    // The token is single use.
    let response = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn forgot(email: &str) -> axum::http::Request<axum::body::Body> {
    request(
        "POST",
        "/api/auth/forgot-password",
        None,
        Some(json!({ "email": email })),
    )
}

fn reset(token: &str, new_password: &str) -> axum::http::Request<axum::body::Body> {
    request(
        "POST",
        "/api/auth/reset-password",
        None,
        Some(json!({ "token": token, "new_password": new_password })),
    )
}

fn login(email: &str, password: &str) -> axum::http::Request<axum::body::Body> {
    request(
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
}

#[tokio::test]
async fn forgot_password_does_not_reveal_accounts() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let state = state().with_notifier(Arc::new(ChannelNotifier(tx)));
    let app = ride_web::app(state.clone());
    register(&app, "fp@example.com", "rider").await;
    next_mail(&mut rx).await;

    let known = send(&app, forgot("fp@example.com")).await;
    assert_eq!(known.status(), StatusCode::OK);
    let known = body_json(known).await;

    let unknown = send(&app, forgot("nobody@example.com")).await;
    assert_eq!(unknown.status(), StatusCode::OK);
    assert_eq!(body_json(unknown).await, known);
    assert_eq!(
        known["data"]["message"],
        "if your email is registered, you will receive a password reset link"
    );

    // Only the registered address gets mail.
    let stored = state.users.find_by_email("fp@example.com").await.unwrap().unwrap();
    let (recipient, mail) = next_mail(&mut rx).await;
    assert_eq!(recipient, "fp@example.com");
    assert_eq!(
        mail,
        Notification::PasswordReset {
            token: stored.reset_token.unwrap()
        }
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn reset_password_replaces_credentials() {
    let state = state();
    let app = ride_web::app(state.clone());
    register(&app, "rp@example.com", "driver").await;
    assert_eq!(send(&app, forgot("rp@example.com")).await.status(), StatusCode::OK);
    let token = state
        .users
        .find_by_email("rp@example.com")
        .await
        .unwrap()
        .unwrap()
        .reset_token
        .unwrap();

    let response = send(&app, reset(&token, "short")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, reset("not-a-token", "brand-new-pass")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid or expired reset token");

    let response = send(&app, reset(&token, "brand-new-pass")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["message"], "password reset successfully");

    assert_eq!(
        send(&app, login("rp@example.com", "correct-horse")).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        send(&app, login("rp@example.com", "brand-new-pass")).await.status(),
        StatusCode::OK
    );

    // Consumed.
    let response = send(&app, reset(&token, "another-pass")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_reset_token_is_rejected() {
    let state = state();
    let app = ride_web::app(state.clone());
    register(&app, "late@example.com", "rider").await;
    send(&app, forgot("late@example.com")).await;

    let mut user = state
        .users
        .find_by_email("late@example.com")
        .await
        .unwrap()
        .unwrap();
    let token = user.reset_token.clone().unwrap();
    user.reset_expires = Some(1);
    state.users.update(user).await.unwrap();

    let response = send(&app, reset(&token, "brand-new-pass")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid or expired reset token");
    assert_eq!(
        send(&app, login("late@example.com", "correct-horse")).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn user_lookup_by_id() {
    let app = ride_web::app(state());
    let (_, viewer, _) = register(&app, "viewer@example.com", "rider").await;
    let (other, _, _) = register(&app, "other@example.com", "driver").await;

    let uri = format!("/api/users/{other}");
    let response = send(&app, request("GET", &uri, Some(&viewer), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["id"], other.as_str());
    assert_eq!(body["data"]["category"], "driver");
    assert_eq!(body["data"]["is_email_verified"], false);
    assert!(body["data"].get("password_hash").is_none());
    assert!(body["data"].get("verify_token").is_none());

    let response = send(&app, request("GET", "/api/users/missing", Some(&viewer), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
