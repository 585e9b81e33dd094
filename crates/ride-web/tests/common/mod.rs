#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use ride_web::config::ServerConfig;
use ride_web::state::AppState;

pub const ACCESS_SECRET: &str = "integration-access-secret-0123456789";
pub const REFRESH_SECRET: &str = "integration-refresh-secret-0123456789";

pub fn config(max_requests: u32) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.access_secret = ACCESS_SECRET.to_string();
    config.auth.refresh_secret = REFRESH_SECRET.to_string();
    config.rate_limit.max_requests = max_requests;
    config
}

pub fn state() -> AppState {
    AppState::new(config(1_000))
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: &axum::Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Registers an account and returns `(user_id, access_token, refresh_token)`.
pub async fn register(app: &axum::Router, email: &str, category: &str) -> (String, String, String) {
    let response = send(
        app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(serde_json::json!({
                "name": "Test User",
                "email": email,
                "phone": format!("+1-{email}"),
                "password": "correct-horse",
                "category": category,
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), 201, "register {email}");
    let body = body_json(response).await;
    (
        body["data"]["user"]["id"].as_str().unwrap().to_string(),
        body["data"]["tokens"]["access_token"].as_str().unwrap().to_string(),
        body["data"]["tokens"]["refresh_token"].as_str().unwrap().to_string(),
    )
}
