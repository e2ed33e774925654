//! Shared helpers: an in-memory app and a request driver.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::Duration;
use keeper_api::config::ApiConfig;
use keeper_api::{AppState, Repositories};
use keeper_core::auth::jwt::JwtSettings;
use keeper_core::auth::password::BcryptHasher;
use keeper_core::memory::{MemoryKeychainRepository, MemoryTokenRepository, MemoryUserRepository};
use serde_json::Value;
use tower::ServiceExt;

pub fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        pg_connection_url: "postgres://unused".into(),
        jwt: JwtSettings {
            issuer: "keeper".into(),
            audience: "keeper-server".into(),
            access_secret: "integration-access-secret-000001".into(),
            access_ttl: Duration::minutes(15),
            refresh_secret: "integration-refresh-secret-00001".into(),
            refresh_ttl: Duration::days(30),
        },
        crypt_key: "integration-crypt-key-0000000001".into(),
    }
}

pub fn memory_repos() -> Repositories {
    Repositories {
        users: Arc::new(MemoryUserRepository::new()),
        tokens: Arc::new(MemoryTokenRepository::new()),
        keychain: Arc::new(MemoryKeychainRepository::new()),
    }
}

pub fn test_app() -> Router {
    let state = AppState::new(
        test_config(),
        memory_repos(),
        Arc::new(BcryptHasher::with_cost(4)),
    )
    .expect("valid test state");
    keeper_api::router(state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let resp = app.clone().oneshot(request).await.expect("request");
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    TestResponse {
        status,
        headers,
        json,
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Register `login` and return its access token.
pub async fn register(app: &Router, login: &str) -> String {
    let resp = send(
        app,
        json_request(
            Method::POST,
            "/api/auth/register",
            None,
            serde_json::json!({"login": login, "password": "password1"}),
        ),
    )
    .await;
    assert_eq!(resp.status, StatusCode::CREATED, "register {login}");
    resp.json["access_token"].as_str().unwrap().to_string()
}
