//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, request::Builder, Request, Response},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;

use edge_gatekeeper::config::{GatekeeperConfig, PLACEHOLDER_SECRET};
use edge_gatekeeper::routing::ManifestRoute;
use edge_gatekeeper::security::RateLimiter;
use edge_gatekeeper::session::{Role, SessionData, SessionIdentity};
use edge_gatekeeper::HttpServer;

pub const BROWSER_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Development config with a small manifest.
pub fn test_config() -> GatekeeperConfig {
    let mut config = GatekeeperConfig::default();
    config.observability.metrics_enabled = false;
    let manifest = &mut config.manifest.inline;
    manifest
        .redirects
        .insert("/dashboard/old-packages".into(), "/dashboard/client/packages".into());
    manifest
        .aliases
        .insert("/portal/home".into(), "/dashboard/client".into());
    manifest.routes.insert(
        "portal-welcome".into(),
        ManifestRoute {
            path: "/portal/welcome".into(),
            public: true,
        },
    );
    config
}

pub fn server(config: &GatekeeperConfig) -> HttpServer {
    HttpServer::new(config, Arc::new(RateLimiter::new(&config.rate_limit)))
}

pub fn identity(user_id: &str, role: Role, tenant_id: Option<&str>) -> SessionIdentity {
    SessionIdentity {
        user_id: user_id.into(),
        email: format!("{user_id}@example.com"),
        role,
        tenant_id: tenant_id.map(str::to_string),
    }
}

pub fn token(server: &HttpServer, user_id: &str, role: Role, tenant_id: Option<&str>) -> String {
    server
        .gatekeeper()
        .load()
        .sessions()
        .create_session(identity(user_id, role, tenant_id))
        .unwrap()
}

/// Token signed with the default secret but arbitrary timestamps.
pub fn token_with_times(user_id: &str, role: Role, iat: i64, exp: i64) -> String {
    let claims = SessionData {
        user_id: user_id.into(),
        email: format!("{user_id}@example.com"),
        role,
        tenant_id: None,
        iat,
        exp,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(PLACEHOLDER_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Browser-like request against localhost.
pub fn get(path: &str) -> Builder {
    Request::builder()
        .uri(path)
        .header(header::HOST, "localhost:3000")
        .header(header::USER_AGENT, BROWSER_UA)
}

pub fn with_session(builder: Builder, token: &str) -> Builder {
    builder.header(header::COOKIE, format!("nm_sess={token}"))
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}
