//! Admin API: runtime status, rate limiter state, active manifest.
//!
//! Served on its own listener and guarded by a bearer API key.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::gatekeeper::SharedGatekeeper;

#[derive(Clone)]
pub struct AdminState {
    pub gatekeeper: SharedGatekeeper,
    pub api_key: Arc<str>,
    pub started: Instant,
}

impl AdminState {
    pub fn new(gatekeeper: SharedGatekeeper, api_key: &str) -> Self {
        Self {
            gatekeeper,
            api_key: Arc::from(api_key),
            started: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/rate-limits", get(get_rate_limits))
        .route("/admin/manifest", get(get_manifest))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
