//! Axum adapter for the gatekeeper pipeline.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::gatekeeper::Gatekeeper;

/// Hot-swappable gatekeeper shared by every request.
pub type SharedGatekeeper = Arc<ArcSwap<Gatekeeper>>;

/// Install with `axum::middleware::from_fn_with_state`.
pub async fn gatekeeper_middleware(
    State(state): State<SharedGatekeeper>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let gatekeeper = state.load_full();
    gatekeeper.handle(request, next).await
}
