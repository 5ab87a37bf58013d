use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::routing::Manifest;

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub production: bool,
    pub uptime_secs: u64,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSummary {
    pub max_requests: u32,
    pub window_ms: u64,
    pub tracked_identifiers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<IdentifierStatus>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierStatus {
    pub identifier: String,
    pub remaining: u32,
    pub reset_ms: u64,
}

#[derive(Deserialize, Debug)]
pub struct RateLimitQuery {
    pub identifier: Option<String>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        production: state.gatekeeper.load().production(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

pub async fn get_rate_limits(
    State(state): State<AdminState>,
    Query(query): Query<RateLimitQuery>,
) -> Json<RateLimitSummary> {
    let gatekeeper = state.gatekeeper.load();
    let limiter = gatekeeper.limiter();

    let identifier = query.identifier.map(|identifier| IdentifierStatus {
        remaining: limiter.remaining_requests(&identifier),
        reset_ms: limiter.reset_time(&identifier),
        identifier,
    });

    Json(RateLimitSummary {
        max_requests: limiter.max_requests(),
        window_ms: limiter.window_ms(),
        tracked_identifiers: limiter.tracked_identifiers(),
        identifier,
    })
}

pub async fn get_manifest(State(state): State<AdminState>) -> Json<Manifest> {
    Json(state.gatekeeper.load().manifest().clone())
}
