//! Edge Gatekeeper
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                    GATEKEEPER                         │
//!   Client Request    │  ┌──────────┐   ┌───────────┐   ┌────────────────┐  │
//!   ──────────────────┼─▶│ request  │──▶│ manifest  │──▶│ threat screen  │  │
//!                     │  │ id/trace │   │ redirects │   │ 403 / 401      │  │
//!                     │  └──────────┘   └───────────┘   └───────┬────────┘  │
//!                     │                                         ▼           │
//!                     │  ┌──────────┐   ┌───────────┐   ┌────────────────┐  │
//!                     │  │ role +   │◀──│ API rate  │◀──│ tenant headers │  │
//!                     │  │ session  │   │ limit 429 │   │ public bypass  │  │
//!                     │  └────┬─────┘   └───────────┘   └────────────────┘  │
//!                     │       ▼                                             │
//!   Client Response   │  ┌──────────┐   ┌──────────────────────────────┐   │
//!   ◀─────────────────┼──│ security │◀──│ CSRF (POST) → route handler  │   │
//!                     │  │ headers  │   └──────────────────────────────┘   │
//!                     │  └──────────┘                                       │
//!                     │  ┌────────────────────────────────────────────────┐ │
//!                     │  │ config + reload · metrics · admin · lifecycle  │ │
//!                     │  └────────────────────────────────────────────────┘ │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use edge_gatekeeper::config::{load_config, load_from_env};
use edge_gatekeeper::lifecycle;
use edge_gatekeeper::observability::logging::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GATEKEEPER_CONFIG").ok())
        .map(PathBuf::from);

    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?config_path,
        "edge-gatekeeper starting"
    );

    lifecycle::run(config, config_path).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
