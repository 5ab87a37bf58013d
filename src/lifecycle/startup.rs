//! Startup orchestration.
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The public listener binds last (traffic only when ready)

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::watcher::ConfigWatcher;
use crate::config::{GatekeeperConfig, PLACEHOLDER_SECRET};
use crate::http::{apply_reloads, HttpServer};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::trigger_on_signal;
use crate::observability::metrics;
use crate::security::RateLimiter;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("config watcher error: {0}")]
    Watch(#[from] notify::Error),
}

/// Run the gatekeeper until a shutdown signal arrives.
///
/// `config_path` enables hot reload of that file.
pub async fn run(config: GatekeeperConfig, config_path: Option<PathBuf>) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();

    // 1. Metrics
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // 2. Shared rate limit state
    let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
    tokio::spawn(limiter.clone().run_sweeper(
        Duration::from_secs(config.rate_limit.sweep_interval_secs),
        shutdown.subscribe(),
    ));

    let server = HttpServer::new(&config, limiter);

    // 3. Hot reload; the watcher stops when dropped
    let _watcher = match config_path {
        Some(path) => {
            let manifest_path = config.manifest.path.as_deref().map(Path::new);
            let (watcher, updates) = ConfigWatcher::new(&path, manifest_path);
            let handle = watcher.run()?;
            tokio::spawn(apply_reloads(server.gatekeeper(), updates, shutdown.subscribe()));
            Some(handle)
        }
        None => None,
    };

    // 4. Admin API
    if config.admin.enabled {
        if config.admin.api_key == PLACEHOLDER_SECRET {
            tracing::warn!("Admin API is using the placeholder API key");
        }
        let listener = bind(&config.admin.bind_address).await?;
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");
        let router = setup_admin_router(AdminState::new(server.gatekeeper(), &config.admin.api_key));
        let stop = shutdown.signalled();
        tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(stop);
            if let Err(e) = serve.await {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        });
    }

    // 5. Public listener
    let listener = bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %config.listener.bind_address,
        production = config.environment.production,
        rate_limit_max = config.rate_limit.max_requests,
        rate_limit_window_ms = config.rate_limit.window_ms,
        "Gatekeeper ready"
    );

    tokio::spawn(trigger_on_signal(shutdown.clone()));
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}
