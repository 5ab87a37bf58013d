//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the gatekeeper in front of the handlers
//! - Wire up middleware (tracing, request ID, timeout, body limit)
//! - Swap in reloaded configuration without dropping rate limit state
//! - Serve until the shutdown broadcast fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode, Uri},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::{Layer, ServiceBuilder};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatekeeperConfig;
use crate::gatekeeper::{gatekeeper_middleware, Gatekeeper, SharedGatekeeper};
use crate::security::RateLimiter;
use crate::session::SessionData;
use crate::tenant::{TENANT_ID_HEADER, TENANT_NAME_HEADER};

/// HTTP server for the gatekeeper.
pub struct HttpServer {
    router: Router,
    gatekeeper: SharedGatekeeper,
}

impl HttpServer {
    /// Gatekeeper in front of the built-in handlers.
    pub fn new(config: &GatekeeperConfig, limiter: Arc<RateLimiter>) -> Self {
        Self::with_app(config, limiter, default_routes())
    }

    /// Gatekeeper in front of `app`.
    pub fn with_app(config: &GatekeeperConfig, limiter: Arc<RateLimiter>, app: Router) -> Self {
        let gatekeeper: SharedGatekeeper =
            Arc::new(ArcSwap::from_pointee(Gatekeeper::new(config, limiter)));
        let router = Self::build_router(config, gatekeeper.clone(), app);
        Self { router, gatekeeper }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The gatekeeper wraps `app` as a whole so alias rewrites happen
    /// before `app` routes the request.
    #[allow(deprecated)]
    pub fn build_router(config: &GatekeeperConfig, gatekeeper: SharedGatekeeper, app: Router) -> Router {
        let gated = middleware::from_fn_with_state(gatekeeper, gatekeeper_middleware).layer(app);

        Router::new().fallback_service(gated).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
        )
    }

    pub fn gatekeeper(&self) -> SharedGatekeeper {
        self.gatekeeper.clone()
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Apply validated configuration updates until shutdown.
pub async fn apply_reloads(
    gatekeeper: SharedGatekeeper,
    mut updates: mpsc::UnboundedReceiver<GatekeeperConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else {
                    break;
                };
                let next = gatekeeper.load().reconfigure(config);
                gatekeeper.store(Arc::new(next));
                tracing::info!("Configuration reloaded");
            }
            _ = shutdown.recv() => break,
        }
    }
}

/// Built-in handlers behind the gatekeeper.
pub fn default_routes() -> Router {
    Router::new()
        .route("/api/health", get(health))
        .fallback(admitted)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Admitted {
    path: String,
    tenant_id: Option<String>,
    tenant_name: Option<String>,
    user_id: Option<String>,
    role: Option<&'static str>,
}

/// Echo what the gatekeeper admitted. Stands in for the application's
/// own handlers when none are mounted.
async fn admitted(
    uri: Uri,
    headers: HeaderMap,
    session: Option<Extension<SessionData>>,
) -> impl IntoResponse {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let session = session.map(|Extension(s)| s);

    (
        StatusCode::OK,
        Json(Admitted {
            path: uri.path().to_string(),
            tenant_id: header(TENANT_ID_HEADER),
            tenant_name: header(TENANT_NAME_HEADER),
            user_id: session.as_ref().map(|s| s.user_id.clone()),
            role: session.as_ref().map(|s| s.role.as_str()),
        }),
    )
}
