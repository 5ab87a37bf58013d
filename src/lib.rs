//! Edge request gatekeeper.
//!
//! An axum middleware stack that screens every request before it reaches
//! a page or API handler: manifest redirects, threat heuristics, security
//! headers, tenant resolution, API rate limiting, session-derived role
//! gating and CSRF checks.

pub mod admin;
pub mod config;
pub mod cookies;
pub mod error;
pub mod gatekeeper;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod session;
pub mod tenant;

pub use config::schema::GatekeeperConfig;
pub use gatekeeper::{gatekeeper_middleware, Gatekeeper, SharedGatekeeper};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
