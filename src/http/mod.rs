//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, trace, timeout, body limit)
//!     → gatekeeper middleware
//!         → request.rs (client address, alias rewrite)
//!         → response.rs (rejections, rate limit headers)
//!     → application handlers
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{apply_reloads, default_routes, HttpServer};
