//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gatekeeper pipeline and services produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID (x-request-id) flows through every log line via TraceLayer spans
//! - Metric updates are cheap; no locks on the request path

pub mod logging;
pub mod metrics;
