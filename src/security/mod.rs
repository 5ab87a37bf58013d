//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → threats.rs (attack signatures, scanner/bot User-Agents)
//!     → rate_limit.rs (sliding window per client fingerprint)
//!     → origin.rs (Origin/Referer allow-list)
//!     → csrf.rs (session-bound signed tokens)
//! Outgoing response:
//!     → headers.rs (CSP, frame, sniffing, referrer, HSTS)
//! ```
//!
//! # Design Decisions
//! - Every check is a boolean predicate; the gatekeeper picks the status
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod crypto;
pub mod csrf;
pub mod headers;
pub mod origin;
pub mod rate_limit;
pub mod threats;

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::config::GatekeeperConfig;
use crate::error::TokenError;

pub use crypto::{generate_secure_random, hash_data};
pub use csrf::CsrfService;
pub use headers::SecurityHeaders;
pub use origin::OriginPolicy;
pub use rate_limit::{client_identifier, RateLimitDecision, RateLimiter};
pub use threats::{sanitize_input, ThreatScreen};

/// Request-level security checks behind one handle.
pub struct SecurityService {
    screen: Arc<ThreatScreen>,
    headers: SecurityHeaders,
    origins: OriginPolicy,
    csrf: Arc<CsrfService>,
}

impl SecurityService {
    pub fn new(config: &GatekeeperConfig, screen: Arc<ThreatScreen>, csrf: Arc<CsrfService>) -> Self {
        Self {
            screen,
            headers: SecurityHeaders::new(&config.security, config.environment.production),
            origins: OriginPolicy::new(&config.security.allowed_origins),
            csrf,
        }
    }

    pub fn generate_csrf_token(&self, session_id: &str) -> Result<String, TokenError> {
        self.csrf.generate(session_id)
    }

    pub fn verify_csrf_token(&self, token: &str, session_id: &str) -> bool {
        self.csrf.verify(token, session_id)
    }

    pub fn set_security_headers(&self, headers: &mut HeaderMap) {
        self.headers.apply(headers);
    }

    pub fn validate_origin(&self, headers: &HeaderMap) -> bool {
        self.origins.validate_origin(headers)
    }

    pub fn check_rate_limit(&self, headers: &HeaderMap, identifier: &str) -> bool {
        self.screen.check_rate_limit(headers, identifier)
    }

    pub fn validate_session_integrity(&self, headers: &HeaderMap) -> bool {
        self.screen.validate_session_integrity(headers)
    }

    pub fn sanitize_input(&self, input: &str) -> String {
        sanitize_input(input)
    }

    pub fn is_suspicious_request(&self, path_and_query: &str) -> bool {
        self.screen.is_suspicious_request(path_and_query)
    }

    pub fn generate_secure_random(&self, len: usize) -> String {
        generate_secure_random(len)
    }

    pub fn hash_data(&self, data: &str) -> String {
        hash_data(data)
    }
}
