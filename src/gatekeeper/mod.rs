//! Gatekeeper subsystem.
//!
//! # Data Flow
//! ```text
//! Request (gated prefix)
//!     → manifest redirect / alias rewrite
//!     → threat screen (403 suspicious, 401 integrity)
//!     → forced HTTPS, security headers on everything after this point
//!     → tenant resolution, x-tenant-* headers rewritten
//!     → public route bypass
//!     → API rate limit (429)
//!     → verified session + role policy (redirect / 401 / 403)
//!     → POST origin + CSRF check (403)
//!     → handler, with SessionData in request extensions
//! ```
//!
//! # Design Decisions
//! - Services are built once per configuration and shared through `Arc`
//! - Role comes from the signed session, never from the `userRole` cookie
//! - The rate limiter and secrets outlive configuration reloads

mod middleware;
mod pipeline;

use std::net::IpAddr;
use std::sync::Arc;

use crate::config::{GatekeeperConfig, SecretsConfig};
use crate::cookies::CookieService;
use crate::routing::{Manifest, PathPrefixMatcher, RoutePolicy};
use crate::security::{CsrfService, RateLimiter, SecurityService, ThreatScreen};
use crate::session::SessionService;
use crate::tenant::TenantService;

pub use middleware::{gatekeeper_middleware, SharedGatekeeper};
pub use pipeline::X_CSRF_TOKEN;

/// Every service the request pipeline needs, built from one configuration.
pub struct Gatekeeper {
    production: bool,
    force_https: bool,
    rate_limit_enabled: bool,
    api_prefix: PathPrefixMatcher,
    trusted_proxies: Vec<IpAddr>,
    manifest: Manifest,
    policy: RoutePolicy,
    cookies: CookieService,
    sessions: SessionService,
    security: SecurityService,
    tenants: TenantService,
    limiter: Arc<RateLimiter>,
    secrets: SecretsConfig,
}

impl Gatekeeper {
    pub fn new(config: &GatekeeperConfig, limiter: Arc<RateLimiter>) -> Self {
        let production = config.environment.production;
        let screen = Arc::new(ThreatScreen::new(&config.security));
        let csrf = Arc::new(CsrfService::new(
            &config.secrets.csrf_secret,
            config.session.csrf_ttl_secs,
        ));
        let cookies = CookieService::new(production);
        let manifest = config.manifest.inline.clone();

        Self {
            production,
            force_https: config.environment.force_https,
            rate_limit_enabled: config.rate_limit.enabled,
            api_prefix: PathPrefixMatcher::new(config.rate_limit.api_prefix.clone()),
            trusted_proxies: config.security.trusted_proxies.clone(),
            policy: RoutePolicy::new(&config.routes, &manifest),
            manifest,
            sessions: SessionService::new(config, cookies.clone(), csrf.clone(), screen.clone()),
            security: SecurityService::new(config, screen, csrf),
            tenants: TenantService::new(&config.tenants, production),
            cookies,
            limiter,
            secrets: config.secrets.clone(),
        }
    }

    /// Replace the tenant service, e.g. to plug in a database-backed
    /// membership store.
    pub fn with_tenants(mut self, tenants: TenantService) -> Self {
        self.tenants = tenants;
        self
    }

    /// Build a gatekeeper for a reloaded configuration. Signing secrets and
    /// rate limit state carry over from `self`.
    pub fn reconfigure(&self, mut config: GatekeeperConfig) -> Self {
        config.secrets = self.secrets.clone();
        if config.rate_limit.max_requests != self.limiter.max_requests()
            || config.rate_limit.window_ms != self.limiter.window_ms()
        {
            tracing::warn!(
                max_requests = self.limiter.max_requests(),
                window_ms = self.limiter.window_ms(),
                "Rate limit thresholds changed on reload; restart to apply them"
            );
        }
        Self::new(&config, self.limiter.clone())
    }

    pub fn production(&self) -> bool {
        self.production
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    pub fn cookies(&self) -> &CookieService {
        &self.cookies
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    pub fn security(&self) -> &SecurityService {
        &self.security
    }

    pub fn tenants(&self) -> &TenantService {
        &self.tenants
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}
