//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gatekeeper.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::routing::manifest::Manifest;
use crate::tenant::TenantConfig;

/// Placeholder secret shipped with the default config. Rejected in production.
pub const PLACEHOLDER_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";

/// Root configuration for the gatekeeper.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Deployment environment flags.
    pub environment: EnvironmentConfig,

    /// Signing secrets for sessions and CSRF tokens.
    pub secrets: SecretsConfig,

    /// Session token and cookie settings.
    pub session: SessionConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Threat heuristics and response headers.
    pub security: SecurityConfig,

    /// Tenant registry and resolution rules.
    pub tenants: TenantsConfig,

    /// Route gating policy.
    pub routes: RoutePolicyConfig,

    /// Redirect/alias manifest.
    pub manifest: ManifestConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Production mode: secure cookies, HSTS, strict origin checks.
    pub production: bool,

    /// Redirect plain HTTP requests to HTTPS (production only).
    pub force_https: bool,
}

/// Symmetric signing secrets.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// HMAC secret for session tokens.
    pub session_secret: String,

    /// HMAC secret for CSRF tokens.
    pub csrf_secret: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            // WARNING: These are placeholders! Change them in production.
            session_secret: PLACEHOLDER_SECRET.to_string(),
            csrf_secret: PLACEHOLDER_SECRET.to_string(),
        }
    }
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsConfig")
            .field("session_secret", &"<redacted>")
            .field("csrf_secret", &"<redacted>")
            .finish()
    }
}

/// Session token settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Token lifetime in seconds (default: 7 days).
    pub ttl_secs: i64,

    /// Hard ceiling on token age since issue, in seconds (default: 30 days).
    pub max_age_secs: i64,

    /// Fraction of the lifetime after which the gatekeeper re-issues the token.
    pub refresh_after_ratio: f64,

    /// CSRF token lifetime in seconds (default: 1 hour).
    pub csrf_ttl_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 7 * 24 * 3600,
            max_age_secs: 30 * 24 * 3600,
            refresh_after_ratio: 0.5,
            csrf_ttl_secs: 3600,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per identifier inside one window.
    pub max_requests: u32,

    /// Window size in milliseconds.
    pub window_ms: u64,

    /// Path prefix the limiter applies to.
    pub api_prefix: String,

    /// Interval between background sweeps of idle identifiers.
    pub sweep_interval_secs: u64,

    /// Tracked identifier count that triggers an inline sweep.
    pub max_tracked_identifiers: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_ms: 15 * 60 * 1000,
            api_prefix: "/api".to_string(),
            sweep_interval_secs: 60,
            max_tracked_identifiers: 100_000,
        }
    }
}

/// Security heuristics and headers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Attach security response headers.
    pub enable_headers: bool,

    /// Production domains accepted as Origin/Referer. `*.` prefixes match subdomains.
    pub allowed_origins: Vec<String>,

    /// Third-party hosts allowed in `connect-src`.
    pub connect_src: Vec<String>,

    /// Case-insensitive attack signatures matched against path and query.
    pub suspicious_patterns: Vec<String>,

    /// User-Agent fragments of known security scanners.
    pub scanner_user_agents: Vec<String>,

    /// User-Agent fragments identifying bots.
    pub bot_user_agents: Vec<String>,

    /// Shortest plausible User-Agent.
    pub min_user_agent_len: usize,

    /// Proxies allowed to set `x-forwarded-for`/`x-real-ip`. Empty trusts
    /// the headers from any peer.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            allowed_origins: vec!["*.example.com".to_string(), "example.com".to_string()],
            connect_src: vec![
                "https://graph.facebook.com".to_string(),
                "https://api.openai.com".to_string(),
            ],
            suspicious_patterns: [
                "<script",
                "javascript:",
                "vbscript:",
                "onerror=",
                "onload=",
                "union select",
                "union all select",
                "drop table",
                "insert into",
                "' or '1'='1",
                "or 1=1",
                "../",
                "..\\",
                "/etc/passwd",
                "/etc/shadow",
                "/proc/self",
                ".env",
                ".git/",
                "wp-admin",
                "wp-login",
                "phpmyadmin",
                "cmd.exe",
                "/bin/sh",
                "/bin/bash",
                "powershell",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            scanner_user_agents: ["sqlmap", "nikto", "nmap", "burp", "owasp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            bot_user_agents: ["bot", "crawler", "spider"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_user_agent_len: 10,
            trusted_proxies: Vec::new(),
        }
    }
}

/// Tenant registry and resolution rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TenantsConfig {
    /// Application domains whose subdomains name tenants.
    pub app_domains: Vec<String>,

    /// Custom domain → tenant id.
    pub custom_domains: HashMap<String, String>,

    /// Known tenants.
    pub registry: Vec<TenantConfig>,
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            app_domains: vec!["example.com".to_string()],
            custom_domains: HashMap::new(),
            registry: vec![TenantConfig::default_tenant("example.com")],
        }
    }
}

/// Route gating policy. Route names live here, not in the pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutePolicyConfig {
    /// Prefixes the gatekeeper applies to. Empty means every path.
    pub matcher: Vec<String>,

    /// Prefixes that skip session and role gating.
    pub public_prefixes: Vec<String>,

    /// Prefixes a CLIENT may visit.
    pub client_allowed_prefixes: Vec<String>,

    /// Where mis-routed CLIENT requests land.
    pub client_home: String,

    /// Prefixes reserved for SUPER_ADMIN.
    pub super_admin_prefixes: Vec<String>,

    /// Where mis-routed ADMIN/EMPLOYEE requests land.
    pub insufficient_permissions_redirect: String,

    /// Page an ADMIN may reach without tenant context.
    pub admin_profile_path: String,

    /// Sign-in page for unauthenticated page requests.
    pub sign_in_path: String,
}

impl Default for RoutePolicyConfig {
    fn default() -> Self {
        Self {
            matcher: ["/dashboard", "/admin", "/portal", "/affiliate", "/api"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            public_prefixes: [
                "/api/auth",
                "/api/health",
                "/api/tracking",
                "/auth",
                "/tracking",
                "/pricing",
                "/about",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            client_allowed_prefixes: [
                "/dashboard/client",
                "/dashboard/profile",
                "/dashboard/support",
                "/api/client",
                "/api/session",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            client_home: "/dashboard/client".to_string(),
            super_admin_prefixes: [
                "/dashboard/companies",
                "/dashboard/super-admin",
                "/dashboard/system",
                "/admin",
                "/api/admin",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            insufficient_permissions_redirect: "/dashboard?error=insufficient_permissions"
                .to_string(),
            admin_profile_path: "/dashboard/profile".to_string(),
            sign_in_path: "/auth/signin".to_string(),
        }
    }
}

/// Redirect/alias manifest source.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Optional JSON manifest file, merged over the inline entries.
    pub path: Option<String>,

    /// Inline manifest entries.
    #[serde(flatten)]
    pub inline: Manifest,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// `pretty` or `json`.
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: PLACEHOLDER_SECRET.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
