//! Tenant resolution and per-tenant policy.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, HeaderMap};

use crate::config::TenantsConfig;
use crate::cookies::{CookieJar, TENANT_COOKIE};
use crate::tenant::membership::{MembershipStore, StaticMembership};
use crate::tenant::registry::{TenantConfig, DEFAULT_SESSION_DURATION_SECS, DEFAULT_TENANT_ID};

pub const TENANT_ID_HEADER: &str = "x-tenant-id";
pub const TENANT_NAME_HEADER: &str = "x-tenant-name";

/// Subdomains that belong to the application itself, not a tenant.
const RESERVED_SUBDOMAINS: &[&str] = &["www", "app", "api"];

pub struct TenantService {
    registry: HashMap<String, TenantConfig>,
    app_domains: Vec<String>,
    custom_domains: HashMap<String, String>,
    production: bool,
    membership: Arc<dyn MembershipStore>,
}

impl TenantService {
    pub fn new(config: &TenantsConfig, production: bool) -> Self {
        let membership = Arc::new(StaticMembership::from_registry(&config.registry));
        Self::with_membership(config, production, membership)
    }

    pub fn with_membership(
        config: &TenantsConfig,
        production: bool,
        membership: Arc<dyn MembershipStore>,
    ) -> Self {
        Self {
            registry: config
                .registry
                .iter()
                .map(|t| (t.id.clone(), t.clone()))
                .collect(),
            app_domains: config.app_domains.iter().map(|d| d.to_lowercase()).collect(),
            custom_domains: config
                .custom_domains
                .iter()
                .map(|(domain, tenant)| (domain.to_lowercase(), tenant.clone()))
                .collect(),
            production,
            membership,
        }
    }

    /// Resolution order: app subdomain, custom domain, `x-tenant-id`
    /// header, `nm_tenant` cookie, then `default` for the bare app domain
    /// or localhost.
    pub fn tenant_from_request(&self, headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
        let host = request_host(headers);

        if let Some(host) = host.as_deref() {
            if let Some(tenant) = self.tenant_from_subdomain(host) {
                return Some(tenant);
            }
            if let Some(tenant) = self.custom_domains.get(host) {
                return Some(tenant.clone());
            }
        }

        let from_header = headers
            .get(TENANT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(sanitize_tenant_id)
            .filter(|t| !t.is_empty());
        if from_header.is_some() {
            return from_header;
        }

        let from_cookie = jar
            .get(TENANT_COOKIE)
            .map(sanitize_tenant_id)
            .filter(|t| !t.is_empty());
        if from_cookie.is_some() {
            return from_cookie;
        }

        match host.as_deref() {
            Some(h) if is_local(h) || self.app_domains.iter().any(|d| d == h) => {
                Some(DEFAULT_TENANT_ID.to_string())
            }
            _ => None,
        }
    }

    fn tenant_from_subdomain(&self, host: &str) -> Option<String> {
        self.app_domains.iter().find_map(|domain| {
            let prefix = host.strip_suffix(domain.as_str())?.strip_suffix('.')?;
            let label = prefix.rsplit('.').next()?;
            if RESERVED_SUBDOMAINS.contains(&label) {
                return None;
            }
            let tenant = sanitize_tenant_id(label);
            (!tenant.is_empty()).then_some(tenant)
        })
    }

    pub fn tenant_config(&self, tenant_id: &str) -> Option<&TenantConfig> {
        self.registry.get(tenant_id)
    }

    pub fn validate_tenant_access(&self, tenant_id: &str, user_id: &str) -> bool {
        self.tenant_config(tenant_id).is_some() && self.membership.is_member(tenant_id, user_id)
    }

    pub fn cookie_domain(&self, tenant_id: &str) -> Option<&str> {
        self.tenant_config(tenant_id)
            .and_then(|t| t.settings.cookie_domain.as_deref())
    }

    pub fn is_cross_tenant_allowed(&self, tenant_id: &str) -> bool {
        self.tenant_config(tenant_id)
            .is_some_and(|t| t.settings.allow_cross_tenant)
    }

    pub fn session_duration(&self, tenant_id: &str) -> i64 {
        self.tenant_config(tenant_id)
            .map(|t| t.settings.session_duration_secs)
            .unwrap_or(DEFAULT_SESSION_DURATION_SECS)
    }

    /// The request host must be the tenant's domain, a subdomain of it, or
    /// a custom domain mapped to it. Localhost always passes outside
    /// production.
    pub fn validate_tenant_security(&self, host: &str, tenant_id: &str) -> bool {
        let host = strip_port(host).to_lowercase();
        if !self.production && is_local(&host) {
            return true;
        }
        let Some(tenant) = self.tenant_config(tenant_id) else {
            return false;
        };
        let domain = tenant.domain.to_lowercase();
        if host == domain || host.ends_with(&format!(".{domain}")) {
            return true;
        }
        self.custom_domains.get(&host).is_some_and(|t| t == tenant_id)
    }

    /// Namespace a cookie name per tenant on shared domains.
    pub fn tenant_cookie_name(&self, base: &str, tenant_id: &str) -> String {
        scoped_cookie_name(base, Some(tenant_id))
    }
}

/// `base` for the default tenant or no tenant, `base_<id>` otherwise.
pub fn scoped_cookie_name(base: &str, tenant_id: Option<&str>) -> String {
    match tenant_id {
        Some(id) if id != DEFAULT_TENANT_ID => format!("{base}_{id}"),
        _ => base.to_string(),
    }
}

/// Keep `[a-zA-Z0-9-_]`, lowercase.
pub fn sanitize_tenant_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Lowercase Host header without port.
pub fn request_host(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| strip_port(h).to_lowercase())
        .filter(|h| !h.is_empty())
}

fn strip_port(host: &str) -> &str {
    // IPv6 literals keep their brackets.
    if host.starts_with('[') {
        return host.split(']').next().map_or(host, |h| &host[..h.len() + 1]);
    }
    host.split(':').next().unwrap_or(host)
}

fn is_local(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::registry::TenantSettings;
    use axum::http::HeaderValue;

    fn config() -> TenantsConfig {
        let mut custom_domains = HashMap::new();
        custom_domains.insert("cargo.acme-freight.io".to_string(), "acme".to_string());
        TenantsConfig {
            app_domains: vec!["example.com".into()],
            custom_domains,
            registry: vec![
                TenantConfig::default_tenant("example.com"),
                TenantConfig {
                    id: "acme".into(),
                    domain: "acme.example.com".into(),
                    subdomain: Some("acme".into()),
                    name: "Acme Freight".into(),
                    settings: TenantSettings {
                        cookie_domain: Some(".acme.example.com".into()),
                        session_duration_secs: 3600,
                        allow_cross_tenant: false,
                    },
                    members: vec!["u-acme".into()],
                },
                TenantConfig {
                    id: "globex".into(),
                    domain: "globex.example.com".into(),
                    subdomain: None,
                    name: "Globex".into(),
                    settings: TenantSettings {
                        allow_cross_tenant: true,
                        ..TenantSettings::default()
                    },
                    members: vec![],
                },
            ],
        }
    }

    fn service() -> TenantService {
        TenantService::new(&config(), true)
    }

    fn request(host: &'static str, header: Option<&'static str>, cookie: Option<&'static str>) -> (HeaderMap, CookieJar) {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static(host));
        if let Some(h) = header {
            headers.insert(TENANT_ID_HEADER, HeaderValue::from_static(h));
        }
        if let Some(c) = cookie {
            headers.insert(header::COOKIE, HeaderValue::from_static(c));
        }
        let jar = CookieJar::from_headers(&headers);
        (headers, jar)
    }

    #[test]
    fn test_subdomain_wins() {
        let (h, j) = request("acme.example.com:443", Some("globex"), Some("nm_tenant=other"));
        assert_eq!(service().tenant_from_request(&h, &j).as_deref(), Some("acme"));
    }

    #[test]
    fn test_custom_domain() {
        let (h, j) = request("cargo.acme-freight.io", None, None);
        assert_eq!(service().tenant_from_request(&h, &j).as_deref(), Some("acme"));
    }

    #[test]
    fn test_header_beats_cookie() {
        let (h, j) = request("localhost:3000", Some("Globex"), Some("nm_tenant=acme"));
        assert_eq!(service().tenant_from_request(&h, &j).as_deref(), Some("globex"));

        let (h, j) = request("localhost:3000", None, Some("nm_tenant=acme"));
        assert_eq!(service().tenant_from_request(&h, &j).as_deref(), Some("acme"));
    }

    #[test]
    fn test_default_fallback() {
        let s = service();
        let (h, j) = request("localhost", None, None);
        assert_eq!(s.tenant_from_request(&h, &j).as_deref(), Some("default"));

        let (h, j) = request("example.com", None, None);
        assert_eq!(s.tenant_from_request(&h, &j).as_deref(), Some("default"));

        let (h, j) = request("www.example.com", None, None);
        assert_eq!(s.tenant_from_request(&h, &j), None);

        let (h, j) = request("unrelated.org", None, None);
        assert_eq!(s.tenant_from_request(&h, &j), None);
    }

    #[test]
    fn test_accessors_and_defaults() {
        let s = service();
        assert_eq!(s.cookie_domain("acme"), Some(".acme.example.com"));
        assert_eq!(s.session_duration("acme"), 3600);
        assert_eq!(s.session_duration("unknown"), DEFAULT_SESSION_DURATION_SECS);
        assert!(s.is_cross_tenant_allowed("globex"));
        assert!(!s.is_cross_tenant_allowed("unknown"));
        assert!(s.tenant_config("unknown").is_none());
    }

    #[test]
    fn test_access_backed_by_membership() {
        let s = service();
        assert!(s.validate_tenant_access("acme", "u-acme"));
        assert!(!s.validate_tenant_access("acme", "u-globex"));
        assert!(!s.validate_tenant_access("ghost", "u-acme"));
    }

    #[test]
    fn test_tenant_security() {
        let s = service();
        assert!(s.validate_tenant_security("acme.example.com", "acme"));
        assert!(s.validate_tenant_security("eu.acme.example.com:8443", "acme"));
        assert!(s.validate_tenant_security("cargo.acme-freight.io", "acme"));
        assert!(!s.validate_tenant_security("globex.example.com", "acme"));
        // production: localhost gets no pass
        assert!(!s.validate_tenant_security("localhost", "acme"));

        let dev = TenantService::new(&config(), false);
        assert!(dev.validate_tenant_security("localhost:3000", "acme"));
    }

    #[test]
    fn test_cookie_names_and_sanitizing() {
        let s = service();
        assert_eq!(s.tenant_cookie_name("nm_sess", "default"), "nm_sess");
        assert_eq!(s.tenant_cookie_name("nm_sess", "acme"), "nm_sess_acme");
        assert_eq!(sanitize_tenant_id("Acme Corp!<script>"), "acmecorpscript");
        assert_eq!(sanitize_tenant_id("north_EU-2"), "north_eu-2");
    }
}
