//! Origin/Referer validation.

use axum::http::{header, HeaderMap};
use url::Url;

#[derive(Debug, Clone)]
pub struct OriginPolicy {
    /// Lowercase hosts; `*.` entries match any subdomain.
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new(allowed_origins: &[String]) -> Self {
        Self {
            allowed: allowed_origins.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// No Origin and no Referer counts as direct navigation and passes.
    /// Otherwise the Origin (or Referer when Origin is absent) must name the
    /// request's own host or an allowed domain.
    pub fn validate_origin(&self, headers: &HeaderMap) -> bool {
        let source = header_str(headers, header::ORIGIN)
            .or_else(|| header_str(headers, header::REFERER));
        let Some(source) = source else {
            return true;
        };

        let Ok(url) = Url::parse(source) else {
            tracing::debug!(origin = source, "Unparseable Origin/Referer");
            return false;
        };
        let Some(host) = url.host_str().map(str::to_lowercase) else {
            return false;
        };
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.clone(),
        };

        if let Some(request_host) = header_str(headers, header::HOST) {
            if request_host.eq_ignore_ascii_case(&authority) {
                return true;
            }
        }

        self.allowed.iter().any(|entry| host_matches(entry, &host))
    }
}

fn host_matches(entry: &str, host: &str) -> bool {
    match entry.strip_prefix("*.") {
        Some(base) => host
            .strip_suffix(base)
            .is_some_and(|sub| sub.len() > 1 && sub.ends_with('.')),
        None => entry == host,
    }
}

pub(crate) fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn policy() -> OriginPolicy {
        OriginPolicy::new(&["*.example.com".to_string(), "example.com".to_string()])
    }

    fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_direct_navigation_allowed() {
        assert!(policy().validate_origin(&HeaderMap::new()));
    }

    #[test]
    fn test_same_host_allowed() {
        let h = headers(&[
            (header::HOST, "localhost:3000"),
            (header::ORIGIN, "http://localhost:3000"),
        ]);
        assert!(policy().validate_origin(&h));
    }

    #[test]
    fn test_wildcard_subdomains() {
        let p = policy();
        assert!(p.validate_origin(&headers(&[(header::ORIGIN, "https://acme.example.com")])));
        assert!(p.validate_origin(&headers(&[(header::ORIGIN, "https://example.com")])));
        assert!(!p.validate_origin(&headers(&[(header::ORIGIN, "https://evilexample.com")])));
        assert!(!p.validate_origin(&headers(&[(header::ORIGIN, "https://example.com.evil.io")])));
    }

    #[test]
    fn test_foreign_origin_rejected() {
        let h = headers(&[
            (header::HOST, "app.example.org"),
            (header::REFERER, "https://evil.com/x"),
        ]);
        assert!(!policy().validate_origin(&h));
        assert!(!policy().validate_origin(&headers(&[(header::ORIGIN, "not a url")])));
    }
}
