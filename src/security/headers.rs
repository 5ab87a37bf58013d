//! Security response headers.
//!
//! Values are built once from configuration and copied onto each response.
//! HSTS and Permissions-Policy are production-only.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::config::SecurityConfig;

const HSTS: &str = "max-age=31536000; includeSubDomains; preload";
const PERMISSIONS_POLICY: &str = "camera=(), microphone=(), geolocation=(self), payment=(), usb=()";

#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    enabled: bool,
    production: bool,
    csp: HeaderValue,
}

impl SecurityHeaders {
    pub fn new(config: &SecurityConfig, production: bool) -> Self {
        let csp = build_csp(&config.connect_src, production);
        Self {
            enabled: config.enable_headers,
            production,
            csp: HeaderValue::from_str(&csp).unwrap_or_else(|e| {
                tracing::error!(error = %e, "CSP contains invalid characters, using default-src only");
                HeaderValue::from_static("default-src 'self'; frame-ancestors 'none'")
            }),
        }
    }

    /// Overwrite the security headers on `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if !self.enabled {
            return;
        }
        headers.insert(header::CONTENT_SECURITY_POLICY, self.csp.clone());
        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        );
        headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));

        if self.production {
            headers.insert(header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS));
            headers.insert(
                HeaderName::from_static("permissions-policy"),
                HeaderValue::from_static(PERMISSIONS_POLICY),
            );
        }
    }
}

fn build_csp(connect_src: &[String], production: bool) -> String {
    // The rendering framework injects inline bootstrap scripts; dev builds also eval.
    let script_src = if production {
        "script-src 'self' 'unsafe-inline'"
    } else {
        "script-src 'self' 'unsafe-inline' 'unsafe-eval'"
    };

    let mut connect = String::from("connect-src 'self'");
    for host in connect_src {
        connect.push(' ');
        connect.push_str(host);
    }

    [
        "default-src 'self'",
        script_src,
        "style-src 'self' 'unsafe-inline'",
        "img-src 'self' data: blob: https:",
        "font-src 'self' data:",
        &connect,
        "frame-ancestors 'none'",
        "base-uri 'self'",
        "form-action 'self'",
    ]
    .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_headers() {
        let headers_cfg = SecurityHeaders::new(&SecurityConfig::default(), false);
        let mut headers = HeaderMap::new();
        headers_cfg.apply(&mut headers);

        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::REFERRER_POLICY], "strict-origin-when-cross-origin");
        assert_eq!(headers[header::X_XSS_PROTECTION], "1; mode=block");
        assert!(!headers.contains_key(header::STRICT_TRANSPORT_SECURITY));

        let csp = headers[header::CONTENT_SECURITY_POLICY].to_str().unwrap();
        assert!(csp.starts_with("default-src 'self'"));
        assert!(csp.contains("connect-src 'self' https://graph.facebook.com"));
        assert!(csp.contains("frame-ancestors 'none'"));
        assert!(csp.contains("'unsafe-eval'"));
    }

    #[test]
    fn test_production_headers() {
        let headers_cfg = SecurityHeaders::new(&SecurityConfig::default(), true);
        let mut headers = HeaderMap::new();
        headers_cfg.apply(&mut headers);

        assert!(headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
        assert!(headers.contains_key("permissions-policy"));
        assert!(!headers[header::CONTENT_SECURITY_POLICY]
            .to_str()
            .unwrap()
            .contains("unsafe-eval"));
    }

    #[test]
    fn test_disabled() {
        let config = SecurityConfig {
            enable_headers: false,
            ..SecurityConfig::default()
        };
        let mut headers = HeaderMap::new();
        SecurityHeaders::new(&config, true).apply(&mut headers);
        assert!(headers.is_empty());
    }
}
