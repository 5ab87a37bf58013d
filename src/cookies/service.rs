//! Purpose-specific cookie helpers.
//!
//! Session cookies are HttpOnly; preference, consent, CSRF and tenant
//! cookies stay script-readable. `Secure` follows the environment.

use axum::http::{header, HeaderMap, HeaderValue};

use crate::cookies::jar::CookieJar;
use crate::cookies::options::{serialize_cookie, CookieOptions};

pub const SESSION_COOKIE: &str = "nm_sess";
/// Older session cookie name still accepted on read.
pub const LEGACY_SESSION_COOKIE: &str = "session-token";
pub const CSRF_COOKIE: &str = "nm_csrf";
pub const CONSENT_COOKIE: &str = "nm_consent";
pub const TENANT_COOKIE: &str = "nm_tenant";
/// Display-only role hint for pages. Never used for authorization.
pub const ROLE_COOKIE: &str = "userRole";

#[derive(Debug, Clone)]
pub struct CookieService {
    production: bool,
}

impl CookieService {
    pub fn new(production: bool) -> Self {
        Self { production }
    }

    pub fn production(&self) -> bool {
        self.production
    }

    pub fn get_cookie<'a>(&self, jar: &'a CookieJar, name: &str) -> Option<&'a str> {
        jar.get(name)
    }

    /// Append a `Set-Cookie` line. Earlier lines are never replaced.
    pub fn set_cookie(&self, headers: &mut HeaderMap, name: &str, value: &str, options: &CookieOptions) {
        let cookie = serialize_cookie(name, value, options);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(cookie = name, error = %e, "Dropping unencodable cookie"),
        }
    }

    /// Expire a cookie on `path` and `domain`. Browsers key cookies by
    /// name, domain and path, so both must match how it was set. Always
    /// HttpOnly.
    pub fn delete_cookie(&self, headers: &mut HeaderMap, name: &str, path: &str, domain: Option<&str>) {
        let options = CookieOptions::expired(self.production, path).with_domain(domain);
        self.set_cookie(headers, name, "", &options);
    }

    /// `name` is the tenant-scoped session cookie name.
    pub fn set_session_cookie(
        &self,
        headers: &mut HeaderMap,
        name: &str,
        token: &str,
        max_age: i64,
        domain: Option<&str>,
    ) {
        let options = CookieOptions::session(self.production)
            .with_max_age(max_age)
            .with_domain(domain);
        self.set_cookie(headers, name, token, &options);
    }

    /// The legacy name is only honoured for the unscoped cookie.
    pub fn get_session_cookie<'a>(&self, jar: &'a CookieJar, name: &str) -> Option<&'a str> {
        jar.get(name).or_else(|| {
            if name == SESSION_COOKIE {
                jar.get(LEGACY_SESSION_COOKIE)
            } else {
                None
            }
        })
    }

    pub fn delete_session_cookie(&self, headers: &mut HeaderMap, name: &str, domain: Option<&str>) {
        self.delete_cookie(headers, name, "/", domain);
    }

    pub fn set_preference_cookie(&self, headers: &mut HeaderMap, name: &str, value: &str) {
        self.set_cookie(headers, name, value, &CookieOptions::preference(self.production));
    }

    pub fn set_csrf_token(
        &self,
        headers: &mut HeaderMap,
        name: &str,
        token: &str,
        max_age: i64,
        domain: Option<&str>,
    ) {
        let options = CookieOptions::csrf(self.production, max_age).with_domain(domain);
        self.set_cookie(headers, name, token, &options);
    }

    pub fn get_csrf_token<'a>(&self, jar: &'a CookieJar, name: &str) -> Option<&'a str> {
        jar.get(name)
    }

    pub fn set_consent_cookie(&self, headers: &mut HeaderMap, consent: &str) {
        self.set_preference_cookie(headers, CONSENT_COOKIE, consent);
    }

    pub fn get_consent_cookie<'a>(&self, jar: &'a CookieJar) -> Option<&'a str> {
        jar.get(CONSENT_COOKIE)
    }

    pub fn set_tenant_cookie(&self, headers: &mut HeaderMap, tenant_id: &str, domain: Option<&str>) {
        let options = CookieOptions::preference(self.production).with_domain(domain);
        self.set_cookie(headers, TENANT_COOKIE, tenant_id, &options);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_cookies(headers: &HeaderMap) -> Vec<String> {
        headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_session_cookie_is_http_only() {
        let service = CookieService::new(true);
        let mut headers = HeaderMap::new();
        service.set_session_cookie(&mut headers, SESSION_COOKIE, "tok.en.sig", 604_800, Some(".example.com"));

        let cookies = set_cookies(&headers);
        assert_eq!(
            cookies[0],
            "nm_sess=tok.en.sig; Max-Age=604800; Path=/; Domain=.example.com; Secure; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_readable_cookies_are_not_http_only() {
        let service = CookieService::new(false);
        let mut headers = HeaderMap::new();
        service.set_preference_cookie(&mut headers, "theme", "dark");
        service.set_consent_cookie(&mut headers, "analytics");
        service.set_tenant_cookie(&mut headers, "acme", None);
        service.set_csrf_token(&mut headers, CSRF_COOKIE, "t", 3600, None);

        let cookies = set_cookies(&headers);
        assert_eq!(cookies.len(), 4, "cookies accumulate as separate lines");
        for cookie in &cookies {
            assert!(!cookie.contains("HttpOnly"), "{cookie}");
            assert!(!cookie.contains("Secure"), "{cookie}");
        }
        assert!(cookies[3].ends_with("SameSite=Strict"));
    }

    #[test]
    fn test_delete_marks_http_only() {
        let service = CookieService::new(true);
        let mut headers = HeaderMap::new();
        service.delete_cookie(&mut headers, "theme", "/settings", None);
        assert_eq!(set_cookies(&headers)[0], "theme=; Max-Age=0; Path=/settings; Secure; HttpOnly");
    }

    #[test]
    fn test_delete_matches_domain() {
        let service = CookieService::new(true);
        let mut headers = HeaderMap::new();
        service.delete_session_cookie(&mut headers, "nm_sess_acme", Some(".acme.example.com"));
        assert_eq!(
            set_cookies(&headers)[0],
            "nm_sess_acme=; Max-Age=0; Path=/; Domain=.acme.example.com; Secure; HttpOnly"
        );
    }

    #[test]
    fn test_session_cookie_fallback_name() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session-token=legacy"));
        let jar = CookieJar::from_headers(&headers);
        let service = CookieService::new(false);
        assert_eq!(service.get_session_cookie(&jar, SESSION_COOKIE), Some("legacy"));
        assert_eq!(service.get_session_cookie(&jar, "nm_sess_acme"), None);
    }

    #[test]
    fn test_reads_consent_and_csrf() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("nm_consent=analytics; nm_csrf=abc"),
        );
        let jar = CookieJar::from_headers(&headers);
        let service = CookieService::new(false);
        assert_eq!(service.get_consent_cookie(&jar), Some("analytics"));
        assert_eq!(service.get_csrf_token(&jar, CSRF_COOKIE), Some("abc"));
    }
}
