//! Session issuance and verification.
//!
//! Tokens are HS256 JWTs carried in the HttpOnly `nm_sess` cookie. Every
//! verification failure is logged and reported as "no session"; nothing
//! here returns an error to a route handler.

use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::config::GatekeeperConfig;
use crate::cookies::{CookieJar, CookieService, CSRF_COOKIE, SESSION_COOKIE};
use crate::error::TokenError;
use crate::observability::metrics;
use crate::security::csrf::CsrfService;
use crate::security::threats::ThreatScreen;
use crate::session::claims::{SessionData, SessionIdentity};
use crate::tenant::{scoped_cookie_name, TenantConfig};

pub struct SessionService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
    max_age_secs: i64,
    refresh_after_ratio: f64,
    csrf_ttl_secs: i64,
    production: bool,
    cookies: CookieService,
    csrf: Arc<CsrfService>,
    screen: Arc<ThreatScreen>,
}

impl SessionService {
    pub fn new(
        config: &GatekeeperConfig,
        cookies: CookieService,
        csrf: Arc<CsrfService>,
        screen: Arc<ThreatScreen>,
    ) -> Self {
        let secret = config.secrets.session_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs: config.session.ttl_secs,
            max_age_secs: config.session.max_age_secs,
            refresh_after_ratio: config.session.refresh_after_ratio,
            csrf_ttl_secs: config.session.csrf_ttl_secs,
            production: config.environment.production,
            cookies,
            csrf,
            screen,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Sign a new token: `iat = now`, `exp = now + 7 days` by default.
    pub fn create_session(&self, identity: SessionIdentity) -> Result<String, TokenError> {
        self.create_session_with_ttl(identity, self.ttl_secs)
    }

    pub fn create_session_with_ttl(
        &self,
        identity: SessionIdentity,
        ttl_secs: i64,
    ) -> Result<String, TokenError> {
        let claims = SessionData::new(identity, Utc::now().timestamp(), ttl_secs);
        self.sign(&claims)
    }

    fn sign(&self, claims: &SessionData) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(TokenError::Sign)
    }

    /// Check the signature only. Expiry is left to the caller.
    pub fn verify_signature(&self, token: &str) -> Result<SessionData, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        jsonwebtoken::decode::<SessionData>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }

    /// Verify signature and expiry. `None` on any failure.
    pub fn verify_session(&self, token: &str) -> Option<SessionData> {
        let result = self.verify_signature(token).and_then(|session| {
            if session.is_expired_at(Utc::now().timestamp()) {
                Err(TokenError::Expired)
            } else {
                Ok(session)
            }
        });

        match result {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!(error = %e, "Session token rejected");
                metrics::record_token_failure("session", &e);
                None
            }
        }
    }

    /// Session cookie name for requests scoped to `tenant`.
    pub fn cookie_name(&self, tenant: Option<&TenantConfig>) -> String {
        scoped_cookie_name(SESSION_COOKIE, tenant.map(|t| t.id.as_str()))
    }

    /// Raw token from the tenant's session cookie, verified or not.
    pub fn session_token<'a>(&self, jar: &'a CookieJar, tenant: Option<&TenantConfig>) -> Option<&'a str> {
        self.cookies.get_session_cookie(jar, &self.cookie_name(tenant))
    }

    pub fn get_session(&self, jar: &CookieJar, tenant: Option<&TenantConfig>) -> Option<SessionData> {
        self.session_token(jar, tenant)
            .and_then(|token| self.verify_session(token))
    }

    /// Issue a token and store it in the HttpOnly session cookie. The
    /// tenant, when known, supplies cookie name, session duration and
    /// cookie domain.
    pub fn set_session_cookie(
        &self,
        headers: &mut HeaderMap,
        identity: SessionIdentity,
        tenant: Option<&TenantConfig>,
    ) -> Result<SessionData, TokenError> {
        let ttl = tenant
            .map(|t| t.settings.session_duration_secs)
            .unwrap_or(self.ttl_secs);
        let session = SessionData::new(identity, Utc::now().timestamp(), ttl);
        let token = self.sign(&session)?;

        self.cookies
            .set_session_cookie(headers, &self.cookie_name(tenant), &token, ttl, cookie_domain(tenant));
        Ok(session)
    }

    /// Re-issue with the same identity and a fresh `iat`/`exp`.
    pub fn refresh_session(
        &self,
        headers: &mut HeaderMap,
        current: &SessionData,
        tenant: Option<&TenantConfig>,
    ) -> Option<SessionData> {
        match self.set_session_cookie(headers, current.identity(), tenant) {
            Ok(session) => {
                tracing::debug!(user_id = %session.user_id, "Session refreshed");
                Some(session)
            }
            Err(e) => {
                tracing::warn!(user_id = %current.user_id, error = %e, "Session refresh failed");
                None
            }
        }
    }

    /// Expire the session cookie under the same name and domain it was set with.
    pub fn clear_session(&self, headers: &mut HeaderMap, tenant: Option<&TenantConfig>) {
        self.cookies
            .delete_session_cookie(headers, &self.cookie_name(tenant), cookie_domain(tenant));
    }

    /// Sliding expiration: true once `refresh_after_ratio` of the lifetime has passed.
    pub fn needs_refresh_at(&self, session: &SessionData, now: i64) -> bool {
        let lifetime = (session.exp - session.iat).max(0) as f64;
        (now - session.iat) as f64 > lifetime * self.refresh_after_ratio
    }

    pub fn validate_session_security(&self, session: &SessionData, headers: &HeaderMap) -> bool {
        self.validate_session_security_at(session, headers, Utc::now().timestamp())
    }

    /// Expired, older than the re-auth ceiling, or failing the transport
    /// checks all reject.
    pub fn validate_session_security_at(
        &self,
        session: &SessionData,
        headers: &HeaderMap,
        now: i64,
    ) -> bool {
        if session.exp <= session.iat || session.exp < now {
            tracing::debug!(user_id = %session.user_id, "Session expired");
            return false;
        }
        if now - session.iat > self.max_age_secs {
            tracing::info!(user_id = %session.user_id, "Session older than re-auth ceiling");
            return false;
        }
        self.screen.validate_cookie_security(headers, self.production)
    }

    pub fn create_csrf_token(&self, session: &SessionData) -> Result<String, TokenError> {
        self.csrf.generate(&session.user_id)
    }

    pub fn verify_csrf_token(&self, token: &str, session: &SessionData) -> bool {
        self.csrf.verify(token, &session.user_id)
    }

    /// Issue a CSRF token into the tenant's script-readable CSRF cookie.
    pub fn set_csrf_cookie(
        &self,
        headers: &mut HeaderMap,
        session: &SessionData,
        tenant: Option<&TenantConfig>,
    ) -> Result<String, TokenError> {
        let token = self.create_csrf_token(session)?;
        let name = scoped_cookie_name(CSRF_COOKIE, tenant.map(|t| t.id.as_str()));
        self.cookies
            .set_csrf_token(headers, &name, &token, self.csrf_ttl_secs, cookie_domain(tenant));
        Ok(token)
    }

    pub fn csrf_cookie<'a>(&self, jar: &'a CookieJar, tenant: Option<&TenantConfig>) -> Option<&'a str> {
        let name = scoped_cookie_name(CSRF_COOKIE, tenant.map(|t| t.id.as_str()));
        self.cookies.get_csrf_token(jar, &name)
    }
}

fn cookie_domain(tenant: Option<&TenantConfig>) -> Option<&str> {
    tenant.and_then(|t| t.settings.cookie_domain.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::session::claims::Role;
    use axum::http::{header, HeaderValue};

    fn service() -> SessionService {
        let config = GatekeeperConfig::default();
        SessionService::new(
            &config,
            CookieService::new(false),
            Arc::new(CsrfService::new("csrf", 3600)),
            Arc::new(ThreatScreen::new(&SecurityConfig::default())),
        )
    }

    fn identity(user: &str) -> SessionIdentity {
        SessionIdentity {
            user_id: user.into(),
            email: format!("{user}@example.com"),
            role: Role::Client,
            tenant_id: Some("acme".into()),
        }
    }

    fn browser_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0"),
        );
        headers
    }

    #[test]
    fn test_round_trip() {
        let svc = service();
        let token = svc.create_session(identity("u1")).unwrap();
        let session = svc.verify_session(&token).expect("valid token");

        assert_eq!(session.identity(), identity("u1"));
        assert_eq!(session.exp - session.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_expired_token() {
        let svc = service();
        let token = svc.create_session_with_ttl(identity("u1"), -60).unwrap();

        let session = svc.verify_signature(&token).expect("signature still valid");
        assert!(!svc.validate_session_security(&session, &browser_headers()));
        assert!(svc.verify_session(&token).is_none());
    }

    #[test]
    fn test_tampered_token_is_none() {
        let svc = service();
        let token = svc.create_session(identity("u1")).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[2] = "AAAA";
        assert!(svc.verify_session(&parts.join(".")).is_none());
        assert!(svc.verify_session("garbage").is_none());
    }

    #[test]
    fn test_reauth_ceiling() {
        let svc = service();
        let iat = 1_700_000_000;
        let session = SessionData::new(identity("u1"), iat, 60 * 24 * 3600);
        let headers = browser_headers();

        assert!(svc.validate_session_security_at(&session, &headers, iat + 24 * 3600));
        assert!(!svc.validate_session_security_at(&session, &headers, iat + 31 * 24 * 3600));
    }

    #[test]
    fn test_bot_user_agent_fails_security() {
        let svc = service();
        let session = SessionData::new(identity("u1"), 1_700_000_000, 3600);
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("Googlebot/2.1 (+http://google.com)"));
        assert!(!svc.validate_session_security_at(&session, &headers, 1_700_000_100));
    }

    #[test]
    fn test_set_and_get_session_cookie() {
        let svc = service();
        let mut response_headers = HeaderMap::new();
        let issued = svc
            .set_session_cookie(&mut response_headers, identity("u1"), None)
            .unwrap();

        let set_cookie = response_headers[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        let token = set_cookie
            .strip_prefix("nm_sess=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();

        let mut request_headers = HeaderMap::new();
        request_headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("nm_sess={token}")).unwrap(),
        );
        let jar = CookieJar::from_headers(&request_headers);
        assert_eq!(svc.get_session(&jar, None), Some(issued));
    }

    #[test]
    fn test_refresh_keeps_identity() {
        let svc = service();
        let old = SessionData::new(identity("u1"), Utc::now().timestamp() - 5 * 24 * 3600, 7 * 24 * 3600);
        assert!(svc.needs_refresh_at(&old, Utc::now().timestamp()));

        let mut headers = HeaderMap::new();
        let fresh = svc.refresh_session(&mut headers, &old, None).unwrap();
        assert_eq!(fresh.identity(), old.identity());
        assert!(fresh.iat > old.iat);
        assert!(headers.contains_key(header::SET_COOKIE));
    }

    #[test]
    fn test_csrf_binding() {
        let svc = service();
        let a = SessionData::new(identity("a"), 0, 10);
        let b = SessionData::new(identity("b"), 0, 10);
        let token = svc.create_csrf_token(&a).unwrap();
        assert!(svc.verify_csrf_token(&token, &a));
        assert!(!svc.verify_csrf_token(&token, &b));
    }

    #[test]
    fn test_clear_session() {
        let svc = service();
        let mut headers = HeaderMap::new();
        svc.clear_session(&mut headers, None);
        assert_eq!(
            headers[header::SET_COOKIE],
            "nm_sess=; Max-Age=0; Path=/; HttpOnly"
        );
    }

    fn acme() -> TenantConfig {
        let mut tenant = TenantConfig::default_tenant("acme.example.com");
        tenant.id = "acme".into();
        tenant.settings.cookie_domain = Some(".acme.example.com".into());
        tenant
    }

    #[test]
    fn test_clear_session_matches_tenant_cookie() {
        let svc = service();
        let acme = acme();
        let mut headers = HeaderMap::new();
        svc.set_session_cookie(&mut headers, identity("u1"), Some(&acme))
            .unwrap();
        svc.clear_session(&mut headers, Some(&acme));

        let lines: Vec<_> = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert!(lines[0].starts_with("nm_sess_acme="));
        assert!(lines[0].contains("Domain=.acme.example.com"));
        assert_eq!(
            lines[1],
            "nm_sess_acme=; Max-Age=0; Path=/; Domain=.acme.example.com; HttpOnly"
        );
    }

    #[test]
    fn test_tenant_sessions_do_not_collide() {
        let svc = service();
        let acme = acme();
        let mut headers = HeaderMap::new();
        svc.set_session_cookie(&mut headers, identity("u1"), Some(&acme))
            .unwrap();
        let line = headers[header::SET_COOKIE].to_str().unwrap();
        let token = line
            .strip_prefix("nm_sess_acme=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();

        let mut request = HeaderMap::new();
        request.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("nm_sess_acme={token}")).unwrap(),
        );
        let jar = CookieJar::from_headers(&request);
        assert!(svc.get_session(&jar, Some(&acme)).is_some());
        assert!(svc.get_session(&jar, None).is_none());
    }

    #[test]
    fn test_csrf_cookie_scoped_to_tenant() {
        let svc = service();
        let acme = acme();
        let session = SessionData::new(identity("u1"), Utc::now().timestamp(), 3600);
        let mut headers = HeaderMap::new();
        let token = svc.set_csrf_cookie(&mut headers, &session, Some(&acme)).unwrap();

        let line = headers[header::SET_COOKIE].to_str().unwrap();
        assert!(line.starts_with("nm_csrf_acme="));
        assert!(!line.contains("HttpOnly"));

        let mut request = HeaderMap::new();
        request.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("nm_csrf_acme={token}")).unwrap(),
        );
        let jar = CookieJar::from_headers(&request);
        let stored = svc.csrf_cookie(&jar, Some(&acme)).unwrap();
        assert!(svc.verify_csrf_token(stored, &session));
        assert!(svc.csrf_cookie(&jar, None).is_none());
    }
}
