//! Per-request gatekeeper pipeline.
//!
//! One linear pass per request. Each step either lets the request continue
//! or short-circuits with a redirect or rejection.

use std::time::Instant;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use url::form_urlencoded;

use crate::cookies::{CookieJar, ROLE_COOKIE};
use crate::gatekeeper::Gatekeeper;
use crate::http::request::{client_ip, path_and_query, request_id, rewrite_path};
use crate::http::response::{
    apply_rate_limit_headers, forbidden, permanent_redirect, temporary_redirect,
    too_many_requests, unauthorized,
};
use crate::observability::metrics;
use crate::routing::{Access, Resolution};
use crate::security::origin::header_str;
use crate::security::threats::{forwarded_proto, user_agent};
use crate::security::{client_identifier, RateLimitDecision};
use crate::session::{Role, SessionData};
use crate::tenant::{request_host, TenantConfig, TENANT_ID_HEADER, TENANT_NAME_HEADER};

/// Header carrying the page's CSRF token on mutating requests.
pub const X_CSRF_TOKEN: &str = "x-csrf-token";

/// State gathered while a request moves through the pipeline.
struct RequestContext {
    request_id: String,
    path: String,
    start: Instant,
    /// Security headers go on every response from the header step on.
    secured: bool,
    rate_limit: Option<RateLimitDecision>,
    /// `Set-Cookie` lines to append to the final response.
    cookies: HeaderMap,
}

impl Gatekeeper {
    pub async fn handle(&self, mut request: Request<Body>, next: Next) -> Response {
        let original_path = request.uri().path().to_string();

        // 0. Scope
        if !self.policy.is_gated(&original_path) {
            return next.run(request).await;
        }

        let original_target = path_and_query(request.uri()).to_string();
        let mut ctx = RequestContext {
            request_id: request_id(request.headers()),
            path: original_path.clone(),
            start: Instant::now(),
            secured: false,
            rate_limit: None,
            cookies: HeaderMap::new(),
        };

        // 1. Manifest
        match self.manifest.resolve(&original_path) {
            Resolution::Redirect(target) => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    from = %original_path,
                    to = %target,
                    "Manifest redirect"
                );
                return self.finish(ctx, "redirected", permanent_redirect(target));
            }
            Resolution::Rewrite(target) => match rewrite_path(request.uri(), target) {
                Some(uri) => {
                    tracing::debug!(
                        request_id = %ctx.request_id,
                        from = %original_path,
                        to = %target,
                        "Manifest alias"
                    );
                    *request.uri_mut() = uri;
                    ctx.path = target.to_string();
                }
                None => {
                    tracing::warn!(request_id = %ctx.request_id, alias = %target, "Alias target is not a valid path");
                }
            },
            Resolution::Unchanged => {}
        }

        // 2. Threat screen
        if self.security.is_suspicious_request(&original_target) {
            return self.reject(ctx, "suspicious_request", forbidden());
        }
        if !self.security.validate_session_integrity(request.headers()) {
            return self.reject(ctx, "integrity", unauthorized());
        }

        // 3. Transport + headers
        ctx.secured = true;
        if self.production
            && self.force_https
            && forwarded_proto(request.headers()).as_deref() == Some("http")
        {
            if let Some(host) = header_str(request.headers(), header::HOST) {
                let location = format!("https://{host}{original_target}");
                return self.finish(ctx, "redirected", permanent_redirect(&location));
            }
        }

        // 4. Tenant
        let jar = CookieJar::from_headers(request.headers());
        let tenant = self
            .tenants
            .tenant_from_request(request.headers(), &jar)
            .and_then(|id| self.tenants.tenant_config(&id));
        propagate_tenant(request.headers_mut(), tenant);

        if let (Some(tenant), Some(host)) = (tenant, request_host(request.headers())) {
            if !tenant.settings.allow_cross_tenant
                && !self.tenants.validate_tenant_security(&host, &tenant.id)
            {
                return self.reject(ctx, "tenant_host_mismatch", forbidden());
            }
        }

        // 5. Public routes
        if self.policy.is_public(&ctx.path) {
            let response = next.run(request).await;
            return self.finish(ctx, "public", response);
        }

        // 6. API rate limit
        let is_api = self.api_prefix.matches(&ctx.path);
        if is_api && self.rate_limit_enabled {
            let identifier = client_identifier(
                &client_ip(&request, &self.trusted_proxies),
                user_agent(request.headers()).unwrap_or_default(),
            );
            if !self.security.check_rate_limit(request.headers(), &identifier) {
                return self.reject(ctx, "bot_user_agent", forbidden());
            }
            let decision = self.limiter.check(&identifier);
            if !decision.allowed {
                ctx.rate_limit = Some(decision);
                return self.reject(ctx, "rate_limited", too_many_requests(&decision));
            }
            ctx.rate_limit = Some(decision);
        }

        // 7. Session + role
        let session = self
            .sessions
            .get_session(&jar, tenant)
            .filter(|s| self.sessions.validate_session_security(s, request.headers()));
        let Some(session) = session else {
            if self.sessions.session_token(&jar, tenant).is_some() {
                self.sessions.clear_session(&mut ctx.cookies, tenant);
            }
            let response = if is_api {
                unauthorized()
            } else {
                temporary_redirect(&self.sign_in_location(&original_target))
            };
            return self.reject(ctx, "no_session", response);
        };

        if let Some(claimed) = jar.get(ROLE_COOKIE) {
            if claimed != session.role.as_str() {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    user_id = %session.user_id,
                    claimed,
                    role = %session.role,
                    "Role cookie disagrees with session"
                );
            }
        }

        if !self.tenant_member(&session, tenant) {
            return self.reject(ctx, "tenant_membership", forbidden());
        }

        match self
            .policy
            .authorize(session.role, &ctx.path, tenant.is_some(), is_api)
        {
            Access::Allow => {}
            Access::Redirect(location) => {
                return self.reject(ctx, "role_redirect", temporary_redirect(&location));
            }
            Access::Deny(reason) => return self.reject(ctx, reason, forbidden()),
        }

        // 8. CSRF
        if request.method() == Method::POST {
            if let Err(reason) = self.check_csrf(request.headers(), &session) {
                return self.reject(ctx, reason, forbidden());
            }
        }

        // Sliding expiration, re-issued under the cookie it arrived in
        if self
            .sessions
            .needs_refresh_at(&session, Utc::now().timestamp())
        {
            self.sessions
                .refresh_session(&mut ctx.cookies, &session, tenant);
        }

        request.extensions_mut().insert(session);
        let response = next.run(request).await;
        self.finish(ctx, "allowed", response)
    }

    /// A session bound to another tenant needs membership or a
    /// cross-tenant allowance. SUPER_ADMIN is exempt.
    fn tenant_member(&self, session: &SessionData, tenant: Option<&TenantConfig>) -> bool {
        if session.role == Role::SuperAdmin {
            return true;
        }
        let (Some(tenant), Some(home)) = (tenant, session.tenant_id.as_deref()) else {
            return true;
        };
        home == tenant.id
            || tenant.settings.allow_cross_tenant
            || self.tenants.validate_tenant_access(&tenant.id, &session.user_id)
    }

    /// Origin and Referer must both be present, agree, and be trusted. A
    /// CSRF token header, when sent, must belong to the session.
    fn check_csrf(&self, headers: &HeaderMap, session: &SessionData) -> Result<(), &'static str> {
        let origin = header_str(headers, header::ORIGIN);
        let referer = header_str(headers, header::REFERER);
        match (origin, referer) {
            (Some(origin), Some(referer)) if referer_matches(origin, referer) => {}
            _ => return Err("csrf_origin_mismatch"),
        }

        if !self.security.validate_origin(headers) {
            return Err("csrf_untrusted_origin");
        }

        if let Some(token) = header_str(headers, header::HeaderName::from_static(X_CSRF_TOKEN)) {
            if !self.sessions.verify_csrf_token(token, session) {
                return Err("csrf_token_invalid");
            }
        }
        Ok(())
    }

    fn sign_in_location(&self, target: &str) -> String {
        let callback: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
        format!("{}?callbackUrl={callback}", self.policy.sign_in_path())
    }

    fn reject(&self, ctx: RequestContext, reason: &'static str, response: Response) -> Response {
        let status = response.status();
        metrics::record_rejection(reason);
        if status.is_redirection() {
            tracing::debug!(
                request_id = %ctx.request_id,
                path = %ctx.path,
                reason,
                status = status.as_u16(),
                "Request redirected"
            );
            self.finish(ctx, "redirected", response)
        } else {
            tracing::warn!(
                request_id = %ctx.request_id,
                path = %ctx.path,
                reason,
                status = status.as_u16(),
                "Request rejected"
            );
            self.finish(ctx, "rejected", response)
        }
    }

    fn finish(&self, ctx: RequestContext, outcome: &'static str, mut response: Response) -> Response {
        let headers = response.headers_mut();
        if ctx.secured {
            self.security.set_security_headers(headers);
        }
        if let Some(decision) = &ctx.rate_limit {
            apply_rate_limit_headers(headers, decision);
        }
        for cookie in ctx.cookies.get_all(header::SET_COOKIE) {
            headers.append(header::SET_COOKIE, cookie.clone());
        }
        metrics::record_request(outcome, ctx.start);
        response
    }
}

/// Client-supplied tenant headers never reach the handler.
fn propagate_tenant(headers: &mut HeaderMap, tenant: Option<&TenantConfig>) {
    headers.remove(TENANT_ID_HEADER);
    headers.remove(TENANT_NAME_HEADER);
    let Some(tenant) = tenant else {
        return;
    };
    if let Ok(id) = HeaderValue::from_str(&tenant.id) {
        headers.insert(TENANT_ID_HEADER, id);
    }
    match HeaderValue::from_str(&tenant.name) {
        Ok(name) => {
            headers.insert(TENANT_NAME_HEADER, name);
        }
        Err(_) => tracing::debug!(tenant = %tenant.id, "Tenant name is not a valid header value"),
    }
}

/// Referer is the Origin itself or a path/query beneath it.
fn referer_matches(origin: &str, referer: &str) -> bool {
    referer
        .strip_prefix(origin)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
}
