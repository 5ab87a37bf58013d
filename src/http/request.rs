//! Request inspection helpers.
//!
//! # Responsibilities
//! - Derive the client address used for rate limit fingerprints
//! - Rewrite the request path for manifest aliases
//! - Read the correlation id attached by the request-id layer

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Request, Uri},
};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Client address for rate limit fingerprints.
///
/// With no `trusted_proxies` the forwarding headers are taken as given:
/// first `x-forwarded-for` hop, then `x-real-ip`, then the socket peer.
/// With a list, the headers count only when the socket peer is listed,
/// and the client is the rightmost `x-forwarded-for` hop that is not a
/// trusted proxy. `"unknown"` when nothing is available.
pub fn client_ip(request: &Request<Body>, trusted_proxies: &[IpAddr]) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if trusted_proxies.is_empty() {
        if let Some(ip) = forwarded_hops(request).first() {
            return ip.to_string();
        }
        if let Some(ip) = real_ip(request) {
            return ip.to_string();
        }
    } else if peer.is_some_and(|p| trusted_proxies.contains(&p)) {
        let hops = forwarded_hops(request);
        let is_trusted = |hop: &&str| {
            hop.parse::<IpAddr>()
                .is_ok_and(|ip| trusted_proxies.contains(&ip))
        };
        if let Some(ip) = hops.iter().rev().find(|hop| !is_trusted(*hop)).or(hops.first()) {
            return ip.to_string();
        }
        if let Some(ip) = real_ip(request) {
            return ip.to_string();
        }
    }

    peer.map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_hops(request: &Request<Body>) -> Vec<&str> {
    request
        .headers()
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|hop| !hop.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn real_ip(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(X_REAL_IP)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Correlation id from the request-id layer, or a fresh one when the
/// middleware is mounted without it.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Path plus query as received.
pub fn path_and_query(uri: &Uri) -> &str {
    uri.path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path())
}

/// Replace the path, keep the query string.
pub fn rewrite_path(uri: &Uri, path: &str) -> Option<Uri> {
    let target = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    Uri::builder().path_and_query(target).build().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_precedence() {
        let request = Request::builder()
            .uri("/api/x")
            .header(X_FORWARDED_FOR, "203.0.113.7, 10.0.0.1")
            .header(X_REAL_IP, "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request, &[]), "203.0.113.7");

        let request = Request::builder()
            .uri("/api/x")
            .header(X_REAL_IP, "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request, &[]), "198.51.100.2");

        let mut request = Request::builder().uri("/api/x").body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request, &[]), "unknown");

        let peer: SocketAddr = "192.0.2.44:51000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(client_ip(&request, &[]), "192.0.2.44");
    }

    #[test]
    fn test_forwarded_headers_need_trusted_peer() {
        let trusted: Vec<IpAddr> = vec!["10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap()];
        let request_from = |peer: &str| {
            let mut request = Request::builder()
                .uri("/api/x")
                .header(X_FORWARDED_FOR, "198.51.100.9, 203.0.113.7, 10.0.0.2")
                .body(Body::empty())
                .unwrap();
            let peer: SocketAddr = peer.parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(peer));
            request
        };

        // Spoofed leftmost hop is skipped; the last untrusted hop wins.
        assert_eq!(client_ip(&request_from("10.0.0.1:443"), &trusted), "203.0.113.7");
        // Untrusted peer: headers ignored.
        assert_eq!(client_ip(&request_from("192.0.2.44:51000"), &trusted), "192.0.2.44");

        let bare = Request::builder()
            .uri("/api/x")
            .header(X_FORWARDED_FOR, "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&bare, &trusted), "unknown");
    }

    #[test]
    fn test_rewrite_keeps_query() {
        let uri: Uri = "/p/launch?ref=mail".parse().unwrap();
        let rewritten = rewrite_path(&uri, "/dashboard/client/packages").unwrap();
        assert_eq!(rewritten.path(), "/dashboard/client/packages");
        assert_eq!(rewritten.query(), Some("ref=mail"));
        assert_eq!(path_and_query(&uri), "/p/launch?ref=mail");
    }
}
