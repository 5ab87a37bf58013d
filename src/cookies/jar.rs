//! Request cookie jar.

use std::collections::HashMap;

use axum::http::{header, HeaderMap};

use crate::cookies::options::decode_value;

/// Cookies sent with one request. First occurrence of a name wins.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
}

impl CookieJar {
    /// Parse every `Cookie` header. Malformed pairs are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = HashMap::new();

        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else {
                tracing::debug!("Skipping non-ASCII Cookie header");
                continue;
            };
            for pair in value.split(';') {
                let Some((name, raw)) = pair.split_once('=') else {
                    continue;
                };
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                let raw = raw.trim().trim_matches('"');
                cookies
                    .entry(name.to_string())
                    .or_insert_with(|| decode_value(raw));
            }
        }

        Self { cookies }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_multiple_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("nm_sess=abc; theme=dark+mode"));
        headers.append(header::COOKIE, HeaderValue::from_static("nm_tenant=acme; nm_sess=other"));

        let jar = CookieJar::from_headers(&headers);
        assert_eq!(jar.get("nm_sess"), Some("abc"));
        assert_eq!(jar.get("theme"), Some("dark mode"));
        assert_eq!(jar.get("nm_tenant"), Some("acme"));
        assert_eq!(jar.get("missing"), None);
    }

    #[test]
    fn test_malformed_pairs_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("garbage; =x; ok=1;"));
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.get("ok"), Some("1"));
    }
}
