//! Cookie attributes and `Set-Cookie` serialization.

use std::fmt;

use url::form_urlencoded;

/// Seven days, the session cookie default.
pub const SESSION_MAX_AGE_SECS: i64 = 7 * 24 * 3600;
/// 180 days, the preference cookie default.
pub const PREFERENCE_MAX_AGE_SECS: i64 = 180 * 24 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

/// Attributes attached to a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
    pub path: Option<String>,
    pub max_age: Option<i64>,
    pub domain: Option<String>,
}

impl CookieOptions {
    /// HttpOnly session cookie: Lax, 7 days.
    pub fn session(production: bool) -> Self {
        Self {
            http_only: true,
            secure: production,
            same_site: Some(SameSite::Lax),
            path: Some("/".to_string()),
            max_age: Some(SESSION_MAX_AGE_SECS),
            domain: None,
        }
    }

    /// Script-readable preference cookie: Lax, 180 days.
    pub fn preference(production: bool) -> Self {
        Self {
            http_only: false,
            secure: production,
            same_site: Some(SameSite::Lax),
            path: Some("/".to_string()),
            max_age: Some(PREFERENCE_MAX_AGE_SECS),
            domain: None,
        }
    }

    /// CSRF cookie: script-readable so pages can echo it, Strict.
    pub fn csrf(production: bool, max_age: i64) -> Self {
        Self {
            same_site: Some(SameSite::Strict),
            max_age: Some(max_age),
            ..Self::preference(production)
        }
    }

    /// Expiring cookie used for deletion.
    pub fn expired(production: bool, path: &str) -> Self {
        Self {
            http_only: true,
            secure: production,
            same_site: None,
            path: Some(path.to_string()),
            max_age: Some(0),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: Option<&str>) -> Self {
        self.domain = domain.map(str::to_string);
        self
    }

    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

/// Build a `Set-Cookie` value. Attribute order is fixed:
/// Max-Age, Path, Domain, Secure, HttpOnly, SameSite.
pub fn serialize_cookie(name: &str, value: &str, options: &CookieOptions) -> String {
    let mut out = format!("{name}={}", encode_value(value));

    if let Some(max_age) = options.max_age {
        out.push_str(&format!("; Max-Age={max_age}"));
    }
    if let Some(path) = &options.path {
        out.push_str(&format!("; Path={path}"));
    }
    if let Some(domain) = &options.domain {
        out.push_str(&format!("; Domain={domain}"));
    }
    if options.secure {
        out.push_str("; Secure");
    }
    if options.http_only {
        out.push_str("; HttpOnly");
    }
    if let Some(same_site) = options.same_site {
        out.push_str(&format!("; SameSite={same_site}"));
    }
    out
}

pub(crate) fn encode_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

pub(crate) fn decode_value(raw: &str) -> String {
    // byte_serialize escapes '&' and '=', so values we wrote parse as one pair.
    if raw.contains('&') {
        return raw.to_string();
    }
    form_urlencoded::parse(format!("v={raw}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}
