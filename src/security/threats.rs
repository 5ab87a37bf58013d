//! Request threat heuristics.
//!
//! Cheap first-pass filters: attack signatures in the URL, scanner and bot
//! User-Agents. Not a WAF; lists come from configuration.

use axum::http::{header, HeaderMap};
use url::form_urlencoded;

use crate::config::SecurityConfig;

/// Longest input `sanitize_input` returns, in characters.
const MAX_INPUT_LEN: usize = 1000;

#[derive(Debug, Clone)]
pub struct ThreatScreen {
    suspicious_patterns: Vec<String>,
    scanner_user_agents: Vec<String>,
    bot_user_agents: Vec<String>,
    min_user_agent_len: usize,
}

impl ThreatScreen {
    pub fn new(config: &SecurityConfig) -> Self {
        let lower = |list: &[String]| list.iter().map(|s| s.to_lowercase()).collect::<Vec<_>>();
        Self {
            suspicious_patterns: lower(&config.suspicious_patterns),
            scanner_user_agents: lower(&config.scanner_user_agents),
            bot_user_agents: lower(&config.bot_user_agents),
            min_user_agent_len: config.min_user_agent_len,
        }
    }

    /// Match path and query, raw and percent-decoded, against the
    /// signature list. Case-insensitive.
    pub fn is_suspicious_request(&self, path_and_query: &str) -> bool {
        let raw = path_and_query.to_lowercase();
        let once = decode_lossy(&raw);
        let twice = decode_lossy(&once);

        [raw, once, twice].iter().any(|candidate| {
            self.suspicious_patterns
                .iter()
                .any(|pattern| candidate.contains(pattern.as_str()))
        })
    }

    /// Reject missing or implausibly short User-Agents and known scanners.
    pub fn validate_session_integrity(&self, headers: &HeaderMap) -> bool {
        let Some(ua) = user_agent(headers) else {
            return false;
        };
        if ua.trim().len() < self.min_user_agent_len {
            return false;
        }
        let ua = ua.to_lowercase();
        !self
            .scanner_user_agents
            .iter()
            .any(|sig| ua.contains(sig.as_str()))
    }

    pub fn is_bot(&self, headers: &HeaderMap) -> bool {
        let ua = user_agent(headers).unwrap_or_default().to_lowercase();
        self.bot_user_agents.iter().any(|sig| ua.contains(sig.as_str()))
    }

    /// Bot rejection layered next to the sliding-window limiter.
    pub fn check_rate_limit(&self, headers: &HeaderMap, identifier: &str) -> bool {
        if self.is_bot(headers) {
            tracing::debug!(identifier, "Bot user agent rejected");
            return false;
        }
        true
    }

    /// Transport checks for cookie-bearing requests: TLS in production and
    /// no bot User-Agent.
    pub fn validate_cookie_security(&self, headers: &HeaderMap, production: bool) -> bool {
        if production && forwarded_proto(headers).is_some_and(|proto| proto != "https") {
            return false;
        }
        !self.is_bot(headers)
    }
}

/// Strip `<>"'`, trim, truncate to 1000 characters.
pub fn sanitize_input(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
        .collect::<String>()
        .trim()
        .chars()
        .take(MAX_INPUT_LEN)
        .collect()
}

pub(crate) fn user_agent(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok())
}

pub(crate) fn forwarded_proto(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_ascii_lowercase())
}

fn decode_lossy(input: &str) -> String {
    form_urlencoded::parse(input.as_bytes())
        .map(|(k, v)| {
            if v.is_empty() {
                k.into_owned()
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join("&")
        .to_lowercase()
}
