//! Sliding-window rate limiter.
//!
//! Each identifier owns an ordered list of request timestamps. Stale
//! timestamps are pruned on every check; rejected requests are not
//! recorded, so hammering a closed window does not extend it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Characters of User-Agent folded into the client identifier.
const USER_AGENT_KEY_LEN: usize = 50;

/// Result of one rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch milliseconds at which the oldest counted request leaves the window.
    pub reset_ms: u64,
    /// Seconds until a retry can succeed. Set only when rejected.
    pub retry_after_secs: Option<u64>,
}

/// Shared state for the sliding-window limiter.
///
/// `DashMap` shard locks make each read-prune-append atomic per identifier.
pub struct RateLimiter {
    windows: DashMap<String, VecDeque<u64>>,
    max_requests: u32,
    window_ms: u64,
    max_tracked: usize,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: config.max_requests,
            window_ms: config.window_ms,
            max_tracked: config.max_tracked_identifiers,
        }
    }

    pub fn with_limits(max_requests: u32, window_ms: u64) -> Self {
        Self::new(&RateLimitConfig {
            max_requests,
            window_ms,
            ..RateLimitConfig::default()
        })
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Record a request and report whether it must be rejected.
    pub fn is_rate_limited(&self, identifier: &str) -> bool {
        !self.check(identifier).allowed
    }

    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, now_ms())
    }

    pub fn check_at(&self, identifier: &str, now: u64) -> RateLimitDecision {
        if self.windows.len() >= self.max_tracked && !self.windows.contains_key(identifier) {
            self.make_room(now);
        }

        let mut timestamps = self.windows.entry(identifier.to_string()).or_default();
        prune(&mut timestamps, now, self.window_ms);

        if timestamps.len() >= self.max_requests as usize {
            let oldest = timestamps.front().copied().unwrap_or(now);
            let reset_ms = oldest + self.window_ms;
            let retry_after_secs = reset_ms.saturating_sub(now).div_ceil(1000).max(1);
            return RateLimitDecision {
                allowed: false,
                limit: self.max_requests,
                remaining: 0,
                reset_ms,
                retry_after_secs: Some(retry_after_secs),
            };
        }

        timestamps.push_back(now);
        let oldest = timestamps.front().copied().unwrap_or(now);
        RateLimitDecision {
            allowed: true,
            limit: self.max_requests,
            remaining: self.max_requests - timestamps.len() as u32,
            reset_ms: oldest + self.window_ms,
            retry_after_secs: None,
        }
    }

    /// Requests left in the current window. Does not record anything.
    pub fn remaining_requests(&self, identifier: &str) -> u32 {
        self.remaining_requests_at(identifier, now_ms())
    }

    pub fn remaining_requests_at(&self, identifier: &str, now: u64) -> u32 {
        let used = self
            .windows
            .get(identifier)
            .map(|ts| ts.iter().filter(|&&t| now.saturating_sub(t) < self.window_ms).count())
            .unwrap_or(0);
        self.max_requests.saturating_sub(used as u32)
    }

    /// Epoch milliseconds when the window for `identifier` frees a slot.
    pub fn reset_time(&self, identifier: &str) -> u64 {
        self.reset_time_at(identifier, now_ms())
    }

    pub fn reset_time_at(&self, identifier: &str, now: u64) -> u64 {
        self.windows
            .get(identifier)
            .and_then(|ts| {
                ts.iter()
                    .find(|&&t| now.saturating_sub(t) < self.window_ms)
                    .copied()
            })
            .map(|oldest| oldest + self.window_ms)
            .unwrap_or(now + self.window_ms)
    }

    /// Drop identifiers with no timestamp inside the window. Returns the
    /// number removed.
    pub fn sweep_at(&self, now: u64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, ts| {
            prune(ts, now, self.window_ms);
            !ts.is_empty()
        });
        let after = self.windows.len();
        metrics::record_rate_limit_identifiers(after);
        before.saturating_sub(after)
    }

    /// Bring the map under `max_tracked` before a new identifier is
    /// inserted: sweep idle windows, then evict the least recently active.
    fn make_room(&self, now: u64) {
        let removed = self.sweep_at(now);
        tracing::debug!(removed, "Inline rate limit sweep");

        while self.windows.len() >= self.max_tracked {
            let stalest = self
                .windows
                .iter()
                .min_by_key(|entry| entry.value().back().copied().unwrap_or(0))
                .map(|entry| entry.key().clone());
            let Some(key) = stalest else {
                break;
            };
            self.windows.remove(&key);
            tracing::warn!(identifier = %key, "Rate limit table full; evicted least recent identifier");
        }
    }

    pub fn tracked_identifiers(&self) -> usize {
        self.windows.len()
    }

    /// Periodic sweep until shutdown.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = interval.as_secs(), "Rate limit sweeper starting");
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep_at(now_ms());
                    if removed > 0 {
                        tracing::debug!(removed, tracked = self.tracked_identifiers(), "Swept idle rate limit windows");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

fn prune(timestamps: &mut VecDeque<u64>, now: u64, window_ms: u64) {
    while let Some(&front) = timestamps.front() {
        if now.saturating_sub(front) >= window_ms {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

/// Client fingerprint: IP plus the first characters of the User-Agent.
pub fn client_identifier(ip: &str, user_agent: &str) -> String {
    let ua: String = user_agent.chars().take(USER_AGENT_KEY_LEN).collect();
    format!("{ip}:{ua}")
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_max_requests_succeed_then_reject() {
        let limiter = RateLimiter::with_limits(100, 900_000);
        let start = 1_700_000_000_000;

        for i in 0..100 {
            let d = limiter.check_at("client", start + i);
            assert!(d.allowed, "request {} should pass", i + 1);
            assert_eq!(d.remaining, 99 - i as u32);
        }

        let rejected = limiter.check_at("client", start + 500);
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
        // oldest at `start`, window 900s
        assert_eq!(rejected.retry_after_secs, Some(900));
        assert_eq!(rejected.reset_ms, start + 900_000);
    }

    #[test]
    fn test_window_slides_after_expiry() {
        let limiter = RateLimiter::with_limits(3, 1000);
        let t = 10_000;
        assert!(limiter.check_at("k", t).allowed);
        assert!(limiter.check_at("k", t + 100).allowed);
        assert!(limiter.check_at("k", t + 200).allowed);
        assert!(!limiter.check_at("k", t + 999).allowed);

        // earliest request has left the window
        assert!(limiter.check_at("k", t + 1000).allowed);
        assert!(!limiter.check_at("k", t + 1001).allowed);
    }

    #[test]
    fn test_rejections_do_not_extend_window() {
        let limiter = RateLimiter::with_limits(1, 1000);
        assert!(limiter.check_at("k", 0).allowed);
        for t in (100..1000).step_by(100) {
            assert!(!limiter.check_at("k", t).allowed);
        }
        assert!(limiter.check_at("k", 1000).allowed);
    }

    #[test]
    fn test_identifiers_are_independent() {
        let limiter = RateLimiter::with_limits(1, 1000);
        assert!(limiter.check_at("a", 0).allowed);
        assert!(limiter.check_at("b", 0).allowed);
        assert!(!limiter.check_at("a", 1).allowed);
    }

    #[test]
    fn test_remaining_and_reset_are_read_only() {
        let limiter = RateLimiter::with_limits(5, 1000);
        assert_eq!(limiter.remaining_requests_at("k", 0), 5);
        assert_eq!(limiter.reset_time_at("k", 0), 1000);

        limiter.check_at("k", 100);
        limiter.check_at("k", 200);
        assert_eq!(limiter.remaining_requests_at("k", 300), 3);
        assert_eq!(limiter.remaining_requests_at("k", 300), 3);
        assert_eq!(limiter.reset_time_at("k", 300), 1100);
        assert_eq!(limiter.remaining_requests_at("k", 1150), 4);
    }

    #[test]
    fn test_sweep_removes_idle_identifiers() {
        let limiter = RateLimiter::with_limits(5, 1000);
        limiter.check_at("old", 0);
        limiter.check_at("fresh", 900);
        assert_eq!(limiter.sweep_at(1500), 1);
        assert_eq!(limiter.tracked_identifiers(), 1);
    }

    #[test]
    fn test_inline_sweep_bounds_memory() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            max_requests: 5,
            window_ms: 1000,
            max_tracked_identifiers: 2,
            ..RateLimitConfig::default()
        });
        limiter.check_at("a", 0);
        limiter.check_at("b", 0);
        limiter.check_at("c", 5000);
        assert_eq!(limiter.tracked_identifiers(), 1);
    }

    #[test]
    fn test_cap_holds_with_live_identifiers() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            max_requests: 5,
            window_ms: 60_000,
            max_tracked_identifiers: 2,
            ..RateLimitConfig::default()
        });
        for i in 0..50u64 {
            limiter.check_at(&format!("203.0.113.{i}:curl"), 1000 + i);
            assert!(limiter.tracked_identifiers() <= 2);
        }
        // The two most recent survive.
        assert_eq!(limiter.remaining_requests_at("203.0.113.49:curl", 1100), 4);
        assert_eq!(limiter.remaining_requests_at("203.0.113.48:curl", 1100), 4);
        assert_eq!(limiter.remaining_requests_at("203.0.113.0:curl", 1100), 5);
    }

    #[test]
    fn test_is_rate_limited_at_threshold() {
        let limiter = RateLimiter::with_limits(3, 60_000);
        assert!(!limiter.is_rate_limited("10.0.0.9:ua"));
        assert!(!limiter.is_rate_limited("10.0.0.9:ua"));
        assert!(!limiter.is_rate_limited("10.0.0.9:ua"));
        assert!(limiter.is_rate_limited("10.0.0.9:ua"));
        assert!(limiter.is_rate_limited("10.0.0.9:ua"));
        assert_eq!(limiter.remaining_requests("10.0.0.9:ua"), 0);
        assert!(!limiter.is_rate_limited("10.0.0.10:ua"));
    }

    #[test]
    fn test_client_identifier_truncates_user_agent() {
        let ua = "x".repeat(80);
        let id = client_identifier("10.0.0.1", &ua);
        assert_eq!(id.len(), "10.0.0.1:".len() + 50);
    }
}
