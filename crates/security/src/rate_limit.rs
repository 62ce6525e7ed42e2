//! Fixed-window, per-client request rate limiting.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default length of one rate-limit window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Default number of requests allowed per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 100;
/// Stale windows are swept every this many checks.
const PRUNE_EVERY: u64 = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed; `remaining` more fit in the current window.
    Allowed { remaining: u32 },
    /// The client is over its allowance until the window ends.
    Limited { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Counts requests per client key in fixed windows.
///
/// A window opens on a client's first request and lasts [`window`] from then;
/// the first request after it has elapsed opens a fresh one with the counter
/// back at one. State is process-local and shared through an internally
/// sharded map, so `check` only needs `&self`.
///
/// [`window`]: RateLimiter::window
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    windows: DashMap<String, Window>,
    checks: AtomicU64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_REQUESTS)
    }
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            windows: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Records a request from `client` and decides whether it may proceed.
    pub fn check(&self, client: &str) -> Decision {
        self.check_at(client, Instant::now())
    }

    /// [`check`](Self::check) against an explicit clock reading.
    pub fn check_at(&self, client: &str, now: Instant) -> Decision {
        let decision = {
            let mut window = self.windows.entry(client.to_string()).or_insert(Window { started: now, count: 0 });
            let elapsed = now.saturating_duration_since(window.started);
            if elapsed >= self.window {
                *window = Window { started: now, count: 0 };
            }
            window.count = window.count.saturating_add(1);
            if window.count > self.max_requests {
                let elapsed = now.saturating_duration_since(window.started);
                Decision::Limited { retry_after: self.window.saturating_sub(elapsed) }
            } else {
                Decision::Allowed { remaining: self.max_requests - window.count }
            }
        };
        // The entry guard must be released before sweeping the whole map.
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune_at(now);
        }
        if !decision.is_allowed() {
            tracing::debug!(client, "Rate limit exceeded");
        }
        decision
    }

    /// Drops every window that has already ended. Returns how many were removed.
    pub fn prune_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| now.saturating_duration_since(window.started) < self.window);
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::trace!(removed, "Pruned stale rate-limit windows");
        }
        removed
    }

    /// Number of clients with a tracked window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hundred_allowed_then_limited_then_reset() {
        let limiter = RateLimiter::default();
        let start = Instant::now();
        for i in 0..100 {
            let decision = limiter.check_at("1.2.3.4", start + Duration::from_millis(i));
            assert_eq!(decision, Decision::Allowed { remaining: 99 - i as u32 });
        }
        let decision = limiter.check_at("1.2.3.4", start + Duration::from_secs(10));
        assert_eq!(decision, Decision::Limited { retry_after: Duration::from_secs(50) });

        // A new window restarts the counter at one.
        let decision = limiter.check_at("1.2.3.4", start + DEFAULT_WINDOW);
        assert_eq!(decision, Decision::Allowed { remaining: 99 });
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(1), 1);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).is_allowed());
        assert!(!limiter.check_at("a", now).is_allowed());
        assert!(limiter.check_at("b", now).is_allowed());
    }

    #[test]
    fn test_denied_requests_do_not_extend_the_window() {
        let limiter = RateLimiter::new(Duration::from_secs(10), 1);
        let start = Instant::now();
        assert!(limiter.check_at("a", start).is_allowed());
        for s in 1..10 {
            assert!(!limiter.check_at("a", start + Duration::from_secs(s)).is_allowed());
        }
        assert!(limiter.check_at("a", start + Duration::from_secs(10)).is_allowed());
    }

    #[test]
    fn test_prune_removes_only_stale_windows() {
        let limiter = RateLimiter::new(Duration::from_secs(10), 5);
        let start = Instant::now();
        limiter.check_at("old", start);
        limiter.check_at("new", start + Duration::from_secs(8));
        assert_eq!(limiter.prune_at(start + Duration::from_secs(12)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
