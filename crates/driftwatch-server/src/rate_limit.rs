//! # Sliding-Window Rate Limiter
//!
//! Per-client admission control with two concurrent windows: a 60-second
//! sustained window and a 5-second burst sub-window. A request is rejected
//! when either window is full; accepted requests are recorded and
//! timestamps older than the sustained window are garbage-collected
//! inline on every check.
//!
//! Client identity is the API key when present, else the remote address,
//! else `"unknown"` - resolution happens in the middleware; the limiter
//! only sees opaque ids.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Sustained window in seconds.
const WINDOW_SECONDS: f64 = 60.0;

/// Burst sub-window in seconds.
const BURST_SECONDS: f64 = 5.0;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq)]
pub struct RateDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// The sustained limit, for the `X-RateLimit-Limit` header.
    pub limit: u32,
    /// Requests remaining in the sustained window.
    pub remaining: u32,
    /// Epoch seconds when the window resets.
    pub reset: u64,
    /// Rejection explanation, when rejected.
    pub message: Option<String>,
}

/// Per-client sliding-window limiter.
#[derive(Debug)]
pub struct RateLimiter {
    rpm: u32,
    burst: u32,
    clients: Mutex<HashMap<String, VecDeque<f64>>>,
}

impl RateLimiter {
    /// Creates a limiter with the given sustained and burst limits.
    pub fn new(rpm: u32, burst: u32) -> Self {
        Self {
            rpm,
            burst,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Checks (and on success records) a request for `client_id` now.
    pub fn check(&self, client_id: &str) -> RateDecision {
        self.check_at(client_id, now_seconds())
    }

    /// Checks a request at an explicit instant. Visible for tests.
    pub fn check_at(&self, client_id: &str, now: f64) -> RateDecision {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let queue = clients.entry(client_id.to_string()).or_default();

        // Inline GC: drop timestamps outside the sustained window.
        let cutoff = now - WINDOW_SECONDS;
        while queue.front().map(|t| *t < cutoff).unwrap_or(false) {
            queue.pop_front();
        }

        let burst_cutoff = now - BURST_SECONDS;
        let burst_count = queue.iter().filter(|t| **t > burst_cutoff).count() as u32;
        if burst_count >= self.burst {
            return RateDecision {
                allowed: false,
                limit: self.rpm,
                remaining: 0,
                reset: (now + WINDOW_SECONDS) as u64,
                message: Some(format!(
                    "rate limit exceeded: max {} requests per 5 seconds",
                    self.burst
                )),
            };
        }

        if queue.len() as u32 >= self.rpm {
            return RateDecision {
                allowed: false,
                limit: self.rpm,
                remaining: 0,
                reset: (now + WINDOW_SECONDS) as u64,
                message: Some(format!(
                    "rate limit exceeded: max {} requests per minute",
                    self.rpm
                )),
            };
        }

        queue.push_back(now);
        RateDecision {
            allowed: true,
            limit: self.rpm,
            remaining: self.rpm.saturating_sub(queue.len() as u32),
            reset: (now + WINDOW_SECONDS) as u64,
            message: None,
        }
    }

    /// Number of clients with live windows.
    pub fn tracked_clients(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_within_limits() {
        let limiter = RateLimiter::new(100, 20);
        let decision = limiter.check_at("client", 1000.0);

        assert!(decision.allowed);
        assert_eq!(decision.limit, 100);
        assert_eq!(decision.remaining, 99);
    }

    #[test]
    fn test_burst_window_rejects() {
        let limiter = RateLimiter::new(100, 5);

        for i in 0..5 {
            assert!(limiter.check_at("c", 1000.0 + i as f64 * 0.1).allowed);
        }

        // Sixth request inside the 5-second burst window.
        let decision = limiter.check_at("c", 1001.0);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.message.unwrap().contains("per 5 seconds"));
    }

    #[test]
    fn test_burst_recovers_after_subwindow() {
        let limiter = RateLimiter::new(100, 5);
        for i in 0..5 {
            limiter.check_at("c", 1000.0 + i as f64 * 0.1);
        }
        assert!(!limiter.check_at("c", 1001.0).allowed);

        // 6 seconds later the burst sub-window is clear.
        assert!(limiter.check_at("c", 1007.0).allowed);
    }

    #[test]
    fn test_sustained_window_rejects() {
        let limiter = RateLimiter::new(10, 100);

        for i in 0..10 {
            // Spread out so the burst window never fills.
            assert!(limiter.check_at("c", 1000.0 + i as f64 * 6.0).allowed);
        }

        let decision = limiter.check_at("c", 1059.0);
        assert!(!decision.allowed);
        assert!(decision.message.unwrap().contains("per minute"));
    }

    #[test]
    fn test_sustained_window_slides() {
        let limiter = RateLimiter::new(10, 100);
        for i in 0..10 {
            limiter.check_at("c", 1000.0 + i as f64 * 6.0);
        }
        assert!(!limiter.check_at("c", 1059.0).allowed);

        // 61+ seconds after the first request, a slot has opened.
        assert!(limiter.check_at("c", 1062.0).allowed);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(100, 2);
        assert!(limiter.check_at("a", 1000.0).allowed);
        assert!(limiter.check_at("a", 1000.1).allowed);
        assert!(!limiter.check_at("a", 1000.2).allowed);

        // A different client is untouched.
        assert!(limiter.check_at("b", 1000.2).allowed);
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_rejection_has_no_side_effect() {
        let limiter = RateLimiter::new(100, 2);
        limiter.check_at("c", 1000.0);
        limiter.check_at("c", 1000.1);

        // Rejected requests are not recorded: once the burst window moves
        // past the two accepted requests, capacity returns.
        for i in 0..10 {
            assert!(!limiter.check_at("c", 1000.2 + i as f64 * 0.01).allowed);
        }
        assert!(limiter.check_at("c", 1006.0).allowed);
    }
}
