//! Fixed-window admission control keyed by client address.
//!
//! Each client key owns a counter and the instant its current window
//! started. A request that arrives more than one window after that instant
//! starts a fresh window. Within a window the first `budget` requests are
//! admitted and the rest are refused.
//!
//! A client can squeeze up to `2 * budget` requests into a short span that
//! straddles a window boundary. That is inherent to fixed windows and is
//! accepted here.
//!
//! The visitor table is a [`DashMap`], so only keys that hash to the same
//! shard ever wait on each other. The shard guard is held for exactly one
//! read-modify-write of a single record.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default request budget per window.
pub const DEFAULT_BUDGET: u32 = 100;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Default number of idle windows after which a record is swept.
pub const DEFAULT_IDLE_WINDOWS: u32 = 5;

#[derive(Debug, Clone, Copy)]
struct Visitor {
    count: u32,
    last_seen: Instant,
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed. `remaining` is what is left of the budget
    /// in the current window.
    Allowed { remaining: u32 },
    /// The request must be refused. `retry_after` is the time left until
    /// the current window closes.
    Limited { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

/// Per-client fixed-window rate limiter.
pub struct RateLimiter {
    visitors: DashMap<String, Visitor>,
    budget: u32,
    window: Duration,
    idle_windows: u32,
}

impl RateLimiter {
    pub fn new(budget: u32, window: Duration) -> Self {
        Self {
            visitors: DashMap::new(),
            budget,
            window,
            idle_windows: DEFAULT_IDLE_WINDOWS,
        }
    }

    /// Sets how many whole windows a record may sit idle before
    /// [`sweep`](Self::sweep) drops it. Values below 1 are raised to 1.
    pub fn with_idle_windows(mut self, idle_windows: u32) -> Self {
        self.idle_windows = idle_windows.max(1);
        self
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Records one request from `key` and reports whether it is admitted.
    pub fn allow(&self, key: &str) -> bool {
        self.check(key).is_allowed()
    }

    /// Records one request from `key` at the current instant.
    pub fn check(&self, key: &str) -> Admission {
        self.check_at(key, Instant::now())
    }

    /// Records one request from `key` as if it arrived at `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> Admission {
        let mut visitor = match self.visitors.get_mut(key) {
            Some(existing) => existing,
            None => self.visitors.entry(key.to_owned()).or_insert(Visitor {
                count: 0,
                last_seen: now,
            }),
        };

        let mut elapsed = now.saturating_duration_since(visitor.last_seen);
        if elapsed > self.window {
            visitor.count = 0;
            visitor.last_seen = now;
            elapsed = Duration::ZERO;
        }

        visitor.count = visitor.count.saturating_add(1);

        if visitor.count <= self.budget {
            Admission::Allowed {
                remaining: self.budget - visitor.count,
            }
        } else {
            Admission::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            }
        }
    }

    /// Drops records that have been idle for longer than the configured
    /// number of windows. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let max_idle = self
            .window
            .checked_mul(self.idle_windows)
            .unwrap_or(Duration::MAX);
        let before = self.visitors.len();
        self.visitors
            .retain(|_, v| now.saturating_duration_since(v.last_seen) <= max_idle);
        let removed = before.saturating_sub(self.visitors.len());
        if removed > 0 {
            tracing::debug!(removed, tracked = self.visitors.len(), "Swept idle visitor records");
        }
        removed
    }

    /// Number of client keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.visitors.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET, DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: Duration = Duration::from_secs(60);

    #[test]
    fn first_hundred_pass_then_deny() {
        let limiter = RateLimiter::new(100, W);
        let start = Instant::now();
        for i in 0..100 {
            let t = start + Duration::from_millis(i * 10);
            assert!(limiter.check_at("10.0.0.1", t).is_allowed(), "call {} denied", i + 1);
        }
        let denied = limiter.check_at("10.0.0.1", start + Duration::from_secs(30));
        assert_eq!(
            denied,
            Admission::Limited {
                retry_after: Duration::from_secs(30)
            }
        );
    }

    #[test]
    fn first_request_is_always_allowed() {
        let limiter = RateLimiter::new(1, W);
        assert_eq!(
            limiter.check_at("fresh", Instant::now()),
            Admission::Allowed { remaining: 0 }
        );
    }

    #[test]
    fn window_reset_restarts_count_at_one() {
        let limiter = RateLimiter::new(100, W);
        let start = Instant::now();
        for _ in 0..100 {
            limiter.check_at("10.0.0.2", start);
        }
        assert!(!limiter.check_at("10.0.0.2", start + W).is_allowed());

        let after = start + W + Duration::from_millis(1);
        assert_eq!(
            limiter.check_at("10.0.0.2", after),
            Admission::Allowed { remaining: 99 }
        );
    }

    #[test]
    fn elapsed_equal_to_window_stays_in_window() {
        let limiter = RateLimiter::new(1, W);
        let start = Instant::now();
        assert!(limiter.check_at("k", start).is_allowed());
        assert_eq!(
            limiter.check_at("k", start + W),
            Admission::Limited {
                retry_after: Duration::ZERO
            }
        );
    }

    #[test]
    fn boundary_burst_admits_up_to_twice_the_budget() {
        let limiter = RateLimiter::new(3, W);
        let start = Instant::now();
        let late = start + W - Duration::from_millis(1);
        assert!(limiter.check_at("k", start).is_allowed());
        for _ in 0..2 {
            assert!(limiter.check_at("k", late).is_allowed());
        }
        let next = start + W + Duration::from_millis(1);
        for _ in 0..3 {
            assert!(limiter.check_at("k", next).is_allowed());
        }
        assert!(!limiter.check_at("k", next).is_allowed());
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(2, W);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).is_allowed());
        assert!(limiter.check_at("b", now).is_allowed());
        assert!(limiter.check_at("a", now).is_allowed());
        assert!(!limiter.check_at("a", now).is_allowed());
        assert_eq!(limiter.check_at("b", now), Admission::Allowed { remaining: 0 });
        assert!(!limiter.check_at("b", now).is_allowed());
    }

    #[test]
    fn concurrent_calls_on_one_key_never_exceed_budget() {
        let limiter = RateLimiter::new(100, W);
        let allowed = std::sync::atomic::AtomicU32::new(0);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..50 {
                        if limiter.allow("shared") {
                            allowed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        }
                    }
                });
            }
        });
        assert_eq!(allowed.into_inner(), 100);
    }

    #[test]
    fn sweep_drops_only_idle_records() {
        let limiter = RateLimiter::new(10, W).with_idle_windows(2);
        let start = Instant::now();
        limiter.check_at("idle", start);
        limiter.check_at("active", start + W * 2);

        assert_eq!(limiter.sweep_at(start + W * 2 + Duration::from_secs(1)), 1);
        assert_eq!(limiter.tracked(), 1);
        assert!(limiter.check_at("active", start + W * 2 + Duration::from_secs(2)).is_allowed());
    }

    #[test]
    fn swept_key_starts_a_fresh_window() {
        let limiter = RateLimiter::new(1, W).with_idle_windows(1);
        let start = Instant::now();
        assert!(limiter.check_at("k", start).is_allowed());
        let later = start + W * 3;
        assert_eq!(limiter.sweep_at(later), 1);
        assert!(limiter.check_at("k", later).is_allowed());
    }
}
