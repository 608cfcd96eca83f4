use crate::config::RateLimitConfig;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Above this many buckets, expired ones are swept on the next admission.
const PRUNE_THRESHOLD: usize = 4096;

/// Budget class an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EndpointClass {
    Read,
    Upload,
    Mutation,
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub admitted: bool,
    /// Time until the current window closes; zero when admitted.
    pub retry_after: Duration,
}

#[derive(Debug, Clone)]
struct RateLimitBucket {
    window_start: Instant,
    count: u32,
}

/// Fixed-window admission control keyed by `(client, endpoint)`.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    budgets: RateLimitConfig,
    buckets: Mutex<HashMap<(String, String), RateLimitBucket>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs),
            budgets: config.clone(),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn budget(&self, class: EndpointClass) -> u32 {
        match class {
            EndpointClass::Read => self.budgets.read,
            EndpointClass::Upload => self.budgets.upload,
            EndpointClass::Mutation => self.budgets.mutation,
            EndpointClass::Execute => self.budgets.execute,
        }
    }

    pub fn admit(&self, client: &str, endpoint: &str, class: EndpointClass) -> bool {
        self.check(client, endpoint, class).admitted
    }

    pub fn check(&self, client: &str, endpoint: &str, class: EndpointClass) -> RateLimitDecision {
        self.check_at(client, endpoint, class, Instant::now())
    }

    /// Admission decision as of `now`. A rejected request does not consume
    /// budget.
    pub fn check_at(
        &self,
        client: &str,
        endpoint: &str,
        class: EndpointClass,
        now: Instant,
    ) -> RateLimitDecision {
        let budget = self.budget(class);
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        if buckets.len() > PRUNE_THRESHOLD {
            let window = self.window;
            buckets.retain(|_, bucket| now.saturating_duration_since(bucket.window_start) < window);
        }

        let bucket = buckets
            .entry((client.to_string(), endpoint.to_string()))
            .or_insert(RateLimitBucket {
                window_start: now,
                count: 0,
            });

        let elapsed = now.saturating_duration_since(bucket.window_start);
        if elapsed >= self.window {
            bucket.window_start = now;
            bucket.count = 0;
        }

        if bucket.count < budget {
            bucket.count += 1;
            RateLimitDecision {
                admitted: true,
                retry_after: Duration::ZERO,
            }
        } else {
            let remaining = self
                .window
                .saturating_sub(now.saturating_duration_since(bucket.window_start));
            RateLimitDecision {
                admitted: false,
                retry_after: remaining,
            }
        }
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(execute: u32) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            execute,
            ..RateLimitConfig::default()
        })
    }

    #[test]
    fn admits_up_to_budget_then_rejects() {
        let limiter = limiter(3);
        let now = Instant::now();

        for _ in 0..3 {
            assert!(
                limiter
                    .check_at("10.0.0.1", "execute", EndpointClass::Execute, now)
                    .admitted
            );
        }
        let rejected = limiter.check_at("10.0.0.1", "execute", EndpointClass::Execute, now);
        assert!(!rejected.admitted);
        assert_eq!(rejected.retry_after, Duration::from_secs(60));
    }

    #[test]
    fn clients_and_endpoints_have_independent_buckets() {
        let limiter = limiter(1);
        let now = Instant::now();

        assert!(limiter.check_at("a", "execute", EndpointClass::Execute, now).admitted);
        assert!(!limiter.check_at("a", "execute", EndpointClass::Execute, now).admitted);
        assert!(limiter.check_at("b", "execute", EndpointClass::Execute, now).admitted);
        assert!(limiter.check_at("a", "upload", EndpointClass::Upload, now).admitted);
    }

    #[test]
    fn window_rollover_resets_budget() {
        let limiter = limiter(1);
        let start = Instant::now();

        assert!(limiter.check_at("a", "x", EndpointClass::Execute, start).admitted);
        let later = start + Duration::from_secs(45);
        let rejected = limiter.check_at("a", "x", EndpointClass::Execute, later);
        assert!(!rejected.admitted);
        assert_eq!(rejected.retry_after, Duration::from_secs(15));

        let next_window = start + Duration::from_secs(60);
        assert!(limiter.check_at("a", "x", EndpointClass::Execute, next_window).admitted);
    }

    #[test]
    fn default_budgets_per_class() {
        let limiter = RateLimiter::new(&RateLimitConfig::default());
        assert_eq!(limiter.budget(EndpointClass::Read), 60);
        assert_eq!(limiter.budget(EndpointClass::Upload), 20);
        assert_eq!(limiter.budget(EndpointClass::Mutation), 10);
        assert_eq!(limiter.budget(EndpointClass::Execute), 10);
    }

    #[test]
    fn zero_budget_always_rejects() {
        let limiter = limiter(0);
        assert!(!limiter.admit("a", "execute", EndpointClass::Execute));
    }

    #[test]
    fn stale_buckets_are_pruned() {
        let limiter = limiter(10);
        let start = Instant::now();
        for i in 0..=PRUNE_THRESHOLD {
            limiter.check_at(&format!("client-{i}"), "x", EndpointClass::Execute, start);
        }
        assert_eq!(limiter.bucket_count(), PRUNE_THRESHOLD + 1);

        let later = start + Duration::from_secs(120);
        limiter.check_at("fresh", "x", EndpointClass::Execute, later);
        assert_eq!(limiter.bucket_count(), 1);
    }

    #[test]
    fn concurrent_admissions_never_exceed_budget() {
        let limiter = std::sync::Arc::new(limiter(10));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..10)
                        .filter(|_| limiter.admit("shared", "execute", EndpointClass::Execute))
                        .count()
                })
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 10);
    }
}
