//! Local sliding window rate limiting.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::RateLimit;

/// Attempts allowed per key within a sliding window.
#[derive(Debug)]
pub struct RateLimiter {
    maximum_request: usize,
    window: Duration,
    buckets: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(maximum_request: usize, window: Duration) -> Self {
        RateLimiter {
            maximum_request,
            window,
            buckets: DashMap::new(),
        }
    }

    /// Record an attempt for `key`. Returns `false` once the limit is reached.
    pub fn check<T>(&self, key: T) -> bool
    where
        T: ToString,
    {
        let now = Instant::now();
        let mut attempts = self.buckets.entry(key.to_string()).or_default();

        // Clean old attempts.
        while let Some(time) = attempts.front() {
            if now.duration_since(*time) >= self.window {
                attempts.pop_front();
            } else {
                break;
            }
        }

        if attempts.len() >= self.maximum_request {
            false
        } else {
            attempts.push_back(now);
            true
        }
    }
}

impl From<&RateLimit> for RateLimiter {
    fn from(config: &RateLimit) -> Self {
        RateLimiter::new(config.max_requests, Duration::from_secs(config.window))
    }
}
