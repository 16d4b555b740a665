//! Rate limiting for the unauthenticated student endpoints.
//!
//! PIN login and room code verification can both be used to guess secrets, so each gets a
//! fixed-window counter. Limiters are process-local and best-effort: state is lost on
//! restart and not shared between replicas.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::{LimitsConfig, RateLimitConfig};
use crate::errors::{Error, Result};

/// Windows are pruned once the table grows past this many keys
const PRUNE_THRESHOLD: usize = 10_000;

/// Container for all resource limiters.
///
/// Built once from configuration and shared through [`AppState`](crate::AppState).
#[derive(Debug, Default, Clone)]
pub struct Limiters {
    /// PIN login attempts keyed by lowercased username. None means unlimited.
    pub pin_login: Option<Arc<RateLimiter>>,
    /// Room code checks keyed by normalized code. None means unlimited.
    pub room_code: Option<Arc<RateLimiter>>,
}

impl Limiters {
    /// Creates all limiters from configuration.
    pub fn new(config: &LimitsConfig) -> Self {
        Self {
            pin_login: RateLimiter::new(&config.pin_login).map(Arc::new),
            room_code: RateLimiter::new(&config.room_code).map(Arc::new),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter.
///
/// Each key may make `max_requests` calls per `window`. The window starts at the first
/// call for the key and resets once it has fully elapsed.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    /// Creates a limiter from configuration. `max_requests: 0` returns `None` (unlimited).
    pub fn new(config: &RateLimitConfig) -> Option<Self> {
        if config.max_requests == 0 {
            return None;
        }

        Some(Self {
            max_requests: config.max_requests,
            window: config.window,
            windows: DashMap::new(),
        })
    }

    /// Count one attempt for `key`.
    ///
    /// Returns `Err(TooManyRequests)` when the key has used up its window.
    pub fn check(&self, key: &str) -> Result<()> {
        let now = Instant::now();

        if self.windows.len() > PRUNE_THRESHOLD {
            self.prune(now);
        }

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, count: 0 };
        }

        if entry.count >= self.max_requests {
            tracing::debug!(key, "Rate limit exceeded");
            return Err(Error::TooManyRequests {
                message: "Too many attempts. Please try again later.".to_string(),
            });
        }

        entry.count += 1;
        Ok(())
    }

    /// Forget a key, e.g. after a successful login
    pub fn reset(&self, key: &str) {
        self.windows.remove(key);
    }

    fn prune(&self, now: Instant) {
        self.windows.retain(|_, w| now.duration_since(w.started) < self.window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
        })
        .unwrap()
    }

    #[test]
    fn test_zero_disables_limiter() {
        let config = RateLimitConfig {
            max_requests: 0,
            window: Duration::from_secs(60),
        };
        assert!(RateLimiter::new(&config).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_after_max_requests() {
        let limiter = limiter(3, 60);

        for _ in 0..3 {
            assert!(limiter.check("student1").is_ok());
        }
        let err = limiter.check("student1").unwrap_err();
        assert!(matches!(err, Error::TooManyRequests { .. }));

        // Other keys are unaffected
        assert!(limiter.check("student2").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets() {
        let limiter = limiter(2, 60);

        assert!(limiter.check("student1").is_ok());
        assert!(limiter.check("student1").is_ok());
        assert!(limiter.check("student1").is_err());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.check("student1").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_key() {
        let limiter = limiter(1, 60);

        assert!(limiter.check("student1").is_ok());
        assert!(limiter.check("student1").is_err());

        limiter.reset("student1");
        assert!(limiter.check("student1").is_ok());
    }

    #[test]
    fn test_limiters_from_config() {
        let limiters = Limiters::new(&LimitsConfig {
            pin_login: RateLimitConfig {
                max_requests: 5,
                window: Duration::from_secs(60),
            },
            room_code: RateLimitConfig {
                max_requests: 0,
                window: Duration::from_secs(60),
            },
        });
        assert!(limiters.pin_login.is_some());
        assert!(limiters.room_code.is_none());
    }
}
