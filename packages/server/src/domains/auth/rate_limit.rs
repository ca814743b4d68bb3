//! Per-subject issuance counter.
//!
//! `rate:<subject>` holds an integer whose TTL is reset to the window on
//! every increment, so the window restarts with each counted request.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::kernel::{with_deadline, BaseKeyValueStore, StoreError};

pub struct RateLimiter {
    store: Arc<dyn BaseKeyValueStore>,
    window: Duration,
    threshold: i64,
    store_timeout: Duration,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn BaseKeyValueStore>,
        window: Duration,
        threshold: i64,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            window,
            threshold,
            store_timeout,
        }
    }

    pub fn key(subject: &str) -> String {
        format!("rate:{}", subject)
    }

    /// Pure read: an absent counter is never limited.
    pub async fn is_limited(&self, subject: &str) -> Result<bool, StoreError> {
        let key = Self::key(subject);
        let Some(raw) = with_deadline(self.store_timeout, self.store.get(&key)).await? else {
            return Ok(false);
        };

        let count: i64 = raw.trim().parse().map_err(|_| {
            warn!(key = %key, value = %raw, "rate-limit counter is not an integer");
            StoreError::Unavailable(format!("corrupt counter at {}", key))
        })?;

        Ok(count >= self.threshold)
    }

    /// Count one issuance and restart the window. Returns the new count.
    pub async fn increment(&self, subject: &str) -> Result<i64, StoreError> {
        let key = Self::key(subject);
        with_deadline(
            self.store_timeout,
            self.store.increment_with_ttl(&key, self.window),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{InMemoryKeyValueStore, MockClock};

    fn limiter(clock: &Arc<MockClock>, threshold: i64) -> (RateLimiter, Arc<InMemoryKeyValueStore>) {
        let store = Arc::new(InMemoryKeyValueStore::new(clock.clone()));
        let limiter = RateLimiter::new(
            store.clone(),
            Duration::from_secs(60),
            threshold,
            Duration::from_secs(1),
        );
        (limiter, store)
    }

    #[tokio::test]
    async fn test_absent_counter_is_not_limited() {
        let clock = Arc::new(MockClock::new());
        let (limiter, store) = limiter(&clock, 3);

        assert!(!limiter.is_limited("+15551234567").await.unwrap());
        // Reading must not create the counter
        assert_eq!(store.raw("rate:+15551234567"), None);
    }

    #[tokio::test]
    async fn test_limited_at_threshold() {
        let clock = Arc::new(MockClock::new());
        let (limiter, _) = limiter(&clock, 3);

        for expected in 1..=2 {
            assert_eq!(limiter.increment("+15551234567").await.unwrap(), expected);
            assert!(!limiter.is_limited("+15551234567").await.unwrap());
        }
        limiter.increment("+15551234567").await.unwrap();
        assert!(limiter.is_limited("+15551234567").await.unwrap());
    }

    #[tokio::test]
    async fn test_window_elapse_clears_limit() {
        let clock = Arc::new(MockClock::new());
        let (limiter, _) = limiter(&clock, 1);

        limiter.increment("+15551234567").await.unwrap();
        assert!(limiter.is_limited("+15551234567").await.unwrap());

        clock.advance(chrono::Duration::seconds(61));
        assert!(!limiter.is_limited("+15551234567").await.unwrap());
        assert_eq!(limiter.increment("+15551234567").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_subjects_are_independent() {
        let clock = Arc::new(MockClock::new());
        let (limiter, _) = limiter(&clock, 1);

        limiter.increment("+15551234567").await.unwrap();
        assert!(!limiter.is_limited("+15557654321").await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_counter_is_a_store_error() {
        let clock = Arc::new(MockClock::new());
        let (limiter, store) = limiter(&clock, 1);

        store
            .set_with_ttl("rate:+15551234567", "lots", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(matches!(
            limiter.is_limited("+15551234567").await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
