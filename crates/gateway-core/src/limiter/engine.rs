//! Store-backed limiter.
//!
//! Holds no per-key state: every mutation happens inside the counter store's
//! atomic increment, so one instance can be shared by any number of workers
//! and any number of processes can share one store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Decision, FailPolicy, FixedWindowPolicy, PolicyConfig, RateLimitKey};
use crate::ports::{CounterStore, RateLimiter, StoreError, WindowCount};

/// Upper bound on a single store round-trip unless configured otherwise.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(50);

/// Limiter backed by a shared [`CounterStore`] and a fixed-window policy.
pub struct LimiterCore {
    store: Arc<dyn CounterStore>,
    config: PolicyConfig,
    policy: FixedWindowPolicy,
    fail_policy: FailPolicy,
    store_timeout: Duration,
}

impl LimiterCore {
    pub fn new(
        store: Arc<dyn CounterStore>,
        config: PolicyConfig,
        fail_policy: FailPolicy,
    ) -> Self {
        Self {
            store,
            config,
            policy: FixedWindowPolicy::new(config.limit()),
            fail_policy,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn fail_policy(&self) -> FailPolicy {
        self.fail_policy
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    async fn increment(&self, key: &RateLimitKey) -> Result<WindowCount, StoreError> {
        let call = self
            .store
            .increment_and_get(key.as_str(), self.config.window());

        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(format!(
                "no reply within {:?}",
                self.store_timeout
            ))),
        }
    }

    fn on_store_failure(&self, key: &RateLimitKey, error: &StoreError) -> Decision {
        match self.fail_policy {
            FailPolicy::Open => {
                tracing::warn!(
                    key = %key,
                    error = %error,
                    backend = self.store.backend(),
                    "Counter store failed, admitting request (fail-open)"
                );
                Decision::allow(self.config.limit(), self.config.limit())
            }
            FailPolicy::Closed => {
                tracing::warn!(
                    key = %key,
                    error = %error,
                    backend = self.store.backend(),
                    "Counter store failed, rejecting request (fail-closed)"
                );
                Decision::deny(self.config.limit(), self.config.window())
            }
        }
    }
}

#[async_trait]
impl RateLimiter for LimiterCore {
    async fn consume(&self, key: &RateLimitKey) -> Decision {
        let decision = match self.increment(key).await {
            Ok(window) => self.policy.evaluate(window.count, window.ttl_remaining),
            Err(error) => self.on_store_failure(key, &error),
        };

        if !decision.allowed {
            tracing::debug!(
                key = %key,
                retry_after_ms = decision.retry_after_millis(),
                "Rate limit exceeded"
            );
        }

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RateLimitError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const WINDOW: Duration = Duration::from_secs(60);

    /// Counts per key with no expiry; enough to exercise the policy wiring.
    #[derive(Default)]
    struct CountingStore {
        counts: Mutex<HashMap<String, u64>>,
    }

    #[async_trait]
    impl CounterStore for CountingStore {
        async fn increment_and_get(
            &self,
            key: &str,
            window: Duration,
        ) -> Result<WindowCount, StoreError> {
            let mut counts = self.counts.lock().unwrap();
            let count = counts.entry(key.to_string()).or_insert(0);
            *count += 1;
            Ok(WindowCount {
                count: *count,
                ttl_remaining: window,
            })
        }

        fn backend(&self) -> &'static str {
            "counting"
        }
    }

    struct UnreachableStore;

    #[async_trait]
    impl CounterStore for UnreachableStore {
        async fn increment_and_get(&self, _: &str, _: Duration) -> Result<WindowCount, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn backend(&self) -> &'static str {
            "unreachable"
        }
    }

    struct StalledStore;

    #[async_trait]
    impl CounterStore for StalledStore {
        async fn increment_and_get(
            &self,
            _: &str,
            window: Duration,
        ) -> Result<WindowCount, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(WindowCount {
                count: 1,
                ttl_remaining: window,
            })
        }

        fn backend(&self) -> &'static str {
            "stalled"
        }
    }

    fn limiter(store: Arc<dyn CounterStore>, limit: u64, fail_policy: FailPolicy) -> LimiterCore {
        let config = PolicyConfig::new(limit, WINDOW).unwrap();
        LimiterCore::new(store, config, fail_policy)
    }

    #[tokio::test]
    async fn test_allows_until_limit_then_denies() {
        let limiter = limiter(Arc::new(CountingStore::default()), 3, FailPolicy::Open);

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check_and_consume("client-a").await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let denied = limiter.check_and_consume("client-a").await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, WINDOW);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = limiter(Arc::new(CountingStore::default()), 1, FailPolicy::Open);

        assert!(limiter.check_and_consume("a").await.unwrap().allowed);
        assert!(!limiter.check_and_consume("a").await.unwrap().allowed);
        assert!(limiter.check_and_consume("b").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_global_key_is_separate_from_callers() {
        let limiter = limiter(Arc::new(CountingStore::default()), 1, FailPolicy::Open);

        assert!(limiter.consume(&RateLimitKey::global()).await.allowed);
        assert!(!limiter.consume(&RateLimitKey::global()).await.allowed);

        // A caller cannot name the fallback bucket directly.
        let result = limiter.check_and_consume(crate::domain::GLOBAL_KEY).await;
        assert!(matches!(result, Err(RateLimitError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_invalid_key_is_an_error() {
        let limiter = limiter(Arc::new(CountingStore::default()), 1, FailPolicy::Open);

        let result = limiter.check_and_consume("  ").await;
        assert!(matches!(result, Err(RateLimitError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_fail_open_admits_when_store_unreachable() {
        let limiter = limiter(Arc::new(UnreachableStore), 5, FailPolicy::Open);

        for _ in 0..10 {
            let decision = limiter.check_and_consume("client").await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, 5);
        }
    }

    #[tokio::test]
    async fn test_fail_closed_denies_when_store_unreachable() {
        let limiter = limiter(Arc::new(UnreachableStore), 5, FailPolicy::Closed);

        for _ in 0..10 {
            let decision = limiter.check_and_consume("client").await.unwrap();
            assert!(!decision.allowed);
            assert_eq!(decision.retry_after, WINDOW);
        }
    }

    #[tokio::test]
    async fn test_stalled_store_is_bounded_by_timeout() {
        let limiter = limiter(Arc::new(StalledStore), 5, FailPolicy::Closed)
            .with_store_timeout(Duration::from_millis(20));

        let started = std::time::Instant::now();
        let decision = limiter.check_and_consume("client").await.unwrap();

        assert!(!decision.allowed);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_admit_exactly_limit() {
        let limiter = Arc::new(limiter(
            Arc::new(CountingStore::default()),
            20,
            FailPolicy::Closed,
        ));

        let tasks = (0..35).map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.check_and_consume("shared").await.unwrap() })
        });
        let decisions = futures::future::join_all(tasks).await;

        let allowed = decisions
            .iter()
            .filter(|d| d.as_ref().unwrap().allowed)
            .count();
        assert_eq!(allowed, 20);
        assert_eq!(decisions.len() - allowed, 15);
    }
}
