//! Application state - shared across all workers.

use std::sync::Arc;

use gateway_core::ports::{CounterStore, RateLimiter, StoreError};
use gateway_core::{InvalidKeyPolicy, LimiterCore, NoLimitLimiter};
use gateway_infra::InMemoryCounterStore;
use gateway_shared::dto::LimiterInfo;

use crate::config::{AppConfig, StoreConfig, StoreEndpoint};
use crate::middleware::AdmissionMiddleware;
use crate::middleware::key::KeyStrategy;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Store-backed limiter guarding the limited route.
    pub limiter: Arc<dyn RateLimiter>,
    /// Always-allow limiter for the control route.
    pub unlimited: Arc<dyn RateLimiter>,
    pub limiter_info: LimiterInfo,
    pub key_strategy: KeyStrategy,
    pub invalid_key_policy: InvalidKeyPolicy,
}

impl AppState {
    /// Build the state with the counter store named by the configuration.
    pub async fn new(config: &AppConfig) -> Result<Self, StoreError> {
        let store = build_store(&config.store).await?;

        let core = LimiterCore::new(store, config.policy, config.fail_policy)
            .with_store_timeout(config.store.timeout);

        let limiter_info = LimiterInfo {
            backend: core.backend().to_string(),
            limit: config.policy.limit(),
            window_ms: config.policy.window_millis(),
            fail_policy: config.fail_policy.as_str().to_string(),
        };

        tracing::info!(
            backend = %limiter_info.backend,
            limit = limiter_info.limit,
            window_ms = limiter_info.window_ms,
            fail_policy = %limiter_info.fail_policy,
            "Application state initialized"
        );

        Ok(Self::with_limiter(
            Arc::new(core),
            limiter_info,
            config.key_strategy.clone(),
            config.invalid_key_policy,
        ))
    }

    pub fn with_limiter(
        limiter: Arc<dyn RateLimiter>,
        limiter_info: LimiterInfo,
        key_strategy: KeyStrategy,
        invalid_key_policy: InvalidKeyPolicy,
    ) -> Self {
        Self {
            limiter,
            unlimited: Arc::new(NoLimitLimiter),
            limiter_info,
            key_strategy,
            invalid_key_policy,
        }
    }

    /// Admission middleware in front of the store-backed limiter.
    pub fn limited_admission(&self) -> AdmissionMiddleware {
        self.admission(self.limiter.clone())
    }

    /// Admission middleware in front of the always-allow limiter.
    ///
    /// The invalid-key policy is never applied here: a request without a
    /// usable key still reaches the route.
    pub fn unlimited_admission(&self) -> AdmissionMiddleware {
        AdmissionMiddleware::new(self.unlimited.clone())
            .with_key_strategy(&self.key_strategy)
            .with_invalid_key_policy(InvalidKeyPolicy::Fallback)
    }

    fn admission(&self, limiter: Arc<dyn RateLimiter>) -> AdmissionMiddleware {
        AdmissionMiddleware::new(limiter)
            .with_key_strategy(&self.key_strategy)
            .with_invalid_key_policy(self.invalid_key_policy)
    }
}

async fn build_store(config: &StoreConfig) -> Result<Arc<dyn CounterStore>, StoreError> {
    match &config.endpoint {
        StoreEndpoint::Memory => {
            tracing::warn!("Using in-memory counter store - limits are per-process");
            Ok(Arc::new(InMemoryCounterStore::new()))
        }
        #[cfg(feature = "redis")]
        StoreEndpoint::Redis(url) => {
            use gateway_infra::{RedisCounterStore, RedisStoreConfig};

            let redis_config = RedisStoreConfig {
                url: url.clone(),
                connect_timeout: config.connect_timeout,
                key_prefix: config.key_prefix.clone(),
            };

            match RedisCounterStore::connect(redis_config.clone()).await {
                Ok(store) => Ok(Arc::new(store)),
                Err(e) => {
                    // Keep serving; the fail policy answers until Redis comes back.
                    tracing::error!(
                        error = %e,
                        "Redis unreachable at startup, will retry on demand"
                    );
                    Ok(Arc::new(RedisCounterStore::new(redis_config)?))
                }
            }
        }
        #[cfg(not(feature = "redis"))]
        StoreEndpoint::Redis(_) => Err(StoreError::Unavailable(
            "built without the `redis` feature".to_string(),
        )),
    }
}
