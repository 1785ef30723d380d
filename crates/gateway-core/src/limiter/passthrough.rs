//! Limiter that admits everything.

use async_trait::async_trait;

use crate::domain::{Decision, RateLimitKey};
use crate::ports::{RateLimitError, RateLimiter};

/// Always allows, never touches a store. Serves the unlimited control route.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLimitLimiter;

#[async_trait]
impl RateLimiter for NoLimitLimiter {
    async fn consume(&self, _key: &RateLimitKey) -> Decision {
        Decision::unlimited()
    }

    /// Skips key validation: an unusable key must not turn into a rejection.
    async fn check_and_consume(&self, _key: &str) -> Result<Decision, RateLimitError> {
        Ok(Decision::unlimited())
    }
}
