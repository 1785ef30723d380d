//! Rate limiting port.

use async_trait::async_trait;

use crate::domain::{Decision, RateLimitKey};

/// Rate limiter trait - what the admission middleware talks to.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request against an already validated key.
    ///
    /// Store failures are resolved into a [`Decision`] by the limiter's fail
    /// policy, so this never fails.
    async fn consume(&self, key: &RateLimitKey) -> Decision;

    /// Validate a raw key, then count the request against it.
    ///
    /// The only error is a key that cannot be used.
    async fn check_and_consume(&self, key: &str) -> Result<Decision, RateLimitError> {
        let key = RateLimitKey::parse(key)?;
        Ok(self.consume(&key).await)
    }
}

/// Rate limit errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("Invalid rate limit key: {0}")]
    InvalidKey(String),
}
