//! Counter store port - atomic increment-with-expiry against a shared backend.

use async_trait::async_trait;
use std::time::Duration;

/// State of a key's window right after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Requests counted in the current window, including this one. Always >= 1.
    pub count: u64,
    /// Time until the window expires and the key is recreated on next use.
    pub ttl_remaining: Duration,
}

/// Counter store trait - abstraction over shared counter backends (Redis, in-memory).
///
/// Implementations must perform the increment and, for a new key, the expiry
/// assignment as one atomic step. Concurrent increments for the same key are
/// linearized by the store.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter for `key`, creating it with a TTL of `window`
    /// and a count of 1 if it is absent or expired.
    async fn increment_and_get(&self, key: &str, window: Duration)
    -> Result<WindowCount, StoreError>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

/// Counter store errors. Infrastructure failures, never "limit exceeded".
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store timed out: {0}")]
    Timeout(String),
}
