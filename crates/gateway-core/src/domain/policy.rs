//! Fixed-window admission policy.
//!
//! Pure computation: the store has already counted the request, this only
//! turns the count into a decision. A fixed window admits up to twice the
//! limit across a window edge; switching to sliding-window or token-bucket
//! semantics only requires a different policy here.

use std::time::Duration;

use super::Decision;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWindowPolicy {
    limit: u64,
}

impl FixedWindowPolicy {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Evaluate the count observed after this request was counted.
    ///
    /// The request that brings the count to exactly `limit` is allowed.
    pub fn evaluate(&self, current_count: u64, ttl_remaining: Duration) -> Decision {
        if current_count <= self.limit {
            Decision::allow(self.limit, self.limit.saturating_sub(current_count))
        } else {
            Decision::deny(self.limit, ttl_remaining)
        }
    }
}
