//! Ports - trait definitions for external dependencies.
//! Storage backends implement these; the HTTP layer consumes them.

mod counter_store;
mod rate_limit;

pub use counter_store::{CounterStore, StoreError, WindowCount};
pub use rate_limit::{RateLimitError, RateLimiter};
