//! Limiter implementations.

mod engine;
mod passthrough;

pub use engine::{DEFAULT_STORE_TIMEOUT, LimiterCore};
pub use passthrough::NoLimitLimiter;
