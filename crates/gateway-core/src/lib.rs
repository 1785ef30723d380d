//! # Gateway Core
//!
//! The rate limiting domain of the gateway.
//! This crate holds the admission policy, the ports that storage backends
//! implement, and the limiter that ties them together. It performs no I/O
//! of its own.

pub mod domain;
pub mod error;
pub mod limiter;
pub mod ports;

pub use domain::{
    Decision, FailPolicy, FixedWindowPolicy, InvalidKeyPolicy, PolicyConfig, RateLimitKey,
};
pub use error::ConfigError;
pub use limiter::{LimiterCore, NoLimitLimiter};
