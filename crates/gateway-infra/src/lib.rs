//! # Gateway Infrastructure
//!
//! Concrete implementations of the counter store port defined in `gateway-core`.
//!
//! ## Feature Flags
//!
//! - `redis` (default) - Redis-backed counter store shared across processes
//!
//! The in-memory store is always available. Its counts are per-process.

pub mod clock;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::InMemoryCounterStore;

#[cfg(feature = "redis")]
pub use store::{RedisCounterStore, RedisStoreConfig};
