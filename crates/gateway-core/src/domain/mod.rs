//! Domain types - keys, policy configuration and admission decisions.

mod config;
mod decision;
mod key;
mod policy;

pub use config::{FailPolicy, InvalidKeyPolicy, PolicyConfig};
pub use decision::Decision;
pub use key::{GLOBAL_KEY, MAX_KEY_LEN, RESERVED_PREFIX, RateLimitKey};
pub use policy::FixedWindowPolicy;
