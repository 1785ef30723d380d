//! Policy configuration - built once at startup, shared read-only.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Requests allowed per fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    limit: u64,
    window: Duration,
}

impl PolicyConfig {
    pub fn new(limit: u64, window: Duration) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::NotPositive { name: "RATE_LIMIT" });
        }
        if window.is_zero() {
            return Err(ConfigError::NotPositive {
                name: "RATE_WINDOW_MS",
            });
        }
        Ok(Self { limit, window })
    }

    pub fn from_millis(limit: u64, window_millis: u64) -> Result<Self, ConfigError> {
        Self::new(limit, Duration::from_millis(window_millis))
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn window_millis(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            limit: 20,
            window: Duration::from_secs(1),
        }
    }
}

/// What to do when the counter store cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailPolicy {
    /// Admit the request and log the failure.
    #[default]
    Open,
    /// Deny the request.
    Closed,
}

impl FromStr for FailPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(ConfigError::invalid(
                "FAIL_POLICY",
                other,
                "expected `open` or `closed`",
            )),
        }
    }
}

impl FailPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// What to do when a request yields an empty or malformed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidKeyPolicy {
    /// Count the request against the shared global key.
    #[default]
    Fallback,
    /// Answer 400 without consulting the limiter.
    Reject,
}

impl FromStr for InvalidKeyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(Self::Fallback),
            "reject" => Ok(Self::Reject),
            other => Err(ConfigError::invalid(
                "INVALID_KEY_POLICY",
                other,
                "expected `fallback` or `reject`",
            )),
        }
    }
}
