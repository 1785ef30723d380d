//! Application configuration loaded from environment variables.
//!
//! Read once at startup into immutable values that are handed to the
//! components that need them. Malformed values fail startup rather than
//! falling back to a default.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use gateway_core::{ConfigError, FailPolicy, InvalidKeyPolicy, PolicyConfig};

use crate::middleware::key::KeyStrategy;

/// Where rate limit counters live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEndpoint {
    /// Per-process counters, for local runs.
    Memory,
    /// Shared Redis instance, given as a connection URL.
    Redis(String),
}

impl FromStr for StoreEndpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("memory") {
            Ok(Self::Memory)
        } else if ["redis://", "rediss://", "redis+unix://", "unix://"]
            .iter()
            .any(|scheme| trimmed.starts_with(scheme))
        {
            Ok(Self::Redis(trimmed.to_string()))
        } else {
            Err(ConfigError::invalid(
                "STORE_ENDPOINT",
                trimmed,
                "expected `memory` or a redis:// URL",
            ))
        }
    }
}

impl StoreEndpoint {
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis(_) => "redis",
        }
    }
}

/// Counter store settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: StoreEndpoint,
    /// Bound on each increment round-trip.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub key_prefix: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub policy: PolicyConfig,
    pub fail_policy: FailPolicy,
    pub store: StoreConfig,
    pub key_strategy: KeyStrategy,
    pub invalid_key_policy: InvalidKeyPolicy,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any name -> value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let policy = PolicyConfig::from_millis(
            parse_or(&lookup, "RATE_LIMIT", 20)?,
            parse_or(&lookup, "RATE_WINDOW_MS", 1000)?,
        )?;

        let store = StoreConfig {
            endpoint: parse_or(
                &lookup,
                "STORE_ENDPOINT",
                StoreEndpoint::Redis("redis://127.0.0.1:6379".to_string()),
            )?,
            timeout: Duration::from_millis(positive_millis(&lookup, "STORE_TIMEOUT_MS", 50)?),
            connect_timeout: Duration::from_millis(positive_millis(
                &lookup,
                "STORE_CONNECT_TIMEOUT_MS",
                1000,
            )?),
            key_prefix: lookup("RATE_LIMIT_KEY_PREFIX").unwrap_or_else(|| "ratelimit".to_string()),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            policy,
            fail_policy: parse_or(&lookup, "FAIL_POLICY", FailPolicy::Open)?,
            store,
            key_strategy: parse_or(&lookup, "KEY_STRATEGY", KeyStrategy::RemoteAddr)?,
            invalid_key_policy: parse_or(
                &lookup,
                "INVALID_KEY_POLICY",
                InvalidKeyPolicy::Fallback,
            )?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Into<ConfigErrorSource>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| {
                Into::<ConfigErrorSource>::into(e).into_config_error(name, &raw)
            }),
    }
}

fn positive_millis<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, name, default)? {
        0 => Err(ConfigError::NotPositive { name }),
        millis => Ok(millis),
    }
}

/// Parse failures from either std number parsing or our own `FromStr` impls.
enum ConfigErrorSource {
    Config(ConfigError),
    Other(String),
}

impl ConfigErrorSource {
    fn into_config_error(self, name: &'static str, raw: &str) -> ConfigError {
        match self {
            Self::Config(err) => err,
            Self::Other(reason) => ConfigError::invalid(name, raw, reason),
        }
    }
}

impl From<ConfigError> for ConfigErrorSource {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<std::num::ParseIntError> for ConfigErrorSource {
    fn from(err: std::num::ParseIntError) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.policy.limit(), 20);
        assert_eq!(config.policy.window(), Duration::from_secs(1));
        assert_eq!(config.fail_policy, FailPolicy::Open);
        assert_eq!(
            config.store.endpoint,
            StoreEndpoint::Redis("redis://127.0.0.1:6379".to_string())
        );
        assert_eq!(config.store.timeout, Duration::from_millis(50));
        assert_eq!(config.key_strategy, KeyStrategy::RemoteAddr);
        assert_eq!(config.invalid_key_policy, InvalidKeyPolicy::Fallback);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("RATE_LIMIT", "40"),
            ("RATE_WINDOW_MS", "2500"),
            ("STORE_ENDPOINT", "memory"),
            ("FAIL_POLICY", "closed"),
            ("KEY_STRATEGY", "header:X-Api-Key"),
            ("INVALID_KEY_POLICY", "reject"),
            ("PORT", "9090"),
        ])
        .unwrap();

        assert_eq!(config.policy.limit(), 40);
        assert_eq!(config.policy.window_millis(), 2500);
        assert_eq!(config.store.endpoint, StoreEndpoint::Memory);
        assert_eq!(config.fail_policy, FailPolicy::Closed);
        assert_eq!(config.invalid_key_policy, InvalidKeyPolicy::Reject);
        assert_eq!(config.port, 9090);
        assert!(matches!(config.key_strategy, KeyStrategy::Header(_)));
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        assert_eq!(
            load(&[("RATE_LIMIT", "0")]).unwrap_err(),
            ConfigError::NotPositive { name: "RATE_LIMIT" }
        );
    }

    #[test]
    fn test_non_numeric_window_is_rejected() {
        let err = load(&[("RATE_WINDOW_MS", "soon")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "RATE_WINDOW_MS",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_store_timeout_is_rejected() {
        assert_eq!(
            load(&[("STORE_TIMEOUT_MS", "0")]).unwrap_err(),
            ConfigError::NotPositive {
                name: "STORE_TIMEOUT_MS"
            }
        );
    }

    #[test]
    fn test_unknown_store_endpoint_is_rejected() {
        assert!(load(&[("STORE_ENDPOINT", "memcached://localhost")]).is_err());
        assert!(load(&[("STORE_ENDPOINT", "rediss://cache.internal:6380")]).is_ok());
    }
}
