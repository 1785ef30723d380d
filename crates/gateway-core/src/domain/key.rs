//! Rate limit keys.

use std::fmt;

use crate::ports::RateLimitError;

/// Keys longer than this are rejected as malformed.
pub const MAX_KEY_LEN: usize = 256;

/// Prefix reserved for keys the gateway creates itself. Caller-supplied keys
/// carrying it are rejected, so no caller can land in an internal bucket.
pub const RESERVED_PREFIX: &str = "__";

/// Shared key used when a request yields no usable key and the
/// invalid-key policy is `fallback`.
pub const GLOBAL_KEY: &str = "__global__";

/// Opaque, validated identifier of a caller (client IP, API token, route...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    /// Validate a raw key: non-blank, bounded length, no control characters,
    /// not in the reserved namespace.
    pub fn parse(raw: &str) -> Result<Self, RateLimitError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(RateLimitError::InvalidKey("key is empty".to_string()));
        }
        if trimmed.len() > MAX_KEY_LEN {
            return Err(RateLimitError::InvalidKey(format!(
                "key exceeds {MAX_KEY_LEN} bytes"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(RateLimitError::InvalidKey(
                "key contains control characters".to_string(),
            ));
        }

        if trimmed.starts_with(RESERVED_PREFIX) {
            return Err(RateLimitError::InvalidKey(format!(
                "keys starting with {RESERVED_PREFIX:?} are reserved"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The global fallback key. Only reachable through this constructor.
    pub fn global() -> Self {
        Self(GLOBAL_KEY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let key = RateLimitKey::parse("  10.0.0.1 ").unwrap();
        assert_eq!(key.as_str(), "10.0.0.1");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(matches!(
            RateLimitKey::parse("   "),
            Err(RateLimitError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_parse_rejects_control_characters() {
        assert!(RateLimitKey::parse("abc\ndef").is_err());
    }

    #[test]
    fn test_parse_rejects_reserved_namespace() {
        assert!(RateLimitKey::parse(GLOBAL_KEY).is_err());
        assert!(RateLimitKey::parse("__admin").is_err());
        assert!(RateLimitKey::parse("_single").is_ok());
        assert_eq!(RateLimitKey::global().as_str(), GLOBAL_KEY);
    }

    #[test]
    fn test_parse_rejects_oversized_key() {
        let raw = "k".repeat(MAX_KEY_LEN + 1);
        assert!(RateLimitKey::parse(&raw).is_err());
        assert!(RateLimitKey::parse(&raw[..MAX_KEY_LEN]).is_ok());
    }
}
