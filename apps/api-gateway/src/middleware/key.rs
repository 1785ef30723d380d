//! Rate limit key extraction.

use std::str::FromStr;
use std::sync::Arc;

use actix_web::dev::ServiceRequest;
use actix_web::http::header::HeaderName;

use gateway_core::ConfigError;

/// Derives the rate limit key from a request. `None` means no key could be found.
pub type KeyExtractor = Arc<dyn Fn(&ServiceRequest) -> Option<String> + Send + Sync>;

/// Built-in ways of identifying a caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// Client address, honouring `Forwarded` / `X-Forwarded-For`.
    #[default]
    RemoteAddr,
    /// Matched route pattern: every caller of a route shares one budget.
    Route,
    /// Value of a request header, such as an API token.
    Header(HeaderName),
}

impl KeyStrategy {
    pub fn extractor(&self) -> KeyExtractor {
        match self {
            Self::RemoteAddr => Arc::new(|req: &ServiceRequest| {
                req.connection_info()
                    .realip_remote_addr()
                    .map(str::to_owned)
            }),
            Self::Route => Arc::new(|req: &ServiceRequest| req.match_pattern()),
            Self::Header(name) => {
                let name = name.clone();
                Arc::new(move |req: &ServiceRequest| {
                    req.headers()
                        .get(&name)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_owned)
                })
            }
        }
    }
}

impl FromStr for KeyStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "ip" => return Ok(Self::RemoteAddr),
            "route" => return Ok(Self::Route),
            _ => {}
        }

        let header = trimmed
            .split_once(':')
            .filter(|(kind, _)| kind.eq_ignore_ascii_case("header"))
            .map(|(_, name)| name.trim())
            .ok_or_else(|| {
                ConfigError::invalid(
                    "KEY_STRATEGY",
                    trimmed,
                    "expected `ip`, `route` or `header:<Name>`",
                )
            })?;

        HeaderName::from_str(header)
            .map(Self::Header)
            .map_err(|e| ConfigError::invalid("KEY_STRATEGY", trimmed, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_parse_strategies() {
        assert_eq!("ip".parse::<KeyStrategy>().unwrap(), KeyStrategy::RemoteAddr);
        assert_eq!("ROUTE".parse::<KeyStrategy>().unwrap(), KeyStrategy::Route);
        assert_eq!(
            "header:X-Api-Key".parse::<KeyStrategy>().unwrap(),
            KeyStrategy::Header(HeaderName::from_static("x-api-key"))
        );
        assert!("header:".parse::<KeyStrategy>().is_err());
        assert!("cookie:session".parse::<KeyStrategy>().is_err());
    }

    #[test]
    fn test_remote_addr_prefers_forwarded_for() {
        let req = TestRequest::default()
            .insert_header(("x-forwarded-for", "203.0.113.9"))
            .to_srv_request();

        let key = KeyStrategy::RemoteAddr.extractor()(&req);
        assert_eq!(key.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_header_strategy_reads_header() {
        let strategy: KeyStrategy = "header:X-Api-Key".parse().unwrap();
        let extract = strategy.extractor();

        let with = TestRequest::default()
            .insert_header(("x-api-key", "token-123"))
            .to_srv_request();
        assert_eq!(extract(&with).as_deref(), Some("token-123"));

        let without = TestRequest::default().to_srv_request();
        assert_eq!(extract(&without), None);
    }
}
