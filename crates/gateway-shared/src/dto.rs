//! Data Transfer Objects - payloads of the gateway routes.

use serde::{Deserialize, Serialize};

/// Body returned by the demo routes once a request is admitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub route: String,
    pub served_at: String,
}

impl RouteResponse {
    pub fn now(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            served_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Active limiter settings, as reported by the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterInfo {
    pub backend: String,
    pub limit: u64,
    pub window_ms: u64,
    pub fail_policy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub limiter: LimiterInfo,
}
