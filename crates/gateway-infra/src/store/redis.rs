//! Redis counter store - fixed-window counters shared by every gateway process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, RedisError, Script};
use tokio::sync::RwLock;

use gateway_core::ports::{CounterStore, StoreError, WindowCount};

/// Increment, start the window on first hit, report the remaining TTL.
/// A key that somehow lost its expiry is given one again so it cannot pin
/// a caller at the limit forever.
const INCREMENT_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end

local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end

return {current, ttl}
"#;

/// Redis counter store configuration.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Bound on establishing the connection
    pub connect_timeout: Duration,
    /// Key prefix for rate limit keys
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connect_timeout: Duration::from_secs(1),
            key_prefix: "ratelimit".to_string(),
        }
    }
}

/// Redis-backed counter store.
///
/// The connection is opened in a background task. While no connection
/// exists every call fails fast with `Unavailable` and, unless an attempt is
/// already running, starts a new one bounded by `connect_timeout`. Request
/// latency therefore never includes a connect, and the gateway can start
/// while Redis is down. Once established, the connection manager reconnects
/// on its own.
pub struct RedisCounterStore {
    client: Client,
    conn: Arc<RwLock<Option<ConnectionManager>>>,
    connecting: Arc<AtomicBool>,
    config: RedisStoreConfig,
    script: Script,
}

impl RedisCounterStore {
    /// Create a store without connecting. Fails only on a malformed URL.
    pub fn new(config: RedisStoreConfig) -> Result<Self, StoreError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            conn: Arc::new(RwLock::new(None)),
            connecting: Arc::new(AtomicBool::new(false)),
            config,
            script: Script::new(INCREMENT_SCRIPT),
        })
    }

    /// Create a store and establish the connection up front.
    pub async fn connect(config: RedisStoreConfig) -> Result<Self, StoreError> {
        let store = Self::new(config)?;
        let conn = establish(store.client.clone(), store.config.connect_timeout).await?;

        tracing::info!(prefix = %store.config.key_prefix, "Connected to Redis counter store");

        *store.conn.write().await = Some(conn);
        Ok(store)
    }

    /// Whether a connection is currently held.
    pub async fn is_connected(&self) -> bool {
        self.conn.read().await.is_some()
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        if let Some(conn) = self.conn.read().await.as_ref() {
            return Ok(conn.clone());
        }

        self.spawn_connect();
        Err(StoreError::Unavailable(
            "no Redis connection yet, connect in progress".to_string(),
        ))
    }

    /// Start a connect attempt unless one is already in flight.
    fn spawn_connect(&self) {
        if self
            .connecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let client = self.client.clone();
        let slot = Arc::clone(&self.conn);
        let connecting = Arc::clone(&self.connecting);
        let connect_timeout = self.config.connect_timeout;
        let prefix = self.config.key_prefix.clone();

        tokio::spawn(async move {
            match establish(client, connect_timeout).await {
                Ok(conn) => {
                    *slot.write().await = Some(conn);
                    tracing::info!(prefix = %prefix, "Connected to Redis counter store");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Redis connect attempt failed");
                }
            }
            connecting.store(false, Ordering::Release);
        });
    }
}

async fn establish(
    client: Client,
    connect_timeout: Duration,
) -> Result<ConnectionManager, StoreError> {
    tokio::time::timeout(connect_timeout, ConnectionManager::new(client))
        .await
        .map_err(|_| {
            StoreError::Timeout(format!("connect not completed within {connect_timeout:?}"))
        })?
        .map_err(map_redis_error)
}

fn map_redis_error(err: RedisError) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout(err.to_string())
    } else {
        StoreError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment_and_get(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, StoreError> {
        let redis_key = self.make_key(key);
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.connection().await?;

        let (count, ttl_ms): (i64, i64) = self
            .script
            .key(&redis_key)
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        Ok(WindowCount {
            count: count.max(1) as u64,
            ttl_remaining: Duration::from_millis(ttl_ms.max(0) as u64),
        })
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
