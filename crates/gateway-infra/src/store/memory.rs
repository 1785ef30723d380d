//! In-memory counter store.
//!
//! Single-process only: two gateway instances each keep their own counts.
//! Used for local runs (`STORE_ENDPOINT=memory`) and tests.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use gateway_core::ports::{CounterStore, StoreError, WindowCount};

use crate::clock::{Clock, SystemClock};

/// Number of live keys above which expired entries are swept on write.
const DEFAULT_SWEEP_THRESHOLD: usize = 10_000;

struct WindowEntry {
    count: u64,
    expires_at: Instant,
}

impl WindowEntry {
    fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            expires_at: now + window,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Fixed-window counters in a mutex-guarded map.
///
/// The increment and the expiry check happen under one lock, which is the
/// atomicity the limiter relies on.
pub struct InMemoryCounterStore<C: Clock = SystemClock> {
    entries: Mutex<HashMap<String, WindowEntry>>,
    clock: C,
    sweep_threshold: usize,
}

impl InMemoryCounterStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryCounterStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemoryCounterStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
        }
    }

    pub fn with_sweep_threshold(mut self, threshold: usize) -> Self {
        self.sweep_threshold = threshold.max(1);
        self
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl<C: Clock> CounterStore for InMemoryCounterStore<C> {
    async fn increment_and_get(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        if entries.len() >= self.sweep_threshold {
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now));
            tracing::debug!(swept = before - entries.len(), "Swept expired rate limit windows");
        }

        let entry = entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if entry.is_expired(now) {
                    *entry = WindowEntry::fresh(now, window);
                } else {
                    entry.count += 1;
                }
            })
            .or_insert_with(|| WindowEntry::fresh(now, window));

        Ok(WindowCount {
            count: entry.count,
            ttl_remaining: entry.expires_at.saturating_duration_since(now),
        })
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
