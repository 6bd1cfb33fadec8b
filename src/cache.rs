//! Time-boxed cache for fetched CSV text with a stale-fallback policy.
//!
//! Read-side consumers prefer degraded data over hard failure: an expired
//! entry is still returned when a refresh fails, flagged as stale. Only a
//! cold miss propagates the fetch error.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

struct Entry {
    value: String,
    stored_at: Instant,
}

/// What a cache lookup produced. `stale` marks the degraded path where the
/// fetch failed and an expired value was served instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOutcome {
    pub value: String,
    pub stale: bool,
}

/// Explicit cache instance with constructor-injected TTL; one per process,
/// no ambient globals.
pub struct Cache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Cache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key` if it is fresh; otherwise invoke
    /// `fetch` and store the result. On fetch failure an expired value is
    /// returned as a stale fallback when one exists.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> anyhow::Result<CacheOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
    {
        {
            let entries = self.entries.lock().await;
            if let Some(entry) = entries.get(key) {
                if entry.stored_at.elapsed() < self.ttl {
                    return Ok(CacheOutcome {
                        value: entry.value.clone(),
                        stale: false,
                    });
                }
            }
        }

        match fetch().await {
            Ok(value) => {
                let mut entries = self.entries.lock().await;
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: value.clone(),
                        stored_at: Instant::now(),
                    },
                );
                Ok(CacheOutcome {
                    value,
                    stale: false,
                })
            }
            Err(err) => {
                let entries = self.entries.lock().await;
                if let Some(entry) = entries.get(key) {
                    warn!(key, ?err, "fetch failed; serving expired cache entry");
                    return Ok(CacheOutcome {
                        value: entry.value.clone(),
                        stale: true,
                    });
                }
                Err(err)
            }
        }
    }

    /// Drop every entry. Operational escape hatch.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}
