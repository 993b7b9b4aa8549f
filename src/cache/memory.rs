//! Memory Backend
//!
//! In-process cache: one `RwLock`-guarded map plus an optional background
//! TTL sweep. Reads of stale entries report `Expired` without removing
//! them; removal is left to the sweep.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::{Cache, CacheEntry, CacheStats, StatsRecorder, Ttl, Value};
use crate::config::{BackendConfig, MemoryConfig};
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_sweep_task, EntryMap, SweepHandle};

// == Memory Cache ==
#[derive(Debug, Default)]
pub struct MemoryCache {
    /// Key-value storage
    entries: EntryMap,
    /// Performance statistics
    stats: Arc<StatsRecorder>,
    /// Running sweep, if enabled
    sweeper: Mutex<Option<SweepHandle>>,
    config: MemoryConfig,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates an empty, unstarted memory cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry constructor.
    pub fn boxed() -> Box<dyn Cache> {
        Box::new(Self::new())
    }

    // == Length ==
    /// Number of entries held, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Whether the internal map holds an entry for `key`, expired or not.
    pub async fn contains_key(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Whether a sweep task is currently running.
    pub async fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[async_trait]
impl Cache for MemoryCache {
    // == Get ==
    async fn get(&self, key: &str) -> Result<Value> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.stats.record_expired();
                Err(CacheError::Expired(key.to_string()))
            }
            Some(entry) => {
                self.stats.record_hit();
                Ok(entry.value.clone())
            }
            None => {
                self.stats.record_miss();
                Err(CacheError::NotFound(key.to_string()))
            }
        }
    }

    // == Put ==
    async fn put(&self, key: &str, value: Value, ttl: Ttl) -> Result<()> {
        let entry = CacheEntry::new(value, ttl);
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    // == Delete ==
    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    // == Start ==
    async fn start(&mut self, config: &BackendConfig) -> Result<()> {
        self.config = MemoryConfig::from_backend_config(config)?;

        match self.config.sweep_interval() {
            Some(interval) => {
                let handle = spawn_sweep_task(self.entries.clone(), self.stats.clone(), interval);
                *self.sweeper.get_mut() = Some(handle);
            }
            None => info!(
                "TTL sweep disabled (interval={}), relying on lazy expiry",
                self.config.interval_secs
            ),
        }

        info!("Memory cache started");
        Ok(())
    }

    // == Stop ==
    async fn stop(&self) {
        let handle = self.sweeper.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.stop().await {
                warn!("Memory cache stopped with error: {}", e);
            }
        }
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}
