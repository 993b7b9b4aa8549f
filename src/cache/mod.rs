//! Cache Module
//!
//! The common cache contract plus the in-memory and file backends that
//! implement it.

mod entry;
mod envelope;
mod file;
mod memory;
mod stats;

#[cfg(test)]
mod property_tests;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::BackendConfig;
use crate::error::{AggregateError, CacheError, Result};

// Re-export public types
pub use entry::CacheEntry;
pub use envelope::Envelope;
pub use file::{key_digest, shard_dir, FileCache};
pub use memory::MemoryCache;
pub use stats::{CacheStats, StatsRecorder};

// == Value ==
/// Opaque value stored by every backend. Typed access goes through
/// [`crate::codec::TypedCache`].
pub type Value = Vec<u8>;

// == TTL ==
/// Lifetime requested for a `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Expire once this much time has passed. The memory backend treats a
    /// zero duration as "never expires".
    After(Duration),
    /// Never expire.
    Forever,
    /// Use the backend's configured default lifetime.
    Default,
}

impl From<Duration> for Ttl {
    fn from(ttl: Duration) -> Self {
        Ttl::After(ttl)
    }
}

// == Multi Get ==
/// Result of a multi-key read: one slot per requested key, in order.
#[derive(Debug)]
pub struct MultiGet<V = Value> {
    /// `None` for every key that failed
    pub values: Vec<Option<V>>,
    /// Set when at least one key failed; always `CacheError::Aggregate`
    pub error: Option<CacheError>,
}

impl<V> MultiGet<V> {
    /// Collapses into a `Result`, dropping the partial values on failure.
    pub fn into_result(self) -> Result<Vec<Option<V>>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.values),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Per-key failures, empty when every key succeeded.
    pub fn failures(&self) -> &[(String, CacheError)] {
        match &self.error {
            Some(CacheError::Aggregate(agg)) => agg.failures(),
            _ => &[],
        }
    }
}

// == Cache Contract ==
/// Contract shared by every cache backend.
///
/// Backends are constructed empty, then started exactly once with their
/// configuration. [`crate::registry::CacheRegistry::create`] does both, so
/// callers only ever see started instances.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the value, `NotFound` for unknown keys or `Expired` for keys
    /// whose TTL has elapsed.
    async fn get(&self, key: &str) -> Result<Value>;

    /// Reads every key, collecting per-key failures into one aggregate error.
    async fn get_multi(&self, keys: &[String]) -> MultiGet {
        let mut values = Vec::with_capacity(keys.len());
        let mut failures = AggregateError::new();

        for key in keys {
            match self.get(key).await {
                Ok(value) => values.push(Some(value)),
                Err(err) => {
                    failures.push(key.clone(), err);
                    values.push(None);
                }
            }
        }

        MultiGet {
            values,
            error: (!failures.is_empty()).then_some(CacheError::Aggregate(failures)),
        }
    }

    /// Creates or overwrites the entry for `key`.
    async fn put(&self, key: &str, value: Value, ttl: Ttl) -> Result<()>;

    /// Removes the entry for `key`; deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Parses the configuration and allocates backend resources.
    async fn start(&mut self, config: &BackendConfig) -> Result<()>;

    /// Stops background work. Safe to call more than once.
    async fn stop(&self) {}

    /// Snapshot of hit/miss counters.
    fn stats(&self) -> CacheStats;
}
