//! TTL Sweep Task
//!
//! Background task that periodically removes expired memory-backend entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::{CacheEntry, StatsRecorder};
use crate::error::{CacheError, Result};

/// Shared key → entry map owned by a memory backend.
pub type EntryMap = Arc<RwLock<HashMap<String, CacheEntry>>>;

// == Sweep Handle ==
/// Owns a running sweep task. Dropping the handle closes the shutdown
/// channel, which ends the task at its next poll.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweepHandle {
    /// Signals the task and waits for it to exit.
    ///
    /// Returns `CacheError::Internal` if the task panicked or was aborted.
    pub async fn stop(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        self.handle
            .await
            .map_err(|e| CacheError::Internal(format!("TTL sweep task ended abnormally: {}", e)))
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

// == Sweep ==
/// Removes expired entries in two phases so the exclusive lock is held only
/// for the removals: expired keys are collected under the shared lock, then
/// deleted under the exclusive lock.
///
/// A key rewritten between the two phases holds a fresh entry and is kept.
///
/// Returns the number of entries removed.
pub async fn sweep_expired(entries: &RwLock<HashMap<String, CacheEntry>>) -> usize {
    let now = Instant::now();

    let expired_keys: Vec<String> = {
        let guard = entries.read().await;
        guard
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    };

    if expired_keys.is_empty() {
        return 0;
    }

    let mut guard = entries.write().await;
    let mut removed = 0;
    for key in expired_keys {
        if guard.get(&key).is_some_and(|entry| entry.is_expired_at(now)) {
            guard.remove(&key);
            removed += 1;
        }
    }
    removed
}

/// Spawns a background task that sweeps `entries` every `interval`.
///
/// The first sweep runs one full interval after spawning.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweep_task(entries.clone(), stats.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// handle.stop().await;
/// ```
pub fn spawn_sweep_task(
    entries: EntryMap,
    stats: Arc<StatsRecorder>,
    interval: Duration,
) -> SweepHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        info!("Starting TTL sweep task with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = sweep_expired(&entries).await;
                    if removed > 0 {
                        stats.record_evictions(removed as u64);
                        info!("TTL sweep: removed {} expired entries", removed);
                    } else {
                        debug!("TTL sweep: no expired entries found");
                    }
                }
                // Fires on an explicit stop and when the sender is dropped
                _ = shutdown_rx.changed() => break,
            }
        }

        info!("TTL sweep task stopped");
    });

    SweepHandle { shutdown, handle }
}
