//! Envelope Module
//!
//! The self-contained record the file backend writes for each key.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::Value;
use crate::error::{CacheError, Result};

/// Horizon used for entries that should not expire: ten years.
pub const FOREVER: Duration = Duration::from_secs(86_400 * 365 * 10);

// == Envelope ==
/// Value blob plus expiry and access metadata, bincode-encoded on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub data: Value,
    pub expires_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

impl Envelope {
    /// Builds an envelope that expires `ttl` after `now`.
    ///
    /// Lifetimes longer than [`FOREVER`] are capped at it.
    pub fn new(data: Value, now: DateTime<Utc>, ttl: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(ttl.min(FOREVER))
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            data,
            expires_at,
            last_access: now,
        }
    }

    /// Expired once `now` has reached the expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn encode(&self, key: &str) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CacheError::Codec {
            key: key.to_string(),
            message: format!("could not encode envelope: {}", e),
        })
    }

    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| CacheError::Codec {
            key: key.to_string(),
            message: format!("could not decode envelope: {}", e),
        })
    }
}
