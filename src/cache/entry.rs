//! Cache Entry Module
//!
//! Defines the structure for individual memory-backend entries with TTL
//! support.

use std::time::{Duration, Instant};

use crate::cache::{Ttl, Value};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// When the entry was written
    pub created_at: Instant,
    /// Lifetime, None = no expiration
    pub ttl: Option<Duration>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current instant.
    ///
    /// A zero `Ttl::After`, `Ttl::Forever` and `Ttl::Default` all produce an
    /// entry that never expires.
    pub fn new(value: Value, ttl: Ttl) -> Self {
        let ttl = match ttl {
            Ttl::After(d) if !d.is_zero() => Some(d),
            _ => None,
        };

        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    // == Is Expired ==
    /// An entry is expired once strictly more than its TTL has elapsed
    /// since creation.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(self.created_at) > ttl,
            None => false,
        }
    }
}
