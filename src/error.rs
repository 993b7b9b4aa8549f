//! Error types for the cache backends
//!
//! Provides unified error handling using thiserror.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for every cache backend.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key is present but its TTL has elapsed
    #[error("Key expired: {0}")]
    Expired(String),

    /// Malformed backend configuration
    #[error("Invalid config: {0}")]
    Validation(String),

    /// No constructor registered under this name
    #[error("Unknown cache backend: {0} (was it registered?)")]
    UnknownBackend(String),

    /// Filesystem failure, with the operation and path that failed
    #[error("I/O error during {op} on {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Value or envelope could not be encoded/decoded
    #[error("Codec error for key {key}: {message}")]
    Codec { key: String, message: String },

    /// One or more keys of a multi-key operation failed
    #[error("{0}")]
    Aggregate(AggregateError),

    /// Internal failure (e.g. a background task panicked)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Wraps an I/O error with operation and path context.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, CacheError::Expired(_))
    }
}

// == Aggregate Error ==
/// Per-key causes collected by a multi-key read.
#[derive(Debug, Default)]
pub struct AggregateError {
    failures: Vec<(String, CacheError)>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the cause for one failing key.
    pub fn push(&mut self, key: impl Into<String>, cause: CacheError) {
        self.failures.push((key.into(), cause));
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Failing keys with their causes, in input order.
    pub fn failures(&self) -> &[(String, CacheError)] {
        &self.failures
    }

    /// Looks up the cause recorded for `key`.
    pub fn cause(&self, key: &str) -> Option<&CacheError> {
        self.failures
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, cause)| cause)
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, cause)) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "key [{}] error: {}", key, cause)?;
        }
        Ok(())
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
