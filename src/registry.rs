//! Registry Module
//!
//! Maps backend names to constructors and hands out started backends.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::cache::{Cache, FileCache, MemoryCache};
use crate::config::BackendConfig;
use crate::error::{CacheError, Result};

/// Builds an empty, unstarted backend.
pub type Constructor = fn() -> Box<dyn Cache>;

pub const MEMORY_BACKEND: &str = "memory";
pub const FILE_BACKEND: &str = "file";

// == Cache Registry ==
/// Name → constructor table, filled once at the composition root and only
/// read afterwards.
#[derive(Debug, Clone, Default)]
pub struct CacheRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl CacheRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `memory` and `file` backends.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(MEMORY_BACKEND, MemoryCache::boxed);
        registry.register(FILE_BACKEND, FileCache::boxed);
        registry
    }

    // == Register ==
    /// Binds `name` to `constructor`.
    ///
    /// # Panics
    /// If `name` is already registered. Registration happens while wiring
    /// the process, so a duplicate is a programming error.
    pub fn register(&mut self, name: impl Into<String>, constructor: Constructor) {
        let name = name.into();
        if self.constructors.contains_key(&name) {
            panic!("cache: register called twice for backend {}", name);
        }
        self.constructors.insert(name, constructor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered backend names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    // == Create ==
    /// Constructs and starts the backend registered as `name`.
    ///
    /// A backend whose `start` fails is dropped; only the error is returned.
    pub async fn create(&self, name: &str, config: &BackendConfig) -> Result<Box<dyn Cache>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| CacheError::UnknownBackend(name.to_string()))?;

        let mut backend = constructor();
        if let Err(e) = backend.start(config).await {
            warn!("Failed to start cache backend {}: {}", name, e);
            return Err(e);
        }

        info!("Cache backend {} ready", name);
        Ok(backend)
    }
}
