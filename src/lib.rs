//! polycache - A pluggable key-value cache
//!
//! One async [`Cache`] contract with interchangeable backends: an in-memory
//! map with a background TTL sweep and a sharded on-disk store. Backends are
//! created by name through a [`CacheRegistry`].

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod registry;
pub mod tasks;

pub use cache::{Cache, FileCache, MemoryCache, MultiGet, Ttl, Value};
pub use codec::{BincodeCodec, Codec, JsonCodec, TypedCache};
pub use config::{AppConfig, BackendConfig};
pub use error::{CacheError, Result};
pub use registry::CacheRegistry;
