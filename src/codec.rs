//! Codec Module
//!
//! Backends store opaque bytes. A [`Codec`] turns typed values into those
//! bytes and back, and [`TypedCache`] pairs a codec with any backend.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{Cache, MultiGet, Ttl, Value};
use crate::error::{AggregateError, CacheError, Result};

// == Codec ==
/// Byte-level serializer for values of type `T`.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, key: &str, value: &T) -> Result<Value>;
    fn decode(&self, key: &str, bytes: &[u8]) -> Result<T>;
}

/// Compact binary encoding via bincode.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl<T> Codec<T> for BincodeCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, key: &str, value: &T) -> Result<Value> {
        bincode::serialize(value).map_err(|e| codec_error(key, "encode", e))
    }

    fn decode(&self, key: &str, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| codec_error(key, "decode", e))
    }
}

/// Human-readable JSON encoding via serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, key: &str, value: &T) -> Result<Value> {
        serde_json::to_vec(value).map_err(|e| codec_error(key, "encode", e))
    }

    fn decode(&self, key: &str, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| codec_error(key, "decode", e))
    }
}

fn codec_error(key: &str, op: &str, err: impl std::fmt::Display) -> CacheError {
    CacheError::Codec {
        key: key.to_string(),
        message: format!("could not {} value: {}", op, err),
    }
}

// == Typed Cache ==
/// Typed view over a backend.
///
/// # Example
/// ```ignore
/// let users: TypedCache<User> = TypedCache::new(backend, BincodeCodec);
/// users.put("user:1", &alice, Duration::from_secs(60).into()).await?;
/// let alice = users.get("user:1").await?;
/// ```
pub struct TypedCache<T, C = BincodeCodec> {
    inner: Arc<dyn Cache>,
    codec: C,
    _value: PhantomData<fn() -> T>,
}

impl<T, C> TypedCache<T, C>
where
    C: Codec<T>,
{
    pub fn new(inner: Arc<dyn Cache>, codec: C) -> Self {
        Self {
            inner,
            codec,
            _value: PhantomData,
        }
    }

    /// The underlying backend.
    pub fn inner(&self) -> &Arc<dyn Cache> {
        &self.inner
    }

    pub async fn get(&self, key: &str) -> Result<T> {
        let bytes = self.inner.get(key).await?;
        self.codec.decode(key, &bytes)
    }

    /// Multi-key read; values that fail to decode are reported alongside
    /// the backend's own per-key failures.
    pub async fn get_multi(&self, keys: &[String]) -> MultiGet<T> {
        let raw = self.inner.get_multi(keys).await;

        let mut failures = match raw.error {
            Some(CacheError::Aggregate(agg)) => agg,
            Some(other) => {
                return MultiGet {
                    values: keys.iter().map(|_| None).collect(),
                    error: Some(other),
                }
            }
            None => AggregateError::new(),
        };

        let values = raw
            .values
            .into_iter()
            .zip(keys)
            .map(|(slot, key)| {
                let bytes = slot?;
                match self.codec.decode(key, &bytes) {
                    Ok(value) => Some(value),
                    Err(err) => {
                        failures.push(key.clone(), err);
                        None
                    }
                }
            })
            .collect();

        MultiGet {
            values,
            error: (!failures.is_empty()).then_some(CacheError::Aggregate(failures)),
        }
    }

    pub async fn put(&self, key: &str, value: &T, ttl: Ttl) -> Result<()> {
        let bytes = self.codec.encode(key, value)?;
        self.inner.put(key, bytes, ttl).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}
