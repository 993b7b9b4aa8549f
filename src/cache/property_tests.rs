//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the contract properties shared by both backends.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use crate::cache::{key_digest, shard_dir, Cache, Envelope, FileCache, MemoryCache, Ttl};
use crate::config::{BackendConfig, DirectoryLevel, FileConfig};
use crate::error::CacheError;

// == Test Configuration ==
const TEST_TTL: Ttl = Ttl::After(Duration::from_secs(300));

// == Strategies ==
/// Generates cache keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:]{1,64}"
}

/// Generates opaque values, including empty and non-UTF-8 blobs
fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: Vec<u8> },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn level_strategy() -> impl Strategy<Value = DirectoryLevel> {
    prop_oneof![
        Just(DirectoryLevel::Flat),
        Just(DirectoryLevel::One),
        Just(DirectoryLevel::Two),
    ]
}

// == Helpers ==
async fn memory_cache() -> MemoryCache {
    let mut cache = MemoryCache::new();
    cache
        .start(&BackendConfig::new().with("interval", "0"))
        .await
        .unwrap();
    cache
}

async fn file_cache(root: &Path, level: DirectoryLevel) -> FileCache {
    let mut cache = FileCache::new();
    let config = BackendConfig::new()
        .with(FileConfig::CACHE_PATH, root.to_string_lossy())
        .with(FileConfig::DIRECTORY_LEVEL, level.depth().to_string());
    cache.start(&config).await.unwrap();
    cache
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing a pair and reading it back before expiry returns the same value.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        tokio_test::block_on(async {
            let cache = memory_cache().await;
            cache.put(&key, value.clone(), TEST_TTL).await.unwrap();
            prop_assert_eq!(cache.get(&key).await.unwrap(), value);
            Ok(())
        })?;
    }

    // A key that was never written reads as NotFound, never as Expired.
    #[test]
    fn prop_unwritten_key_not_found(
        written in prop::collection::hash_set(key_strategy(), 0..10),
        absent_key in key_strategy()
    ) {
        prop_assume!(!written.contains(&absent_key));
        tokio_test::block_on(async {
            let cache = memory_cache().await;
            for key in &written {
                cache.put(key, b"v".to_vec(), TEST_TTL).await.unwrap();
            }
            prop_assert!(matches!(cache.get(&absent_key).await, Err(CacheError::NotFound(_))));
            Ok(())
        })?;
    }

    // Delete removes the entry, and repeating it never errors.
    #[test]
    fn prop_delete_idempotent(key in key_strategy(), value in value_strategy(), repeats in 1usize..4) {
        tokio_test::block_on(async {
            let cache = memory_cache().await;
            cache.put(&key, value, TEST_TTL).await.unwrap();
            for _ in 0..repeats {
                prop_assert!(cache.delete(&key).await.is_ok());
            }
            prop_assert!(matches!(cache.get(&key).await, Err(CacheError::NotFound(_))));
            Ok(())
        })?;
    }

    // The second of two writes to one key wins and leaves one entry.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        tokio_test::block_on(async {
            let cache = memory_cache().await;
            cache.put(&key, value1, TEST_TTL).await.unwrap();
            cache.put(&key, value2.clone(), TEST_TTL).await.unwrap();
            prop_assert_eq!(cache.get(&key).await.unwrap(), value2);
            prop_assert_eq!(cache.len().await, 1);
            Ok(())
        })?;
    }

    // Multi-get keeps input length and order, fills present keys and names
    // exactly the absent ones in the aggregate error.
    #[test]
    fn prop_get_multi_shape(
        keys in prop::collection::hash_set(key_strategy(), 1..20),
        present_mask in prop::collection::vec(any::<bool>(), 20)
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        tokio_test::block_on(async {
            let cache = memory_cache().await;
            let mut expected_missing = HashSet::new();
            for (key, present) in keys.iter().zip(&present_mask) {
                if *present {
                    cache.put(key, key.as_bytes().to_vec(), TEST_TTL).await.unwrap();
                } else {
                    expected_missing.insert(key.clone());
                }
            }

            let result = cache.get_multi(&keys).await;
            prop_assert_eq!(result.values.len(), keys.len());
            for (key, slot) in keys.iter().zip(&result.values) {
                if expected_missing.contains(key) {
                    prop_assert!(slot.is_none());
                } else {
                    prop_assert_eq!(slot.as_deref(), Some(key.as_bytes()));
                }
            }

            let failed: HashSet<String> =
                result.failures().iter().map(|(k, _)| k.clone()).collect();
            prop_assert_eq!(&failed, &expected_missing);
            prop_assert_eq!(result.is_ok(), expected_missing.is_empty());
            Ok(())
        })?;
    }

    // Hits + misses + expired equals the number of reads.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        tokio_test::block_on(async {
            let cache = memory_cache().await;
            let mut expected_hits = 0;
            let mut expected_misses = 0;

            for op in ops {
                match op {
                    CacheOp::Put { key, value } => cache.put(&key, value, TEST_TTL).await.unwrap(),
                    CacheOp::Get { key } => match cache.get(&key).await {
                        Ok(_) => expected_hits += 1,
                        Err(_) => expected_misses += 1,
                    },
                    CacheOp::Delete { key } => cache.delete(&key).await.unwrap(),
                }
            }

            let stats = cache.stats();
            prop_assert_eq!(stats.hits, expected_hits);
            prop_assert_eq!(stats.misses, expected_misses);
            prop_assert_eq!(stats.expired, 0);
            Ok(())
        })?;
    }

    // Two keys share a shard directory exactly when their digests share the
    // prefix that the level uses.
    #[test]
    fn prop_shard_prefix_determines_directory(
        a in key_strategy(),
        b in key_strategy(),
        level in level_strategy()
    ) {
        let root = Path::new("/cache");
        let (da, db) = (key_digest(&a), key_digest(&b));
        let prefix = level.depth() * 2;

        let same_dir = shard_dir(root, level, &da) == shard_dir(root, level, &db);
        prop_assert_eq!(same_dir, da[..prefix] == db[..prefix]);
    }

    // Envelopes survive encode/decode for arbitrary blobs.
    #[test]
    fn prop_envelope_roundtrip(data in value_strategy(), ttl_secs in 0u64..1_000_000) {
        let envelope = Envelope::new(data, Utc::now(), Duration::from_secs(ttl_secs));
        let bytes = envelope.encode("k").unwrap();
        prop_assert_eq!(Envelope::decode("k", &bytes).unwrap(), envelope);
    }
}

// File-backed properties touch the disk; fewer cases
proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // Round-trips hold at every directory level, and each level resolves
    // the key to a different path.
    #[test]
    fn prop_file_roundtrip_any_level(
        entries in prop::collection::hash_map(key_strategy(), value_strategy(), 1..8),
        level in level_strategy()
    ) {
        let dir = TempDir::new().unwrap();
        tokio_test::block_on(async {
            let cache = file_cache(dir.path(), level).await;
            for (key, value) in &entries {
                cache.put(key, value.clone(), TEST_TTL).await.unwrap();
            }
            for (key, value) in &entries {
                prop_assert_eq!(&cache.get(key).await.unwrap(), value);
                prop_assert!(cache.path_for(key).is_file());
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_file_path_depends_on_level(key in key_strategy()) {
        let dir = TempDir::new().unwrap();
        tokio_test::block_on(async {
            let mut paths = HashSet::new();
            for level in [DirectoryLevel::Flat, DirectoryLevel::One, DirectoryLevel::Two] {
                let cache = file_cache(dir.path(), level).await;
                let path = cache.path_for(&key);
                prop_assert_eq!(path.ancestors().count() - dir.path().ancestors().count(), 1 + level.depth());
                paths.insert(path);
            }
            prop_assert_eq!(paths.len(), 3);
            Ok(())
        })?;
    }
}

// TTL properties sleep; keep the case count low
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // After the TTL has elapsed both backends report Expired.
    #[test]
    fn prop_ttl_expiration_behavior(key in key_strategy(), value in value_strategy()) {
        let dir = TempDir::new().unwrap();
        tokio_test::block_on(async {
            let memory = memory_cache().await;
            let file = file_cache(dir.path(), DirectoryLevel::Two).await;
            let ttl = Ttl::After(Duration::from_millis(100));

            for cache in [&memory as &dyn Cache, &file as &dyn Cache] {
                cache.put(&key, value.clone(), ttl).await.unwrap();
                prop_assert_eq!(cache.get(&key).await.unwrap(), value.clone());
            }

            tokio::time::sleep(Duration::from_millis(150)).await;

            for cache in [&memory as &dyn Cache, &file as &dyn Cache] {
                prop_assert!(matches!(cache.get(&key).await, Err(CacheError::Expired(_))));
            }
            Ok(())
        })?;
    }
}

// == Concurrent Operation Correctness ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Many tasks working on disjoint keys never lose or corrupt each
    // other's entries.
    #[test]
    fn prop_concurrent_disjoint_keys(
        workloads in prop::collection::hash_map(
            key_strategy(),
            prop::collection::vec(value_strategy(), 1..10),
            1..32
        ),
        delete_mask in prop::collection::vec(any::<bool>(), 32)
    ) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let cache = Arc::new(memory_cache().await);
            let mut handles = Vec::new();
            let mut expected = HashMap::new();

            for ((key, values), delete) in workloads.into_iter().zip(delete_mask) {
                let last = values.last().cloned();
                if !delete {
                    expected.insert(key.clone(), last);
                }

                let cache = Arc::clone(&cache);
                handles.push(tokio::spawn(async move {
                    for value in values {
                        cache.put(&key, value.clone(), TEST_TTL).await?;
                        let read = cache.get(&key).await?;
                        if read != value {
                            return Err(CacheError::Internal(format!("corrupted read for {}", key)));
                        }
                    }
                    if delete {
                        cache.delete(&key).await?;
                    }
                    Ok::<_, CacheError>(())
                }));
            }

            for handle in handles {
                let result = handle.await.expect("Task should not panic");
                prop_assert!(result.is_ok(), "Concurrent operation failed: {:?}", result);
            }

            prop_assert_eq!(cache.len().await, expected.len());
            for (key, last) in expected {
                prop_assert_eq!(cache.get(&key).await.ok(), last);
            }
            Ok(())
        })?;
    }
}
