//! File Backend
//!
//! Persists one envelope file per key under a directory tree sharded by
//! the key's MD5 digest:
//!
//! ```text
//! <CachePath>/[<hex[0..2]>/[<hex[2..4]>/]]<hex><FileSuffix>
//! ```
//!
//! There is no in-process locking. Writes go to a temporary file that is
//! renamed over the target, so readers see either the old or the new
//! envelope and concurrent writers to one key resolve last-writer-wins.
//! Expired files stay on disk until deleted or overwritten.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache::envelope::FOREVER;
use crate::cache::{Cache, CacheStats, Envelope, StatsRecorder, Ttl, Value};
use crate::config::{BackendConfig, DirectoryLevel, FileConfig};
use crate::error::{CacheError, Result};

/// Distinguishes temporary files written concurrently by this process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

// == Path Derivation ==
/// Lowercase hex MD5 digest of `key` (32 characters).
pub fn key_digest(key: &str) -> String {
    format!("{:x}", md5::compute(key.as_bytes()))
}

/// Directory that holds the file for `digest` at the given level.
pub fn shard_dir(root: &Path, level: DirectoryLevel, digest: &str) -> PathBuf {
    match level {
        DirectoryLevel::Flat => root.to_path_buf(),
        DirectoryLevel::One => root.join(&digest[0..2]),
        DirectoryLevel::Two => root.join(&digest[0..2]).join(&digest[2..4]),
    }
}

// == File Cache ==
#[derive(Debug, Default)]
pub struct FileCache {
    config: FileConfig,
    stats: StatsRecorder,
}

impl FileCache {
    // == Constructor ==
    /// Creates an unstarted file cache using the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry constructor.
    pub fn boxed() -> Box<dyn Cache> {
        Box::new(Self::new())
    }

    pub fn config(&self) -> &FileConfig {
        &self.config
    }

    /// Full path of the file that stores `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = key_digest(key);
        shard_dir(&self.config.cache_path, self.config.directory_level, &digest)
            .join(format!("{}{}", digest, self.config.file_suffix))
    }

    fn lifetime(&self, ttl: Ttl) -> Duration {
        match ttl {
            Ttl::After(d) => d,
            Ttl::Forever => FOREVER,
            Ttl::Default if self.config.embed_expiry.is_zero() => FOREVER,
            Ttl::Default => self.config.embed_expiry,
        }
    }

    /// Writes `bytes` next to `path` and renames it into place.
    async fn replace_file(path: &Path, bytes: &[u8]) -> Result<()> {
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(format!(".{}.{}.tmp", std::process::id(), seq));

        Self::write_and_rename(&PathBuf::from(tmp_name), path, bytes).await
    }

    /// Either `path` holds `bytes` afterwards, or `tmp` is gone.
    async fn write_and_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Err(e) = fs::write(tmp, bytes).await {
            let _ = fs::remove_file(tmp).await;
            return Err(CacheError::io("write", tmp, e));
        }

        if let Err(e) = fs::rename(tmp, path).await {
            let _ = fs::remove_file(tmp).await;
            return Err(CacheError::io("rename", path, e));
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for FileCache {
    // == Get ==
    async fn get(&self, key: &str) -> Result<Value> {
        let path = self.path_for(key);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.stats.record_miss();
                return Err(CacheError::NotFound(key.to_string()));
            }
            Err(e) => return Err(CacheError::io("read", path, e)),
        };

        let envelope = Envelope::decode(key, &bytes).map_err(|e| {
            warn!("Unreadable cache file {}: {}", path.display(), e);
            e
        })?;

        if envelope.is_expired_at(Utc::now()) {
            self.stats.record_expired();
            return Err(CacheError::Expired(key.to_string()));
        }

        self.stats.record_hit();
        Ok(envelope.data)
    }

    // == Put ==
    async fn put(&self, key: &str, value: Value, ttl: Ttl) -> Result<()> {
        let envelope = Envelope::new(value, Utc::now(), self.lifetime(ttl));
        let bytes = envelope.encode(key)?;

        let path = self.path_for(key);
        if let Some(dir) = path.parent() {
            // Tolerates a concurrent writer creating the same shard
            fs::create_dir_all(dir)
                .await
                .map_err(|e| CacheError::io("create shard directory", dir, e))?;
        }

        Self::replace_file(&path, &bytes).await?;
        debug!("Stored {} bytes for key {} at {}", bytes.len(), key, path.display());
        Ok(())
    }

    // == Delete ==
    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io("delete", path, e)),
        }
    }

    // == Start ==
    async fn start(&mut self, config: &BackendConfig) -> Result<()> {
        self.config = FileConfig::from_backend_config(config)?;

        let root = &self.config.cache_path;
        fs::create_dir_all(root)
            .await
            .map_err(|e| CacheError::io("create cache directory", root, e))?;

        info!(
            "File cache started: path={}, suffix={}, level={}, embed_expiry={}s",
            root.display(),
            self.config.file_suffix,
            self.config.directory_level.depth(),
            self.config.embed_expiry.as_secs()
        );
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}
