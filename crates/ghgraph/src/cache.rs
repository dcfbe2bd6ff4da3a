//! Durable cache of raw API responses, one file per [`Locator`].
//!
//! Presence of an artifact is treated as ground truth: there is no expiry
//! and no invalidation. Re-fetching a resource means deleting its file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use crate::locator::Locator;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Storage for cache artifacts.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The stored bytes for `locator`, or `None` when nothing is cached.
    async fn get(&self, locator: &Locator) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `bytes` for `locator`. Readers never observe a partial write.
    async fn put(&self, locator: &Locator, bytes: &[u8]) -> Result<(), CacheError>;
}

/// Cache artifacts stored as plain files in one directory.
#[derive(Debug)]
pub struct FsCacheStore {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl FsCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the artifact for `locator` lives.
    pub fn path_for(&self, locator: &Locator) -> PathBuf {
        self.dir.join(locator.cache_file_name())
    }

    fn tmp_path_for(&self, locator: &Locator) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            ".{}.{}.{n}.tmp",
            locator.cache_file_name(),
            std::process::id()
        ))
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn get(&self, locator: &Locator) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.path_for(locator);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    async fn put(&self, locator: &Locator, bytes: &[u8]) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CacheError::io(&self.dir, e))?;

        let path = self.path_for(locator);
        let tmp = self.tmp_path_for(locator);

        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::io(tmp, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::io(path, e));
        }

        tracing::trace!(path = %path.display(), bytes = bytes.len(), "cached response");
        Ok(())
    }
}
