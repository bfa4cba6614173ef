//! Filesystem-backed store of transformed image variants.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          CacheStore                             │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                  get_or_compute()                       │    │
//! │  │  1. Stat source        4. Join in-flight computation    │    │
//! │  │  2. Derive key         5. Transform on blocking pool    │    │
//! │  │  3. Check cache file   6. Persist (best effort)         │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌─────────────┐    ┌──────────────────┐   ┌──────────────┐   │
//! │    │ AssetSource │    │ ImageTransformer │   │  cache dir   │   │
//! │    └─────────────┘    └──────────────────┘   └──────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Concurrent misses for the same key share one computation: the first
//! caller runs the transform, later callers wait for its result. Entries are
//! written to a temporary file and renamed into place, so readers see either
//! the old file, the new file, or nothing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use crate::error::{StoreError, TransformError};
use crate::source::{AssetMetadata, AssetSource};
use crate::transform::{ImageFormat, ImageTransformer, TransformSpec};

use super::key::{CacheKey, TEMP_SUFFIX};

/// Sequence for temporary file names, unique within the process.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

// =============================================================================
// Results
// =============================================================================

/// A transformed variant returned by the store.
#[derive(Debug, Clone)]
pub struct CachedVariant {
    /// Bytes to serve
    pub data: Bytes,

    /// Whether the bytes were read from an existing cache entry
    pub cache_hit: bool,

    /// Whether the bytes differ from the source (false for pass-through)
    pub applied: bool,
}

/// Counters describing store activity since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from a valid cache entry
    pub hits: u64,

    /// Requests that found no valid entry
    pub misses: u64,

    /// Transforms actually executed
    pub transforms: u64,

    /// Cache writes that failed and were skipped
    pub write_failures: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    transforms: AtomicU64,
    write_failures: AtomicU64,
}

type InFlight = Arc<OnceCell<Result<CachedVariant, StoreError>>>;

// =============================================================================
// Cache Store
// =============================================================================

/// Compute-on-miss, persist-on-success cache of image variants.
///
/// # Type Parameters
///
/// * `S` - The asset source type (e.g. [`LocalAssetSource`](crate::source::LocalAssetSource))
///
/// # Example
///
/// ```ignore
/// use quill_media::cache::CacheStore;
/// use quill_media::source::LocalAssetSource;
/// use quill_media::transform::TransformSpec;
///
/// let store = CacheStore::new(LocalAssetSource::new("content/images"), "content/cache");
/// let variant = store
///     .get_or_compute("2024/photo.png", TransformSpec::Recompress)
///     .await?;
/// println!("{} bytes, hit: {}", variant.data.len(), variant.cache_hit);
/// ```
pub struct CacheStore<S: AssetSource> {
    /// Where source assets come from
    source: Arc<S>,

    /// Directory holding cache entries
    cache_dir: PathBuf,

    /// Image transformer
    transformer: ImageTransformer,

    /// Computations currently running, by cache key
    in_flight: Mutex<HashMap<CacheKey, InFlight>>,

    counters: Counters,
}

impl<S: AssetSource> CacheStore<S> {
    /// Create a store reading from `source` and caching under `cache_dir`.
    ///
    /// The directory is created on the first write.
    pub fn new(source: S, cache_dir: impl Into<PathBuf>) -> Self {
        Self::with_shared_source(Arc::new(source), cache_dir)
    }

    /// Create a store with a shared source.
    pub fn with_shared_source(source: Arc<S>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            cache_dir: cache_dir.into(),
            transformer: ImageTransformer::new(),
            in_flight: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// Get a reference to the underlying asset source.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Get the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Full path of the cache file for `key`.
    pub fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.file_name())
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            transforms: self.counters.transforms.load(Ordering::Relaxed),
            write_failures: self.counters.write_failures.load(Ordering::Relaxed),
        }
    }

    /// Get a transformed variant, computing and caching it on a miss.
    ///
    /// # Errors
    ///
    /// - [`StoreError::SourceNotFound`] if the source does not exist
    /// - [`StoreError::Source`] if the source cannot be read
    /// - [`StoreError::Transform`] if decoding or encoding fails
    ///
    /// Failing to write the cache entry is not an error: the computed bytes
    /// are returned with `cache_hit = false`.
    pub async fn get_or_compute(
        &self,
        source_path: &str,
        spec: TransformSpec,
    ) -> Result<CachedVariant, StoreError> {
        let metadata = self.source.metadata(source_path).await?;

        // Recompress keys hash the content, so the source is read up front.
        let (key, preloaded) = match spec {
            TransformSpec::Recompress => {
                let data = self.source.read(source_path).await?;
                let key = CacheKey::recompress(source_path, &data, metadata.modified);
                (key, Some(data))
            }
            TransformSpec::Resize {
                max_width,
                max_height,
            } => (CacheKey::resize(source_path, max_width, max_height), None),
        };

        if let Some(data) = self.lookup(&key, metadata.modified).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, bytes = data.len(), "Cache hit");
            return Ok(CachedVariant {
                data,
                cache_hit: true,
                applied: true,
            });
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Cache miss");

        let cell: InFlight = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.entry(key.clone()).or_default().clone()
        };

        let result = cell
            .get_or_init(|| async {
                let result = self
                    .compute(source_path, spec, &key, metadata, preloaded)
                    .await;
                self.in_flight.lock().await.remove(&key);
                result
            })
            .await;

        result.clone()
    }

    /// Read a cache entry if it exists and is valid for the source.
    async fn lookup(&self, key: &CacheKey, source_modified: SystemTime) -> Option<Bytes> {
        let path = self.cache_path(key);
        let meta = tokio::fs::metadata(&path).await.ok()?;
        if !meta.is_file() {
            return None;
        }

        let cache_modified = meta.modified().ok()?;
        if !key.is_valid(cache_modified, source_modified) {
            debug!(key = %key, "Cache entry is stale");
            return None;
        }

        match tokio::fs::read(&path).await {
            Ok(data) => Some(Bytes::from(data)),
            Err(e) => {
                debug!(key = %key, error = %e, "Cache entry unreadable, treating as miss");
                None
            }
        }
    }

    /// Run the transform for a miss. Executed by one caller per key.
    async fn compute(
        &self,
        source_path: &str,
        spec: TransformSpec,
        key: &CacheKey,
        metadata: AssetMetadata,
        preloaded: Option<Bytes>,
    ) -> Result<CachedVariant, StoreError> {
        // A previous computation may have finished between our lookup and now.
        if let Some(data) = self.lookup(key, metadata.modified).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(CachedVariant {
                data,
                cache_hit: true,
                applied: true,
            });
        }

        let source = match preloaded {
            Some(data) => data,
            None => self.source.read(source_path).await?,
        };
        let original_len = source.len();
        let format = ImageFormat::from_path(source_path);
        let extension = Path::new(source_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        let transformer = self.transformer.clone();

        self.counters.transforms.fetch_add(1, Ordering::Relaxed);

        let (data, applied) = tokio::task::spawn_blocking(move || match spec {
            TransformSpec::Recompress => transformer
                .recompress(source, format)
                .map(|out| (out.data, out.applied)),
            TransformSpec::Resize {
                max_width,
                max_height,
            } => {
                let format = format.ok_or(TransformError::UnsupportedFormat { extension })?;
                transformer
                    .resize(&source, format, max_width, max_height)
                    .map(|data| (data, true))
            }
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))??;

        let persist = match spec {
            TransformSpec::Recompress => applied && data.len() < original_len,
            TransformSpec::Resize { .. } => true,
        };

        if persist {
            self.persist(key, &data).await;
        }

        Ok(CachedVariant {
            data,
            cache_hit: false,
            applied,
        })
    }

    /// Write an entry, logging and counting failures instead of returning them.
    async fn persist(&self, key: &CacheKey, data: &[u8]) {
        if let Err(e) = self.write_entry(key, data).await {
            self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                key = %key,
                cache_dir = %self.cache_dir.display(),
                error = %e,
                "Failed to write cache entry"
            );
        }
    }

    /// Write to a temporary file in the cache directory, then rename over the
    /// final path.
    async fn write_entry(&self, key: &CacheKey, data: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let final_path = self.cache_path(key);
        let temp_path = self.cache_dir.join(format!(
            ".{}.{}.{}{}",
            key.file_name(),
            std::process::id(),
            TEMP_SEQ.fetch_add(1, Ordering::Relaxed),
            TEMP_SUFFIX
        ));

        if let Err(e) = tokio::fs::write(&temp_path, data).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&temp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
