//! Source asset access.
//!
//! The cache never owns the original uploads. It asks an [`AssetSource`] for
//! an asset's metadata and bytes and only ever observes the modification
//! time; sources are never mutated.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              CacheStore                 │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           AssetSource Trait             │
//! │     (metadata + read by asset path)     │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           LocalAssetSource              │
//! │   (media directory on local disk)       │
//! └─────────────────────────────────────────┘
//! ```

mod local;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

pub use local::LocalAssetSource;

/// Metadata of a source asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetMetadata {
    /// Size in bytes
    pub size: u64,

    /// Last modification time
    pub modified: SystemTime,
}

impl AssetMetadata {
    /// Modification time as whole seconds since the Unix epoch.
    ///
    /// Times before the epoch collapse to `0`.
    pub fn modified_unix_secs(&self) -> u64 {
        self.modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A fully loaded source asset.
#[derive(Debug, Clone)]
pub struct SourceAsset {
    /// Asset path as requested (relative to the source root)
    pub path: String,

    /// Content bytes
    pub data: Bytes,

    /// Size and modification time
    pub metadata: AssetMetadata,
}

impl SourceAsset {
    /// File name without directories, e.g. `photo.jpg`.
    pub fn file_name(&self) -> &str {
        Path::new(&self.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.path)
    }
}

/// Trait for resolving asset paths to bytes and metadata.
///
/// This abstraction allows the cache store to work with different storage
/// backends without being tied to a specific implementation.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Stat an asset.
    ///
    /// Returns [`IoError::NotFound`] when the asset does not exist.
    async fn metadata(&self, path: &str) -> Result<AssetMetadata, IoError>;

    /// Read an asset's full contents.
    async fn read(&self, path: &str) -> Result<Bytes, IoError>;

    /// Read an asset together with its metadata.
    async fn load(&self, path: &str) -> Result<SourceAsset, IoError> {
        let metadata = self.metadata(path).await?;
        let data = self.read(path).await?;
        Ok(SourceAsset {
            path: path.to_string(),
            data,
            metadata,
        })
    }
}
