//! Local filesystem asset source.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

use super::{AssetMetadata, AssetSource};

/// Serves assets from a directory on local disk.
///
/// Asset paths are interpreted relative to the root. Paths containing `..`,
/// absolute prefixes or other non-plain components are rejected with
/// [`IoError::InvalidPath`].
///
/// # Example
///
/// ```ignore
/// use quill_media::source::{AssetSource, LocalAssetSource};
///
/// let source = LocalAssetSource::new("content/images");
/// let meta = source.metadata("2024/05/photo.jpg").await?;
/// ```
#[derive(Debug, Clone)]
pub struct LocalAssetSource {
    root: PathBuf,
}

impl LocalAssetSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an asset path to a filesystem path under the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, IoError> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        let mut has_name = false;

        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    has_name = true;
                }
                Component::CurDir => {}
                _ => return Err(IoError::InvalidPath(path.to_string())),
            }
        }

        if !has_name {
            return Err(IoError::InvalidPath(path.to_string()));
        }

        Ok(resolved)
    }
}

#[async_trait]
impl AssetSource for LocalAssetSource {
    async fn metadata(&self, path: &str) -> Result<AssetMetadata, IoError> {
        let full = self.resolve(path)?;
        let meta = tokio::fs::metadata(&full)
            .await
            .map_err(|e| IoError::from_std(path, &e))?;

        if !meta.is_file() {
            return Err(IoError::NotFound(path.to_string()));
        }

        let modified = meta.modified().map_err(|e| IoError::from_std(path, &e))?;

        Ok(AssetMetadata {
            size: meta.len(),
            modified,
        })
    }

    async fn read(&self, path: &str) -> Result<Bytes, IoError> {
        let full = self.resolve(path)?;
        let data = tokio::fs::read(&full)
            .await
            .map_err(|e| IoError::from_std(path, &e))?;
        Ok(Bytes::from(data))
    }
}
