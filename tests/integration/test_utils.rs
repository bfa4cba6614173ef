//! Test utilities for integration tests.
//!
//! Provides synthetic images, an in-memory asset source with read tracking,
//! and a scratch media/cache directory fixture.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, Rgb, RgbImage};
use tempfile::TempDir;
use tower::ServiceExt;

use quill_media::error::IoError;
use quill_media::source::{AssetMetadata, AssetSource, LocalAssetSource};
use quill_media::{create_router, CacheStore, RouterConfig, StaticFiles};

// =============================================================================
// Synthetic Images
// =============================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 2 % 256) as u8, (y * 2 % 256) as u8, ((x + y) % 256) as u8])
    })
}

/// A PNG encoded with the fastest settings, so recompression shrinks it.
pub fn create_png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Fast, FilterType::NoFilter);
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_with_encoder(encoder)
        .unwrap();
    buf
}

/// A JPEG at the given quality.
pub fn create_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&DynamicImage::ImageRgb8(gradient(width, height)))
        .unwrap();
    buf
}

/// Bytes that carry a GIF header but are never decoded.
pub fn create_gif_stub() -> Vec<u8> {
    let mut data = b"GIF89a".to_vec();
    data.extend_from_slice(&[1, 0, 1, 0, 0, 0, 0, 0x3b]);
    data
}

/// Decode an image and return its dimensions.
pub fn image_dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).expect("response should decode");
    (img.width(), img.height())
}

// =============================================================================
// In-Memory Asset Source
// =============================================================================

/// An in-memory asset source that counts full reads.
///
/// Clones share the read counter.
#[derive(Clone, Default)]
pub struct MockAssetSource {
    assets: Arc<HashMap<String, (Bytes, SystemTime)>>,
    reads: Arc<AtomicUsize>,
}

impl MockAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset dated in the past.
    pub fn with_asset(self, path: impl Into<String>, data: Vec<u8>) -> Self {
        let modified = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        let mut assets = (*self.assets).clone();
        assets.insert(path.into(), (Bytes::from(data), modified));
        Self {
            assets: Arc::new(assets),
            reads: self.reads,
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetSource for MockAssetSource {
    async fn metadata(&self, path: &str) -> Result<AssetMetadata, IoError> {
        match self.assets.get(path) {
            Some((data, modified)) => Ok(AssetMetadata {
                size: data.len() as u64,
                modified: *modified,
            }),
            None => Err(IoError::NotFound(path.to_string())),
        }
    }

    async fn read(&self, path: &str) -> Result<Bytes, IoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.assets.get(path) {
            Some((data, _)) => Ok(data.clone()),
            None => Err(IoError::NotFound(path.to_string())),
        }
    }
}

// =============================================================================
// Filesystem Fixture
// =============================================================================

/// Scratch media, cache and static directories.
pub struct MediaFixture {
    _dir: TempDir,
    pub media_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl MediaFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let media_dir = dir.path().join("media");
        let cache_dir = dir.path().join("cache");
        let static_dir = dir.path().join("static");
        std::fs::create_dir_all(&media_dir).unwrap();
        std::fs::create_dir_all(&static_dir).unwrap();

        Self {
            _dir: dir,
            media_dir,
            cache_dir,
            static_dir,
        }
    }

    /// Write a source file dated one hour ago. Returns its path.
    pub fn add_media(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.media_dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, data).unwrap();
        set_mtime(&path, SystemTime::now() - Duration::from_secs(3600));
        path
    }

    pub fn store(&self) -> CacheStore<LocalAssetSource> {
        CacheStore::new(LocalAssetSource::new(&self.media_dir), &self.cache_dir)
    }

    pub fn router(&self) -> Router {
        create_router(self.store(), StaticFiles::new(), test_router_config())
    }

    /// Files currently in the cache directory, sorted.
    pub fn cache_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }
}

pub fn test_router_config() -> RouterConfig {
    RouterConfig::new().with_tracing(false)
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}

/// Source mtime as the lowercase hex used in ETags.
pub fn mtime_hex(path: &Path) -> String {
    let modified = std::fs::metadata(path).unwrap().modified().unwrap();
    format!("{:x}", modified.duration_since(UNIX_EPOCH).unwrap().as_secs())
}

// =============================================================================
// Requests
// =============================================================================

/// A collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Send a GET through the router.
pub async fn get(router: &Router, uri: &str) -> TestResponse {
    get_with_headers(router, uri, &[]).await
}

/// Send a GET with extra request headers through the router.
pub async fn get_with_headers(
    router: &Router,
    uri: &str,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::empty()).unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();

    TestResponse {
        status,
        headers,
        body,
    }
}
