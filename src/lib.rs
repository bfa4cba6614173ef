//! # quill-media
//!
//! Image asset pipeline for a blog: serves uploaded images over HTTP,
//! recompressing or resizing them on the fly and keeping the results in a
//! filesystem cache.
//!
//! ## Features
//!
//! - **Recompression**: PNG at maximum deflate, JPEG at quality 95, kept only
//!   when the result is not meaningfully larger
//! - **Resizing**: `?maxWidth=` / `?maxHeight=` bounding box with
//!   aspect-preserving Lanczos3 downscaling
//! - **Disk cache**: deterministic file names, atomic writes, one transform
//!   per key even under concurrent misses
//! - **Janitor**: periodic removal of expired recompressed variants and
//!   orphaned temporary files
//! - **Conditional GET**: stable ETags and `304 Not Modified`
//!
//! ## Architecture
//!
//! - [`transform`] - Decode, transform and re-encode image bytes
//! - [`source`] - Where original assets come from
//! - [`cache`] - Cache keys, the get-or-compute store, and the janitor
//! - [`server`] - Axum handlers and router
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use quill_media::{create_router, CacheStore, LocalAssetSource, RouterConfig, StaticFiles};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let store = CacheStore::new(LocalAssetSource::new("content/images"), "content/cache");
//!     let router = create_router(store, StaticFiles::new(), RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, router).await
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod server;
pub mod source;
pub mod transform;

// Re-export commonly used types
pub use cache::{sweep, CacheJanitor, CacheKey, CacheKind, CacheStats, CacheStore, CachedVariant};
pub use config::Config;
pub use error::{IoError, StoreError, SweepError, TransformError};
pub use server::{create_router, AppState, RouterConfig, StaticFiles};
pub use source::{AssetMetadata, AssetSource, LocalAssetSource, SourceAsset};
pub use transform::{ImageFormat, ImageTransformer, TransformSpec};
