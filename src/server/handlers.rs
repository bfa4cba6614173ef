//! HTTP request handlers for image delivery.
//!
//! # Endpoints
//!
//! - `GET /images/{*path}` - Serve an image, optionally resized
//! - `GET /content/images/{*path}` - Same handler, legacy URL layout
//! - `GET /{name}` - Serve a preloaded static file
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::cache::{CacheStore, CachedVariant};
use crate::error::{IoError, StoreError};
use crate::source::AssetSource;
use crate::transform::{content_type_for, ImageFormat, TransformSpec, MAX_RESIZE_DIMENSION};

use super::static_files::StaticFiles;

/// Debug header reporting whether a resized variant came from disk.
pub const X_RESIZE_CACHE: HeaderName = HeaderName::from_static("x-resize-cache");

/// Debug header reporting whether a recompressed variant came from disk.
pub const X_COMPRESSION_CACHE: HeaderName = HeaderName::from_static("x-compression-cache");

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to every handler.
pub struct AppState<S: AssetSource> {
    /// Cache-backed transform entry point
    pub store: Arc<CacheStore<S>>,

    /// Root-level static files, loaded once at startup
    pub static_files: Arc<StaticFiles>,

    /// `Cache-Control` max-age in seconds for image responses
    pub cache_max_age: u32,
}

impl<S: AssetSource> AppState<S> {
    /// Create state with no static files and the default max-age.
    pub fn new(store: CacheStore<S>) -> Self {
        Self {
            store: Arc::new(store),
            static_files: Arc::new(StaticFiles::new()),
            cache_max_age: super::routes::DEFAULT_CACHE_MAX_AGE,
        }
    }

    /// Replace the static file table.
    pub fn with_static_files(mut self, static_files: StaticFiles) -> Self {
        self.static_files = Arc::new(static_files);
        self
    }

    /// Set the `Cache-Control` max-age.
    pub fn with_cache_max_age(mut self, cache_max_age: u32) -> Self {
        self.cache_max_age = cache_max_age;
        self
    }

    fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_max_age)
    }
}

impl<S: AssetSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            static_files: Arc::clone(&self.static_files),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for image requests.
///
/// Values are kept as strings so that garbage never rejects the request;
/// see [`ImageQueryParams::bounds`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageQueryParams {
    /// Maximum output width in pixels (`maxWidth`)
    pub max_width: Option<String>,

    /// Maximum output height in pixels (`maxHeight`)
    pub max_height: Option<String>,
}

impl ImageQueryParams {
    /// Collect the known parameters from decoded query pairs.
    ///
    /// The first occurrence of a repeated key wins; unknown keys are ignored.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let first = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };

        Self {
            max_width: first("maxWidth"),
            max_height: first("maxHeight"),
        }
    }

    /// Parsed `(max_width, max_height)` bounding box, `(0, 0)` when unset.
    ///
    /// Non-numeric, zero and negative values are treated as absent. Values
    /// above [`MAX_RESIZE_DIMENSION`] are clamped. A single bound is copied
    /// to the other side, so `maxWidth=50` alone means a 50x50 box.
    pub fn bounds(&self) -> (u32, u32) {
        let width = parse_bound(self.max_width.as_deref());
        let height = parse_bound(self.max_height.as_deref());

        match (width, height) {
            (w, 0) => (w, w),
            (0, h) => (h, h),
            bounds => bounds,
        }
    }
}

fn parse_bound(value: Option<&str>) -> u32 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|&n| n > 0)
        .map(|n| n.min(i64::from(MAX_RESIZE_DIMENSION)) as u32)
        .unwrap_or(0)
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Source errors are the only errors that reach the client; transform
/// failures are absorbed by the verbatim fallback.
impl IntoResponse for IoError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            // Traversal attempts look like any other missing file.
            IoError::NotFound(path) | IoError::InvalidPath(path) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Not found: {}", path),
            ),
            IoError::Read { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                format!("I/O error: {}", self),
            ),
        };

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Conditional GET
// =============================================================================

/// Whether an `If-None-Match` header value matches `etag`.
///
/// Matches on the whole value, any comma-separated entry, or `*`. Values
/// that are not visible ASCII never match.
pub fn etag_matches(if_none_match: Option<&HeaderValue>, etag: &str) -> bool {
    let Some(value) = if_none_match.and_then(|v| v.to_str().ok()) else {
        return false;
    };

    value
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == "*" || candidate == etag)
}

/// ETag of a resized variant, built from the bounding box.
pub fn resized_etag(mtime_secs: u64, max_width: u32, max_height: u32) -> String {
    format!("\"{:x}-{}x{}-resized\"", mtime_secs, max_width, max_height)
}

/// ETag of a recompressed variant.
pub fn compressed_etag(mtime_secs: u64, len: usize) -> String {
    format!("\"{:x}-{:x}-compressed\"", mtime_secs, len)
}

/// ETag of the unmodified source.
pub fn source_etag(mtime_secs: u64, size: u64) -> String {
    format!("\"{:x}-{:x}\"", mtime_secs, size)
}

fn cache_status(hit: bool) -> HeaderValue {
    HeaderValue::from_static(if hit { "hit" } else { "miss" })
}

/// Build a 200 or 304 response. The 304 carries validators but no body and
/// no `Content-Type`.
fn conditional_response(
    headers: &HeaderMap,
    etag: String,
    cache_control: String,
    content_type: &'static str,
    data: Bytes,
) -> Response {
    if etag_matches(headers.get(header::IF_NONE_MATCH), &etag) {
        return (
            StatusCode::NOT_MODIFIED,
            [(header::ETAG, etag), (header::CACHE_CONTROL, cache_control)],
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [
            (header::ETAG, etag),
            (header::CACHE_CONTROL, cache_control),
            (header::CONTENT_TYPE, content_type.to_string()),
        ],
        Body::from(data),
    )
        .into_response()
}

fn variant_response(
    headers: &HeaderMap,
    etag: String,
    cache_control: String,
    content_type: &'static str,
    debug_header: HeaderName,
    variant: CachedVariant,
) -> Response {
    let mut response =
        conditional_response(headers, etag, cache_control, content_type, variant.data);
    response
        .headers_mut()
        .insert(debug_header, cache_status(variant.cache_hit));
    response
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle image requests.
///
/// # Endpoint
///
/// `GET /images/{*path}` and `GET /content/images/{*path}`
///
/// # Query Parameters
///
/// - `maxWidth`: Maximum width in pixels (optional)
/// - `maxHeight`: Maximum height in pixels (optional)
///
/// # Pipeline
///
/// 1. With a bound and a resizable format: serve the resized variant.
/// 2. Otherwise, or if resizing failed, for image files: serve the
///    recompressed variant.
/// 3. If that fails too: serve the source bytes verbatim.
///
/// Query values that do not parse are ignored rather than rejected; a
/// repeated key uses its first value.
///
/// # Response
///
/// - `200 OK`: Image bytes
/// - `304 Not Modified`: `If-None-Match` matched the ETag
/// - `404 Not Found`: Source does not exist
///
/// # Headers
///
/// - `ETag`
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Resize-Cache` / `X-Compression-Cache: hit|miss`
pub async fn image_handler<S: AssetSource + 'static>(
    State(state): State<AppState<S>>,
    Path(path): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, IoError> {
    let metadata = state.store.source().metadata(&path).await?;
    let mtime = metadata.modified_unix_secs();
    let content_type = content_type_for(&path);
    let format = ImageFormat::from_path(&path);
    let (max_width, max_height) = ImageQueryParams::from_pairs(&pairs).bounds();

    let resize = TransformSpec::resize(max_width, max_height)
        .filter(|_| format.is_some_and(|f| f.supports_resize()));

    if let Some(spec) = resize {
        match state.store.get_or_compute(&path, spec).await {
            Ok(variant) => {
                return Ok(variant_response(
                    &headers,
                    resized_etag(mtime, max_width, max_height),
                    state.cache_control(),
                    content_type,
                    X_RESIZE_CACHE,
                    variant,
                ));
            }
            Err(StoreError::SourceNotFound(p)) => return Err(IoError::NotFound(p)),
            Err(e) => {
                debug!(path = %path, error = %e, "Resize failed, trying recompression");
            }
        }
    }

    if format.is_some() {
        match state
            .store
            .get_or_compute(&path, TransformSpec::Recompress)
            .await
        {
            Ok(variant) => {
                return Ok(variant_response(
                    &headers,
                    compressed_etag(mtime, variant.data.len()),
                    state.cache_control(),
                    content_type,
                    X_COMPRESSION_CACHE,
                    variant,
                ));
            }
            Err(StoreError::SourceNotFound(p)) => return Err(IoError::NotFound(p)),
            Err(e) => {
                debug!(path = %path, error = %e, "Recompression failed, serving original");
            }
        }
    }

    fallback(&state, &path, &headers, content_type).await
}

/// Serve the source verbatim. The asset is reloaded so the ETag matches the
/// bytes actually sent.
async fn fallback<S: AssetSource>(
    state: &AppState<S>,
    path: &str,
    headers: &HeaderMap,
    content_type: &'static str,
) -> Result<Response, IoError> {
    let asset = state.store.source().load(path).await?;
    debug!(file = asset.file_name(), bytes = asset.data.len(), "Serving original");

    Ok(conditional_response(
        headers,
        source_etag(asset.metadata.modified_unix_secs(), asset.metadata.size),
        state.cache_control(),
        content_type,
        asset.data,
    ))
}

/// Handle static file requests.
///
/// # Endpoint
///
/// `GET /{name}` for each file loaded into [`StaticFiles`].
pub async fn static_file_handler<S: AssetSource + 'static>(
    State(state): State<AppState<S>>,
    uri: Uri,
) -> Response {
    let name = uri.path().trim_start_matches('/');

    match state.static_files.get(name) {
        Some(file) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, file.content_type)],
            file.content.clone(),
        )
            .into_response(),
        None => {
            warn!(name = name, "Static route without a loaded file");
            IoError::NotFound(name.to_string()).into_response()
        }
    }
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
