//! Router configuration.
//!
//! # Route Structure
//!
//! ```text
//! /health                     - Health check
//! /images/{*path}             - Image delivery
//! /content/images/{*path}     - Image delivery, legacy URL layout
//! /{name}                     - One route per loaded static file
//! ```
//!
//! # Example
//!
//! ```ignore
//! use quill_media::cache::CacheStore;
//! use quill_media::server::{create_router, RouterConfig, StaticFiles};
//! use quill_media::source::LocalAssetSource;
//!
//! let store = CacheStore::new(LocalAssetSource::new("content/images"), "content/cache");
//! let router = create_router(store, StaticFiles::new(), RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::{CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, image_handler, static_file_handler, AppState};
use super::static_files::StaticFiles;
use crate::cache::CacheStore;
use crate::source::AssetSource;

/// Default `Cache-Control` max-age for images (90 days).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 7_776_000;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Any CORS origin, 90-day max-age, tracing on.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// An empty vec disallows all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
///
/// Each name in `static_files` gets its own root-level route; anything else
/// outside the image prefixes is a 404.
pub fn create_router<S>(
    store: CacheStore<S>,
    static_files: StaticFiles,
    config: RouterConfig,
) -> Router
where
    S: AssetSource + 'static,
{
    let app_state = AppState::new(store)
        .with_static_files(static_files)
        .with_cache_max_age(config.cache_max_age);

    let cors = build_cors_layer(&config);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/images/{*path}", get(image_handler::<S>))
        .route("/content/images/{*path}", get(image_handler::<S>));

    let mut names: Vec<String> = app_state.static_files.names().map(String::from).collect();
    names.sort();
    for name in names {
        // "health" would collide with the health check route.
        if name == "health" {
            continue;
        }
        router = router.route(&format!("/{}", name), get(static_file_handler::<S>));
    }

    let router = router.with_state(app_state).layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, IF_NONE_MATCH])
        .expose_headers([ETAG])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
