//! HTTP delivery layer.
//!
//! ```text
//! request ──> image_handler ──> CacheStore::get_or_compute ──> response
//!                  │                                             ▲
//!                  └──────────── verbatim fallback ──────────────┘
//! ```

pub mod handlers;
pub mod routes;
pub mod static_files;

pub use handlers::{
    etag_matches, health_handler, image_handler, static_file_handler, AppState, ErrorResponse,
    HealthResponse, ImageQueryParams, X_COMPRESSION_CACHE, X_RESIZE_CACHE,
};
pub use routes::{create_router, RouterConfig, DEFAULT_CACHE_MAX_AGE};
pub use static_files::{StaticFile, StaticFiles, DEFAULT_STATIC_FILES};
