//! Configuration management for quill-media.
//!
//! Settings come from command-line arguments via clap, falling back to
//! environment variables with the `QUILL_` prefix, then to defaults.
//!
//! # Environment Variables
//!
//! - `QUILL_HOST` - Server bind address (default: 0.0.0.0)
//! - `QUILL_PORT` - Server port (default: 8080)
//! - `QUILL_MEDIA_DIR` - Directory holding source images (default: content/images)
//! - `QUILL_CACHE_DIR` - Directory for transformed variants (default: content/cache)
//! - `QUILL_STATIC_DIR` - Directory holding favicons and robots.txt (default: static)
//! - `QUILL_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 7776000)
//! - `QUILL_CLEANUP_INTERVAL` - Seconds between cache sweeps (default: 3600)
//! - `QUILL_CACHE_RETENTION` - Seconds a recompressed variant is kept (default: 604800)
//! - `QUILL_CORS_ORIGINS` - Comma-separated allowed origins (default: any)

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::cache::{DEFAULT_MAX_AGE, DEFAULT_SWEEP_INTERVAL};
use crate::server::{RouterConfig, DEFAULT_CACHE_MAX_AGE};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default source image directory.
pub const DEFAULT_MEDIA_DIR: &str = "content/images";

/// Default cache directory.
pub const DEFAULT_CACHE_DIR: &str = "content/cache";

/// Default static file directory.
pub const DEFAULT_STATIC_DIR: &str = "static";

// =============================================================================
// CLI Arguments
// =============================================================================

/// quill-media - image delivery for a blog.
///
/// Serves images with on-the-fly recompression and resizing, backed by a
/// filesystem cache that is swept in the background.
#[derive(Parser, Debug, Clone)]
#[command(name = "quill-media")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "QUILL_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "QUILL_PORT")]
    pub port: u16,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Directory holding the source images served under /images.
    #[arg(long, default_value = DEFAULT_MEDIA_DIR, env = "QUILL_MEDIA_DIR")]
    pub media_dir: PathBuf,

    /// Directory for cached variants. Created on first write.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "QUILL_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Directory holding root-level static files (favicon.ico, robots.txt).
    #[arg(long, default_value = DEFAULT_STATIC_DIR, env = "QUILL_STATIC_DIR")]
    pub static_dir: PathBuf,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "QUILL_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Seconds between background cache sweeps.
    #[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL.as_secs(), env = "QUILL_CLEANUP_INTERVAL")]
    pub cleanup_interval: u64,

    /// Seconds a recompressed variant is kept before the sweep removes it.
    #[arg(long, default_value_t = DEFAULT_MAX_AGE.as_secs(), env = "QUILL_CACHE_RETENTION")]
    pub cache_retention: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "QUILL_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.media_dir.as_os_str().is_empty() {
            return Err("media_dir must not be empty. Set --media-dir or QUILL_MEDIA_DIR".to_string());
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err("cache_dir must not be empty. Set --cache-dir or QUILL_CACHE_DIR".to_string());
        }
        if self.cache_dir == self.media_dir {
            return Err("cache_dir must differ from media_dir".to_string());
        }

        if self.cleanup_interval == 0 {
            return Err("cleanup_interval must be greater than 0".to_string());
        }
        if self.cache_retention == 0 {
            return Err("cache_retention must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Time between cache sweeps.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }

    /// Retention for recompressed variants.
    pub fn cache_retention(&self) -> Duration {
        Duration::from_secs(self.cache_retention)
    }

    /// HTTP layer settings derived from this configuration.
    pub fn router_config(&self) -> RouterConfig {
        let mut router_config = RouterConfig::new()
            .with_cache_max_age(self.cache_max_age)
            .with_tracing(!self.no_tracing);

        if let Some(ref origins) = self.cors_origins {
            router_config = router_config.with_cors_origins(origins.clone());
        }

        router_config
    }
}

// =============================================================================
// Tests
// =============================================================================
