//! quill-media - image delivery for a blog.
//!
//! This binary starts the HTTP server, the cache janitor, and wires all
//! components together.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill_media::{
    cache::{CacheJanitor, CacheStore},
    config::Config,
    server::{create_router, StaticFiles, DEFAULT_STATIC_FILES},
    source::LocalAssetSource,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("quill-media v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Media directory: {}", config.media_dir.display());
    info!("  Cache directory: {}", config.cache_dir.display());
    info!("  Static directory: {}", config.static_dir.display());
    info!(
        "  Cache sweep: every {}s, retention {}s",
        config.cleanup_interval, config.cache_retention
    );

    if !config.media_dir.is_dir() {
        warn!(
            "  Media directory {} does not exist; every image request will 404",
            config.media_dir.display()
        );
    }

    let static_files = StaticFiles::load(&config.static_dir, DEFAULT_STATIC_FILES).await;
    info!("  Static files: {} loaded", static_files.len());

    let source = LocalAssetSource::new(&config.media_dir);
    let store = CacheStore::new(source, &config.cache_dir);

    let janitor = CacheJanitor::new(&config.cache_dir)
        .with_interval(config.cleanup_interval())
        .with_max_age(config.cache_retention())
        .spawn();

    let router = create_router(store, static_files, config.router_config());

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            janitor.abort();
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  curl http://{}/health", addr);

    let result = axum::serve(listener, router).await;
    janitor.abort();

    if let Err(e) = result {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "quill_media=debug,tower_http=debug"
    } else {
        "quill_media=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
