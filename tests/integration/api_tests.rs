//! API integration tests for image delivery.
//!
//! Tests verify:
//! - Resize and recompress responses with their cache headers
//! - Conditional GET on every response kind
//! - Verbatim fallback when a transform fails
//! - Error cases (missing file, traversal)
//! - Health check and static files

use axum::http::StatusCode;

use quill_media::{create_router, StaticFiles};

use super::test_utils::{
    create_gif_stub, create_jpeg, create_png, get, get_with_headers, image_dimensions, mtime_hex,
    test_router_config, MediaFixture,
};

// =============================================================================
// Resize
// =============================================================================

#[tokio::test]
async fn test_resize_miss_then_hit() {
    let fixture = MediaFixture::new();
    let path = fixture.add_media("photo.png", &create_png(100, 100));
    let router = fixture.router();

    let first = get(&router, "/images/photo.png?maxWidth=50").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.header("x-resize-cache"), Some("miss"));
    assert_eq!(first.header("content-type"), Some("image/png"));
    assert_eq!(
        first.header("cache-control"),
        Some("public, max-age=7776000")
    );
    assert_eq!(
        first.header("etag").unwrap(),
        format!("\"{}-50x50-resized\"", mtime_hex(&path))
    );

    let (width, height) = image_dimensions(&first.body);
    assert!(width <= 50 && height <= 50, "got {width}x{height}");

    let second = get(&router, "/images/photo.png?maxWidth=50").await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.header("x-resize-cache"), Some("hit"));
    assert_eq!(first.body, second.body);
    assert_eq!(first.header("etag"), second.header("etag"));

    assert_eq!(fixture.cache_entries(), vec!["photo.png.320".to_string()]);
}

#[tokio::test]
async fn test_resize_jpeg_preserves_aspect_ratio() {
    let fixture = MediaFixture::new();
    fixture.add_media("wide.jpg", &create_jpeg(200, 100, 90));
    let router = fixture.router();

    let response = get(&router, "/images/wide.jpg?maxWidth=100&maxHeight=100").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("image/jpeg"));
    assert_eq!(image_dimensions(&response.body), (100, 50));
}

#[tokio::test]
async fn test_resize_never_enlarges() {
    let fixture = MediaFixture::new();
    fixture.add_media("icon.png", &create_png(10, 10));
    let router = fixture.router();

    let response = get(&router, "/images/icon.png?maxWidth=4096").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("x-resize-cache"), Some("miss"));
    assert_eq!(image_dimensions(&response.body), (10, 10));
}

#[tokio::test]
async fn test_resize_tall_strip_fits_square_box() {
    let fixture = MediaFixture::new();
    fixture.add_media("strip.png", &create_png(2, 600));
    let router = fixture.router();

    let response = get(&router, "/images/strip.png?maxWidth=100").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("x-resize-cache"), Some("miss"));
    assert!(response.header("etag").unwrap().ends_with("-100x100-resized\""));

    let (width, height) = image_dimensions(&response.body);
    assert_eq!(height, 100);
    assert!(width <= 100, "got {width}x{height}");
}

#[tokio::test]
async fn test_repeated_query_param_uses_first_value() {
    let fixture = MediaFixture::new();
    let path = fixture.add_media("photo.png", &create_png(100, 100));
    let router = fixture.router();

    let response = get(&router, "/images/photo.png?maxWidth=50&maxWidth=60").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("x-resize-cache"), Some("miss"));
    assert_eq!(
        response.header("etag").unwrap(),
        format!("\"{}-50x50-resized\"", mtime_hex(&path))
    );
    assert_eq!(image_dimensions(&response.body), (50, 50));

    let garbage = get(&router, "/images/photo.png?maxWidth=x&maxWidth=20&other=1").await;
    assert_eq!(garbage.status, StatusCode::OK);
    assert!(garbage.header("x-resize-cache").is_none());
    assert!(garbage.header("x-compression-cache").is_some());
}

#[tokio::test]
async fn test_resize_conditional_get() {
    let fixture = MediaFixture::new();
    fixture.add_media("photo.png", &create_png(64, 64));
    let router = fixture.router();

    let first = get(&router, "/images/photo.png?maxHeight=32").await;
    let etag = first.header("etag").unwrap().to_string();
    assert!(etag.ends_with("-32x32-resized\""), "{etag}");

    let second = get_with_headers(
        &router,
        "/images/photo.png?maxHeight=32",
        &[("if-none-match", etag.as_str())],
    )
    .await;
    assert_eq!(second.status, StatusCode::NOT_MODIFIED);
    assert!(second.body.is_empty());
    assert_eq!(second.header("etag"), Some(etag.as_str()));
    assert!(second.header("content-type").is_none());
}

#[tokio::test]
async fn test_resize_unsupported_format_recompresses_instead() {
    let fixture = MediaFixture::new();
    let gif = create_gif_stub();
    fixture.add_media("anim.gif", &gif);
    let router = fixture.router();

    let response = get(&router, "/images/anim.gif?maxWidth=50").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header("x-resize-cache").is_none());
    assert_eq!(response.header("x-compression-cache"), Some("miss"));
    assert_eq!(&response.body[..], &gif[..]);
}

// =============================================================================
// Recompress
// =============================================================================

#[tokio::test]
async fn test_recompress_png() {
    let fixture = MediaFixture::new();
    let original = create_png(128, 128);
    let path = fixture.add_media("diagram.png", &original);
    let router = fixture.router();

    let first = get(&router, "/images/diagram.png").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.header("x-compression-cache"), Some("miss"));
    assert!(first.body.len() < original.len());
    assert_eq!(image_dimensions(&first.body), (128, 128));
    assert_eq!(
        first.header("etag").unwrap(),
        format!(
            "\"{}-{:x}-compressed\"",
            mtime_hex(&path),
            first.body.len()
        )
    );

    let second = get(&router, "/images/diagram.png").await;
    assert_eq!(second.header("x-compression-cache"), Some("hit"));
    assert_eq!(first.body, second.body);

    let entries = fixture.cache_entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].starts_with("diagram_"));
    assert!(entries[0].ends_with(".png.compressed"));
}

#[tokio::test]
async fn test_recompress_conditional_get() {
    let fixture = MediaFixture::new();
    fixture.add_media("diagram.png", &create_png(64, 64));
    let router = fixture.router();

    let etag = get(&router, "/images/diagram.png")
        .await
        .header("etag")
        .unwrap()
        .to_string();

    let header = format!("\"stale\", {etag}");
    let response = get_with_headers(
        &router,
        "/images/diagram.png",
        &[("if-none-match", header.as_str())],
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_MODIFIED);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_gif_passes_through_uncached() {
    let fixture = MediaFixture::new();
    let gif = create_gif_stub();
    fixture.add_media("anim.gif", &gif);
    let router = fixture.router();

    let response = get(&router, "/images/anim.gif").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("image/gif"));
    assert_eq!(response.header("x-compression-cache"), Some("miss"));
    assert_eq!(&response.body[..], &gif[..]);
    assert!(fixture.cache_entries().is_empty());
}

#[tokio::test]
async fn test_unparsable_bounds_use_recompress() {
    let fixture = MediaFixture::new();
    fixture.add_media("photo.png", &create_png(32, 32));
    let router = fixture.router();

    for query in ["maxWidth=abc", "maxWidth=-10", "maxWidth=0&maxHeight=0"] {
        let response = get(&router, &format!("/images/photo.png?{query}")).await;
        assert_eq!(response.status, StatusCode::OK, "{query}");
        assert!(response.header("x-resize-cache").is_none(), "{query}");
        assert!(response.header("x-compression-cache").is_some(), "{query}");
    }
}

// =============================================================================
// Fallback
// =============================================================================

#[tokio::test]
async fn test_corrupt_image_served_verbatim() {
    let fixture = MediaFixture::new();
    let garbage = b"definitely not a png".to_vec();
    let path = fixture.add_media("broken.png", &garbage);
    let router = fixture.router();

    let expected_etag = format!("\"{}-{:x}\"", mtime_hex(&path), garbage.len());

    for uri in ["/images/broken.png", "/images/broken.png?maxWidth=50"] {
        let response = get(&router, uri).await;
        assert_eq!(response.status, StatusCode::OK, "{uri}");
        assert_eq!(&response.body[..], &garbage[..], "{uri}");
        assert_eq!(response.header("etag"), Some(expected_etag.as_str()), "{uri}");
        assert_eq!(response.header("content-type"), Some("image/png"), "{uri}");
        assert!(response.header("x-resize-cache").is_none(), "{uri}");
        assert!(response.header("x-compression-cache").is_none(), "{uri}");
    }

    let response = get_with_headers(
        &router,
        "/images/broken.png",
        &[("if-none-match", expected_etag.as_str())],
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_MODIFIED);
    assert!(response.body.is_empty());
    assert!(fixture.cache_entries().is_empty());
}

#[tokio::test]
async fn test_non_image_served_verbatim() {
    let fixture = MediaFixture::new();
    fixture.add_media("notes.txt", b"hello");
    let router = fixture.router();

    let response = get(&router, "/images/notes.txt?maxWidth=10").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"hello");
    assert_eq!(
        response.header("content-type"),
        Some("text/plain; charset=utf-8")
    );
}

#[tokio::test]
async fn test_wildcard_matches_any_if_none_match() {
    let fixture = MediaFixture::new();
    fixture.add_media("notes.txt", b"hello");
    let router = fixture.router();

    let response =
        get_with_headers(&router, "/images/notes.txt", &[("if-none-match", "*")]).await;
    assert_eq!(response.status, StatusCode::NOT_MODIFIED);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_missing_image_returns_404() {
    let fixture = MediaFixture::new();
    let router = fixture.router();

    for uri in ["/images/nope.png", "/images/nope.png?maxWidth=50"] {
        let response = get(&router, uri).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");

        let json: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(json["error"], "not_found");
        assert_eq!(json["status"], 404);
    }
}

#[tokio::test]
async fn test_path_traversal_returns_404() {
    let fixture = MediaFixture::new();
    std::fs::write(fixture.media_dir.parent().unwrap().join("secret.png"), b"x").unwrap();
    let router = fixture.router();

    let response = get(&router, "/images/..%2Fsecret.png").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Routes
// =============================================================================

#[tokio::test]
async fn test_nested_path_and_legacy_route() {
    let fixture = MediaFixture::new();
    fixture.add_media("2024/05/photo.png", &create_png(40, 40));
    let router = fixture.router();

    let modern = get(&router, "/images/2024/05/photo.png?maxWidth=20").await;
    let legacy = get(&router, "/content/images/2024/05/photo.png?maxWidth=20").await;

    assert_eq!(modern.status, StatusCode::OK);
    assert_eq!(legacy.status, StatusCode::OK);
    assert_eq!(modern.body, legacy.body);
    assert_eq!(legacy.header("x-resize-cache"), Some("hit"));
}

#[tokio::test]
async fn test_health_check() {
    let fixture = MediaFixture::new();
    let router = fixture.router();

    let response = get(&router, "/health").await;
    assert_eq!(response.status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_static_files() {
    let fixture = MediaFixture::new();
    std::fs::write(fixture.static_dir.join("robots.txt"), b"User-agent: *\n").unwrap();
    std::fs::write(fixture.static_dir.join("favicon.ico"), [0u8, 0, 1, 0]).unwrap();

    let static_files =
        StaticFiles::load(&fixture.static_dir, quill_media::server::DEFAULT_STATIC_FILES).await;
    let router = create_router(fixture.store(), static_files, test_router_config());

    let robots = get(&router, "/robots.txt").await;
    assert_eq!(robots.status, StatusCode::OK);
    assert_eq!(&robots.body[..], b"User-agent: *\n");
    assert_eq!(
        robots.header("content-type"),
        Some("text/plain; charset=utf-8")
    );

    let favicon = get(&router, "/favicon.ico").await;
    assert_eq!(favicon.status, StatusCode::OK);
    assert_eq!(favicon.header("content-type"), Some("image/x-icon"));

    // Listed by default but absent on disk.
    let missing = get(&router, "/apple-touch-icon.png").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}
