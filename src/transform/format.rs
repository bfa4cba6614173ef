//! Image format detection by file extension.
//!
//! Dispatch is purely name-based and case-insensitive; file contents are
//! never sniffed.

use std::path::Path;

/// Image formats known to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Svg,
}

impl ImageFormat {
    /// Detect the format from a path's extension.
    ///
    /// Returns `None` for anything that is not a supported image.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        Self::from_extension(ext)
    }

    /// Detect the format from a bare extension (with or without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "svg" => Some(ImageFormat::Svg),
            _ => None,
        }
    }

    /// Short lowercase name of the format.
    pub fn name(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Svg => "svg",
        }
    }

    /// MIME type served for this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    /// Whether the resize transform can decode and re-encode this format.
    pub fn supports_resize(&self) -> bool {
        matches!(self, ImageFormat::Png | ImageFormat::Jpeg)
    }

    /// Decoder/encoder format in the `image` crate, for raster formats.
    pub(crate) fn codec(&self) -> Option<image::ImageFormat> {
        match self {
            ImageFormat::Png => Some(image::ImageFormat::Png),
            ImageFormat::Jpeg => Some(image::ImageFormat::Jpeg),
            ImageFormat::Gif | ImageFormat::Svg => None,
        }
    }
}

/// Check if a path names a supported image file.
#[inline]
pub fn is_image_file(path: impl AsRef<Path>) -> bool {
    ImageFormat::from_path(path).is_some()
}

/// Content type for any served file, falling back to `application/octet-stream`.
pub fn content_type_for(path: impl AsRef<Path>) -> &'static str {
    let path = path.as_ref();
    if let Some(format) = ImageFormat::from_path(path) {
        return format.content_type();
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("txt") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("json") | Some("webmanifest") => "application/json",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        _ => "application/octet-stream",
    }
}
