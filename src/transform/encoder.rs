//! Image transformer: recompression and bounded resizing.
//!
//! # Design Decisions
//!
//! - **Pure functions of bytes**: the transformer never touches the
//!   filesystem. Callers hand it the source bytes and a format and get new
//!   bytes back, or the original bytes untouched.
//!
//! - **Acceptance policy**: a recompressed PNG must be strictly smaller than
//!   its source; a recompressed JPEG may grow by up to 5% so that
//!   re-encoding at a uniform quality is still applied.
//!
//! - **Resize in the source format**: PNG stays PNG, JPEG stays JPEG. Only
//!   raster formats with a decoder are resizable.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use super::format::ImageFormat;
use crate::error::TransformError;

/// JPEG quality used when recompressing.
pub const RECOMPRESS_JPEG_QUALITY: u8 = 95;

/// JPEG quality used when encoding resized images.
pub const RESIZE_JPEG_QUALITY: u8 = 85;

/// Maximum growth allowed for a recompressed JPEG, in percent of the original.
pub const JPEG_GROWTH_PERCENT: usize = 105;

/// Largest output side a resize may produce.
pub const MAX_RESIZE_DIMENSION: u32 = 4096;

// =============================================================================
// Results
// =============================================================================

/// Output of a recompression attempt.
#[derive(Debug, Clone)]
pub struct Recompressed {
    /// The recompressed bytes, or the original bytes when not applied
    pub data: Bytes,

    /// Whether the returned bytes differ from the input
    pub applied: bool,
}

impl Recompressed {
    fn unchanged(data: Bytes) -> Self {
        Self {
            data,
            applied: false,
        }
    }
}

// =============================================================================
// Transformer
// =============================================================================

/// Decodes, transforms and re-encodes images.
///
/// # Example
///
/// ```ignore
/// use quill_media::transform::{ImageFormat, ImageTransformer};
///
/// let transformer = ImageTransformer::new();
/// let out = transformer.recompress(source_bytes, Some(ImageFormat::Png))?;
/// if out.applied {
///     println!("saved {} bytes", source_len - out.data.len());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ImageTransformer {
    recompress_quality: u8,
    resize_quality: u8,
}

impl Default for ImageTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageTransformer {
    /// Create a transformer with the standard qualities (95 recompress, 85 resize).
    pub fn new() -> Self {
        Self {
            recompress_quality: RECOMPRESS_JPEG_QUALITY,
            resize_quality: RESIZE_JPEG_QUALITY,
        }
    }

    /// Recompress an image according to its format.
    ///
    /// PNG is re-encoded losslessly at maximum compression, JPEG is
    /// re-encoded at high quality. Any other format, including `None`, is
    /// passed through with `applied = false`.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Decode`] if the bytes are not a valid image
    /// of the given format.
    pub fn recompress(
        &self,
        data: Bytes,
        format: Option<ImageFormat>,
    ) -> Result<Recompressed, TransformError> {
        let format = match format {
            Some(f @ (ImageFormat::Png | ImageFormat::Jpeg)) => f,
            _ => return Ok(Recompressed::unchanged(data)),
        };

        let img = decode(&data, format)?;
        let candidate = match format {
            ImageFormat::Png => encode_png(&img, CompressionType::Best, PngFilter::Adaptive)?,
            _ => encode_jpeg(&img, self.recompress_quality)?,
        };

        if accept_recompressed(format, data.len(), candidate.len()) {
            Ok(Recompressed {
                data: Bytes::from(candidate),
                applied: true,
            })
        } else {
            Ok(Recompressed::unchanged(data))
        }
    }

    /// Resize an image to fit the given bounds, re-encoding in its own format.
    ///
    /// A bound of `0` takes the value of the other bound. See
    /// [`target_dimensions`] for how the output size is chosen.
    pub fn resize(
        &self,
        data: &[u8],
        format: ImageFormat,
        max_width: u32,
        max_height: u32,
    ) -> Result<Bytes, TransformError> {
        if max_width == 0 && max_height == 0 {
            return Err(TransformError::MissingDimensions);
        }
        if !format.supports_resize() {
            return Err(TransformError::UnsupportedFormat {
                extension: format.name().to_string(),
            });
        }

        let img = decode(data, format)?;
        let (width, height) = target_dimensions(img.width(), img.height(), max_width, max_height)?;

        let resized = if (width, height) == (img.width(), img.height()) {
            img
        } else {
            img.resize_exact(width, height, FilterType::Lanczos3)
        };

        let encoded = match format {
            ImageFormat::Png => encode_png(&resized, CompressionType::Default, PngFilter::Adaptive)?,
            _ => encode_jpeg(&resized, self.resize_quality)?,
        };

        Ok(Bytes::from(encoded))
    }
}

// =============================================================================
// Policy
// =============================================================================

/// Decide whether a recompressed candidate replaces the original.
///
/// PNG: strictly smaller. JPEG: at most 5% larger. Other formats never
/// accept a candidate.
#[inline]
pub fn accept_recompressed(format: ImageFormat, original_len: usize, candidate_len: usize) -> bool {
    match format {
        ImageFormat::Png => candidate_len < original_len,
        ImageFormat::Jpeg => candidate_len * 100 <= original_len * JPEG_GROWTH_PERCENT,
        ImageFormat::Gif | ImageFormat::Svg => false,
    }
}

/// Compute output dimensions for a resize, preserving aspect ratio.
///
/// The source is fit within a `max_width` x `max_height` box whose sides
/// are capped at [`MAX_RESIZE_DIMENSION`]. A bound of 0 copies the other
/// bound, so a single bound describes a square box. Images are never
/// enlarged: a source already inside the box keeps its size.
///
/// Returns [`TransformError::MissingDimensions`] if both bounds are 0.
pub fn target_dimensions(
    src_width: u32,
    src_height: u32,
    max_width: u32,
    max_height: u32,
) -> Result<(u32, u32), TransformError> {
    let (max_width, max_height) = match (max_width, max_height) {
        (0, 0) => return Err(TransformError::MissingDimensions),
        (w, 0) => (w, w),
        (0, h) => (h, h),
        bounds => bounds,
    };
    let max_width = max_width.min(MAX_RESIZE_DIMENSION);
    let max_height = max_height.min(MAX_RESIZE_DIMENSION);

    if src_width <= max_width && src_height <= max_height {
        return Ok((src_width, src_height));
    }

    let sw = src_width as f64;
    let sh = src_height as f64;
    let scale = (max_width as f64 / sw).min(max_height as f64 / sh);

    Ok((
        scaled(sw, scale).min(max_width),
        scaled(sh, scale).min(max_height),
    ))
}

fn scaled(side: f64, scale: f64) -> u32 {
    (side * scale).round().max(1.0) as u32
}

// =============================================================================
// Codec helpers
// =============================================================================

fn codec_for(format: ImageFormat) -> Result<image::ImageFormat, TransformError> {
    format.codec().ok_or_else(|| TransformError::UnsupportedFormat {
        extension: format.name().to_string(),
    })
}

fn decode(data: &[u8], format: ImageFormat) -> Result<DynamicImage, TransformError> {
    let codec = codec_for(format)?;
    ImageReader::with_format(Cursor::new(data), codec)
        .decode()
        .map_err(|e| TransformError::Decode {
            message: e.to_string(),
        })
}

fn encode_png(
    img: &DynamicImage,
    compression: CompressionType,
    filter: PngFilter,
) -> Result<Vec<u8>, TransformError> {
    let mut output = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut output, compression, filter);
    img.write_with_encoder(encoder)
        .map_err(|e| TransformError::Encode {
            message: e.to_string(),
        })?;
    Ok(output)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    // The JPEG encoder rejects alpha channels.
    let img = match img {
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageRgba8(_) => {
            DynamicImage::ImageRgb8(img.to_rgb8())
        }
        _ => img.clone(),
    };

    let mut output = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
    encoder
        .encode_image(&img)
        .map_err(|e| TransformError::Encode {
            message: e.to_string(),
        })?;
    Ok(output)
}

// =============================================================================
// Tests
// =============================================================================
