//! Transform engine.
//!
//! Decodes an image, applies a transformation and re-encodes it. Everything
//! here is a pure function of (bytes, format, parameters); persistence lives
//! in [`crate::cache`].
//!
//! # Transforms
//!
//! - [`TransformSpec::Recompress`]: PNG is re-encoded at maximum deflate
//!   compression, JPEG at quality 95. Other formats pass through.
//! - [`TransformSpec::Resize`]: aspect-preserving downscale with Lanczos3
//!   into a bounding box, re-encoded in the source format (JPEG quality
//!   85). Images are never enlarged.

mod encoder;
mod format;

pub use encoder::{
    accept_recompressed, target_dimensions, ImageTransformer, Recompressed, JPEG_GROWTH_PERCENT,
    MAX_RESIZE_DIMENSION, RECOMPRESS_JPEG_QUALITY, RESIZE_JPEG_QUALITY,
};
pub use format::{content_type_for, is_image_file, ImageFormat};

/// A transformation applied to a source asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformSpec {
    /// Format-specific lossless or near-lossless re-encoding
    Recompress,

    /// Aspect-preserving resize; a `0` bound copies the other one
    Resize { max_width: u32, max_height: u32 },
}

impl TransformSpec {
    /// Build a resize spec, or `None` when neither bound is positive.
    pub fn resize(max_width: u32, max_height: u32) -> Option<Self> {
        if max_width == 0 && max_height == 0 {
            None
        } else {
            Some(TransformSpec::Resize {
                max_width,
                max_height,
            })
        }
    }
}
