use thiserror::Error;

/// I/O errors that can occur when resolving or reading a source asset
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Asset does not exist
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Request path escapes the media directory or is otherwise unusable
    #[error("Invalid asset path: {0}")]
    InvalidPath(String),

    /// Any other filesystem failure
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },
}

impl IoError {
    /// Build an `IoError` from a `std::io::Error`, mapping `NotFound` through.
    pub fn from_std(path: impl Into<String>, err: &std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            IoError::NotFound(path)
        } else {
            IoError::Read {
                path,
                message: err.to_string(),
            }
        }
    }
}

/// Errors raised by the transform engine
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// Source bytes are not a decodable image of the expected format
    #[error("Failed to decode image: {message}")]
    Decode { message: String },

    /// Re-encoding the transformed pixels failed
    #[error("Failed to encode image: {message}")]
    Encode { message: String },

    /// The extension has no decoder for the requested transform
    #[error("Unsupported image format: {extension}")]
    UnsupportedFormat { extension: String },

    /// Resize was requested with neither bound positive
    #[error("No resize dimensions specified")]
    MissingDimensions,
}

/// Errors returned by the cache store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The source asset does not exist (terminal, maps to HTTP 404)
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// The source asset exists but could not be read
    #[error("Source error: {0}")]
    Source(IoError),

    /// The transform failed; callers fall back to the original bytes
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// The blocking transform task did not complete
    #[error("Transform task failed: {0}")]
    Task(String),
}

impl From<IoError> for StoreError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::NotFound(path) => StoreError::SourceNotFound(path),
            other => StoreError::Source(other),
        }
    }
}

/// Errors that abort a janitor sweep
#[derive(Debug, Clone, Error)]
pub enum SweepError {
    /// Traversing the cache directory failed
    #[error("Failed to walk cache directory: {message}")]
    Walk { message: String },

    /// Deleting an expired entry failed
    #[error("Failed to remove {path}: {message}")]
    Remove { path: String, message: String },
}
