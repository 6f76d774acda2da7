//! Error types for the image similarity engine.

use thiserror::Error;

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, SimilarityError>;

/// Main error type for the image similarity engine.
///
/// Only [`SimilarityError::TooSmall`] and [`SimilarityError::Critical`] ever
/// reach a caller of the engine, and then only as the `error` string of a
/// [`ComparisonResult`](crate::scoring::ComparisonResult). The other
/// variants are recovered inside the pipeline.
#[derive(Error, Debug)]
pub enum SimilarityError {
    /// Image resource could not be fetched or decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Image is below the minimum usable resolution.
    #[error("Image too small: {width}x{height} (minimum dimension is {minimum})")]
    TooSmall {
        /// Natural width of the offending image.
        width: u32,
        /// Natural height of the offending image.
        height: u32,
        /// Minimum accepted value for the smaller dimension.
        minimum: u32,
    },

    /// One of the auxiliary or structural metrics failed.
    #[error("Metric computation error: {0}")]
    MetricComputation(String),

    /// A single pyramid level failed.
    #[error("Scale computation error: {0}")]
    ScaleComputation(String),

    /// Unexpected failure anywhere in the pipeline.
    #[error("Critical error: {0}")]
    Critical(String),

    /// Pixel buffer shape or content is invalid.
    #[error("Image data error: {0}")]
    ImageData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for SimilarityError {
    fn from(err: image::ImageError) -> Self {
        SimilarityError::Decode(err.to_string())
    }
}

impl From<toml::de::Error> for SimilarityError {
    fn from(err: toml::de::Error) -> Self {
        SimilarityError::Config(err.to_string())
    }
}

#[cfg(feature = "fetch")]
impl From<reqwest::Error> for SimilarityError {
    fn from(err: reqwest::Error) -> Self {
        SimilarityError::Decode(err.to_string())
    }
}
