//! Perceptual Image Similarity Library
//!
//! Scores how closely a generated picture reproduces a target picture. The
//! engine normalizes both images to a common square size, measures
//! multi-scale structural similarity (MS-SSIM), color histogram similarity
//! and edge similarity, then fuses the three into a bounded percentage with
//! a small set of tunable boosts and floors.
//!
//! # Features
//!
//! - **MS-SSIM**: weighted geometric mean of windowed SSIM over a five level pyramid
//! - **Auxiliary metrics**: 48-bin RGB histogram intersection and gradient similarity
//! - **Graceful degradation**: undecodable sources become a placeholder, failing
//!   pyramid levels fall back to global statistics, failing metrics score 0
//! - **Reentrant**: no state is shared between comparisons
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use promptmatch::{EngineConfig, ImageSource, SimilarityEngine, PASS_THRESHOLD};
//!
//! let engine = SimilarityEngine::new(EngineConfig::default());
//! let result = engine.compare(
//!     &ImageSource::parse("target.png"),
//!     &ImageSource::parse("https://example.com/generated.png"),
//! );
//!
//! println!("Score: {:.2}%", result.percentage);
//! if result.passes(PASS_THRESHOLD) {
//!     println!("Challenge complete");
//! }
//! ```
//!
//! The engine never returns an `Err`: failures that cannot be recovered
//! (an input below 16 pixels, an unexpected internal fault) are reported in
//! the `error` field of an otherwise zeroed result.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod acquire;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod scoring;

// Re-export commonly used types
pub use acquire::ImageSource;
pub use batch::{BatchComparator, BatchEntry, BatchReport};
pub use config::{CorrectionPolicy, EngineConfig, ScoreWeights, PASS_THRESHOLD};
pub use error::{Result, SimilarityError};
pub use metrics::{MsSsimResult, ScaleLevel, SsimConfig};
pub use pipeline::SimilarityEngine;
pub use scoring::{ComparisonResult, MetricScores, ScoreCombiner};

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

/// Immutable RGBA pixel grid, 8 bits per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer from raw RGBA bytes in row-major order.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SimilarityError::ImageData(format!(
                "Buffer dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(SimilarityError::ImageData(format!(
                "Pixel data size mismatch: expected {} bytes, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a buffer filled with a single color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        Self::from_fn(width, height, |_, _| rgba)
    }

    /// Create a buffer by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Result<Self>
    where
        F: Fn(u32, u32) -> [u8; 4],
    {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    /// Take ownership of an RGBA image.
    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    /// Convert any decoded image to RGBA.
    pub fn from_image(image: &DynamicImage) -> Self {
        Self::from_rgba(image.to_rgba8())
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// RGBA value at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Iterate over pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(4)
    }

    /// Per-pixel luminance as the average of the RGB channels.
    pub fn luminance(&self) -> Vec<f64> {
        self.pixels()
            .map(|p| (p[0] as f64 + p[1] as f64 + p[2] as f64) / 3.0)
            .collect()
    }

    /// Resample to `width x height` with bilinear filtering.
    ///
    /// The scratch image lives only for the duration of this call.
    pub fn resize(&self, width: u32, height: u32) -> Result<Self> {
        if (width, height) == self.dimensions() {
            return Ok(self.clone());
        }
        if width == 0 || height == 0 {
            return Err(SimilarityError::ImageData(format!(
                "Cannot resize to {}x{}",
                width, height
            )));
        }
        let surface = RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| {
                SimilarityError::ImageData("Pixel data does not match dimensions".into())
            })?;
        let resized = image::imageops::resize(&surface, width, height, FilterType::Triangle);
        Ok(Self::from_rgba(resized))
    }
}
