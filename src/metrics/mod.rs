//! Similarity metrics between a target and a generated image.
//!
//! This module provides the three signals the score combiner fuses:
//! - **MS-SSIM** (Multi-Scale Structural Similarity): structure across a resolution pyramid
//! - **Color histogram intersection**: global color distribution
//! - **Edge similarity**: agreement of luminance gradients
//!
//! All functions expect two buffers of the same shape, as produced by
//! [`crate::acquire::normalize_pair`].
//!
//! # Example
//!
//! ```rust,ignore
//! use promptmatch::metrics::{calculate_ms_ssim, color_similarity, edge_similarity, SsimConfig};
//!
//! let structure = calculate_ms_ssim(&target, &generated, 5, &SsimConfig::default());
//! println!("MS-SSIM: {:.4}", structure.ms_ssim);
//!
//! let color = color_similarity(&target, &generated)?;
//! let shape = edge_similarity(&target, &generated)?;
//! ```

mod edge;
mod histogram;
mod ms_ssim;
mod ssim;

pub use edge::{edge_similarity, gradient_magnitudes};
pub use histogram::{color_histogram, color_similarity, BINS_PER_CHANNEL};
pub use ms_ssim::{calculate_ms_ssim, MsSsimResult, ScaleLevel, MS_SSIM_WEIGHTS};
pub use ssim::{calculate_ssim, fallback_ssim, SsimConfig};

use crate::error::{Result, SimilarityError};
use crate::PixelBuffer;

/// Validate that two buffers can be compared pixel for pixel.
pub(crate) fn validate_pair(a: &PixelBuffer, b: &PixelBuffer) -> Result<()> {
    if a.dimensions() != b.dimensions() {
        return Err(SimilarityError::ImageData(format!(
            "Image dimensions mismatch: {}x{} vs {}x{}",
            a.width(),
            a.height(),
            b.width(),
            b.height()
        )));
    }
    Ok(())
}
