//! Edge (shape) similarity from luminance gradients.

use crate::error::{Result, SimilarityError};
use crate::PixelBuffer;

use super::validate_pair;

/// Normalizer for the per-pixel gradient difference.
const MAX_EDGE_DIFFERENCE: f64 = 255.0;

/// Gradient magnitude of every interior pixel, row-major.
///
/// Uses forward differences to the right and lower neighbors; the one pixel
/// border is skipped, so the result has `(width - 2) * (height - 2)` entries.
pub fn gradient_magnitudes(buffer: &PixelBuffer) -> Vec<f64> {
    let width = buffer.width() as usize;
    let height = buffer.height() as usize;
    if width < 3 || height < 3 {
        return Vec::new();
    }

    let luma = buffer.luminance();
    let mut magnitudes = Vec::with_capacity((width - 2) * (height - 2));

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let here = luma[y * width + x];
            let gx = luma[y * width + x + 1] - here;
            let gy = luma[(y + 1) * width + x] - here;
            magnitudes.push((gx * gx + gy * gy).sqrt());
        }
    }

    magnitudes
}

/// Edge similarity of two equally sized buffers, in `[0, 1]`.
///
/// `1 - sum|edge_a - edge_b| / (255 * interior_pixels)`, clamped.
pub fn edge_similarity(a: &PixelBuffer, b: &PixelBuffer) -> Result<f64> {
    validate_pair(a, b)?;

    let edges_a = gradient_magnitudes(a);
    let edges_b = gradient_magnitudes(b);
    if edges_a.is_empty() {
        return Err(SimilarityError::MetricComputation(format!(
            "{}x{} buffer has no interior pixels",
            a.width(),
            a.height()
        )));
    }

    let total_diff: f64 = edges_a
        .iter()
        .zip(edges_b.iter())
        .map(|(x, y)| (x - y).abs())
        .sum();
    let max_diff = MAX_EDGE_DIFFERENCE * edges_a.len() as f64;

    Ok((1.0 - total_diff / max_diff).clamp(0.0, 1.0))
}
