//! Color histogram similarity.
//!
//! Each RGB channel is quantized into 16 bins. The three per-channel
//! histograms of an image are concatenated into 48 bins and normalized by
//! the total number of samples, so every histogram sums to 1 and the
//! intersection of two histograms lies in `[0, 1]`.

use crate::error::Result;
use crate::PixelBuffer;

use super::validate_pair;

/// Bins per color channel.
pub const BINS_PER_CHANNEL: usize = 16;

const BIN_WIDTH: usize = 256 / BINS_PER_CHANNEL;

/// Normalized 48-bin RGB histogram (red bins, then green, then blue).
pub fn color_histogram(buffer: &PixelBuffer) -> [f64; 3 * BINS_PER_CHANNEL] {
    let mut counts = [0u64; 3 * BINS_PER_CHANNEL];

    for pixel in buffer.pixels() {
        for channel in 0..3 {
            let bin = pixel[channel] as usize / BIN_WIDTH;
            counts[channel * BINS_PER_CHANNEL + bin] += 1;
        }
    }

    let samples = (buffer.pixel_count() * 3) as f64;
    counts.map(|c| c as f64 / samples)
}

/// Histogram intersection of two equally sized buffers, in `[0, 1]`.
///
/// Symmetric in its arguments; identical color distributions score 1.
pub fn color_similarity(a: &PixelBuffer, b: &PixelBuffer) -> Result<f64> {
    validate_pair(a, b)?;

    let hist_a = color_histogram(a);
    let hist_b = color_histogram(b);

    let intersection: f64 = hist_a
        .iter()
        .zip(hist_b.iter())
        .map(|(x, y)| x.min(*y))
        .sum();

    Ok(intersection.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_sums_to_one() {
        let img = PixelBuffer::from_fn(20, 10, |x, y| [(x * 12) as u8, (y * 25) as u8, 99, 255])
            .unwrap();
        let hist = color_histogram(&img);
        assert!((hist.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bin_boundaries() {
        let img = PixelBuffer::solid(4, 4, [15, 16, 255, 255]).unwrap();
        let hist = color_histogram(&img);
        let third = 1.0 / 3.0;
        assert!((hist[0] - third).abs() < 1e-12);
        assert!((hist[BINS_PER_CHANNEL + 1] - third).abs() < 1e-12);
        assert!((hist[3 * BINS_PER_CHANNEL - 1] - third).abs() < 1e-12);
    }

    #[test]
    fn test_identical_images_score_one() {
        let img = PixelBuffer::from_fn(16, 16, |x, y| [(x * 16) as u8, (y * 16) as u8, 0, 255])
            .unwrap();
        assert!((color_similarity(&img, &img).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_black_vs_white_scores_zero() {
        let black = PixelBuffer::solid(16, 16, [0, 0, 0, 255]).unwrap();
        let white = PixelBuffer::solid(16, 16, [255, 255, 255, 255]).unwrap();
        assert_eq!(color_similarity(&black, &white).unwrap(), 0.0);
    }

    #[test]
    fn test_partial_overlap_is_symmetric() {
        let a = PixelBuffer::from_fn(16, 16, |x, _| {
            if x < 8 {
                [255, 0, 0, 255]
            } else {
                [0, 0, 255, 255]
            }
        })
        .unwrap();
        let b = PixelBuffer::solid(16, 16, [255, 0, 0, 255]).unwrap();

        let ab = color_similarity(&a, &b).unwrap();
        let ba = color_similarity(&b, &a).unwrap();
        assert_eq!(ab, ba);
        assert!(ab > 0.0 && ab < 1.0);
    }

    #[test]
    fn test_alpha_is_ignored() {
        let opaque = PixelBuffer::solid(8, 8, [10, 20, 30, 255]).unwrap();
        let clear = PixelBuffer::solid(8, 8, [10, 20, 30, 0]).unwrap();
        assert!((color_similarity(&opaque, &clear).unwrap() - 1.0).abs() < 1e-12);
    }
}
