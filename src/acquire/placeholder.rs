//! Synthetic stand-in for images that cannot be decoded.

use crate::error::Result;
use crate::PixelBuffer;

/// Top-left color of the placeholder gradient.
pub const PLACEHOLDER_START: [u8; 3] = [0x66, 0x7e, 0xea];

/// Bottom-right color of the placeholder gradient.
pub const PLACEHOLDER_END: [u8; 3] = [0x76, 0x4b, 0xa2];

/// Deterministic diagonal gradient from [`PLACEHOLDER_START`] to
/// [`PLACEHOLDER_END`].
pub fn placeholder(width: u32, height: u32) -> Result<PixelBuffer> {
    let span = (width.saturating_sub(1) + height.saturating_sub(1)).max(1) as f64;

    PixelBuffer::from_fn(width, height, |x, y| {
        let t = (x + y) as f64 / span;
        let mix = |c: usize| {
            let start = PLACEHOLDER_START[c] as f64;
            let end = PLACEHOLDER_END[c] as f64;
            (start + (end - start) * t).round() as u8
        };
        [mix(0), mix(1), mix(2), 255]
    })
}
