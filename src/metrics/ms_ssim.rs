//! Multi-scale SSIM over a resolution pyramid.
//!
//! Each level halves the previous resolution (never below 8x8) and is scored
//! with the windowed SSIM. The per-level scores are fused by a weighted
//! geometric mean using the standard MS-SSIM coefficients.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{MAX_SCALES, PYRAMID_FLOOR};
use crate::error::Result;
use crate::PixelBuffer;

use super::ssim::{global_ssim, windowed_ssim, SsimConfig};
use super::validate_pair;

/// Canonical MS-SSIM level weights, finest level first.
pub const MS_SSIM_WEIGHTS: [f64; MAX_SCALES] = [0.0448, 0.2856, 0.3001, 0.2363, 0.1333];

/// Lower bound applied to each level score before exponentiation, so a
/// single zero level does not collapse the product.
const SCORE_FLOOR: f64 = 1e-10;

/// One level of the resolution pyramid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleLevel {
    /// 1-based level index; higher means coarser.
    pub index: usize,
    /// Level width in pixels.
    pub width: u32,
    /// Level height in pixels.
    pub height: u32,
    /// Exponent of this level in the geometric mean.
    pub weight: f64,
    /// SSIM of this level, clamped to `[0, 1]`.
    pub ssim_score: f64,
    /// Why the windowed SSIM failed, when the global fallback was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScaleLevel {
    /// Whether this level was scored with the global fallback.
    pub fn used_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of an MS-SSIM computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsSsimResult {
    /// Weighted geometric mean of the level scores, in `[0, 1]`.
    pub ms_ssim: f64,
    /// One entry per level, finest first.
    pub per_scale_scores: Vec<ScaleLevel>,
    /// Set when no score could be produced at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MsSsimResult {
    fn failed(message: String) -> Self {
        Self {
            ms_ssim: 0.0,
            per_scale_scores: Vec::new(),
            error: Some(message),
        }
    }
}

/// Calculate MS-SSIM between two equally sized buffers.
///
/// `scales` is clamped to `1..=5`. With fewer than five levels the first
/// `scales` canonical weights are used as they are, without rescaling them
/// to sum to one, which lowers the score of imperfect matches slightly.
///
/// Never fails: a level whose windowed SSIM cannot be computed is scored
/// with the global fallback and records the reason, and anything worse
/// yields `ms_ssim = 0` with an `error`.
pub fn calculate_ms_ssim(
    a: &PixelBuffer,
    b: &PixelBuffer,
    scales: usize,
    config: &SsimConfig,
) -> MsSsimResult {
    match try_ms_ssim(a, b, scales, config) {
        Ok(result) => result,
        Err(e) => {
            log::warn!("MS-SSIM failed: {}", e);
            MsSsimResult::failed(e.to_string())
        }
    }
}

fn try_ms_ssim(
    a: &PixelBuffer,
    b: &PixelBuffer,
    scales: usize,
    config: &SsimConfig,
) -> Result<MsSsimResult> {
    validate_pair(a, b)?;
    let scales = scales.clamp(1, MAX_SCALES);

    let per_scale_scores = (0..scales)
        .into_par_iter()
        .map(|level| score_level(a, b, level, config))
        .collect::<Result<Vec<_>>>()?;

    let ms_ssim = per_scale_scores
        .iter()
        .map(|s| s.ssim_score.max(SCORE_FLOOR).powf(s.weight))
        .product::<f64>()
        .clamp(0.0, 1.0);

    Ok(MsSsimResult {
        ms_ssim,
        per_scale_scores,
        error: None,
    })
}

/// Downsample both buffers to pyramid level `level` and score them.
fn score_level(
    a: &PixelBuffer,
    b: &PixelBuffer,
    level: usize,
    config: &SsimConfig,
) -> Result<ScaleLevel> {
    let factor = 1u32 << level;
    let width = (a.width() / factor).max(PYRAMID_FLOOR);
    let height = (a.height() / factor).max(PYRAMID_FLOOR);

    let level_a = a.resize(width, height)?;
    let level_b = b.resize(width, height)?;
    let luma_a = level_a.luminance();
    let luma_b = level_b.luminance();

    let (score, error) = match windowed_ssim(
        &luma_a,
        &luma_b,
        width as usize,
        height as usize,
        config,
    ) {
        Ok(score) => (score, None),
        Err(e) => {
            log::warn!(
                "Scale {} ({}x{}) falling back to global SSIM: {}",
                level + 1,
                width,
                height,
                e
            );
            (global_ssim(&luma_a, &luma_b, config)?, Some(e.to_string()))
        }
    };

    let ssim_score = score.clamp(0.0, 1.0);
    log::debug!(
        "Scale {} ({}x{}): SSIM {:.4}",
        level + 1,
        width,
        height,
        ssim_score
    );

    Ok(ScaleLevel {
        index: level + 1,
        width,
        height,
        weight: MS_SSIM_WEIGHTS[level],
        ssim_score,
        error,
    })
}
