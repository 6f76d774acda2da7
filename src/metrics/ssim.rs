//! SSIM (Structural Similarity Index) calculation.
//!
//! SSIM compares two luminance planes through their local means, variances
//! and cross-covariance:
//!
//! ```text
//! SSIM = ((2 ux uy + C1) (2 sxy + C2)) / ((ux^2 + uy^2 + C1) (sx^2 + sy^2 + C2))
//! ```
//!
//! - SSIM = 1.0: Identical images
//! - SSIM near 0: Unrelated images
//! - SSIM < 0: Anti-correlated structure (callers clamp to 0)
//!
//! Two flavors live here: the windowed index averaged over every sliding
//! window, and a global-statistics index that treats the whole plane as one
//! window. The global one only backs up the windowed one.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimilarityError};
use crate::PixelBuffer;

use super::validate_pair;

/// Peak value of an 8-bit sample.
const MAX_SAMPLE: f64 = 255.0;

/// Configuration for SSIM calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsimConfig {
    /// Edge length of the square window (default: 8).
    /// Must not exceed the 8 pixel pyramid floor.
    pub window_size: usize,

    /// Distance between neighboring windows (default: 1).
    pub step: usize,

    /// K1 constant for luminance comparison (default: 0.01).
    pub k1: f64,

    /// K2 constant for contrast comparison (default: 0.03).
    pub k2: f64,
}

impl Default for SsimConfig {
    fn default() -> Self {
        Self {
            window_size: 8,
            step: 1,
            k1: 0.01,
            k2: 0.03,
        }
    }
}

impl SsimConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set window size.
    pub fn window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    /// Set window step.
    pub fn step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    /// Stabilization constants `(C1, C2)` for 8-bit samples.
    pub fn constants(&self) -> (f64, f64) {
        (
            (self.k1 * MAX_SAMPLE).powi(2),
            (self.k2 * MAX_SAMPLE).powi(2),
        )
    }
}

/// Windowed SSIM between two equally sized buffers.
pub fn calculate_ssim(a: &PixelBuffer, b: &PixelBuffer, config: &SsimConfig) -> Result<f64> {
    validate_pair(a, b)?;
    windowed_ssim(
        &a.luminance(),
        &b.luminance(),
        a.width() as usize,
        a.height() as usize,
        config,
    )
}

/// Global-statistics SSIM between two equally sized buffers.
///
/// Less accurate than [`calculate_ssim`]; used when the windowed index
/// cannot be computed for a pyramid level.
pub fn fallback_ssim(a: &PixelBuffer, b: &PixelBuffer, config: &SsimConfig) -> Result<f64> {
    validate_pair(a, b)?;
    global_ssim(&a.luminance(), &b.luminance(), config)
}

/// Mean SSIM over all sliding windows of two luminance planes.
pub(crate) fn windowed_ssim(
    a: &[f64],
    b: &[f64],
    width: usize,
    height: usize,
    config: &SsimConfig,
) -> Result<f64> {
    let window = config.window_size;
    if a.len() != width * height || b.len() != width * height {
        return Err(SimilarityError::ScaleComputation(format!(
            "Plane length mismatch for {}x{}: {} vs {}",
            width,
            height,
            a.len(),
            b.len()
        )));
    }
    if window == 0 || config.step == 0 {
        return Err(SimilarityError::ScaleComputation(
            "Window size and step must be positive".into(),
        ));
    }
    if width < window || height < window {
        return Err(SimilarityError::ScaleComputation(format!(
            "{}x{} plane is smaller than the {}x{} window",
            width, height, window, window
        )));
    }

    let (c1, c2) = config.constants();
    let tables = MomentTables::new(a, b, width, height);
    let n = (window * window) as f64;

    let mut total = 0.0;
    let mut count = 0usize;

    for y in (0..=(height - window)).step_by(config.step) {
        for x in (0..=(width - window)).step_by(config.step) {
            let m = tables.window_sums(x, y, window);

            let mu_a = m.a / n;
            let mu_b = m.b / n;
            // Clamp away tiny negative variances from cancellation
            let var_a = (m.aa / n - mu_a * mu_a).max(0.0);
            let var_b = (m.bb / n - mu_b * mu_b).max(0.0);
            let cov = m.ab / n - mu_a * mu_b;

            total += ssim_formula(mu_a, mu_b, var_a, var_b, cov, c1, c2);
            count += 1;
        }
    }

    let ssim = total / count as f64;
    if !ssim.is_finite() {
        return Err(SimilarityError::ScaleComputation(format!(
            "Windowed SSIM is not finite ({})",
            ssim
        )));
    }
    Ok(ssim)
}

/// SSIM over the whole plane treated as a single window.
pub(crate) fn global_ssim(a: &[f64], b: &[f64], config: &SsimConfig) -> Result<f64> {
    if a.is_empty() || a.len() != b.len() {
        return Err(SimilarityError::ScaleComputation(format!(
            "Cannot compute global SSIM over planes of length {} and {}",
            a.len(),
            b.len()
        )));
    }

    let (c1, c2) = config.constants();
    let n = a.len() as f64;

    let mu_a: f64 = a.iter().sum::<f64>() / n;
    let mu_b: f64 = b.iter().sum::<f64>() / n;

    let var_a: f64 = a.iter().map(|&v| (v - mu_a).powi(2)).sum::<f64>() / n;
    let var_b: f64 = b.iter().map(|&v| (v - mu_b).powi(2)).sum::<f64>() / n;
    let cov: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - mu_a) * (y - mu_b))
        .sum::<f64>()
        / n;

    let ssim = ssim_formula(mu_a, mu_b, var_a, var_b, cov, c1, c2);
    if !ssim.is_finite() {
        return Err(SimilarityError::ScaleComputation(format!(
            "Global SSIM is not finite ({})",
            ssim
        )));
    }
    Ok(ssim)
}

/// Combined SSIM expression. C1 and C2 keep the denominator positive for
/// flat, black inputs.
fn ssim_formula(mu_a: f64, mu_b: f64, var_a: f64, var_b: f64, cov: f64, c1: f64, c2: f64) -> f64 {
    let numerator = (2.0 * mu_a * mu_b + c1) * (2.0 * cov + c2);
    let denominator = (mu_a * mu_a + mu_b * mu_b + c1) * (var_a + var_b + c2);
    numerator / denominator
}

/// Raw moment sums over one window.
struct WindowSums {
    a: f64,
    b: f64,
    aa: f64,
    bb: f64,
    ab: f64,
}

/// Summed-area tables of the first and second moments of two planes, so
/// each window costs a constant number of lookups.
struct MomentTables {
    stride: usize,
    a: Vec<f64>,
    b: Vec<f64>,
    aa: Vec<f64>,
    bb: Vec<f64>,
    ab: Vec<f64>,
}

impl MomentTables {
    fn new(a: &[f64], b: &[f64], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let size = stride * (height + 1);
        let mut tables = Self {
            stride,
            a: vec![0.0; size],
            b: vec![0.0; size],
            aa: vec![0.0; size],
            bb: vec![0.0; size],
            ab: vec![0.0; size],
        };

        for y in 0..height {
            let mut row = [0.0f64; 5];
            for x in 0..width {
                let va = a[y * width + x];
                let vb = b[y * width + x];
                row[0] += va;
                row[1] += vb;
                row[2] += va * va;
                row[3] += vb * vb;
                row[4] += va * vb;

                let above = y * stride + (x + 1);
                let here = (y + 1) * stride + (x + 1);
                tables.a[here] = row[0] + tables.a[above];
                tables.b[here] = row[1] + tables.b[above];
                tables.aa[here] = row[2] + tables.aa[above];
                tables.bb[here] = row[3] + tables.bb[above];
                tables.ab[here] = row[4] + tables.ab[above];
            }
        }

        tables
    }

    fn window_sums(&self, x: usize, y: usize, size: usize) -> WindowSums {
        let (x0, y0, x1, y1) = (x, y, x + size, y + size);
        let s = self.stride;
        let sum = |t: &[f64]| t[y1 * s + x1] - t[y0 * s + x1] - t[y1 * s + x0] + t[y0 * s + x0];

        WindowSums {
            a: sum(&self.a),
            b: sum(&self.b),
            aa: sum(&self.aa),
            bb: sum(&self.bb),
            ab: sum(&self.ab),
        }
    }
}
