//! Configuration types for the similarity engine and its scoring policy.
//!
//! Every empirically tuned threshold and multiplier of the score combiner is
//! a named field here rather than a literal in the scoring code.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimilarityError};
use crate::metrics::SsimConfig;

/// Score (in percent) a comparison must reach to pass a challenge.
pub const PASS_THRESHOLD: f64 = 70.0;

/// Maximum number of pyramid levels the MS-SSIM engine evaluates.
pub const MAX_SCALES: usize = 5;

/// Smallest edge length of any pyramid level.
pub const PYRAMID_FLOOR: u32 = 8;

/// Relative weight of each metric in the combined score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Weight of the MS-SSIM structure score.
    pub structure: f64,
    /// Weight of the color histogram score.
    pub color: f64,
    /// Weight of the edge/shape score.
    pub shape: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            structure: 0.60,
            color: 0.25,
            shape: 0.15,
        }
    }
}

impl ScoreWeights {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("structure", self.structure),
            ("color", self.color),
            ("shape", self.shape),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimilarityError::Config(format!(
                    "weight '{}' must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Heuristic boosts and floors applied after the weighted combination.
///
/// The values are empirically tuned and carry no physical meaning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionPolicy {
    /// Structure score above which the structure boost fires.
    pub structure_boost_threshold: f64,
    /// Multiplier of the structure boost.
    pub structure_boost_factor: f64,

    /// Structure score above which the alignment boost may fire.
    pub alignment_structure_threshold: f64,
    /// Color score above which the alignment boost may fire.
    pub alignment_color_threshold: f64,
    /// Shape score above which the alignment boost may fire.
    pub alignment_shape_threshold: f64,
    /// Multiplier of the alignment boost.
    pub alignment_boost_factor: f64,

    /// Structure score above which the quality floor is considered.
    pub floor_structure_threshold: f64,
    /// Final score below which the quality floor is applied.
    pub floor_trigger: f64,
    /// Fraction of the structure score used as the floor.
    pub floor_factor: f64,
}

impl Default for CorrectionPolicy {
    fn default() -> Self {
        Self {
            structure_boost_threshold: 0.7,
            structure_boost_factor: 1.10,
            alignment_structure_threshold: 0.5,
            alignment_color_threshold: 0.6,
            alignment_shape_threshold: 0.5,
            alignment_boost_factor: 1.05,
            floor_structure_threshold: 0.4,
            floor_trigger: 0.3,
            floor_factor: 0.75,
        }
    }
}

impl CorrectionPolicy {
    /// Policy that leaves the combined score untouched.
    pub fn disabled() -> Self {
        Self {
            structure_boost_factor: 1.0,
            alignment_boost_factor: 1.0,
            floor_factor: 0.0,
            ..Self::default()
        }
    }
}

/// Configuration for one similarity engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of pyramid levels (clamped to `1..=5`).
    pub scales: usize,
    /// Upper bound on the normalized edge length.
    pub max_size: u32,
    /// Minimum accepted value for the smaller natural dimension of a source.
    pub min_size: u32,
    /// Time budget for fetching a remote source, in seconds.
    pub fetch_timeout_secs: u64,
    /// Windowed SSIM parameters.
    pub ssim: SsimConfig,
    /// Metric weights.
    pub weights: ScoreWeights,
    /// Boosts and floors.
    pub corrections: CorrectionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scales: MAX_SCALES,
            max_size: 512,
            min_size: 16,
            fetch_timeout_secs: 15,
            ssim: SsimConfig::default(),
            weights: ScoreWeights::default(),
            corrections: CorrectionPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of pyramid levels.
    pub fn scales(mut self, scales: usize) -> Self {
        self.scales = scales;
        self
    }

    /// Set the correction policy.
    pub fn corrections(mut self, corrections: CorrectionPolicy) -> Self {
        self.corrections = corrections;
        self
    }

    /// Number of pyramid levels actually evaluated.
    pub fn effective_scales(&self) -> usize {
        self.scales.clamp(1, MAX_SCALES)
    }

    /// Parse a configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SimilarityError::Config(e.to_string()))
    }

    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.min_size < PYRAMID_FLOOR {
            return Err(SimilarityError::Config(format!(
                "min_size must be at least {}, got {}",
                PYRAMID_FLOOR, self.min_size
            )));
        }
        if self.max_size < self.min_size {
            return Err(SimilarityError::Config(format!(
                "max_size ({}) must not be smaller than min_size ({})",
                self.max_size, self.min_size
            )));
        }
        if self.ssim.window_size == 0 || self.ssim.window_size > PYRAMID_FLOOR as usize {
            return Err(SimilarityError::Config(format!(
                "ssim window_size must be in 1..={}, got {}",
                PYRAMID_FLOOR, self.ssim.window_size
            )));
        }
        if self.ssim.step == 0 {
            return Err(SimilarityError::Config("ssim step must be positive".into()));
        }
        self.weights.validate()
    }
}
