//! Comparison pipeline.
//!
//! This module wires acquisition, the three metric extractors and the score
//! combiner into one call that always yields a [`ComparisonResult`].

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::acquire::{acquire_pair, ImageSource};
use crate::config::EngineConfig;
use crate::error::{Result, SimilarityError};
use crate::metrics::{calculate_ms_ssim, color_similarity, edge_similarity};
use crate::scoring::{ComparisonResult, ScoreCombiner};
use crate::PixelBuffer;

/// Perceptual similarity engine.
///
/// Holds only immutable configuration, so one engine can serve any number
/// of concurrent comparisons.
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    /// Engine configuration.
    config: EngineConfig,
    /// Score fusion policy derived from the configuration.
    combiner: ScoreCombiner,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SimilarityEngine {
    /// Create a new engine with the given configuration.
    ///
    /// An invalid configuration is logged and replaced by the defaults;
    /// use [`SimilarityEngine::try_new`] to reject it instead.
    pub fn new(config: EngineConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|e| {
            log::warn!("Invalid engine configuration, using defaults: {}", e);
            Self::from_valid(EngineConfig::default())
        })
    }

    /// Create a new engine, failing on an invalid configuration.
    pub fn try_new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: EngineConfig) -> Self {
        let combiner = ScoreCombiner::from_config(&config);
        Self { config, combiner }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compare a target against a generated image with the configured
    /// number of scales.
    pub fn compare(&self, target: &ImageSource, generated: &ImageSource) -> ComparisonResult {
        self.compare_with_scales(target, generated, self.config.scales)
    }

    /// Compare a target against a generated image.
    ///
    /// Never panics and never returns an error: an input below the minimum
    /// size or an unexpected internal fault yields a zero-score result with
    /// its `error` field set.
    pub fn compare_with_scales(
        &self,
        target: &ImageSource,
        generated: &ImageSource,
        scales: usize,
    ) -> ComparisonResult {
        let start = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run(target, generated, scales)
        }))
        .unwrap_or_else(|payload| {
            Err(SimilarityError::Critical(panic_message(payload.as_ref())))
        });

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                log::error!(
                    "Comparison of {} against {} failed: {}",
                    generated.label(),
                    target.label(),
                    e
                );
                ComparisonResult::failed(e.to_string())
            }
        };

        log::info!(
            "Compared {} against {}: {:.2}% (MS-SSIM {:.4}) in {} ms",
            generated.label(),
            target.label(),
            result.percentage,
            result.ms_ssim,
            start.elapsed().as_millis()
        );

        result
    }

    /// Compare two in-memory buffers.
    pub fn compare_buffers(&self, target: &PixelBuffer, generated: &PixelBuffer) -> ComparisonResult {
        self.compare(
            &ImageSource::Buffer(target.clone()),
            &ImageSource::Buffer(generated.clone()),
        )
    }

    /// Score two buffers that are already normalized to the same shape.
    ///
    /// The three metrics run independently. Color and shape failures are
    /// logged and scored as 0.
    pub fn score_normalized(
        &self,
        target: &PixelBuffer,
        generated: &PixelBuffer,
        scales: usize,
    ) -> ComparisonResult {
        let (structure, (color, shape)) = rayon::join(
            || calculate_ms_ssim(target, generated, scales, &self.config.ssim),
            || {
                rayon::join(
                    || color_similarity(target, generated),
                    || edge_similarity(target, generated),
                )
            },
        );

        let color = color.unwrap_or_else(|e| {
            log::warn!("Color metric failed, scoring 0: {}", e);
            0.0
        });
        let shape = shape.unwrap_or_else(|e| {
            log::warn!("Shape metric failed, scoring 0: {}", e);
            0.0
        });

        self.combiner.finish(structure, color, shape)
    }

    fn run(
        &self,
        target: &ImageSource,
        generated: &ImageSource,
        scales: usize,
    ) -> Result<ComparisonResult> {
        let (target, generated) = acquire_pair(target, generated, &self.config)?;
        Ok(self.score_normalized(&target, &generated, scales))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
