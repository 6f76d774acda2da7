//! Score fusion and the comparison result record.
//!
//! The combiner weights the structure, color and shape scores, then applies
//! the [`CorrectionPolicy`] in a fixed order:
//!
//! 1. **Structure boost**: strong structure scales the combined score up.
//! 2. **Alignment boost**: all three metrics agreeing scales it up again.
//! 3. **Quality floor**: a decent structure score keeps the final score from
//!    being dragged down too far by the other two metrics.
//!
//! Every step keeps the score in `[0, 1]`.

mod result;

pub use result::{Alignment, Analysis, ComparisonResult, DetailedScores, StructureQuality};

use serde::{Deserialize, Serialize};

use crate::config::{CorrectionPolicy, EngineConfig, ScoreWeights};
use crate::metrics::MsSsimResult;

/// The three independently computed similarity scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricScores {
    /// MS-SSIM structure score.
    pub structure: f64,
    /// Color histogram intersection.
    pub color: f64,
    /// Edge similarity.
    pub shape: f64,
}

impl MetricScores {
    /// Create a score triple, mapping non-finite values to 0 and clamping
    /// the rest to `[0, 1]`.
    pub fn new(structure: f64, color: f64, shape: f64) -> Self {
        let sanitize = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            structure: sanitize(structure),
            color: sanitize(color),
            shape: sanitize(shape),
        }
    }
}

/// Outcome of the weighted combination and corrections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedScore {
    /// Weighted sum before corrections.
    pub combined: f64,
    /// Score after all corrections, in `[0, 1]`.
    pub final_score: f64,
    /// Whether the structure boost fired.
    pub structure_boost: bool,
    /// Whether the alignment boost fired.
    pub alignment_boost: bool,
    /// Whether the quality floor raised the score.
    pub quality_floor: bool,
}

/// Fuses metric scores into a [`ComparisonResult`].
#[derive(Debug, Clone, Default)]
pub struct ScoreCombiner {
    weights: ScoreWeights,
    policy: CorrectionPolicy,
}

impl ScoreCombiner {
    /// Create a combiner with explicit weights and policy.
    pub fn new(weights: ScoreWeights, policy: CorrectionPolicy) -> Self {
        Self { weights, policy }
    }

    /// Create a combiner from an engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.weights, config.corrections)
    }

    /// Weighted combination followed by the correction steps.
    pub fn combine(&self, scores: MetricScores) -> CombinedScore {
        let w = &self.weights;
        let p = &self.policy;

        let combined = (w.structure * scores.structure
            + w.color * scores.color
            + w.shape * scores.shape)
            .clamp(0.0, 1.0);
        let mut final_score = combined;

        let structure_boost = scores.structure > p.structure_boost_threshold;
        if structure_boost {
            final_score = (combined * p.structure_boost_factor).min(1.0);
        }

        let alignment_boost = scores.structure > p.alignment_structure_threshold
            && scores.color > p.alignment_color_threshold
            && scores.shape > p.alignment_shape_threshold;
        if alignment_boost {
            final_score = (final_score * p.alignment_boost_factor).min(1.0);
        }

        let mut quality_floor = false;
        if scores.structure > p.floor_structure_threshold && final_score < p.floor_trigger {
            let floor = scores.structure * p.floor_factor;
            if floor > final_score {
                final_score = floor;
                quality_floor = true;
            }
        }

        CombinedScore {
            combined,
            final_score: final_score.clamp(0.0, 1.0),
            structure_boost,
            alignment_boost,
            quality_floor,
        }
    }

    /// Build the result record for one comparison.
    ///
    /// When the structure stage reported an error the remaining scores are
    /// not trusted and an error result is returned instead.
    pub fn finish(&self, structure: MsSsimResult, color: f64, shape: f64) -> ComparisonResult {
        if let Some(error) = structure.error {
            return ComparisonResult::failed(error);
        }

        let scores = MetricScores::new(structure.ms_ssim, color, shape);
        let outcome = self.combine(scores);

        log::debug!(
            "Scores: structure {:.4}, color {:.4}, shape {:.4}, combined {:.4}, final {:.4}",
            scores.structure,
            scores.color,
            scores.shape,
            outcome.combined,
            outcome.final_score
        );

        ComparisonResult {
            ms_ssim: scores.structure,
            percentage: (outcome.final_score * 10_000.0).round() / 100.0,
            detailed_scores: Some(DetailedScores {
                structure: whole_percent(scores.structure),
                color: whole_percent(scores.color),
                shape: whole_percent(scores.shape),
                combined: whole_percent(outcome.combined),
                final_score: whole_percent(outcome.final_score),
            }),
            per_scale_scores: structure.per_scale_scores,
            weights_used: Some(self.weights),
            analysis: Some(Analysis::classify(scores, &outcome)),
            error: None,
        }
    }
}

fn whole_percent(score: f64) -> u32 {
    (score * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(ms_ssim: f64) -> MsSsimResult {
        MsSsimResult {
            ms_ssim,
            per_scale_scores: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn test_plain_weighted_sum() {
        let combiner = ScoreCombiner::default();
        let outcome = combiner.combine(MetricScores::new(0.5, 0.4, 0.2));

        assert!((outcome.combined - 0.43).abs() < 1e-12);
        assert!((outcome.final_score - 0.43).abs() < 1e-12);
        assert!(!outcome.structure_boost && !outcome.alignment_boost && !outcome.quality_floor);
    }

    #[test]
    fn test_both_boosts_apply_in_order() {
        let combiner = ScoreCombiner::default();
        let outcome = combiner.combine(MetricScores::new(0.8, 0.7, 0.6));

        // 0.745 * 1.10 * 1.05
        assert!((outcome.combined - 0.745).abs() < 1e-12);
        assert!((outcome.final_score - 0.860475).abs() < 1e-9);
        assert!(outcome.structure_boost && outcome.alignment_boost);
    }

    #[test]
    fn test_boosts_are_capped_at_one() {
        let combiner = ScoreCombiner::default();
        let outcome = combiner.combine(MetricScores::new(1.0, 1.0, 1.0));
        assert_eq!(outcome.final_score, 1.0);
    }

    #[test]
    fn test_quality_floor() {
        let combiner = ScoreCombiner::default();
        let outcome = combiner.combine(MetricScores::new(0.45, 0.0, 0.0));

        assert!((outcome.combined - 0.27).abs() < 1e-12);
        assert!((outcome.final_score - 0.3375).abs() < 1e-12);
        assert!(outcome.quality_floor);
        assert!(!outcome.structure_boost);
    }

    #[test]
    fn test_floor_not_applied_to_weak_structure() {
        let combiner = ScoreCombiner::default();
        let outcome = combiner.combine(MetricScores::new(0.4, 0.0, 0.0));
        assert!(!outcome.quality_floor);
        assert!((outcome.final_score - 0.24).abs() < 1e-12);
    }

    #[test]
    fn test_disabled_policy_keeps_combined() {
        let combiner = ScoreCombiner::new(ScoreWeights::default(), CorrectionPolicy::disabled());
        let outcome = combiner.combine(MetricScores::new(0.9, 0.9, 0.9));
        assert!((outcome.final_score - outcome.combined).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_inputs_are_zeroed() {
        let scores = MetricScores::new(f64::NAN, 2.0, -1.0);
        assert_eq!(scores, MetricScores::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_finish_builds_full_record() {
        let combiner = ScoreCombiner::default();
        let result = combiner.finish(structure(0.8), 0.8, 0.8);

        // 0.8 * 1.10 * 1.05
        assert!(result.error.is_none());
        assert!((result.percentage - 92.4).abs() < 1e-9);
        let detailed = result.detailed_scores.unwrap();
        assert_eq!(detailed.structure, 80);
        assert_eq!(detailed.color, 80);
        assert_eq!(detailed.shape, 80);
        assert_eq!(detailed.combined, 80);
        assert_eq!(detailed.final_score, 92);

        let analysis = result.analysis.unwrap();
        assert_eq!(analysis.structure_quality, StructureQuality::High);
        assert_eq!(analysis.color_alignment, Alignment::Good);
        assert_eq!(analysis.shape_alignment, Alignment::Good);
        assert!(analysis.enhancement_applied);
        assert_eq!(result.weights_used, Some(ScoreWeights::default()));
    }

    #[test]
    fn test_finish_short_circuits_on_upstream_error() {
        let combiner = ScoreCombiner::default();
        let failed = MsSsimResult {
            ms_ssim: 0.0,
            per_scale_scores: Vec::new(),
            error: Some("all scales failed".into()),
        };
        let result = combiner.finish(failed, 0.9, 0.9);

        assert_eq!(result.ms_ssim, 0.0);
        assert_eq!(result.percentage, 0.0);
        assert!(result.detailed_scores.is_none());
        assert_eq!(result.error.as_deref(), Some("all scales failed"));
    }
}
