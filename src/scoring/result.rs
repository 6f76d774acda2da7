//! Comparison result record handed to callers.

use serde::{Deserialize, Serialize};

use crate::config::ScoreWeights;
use crate::metrics::ScaleLevel;

use super::{CombinedScore, MetricScores};

/// Per-metric scores in whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedScores {
    /// Structure (MS-SSIM) score.
    pub structure: u32,
    /// Color histogram score.
    pub color: u32,
    /// Edge/shape score.
    pub shape: u32,
    /// Weighted combination before corrections.
    pub combined: u32,
    /// Score after corrections.
    #[serde(rename = "final")]
    pub final_score: u32,
}

/// Qualitative structure rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureQuality {
    /// Structure score above 0.7.
    High,
    /// Structure score above 0.4.
    Medium,
    /// Anything lower.
    Low,
}

impl StructureQuality {
    /// Classify a structure score.
    pub fn classify(score: f64) -> Self {
        if score > 0.7 {
            Self::High
        } else if score > 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Qualitative rating of the color or shape agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Above the "good" threshold.
    Good,
    /// Above the "fair" threshold.
    Fair,
    /// Anything lower.
    Poor,
}

impl Alignment {
    /// Color rating: good above 0.6, fair above 0.4.
    pub fn for_color(score: f64) -> Self {
        Self::classify(score, 0.6, 0.4)
    }

    /// Shape rating: good above 0.5, fair above 0.3.
    pub fn for_shape(score: f64) -> Self {
        Self::classify(score, 0.5, 0.3)
    }

    fn classify(score: f64, good: f64, fair: f64) -> Self {
        if score > good {
            Self::Good
        } else if score > fair {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for StructureQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Fair => write!(f, "fair"),
            Self::Poor => write!(f, "poor"),
        }
    }
}

/// Qualitative breakdown for feedback display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Structure rating.
    pub structure_quality: StructureQuality,
    /// Color rating.
    pub color_alignment: Alignment,
    /// Shape rating.
    pub shape_alignment: Alignment,
    /// Whether the structure or alignment boost fired.
    pub enhancement_applied: bool,
    /// Whether the quality floor raised the score.
    #[serde(default)]
    pub quality_floor_applied: bool,
}

impl Analysis {
    pub(crate) fn classify(scores: MetricScores, outcome: &CombinedScore) -> Self {
        Self {
            structure_quality: StructureQuality::classify(scores.structure),
            color_alignment: Alignment::for_color(scores.color),
            shape_alignment: Alignment::for_shape(scores.shape),
            enhancement_applied: outcome.structure_boost || outcome.alignment_boost,
            quality_floor_applied: outcome.quality_floor,
        }
    }
}

/// Outcome of one comparison. Created fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// MS-SSIM structure score, in `[0, 1]`.
    pub ms_ssim: f64,

    /// Final score in percent, two decimal places.
    pub percentage: f64,

    /// Per-metric scores in whole percent. Absent on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_scores: Option<DetailedScores>,

    /// One entry per pyramid level, finest first. Empty on error.
    #[serde(default)]
    pub per_scale_scores: Vec<ScaleLevel>,

    /// Metric weights that produced the score. Absent on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights_used: Option<ScoreWeights>,

    /// Qualitative breakdown. Absent on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,

    /// Why the comparison could not be scored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComparisonResult {
    /// Zero-score result carrying an error message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ms_ssim: 0.0,
            percentage: 0.0,
            detailed_scores: None,
            per_scale_scores: Vec::new(),
            weights_used: None,
            analysis: None,
            error: Some(error.into()),
        }
    }

    /// Whether the comparison failed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether the score reaches `threshold` percent.
    pub fn passes(&self, threshold: f64) -> bool {
        !self.is_error() && self.percentage >= threshold
    }

    /// Number of pyramid levels that fell back to global statistics.
    pub fn fallback_scales(&self) -> usize {
        self.per_scale_scores
            .iter()
            .filter(|s| s.used_fallback())
            .count()
    }
}

impl std::fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Similarity Report")?;
        writeln!(f, "=================")?;

        if let Some(ref error) = self.error {
            writeln!(f, "Error: {}", error)?;
            return Ok(());
        }

        writeln!(f, "Score: {:.2}%", self.percentage)?;
        writeln!(f, "MS-SSIM: {:.4}", self.ms_ssim)?;
        let fallbacks = self.fallback_scales();
        if fallbacks > 0 {
            writeln!(f, "Fallback levels: {}", fallbacks)?;
        }

        if let Some(d) = self.detailed_scores {
            writeln!(f)?;
            writeln!(f, "Scores:")?;
            writeln!(f, "  Structure: {}%", d.structure)?;
            writeln!(f, "  Color: {}%", d.color)?;
            writeln!(f, "  Shape: {}%", d.shape)?;
            writeln!(f, "  Combined: {}%", d.combined)?;
            writeln!(f, "  Final: {}%", d.final_score)?;
        }

        if let Some(a) = self.analysis {
            writeln!(f)?;
            writeln!(f, "Analysis:")?;
            writeln!(f, "  Structure quality: {}", a.structure_quality)?;
            writeln!(f, "  Color alignment: {}", a.color_alignment)?;
            writeln!(f, "  Shape alignment: {}", a.shape_alignment)?;
            if a.enhancement_applied {
                writeln!(f, "  Enhancement applied")?;
            }
            if a.quality_floor_applied {
                writeln!(f, "  Quality floor applied")?;
            }
        }

        if !self.per_scale_scores.is_empty() {
            writeln!(f)?;
            writeln!(f, "Scales:")?;
            for s in &self.per_scale_scores {
                write!(
                    f,
                    "  {}: {}x{} weight {:.4} SSIM {:.4}",
                    s.index, s.width, s.height, s.weight, s.ssim_score
                )?;
                match s.error {
                    Some(ref e) => writeln!(f, " (fallback: {})", e)?,
                    None => writeln!(f)?,
                }
            }
        }

        Ok(())
    }
}
