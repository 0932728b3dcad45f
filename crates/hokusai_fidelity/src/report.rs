//! Fidelity reports: scores, information gaps, iteration records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of meaning lost between ground truth and reconstruction.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GapCategory {
    /// Key events the reader missed
    Plot,
    /// Character goals the reader did not understand
    Motivation,
    /// Emotional beats that were not conveyed
    Emotion,
    /// Character relationships that stayed unclear
    Relationship,
    /// Tensions that were not apparent
    Conflict,
}

impl GapCategory {
    /// Map free-text category from model output onto a variant.
    pub fn parse_lenient(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "plot" => Some(Self::Plot),
            "motivation" => Some(Self::Motivation),
            "emotion" => Some(Self::Emotion),
            "relationship" => Some(Self::Relationship),
            "conflict" => Some(Self::Conflict),
            _ => None,
        }
    }
}

/// How badly a gap damages comprehension.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GapSeverity {
    /// The story does not make sense without this element
    Critical,
    /// Significant misunderstanding of a specific motivation or conflict
    Major,
    /// Stylistic or detail-level omission
    Minor,
}

impl GapSeverity {
    /// Map free-text severity from model output onto a variant.
    pub fn parse_lenient(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "major" => Some(Self::Major),
            "minor" => Some(Self::Minor),
            _ => None,
        }
    }
}

/// One discrepancy between what the ground truth intended and what the
/// reconstruction understood.
///
/// The suggested remedy is always phrased as a presentation change (visual
/// cue, dialogue, framing), never a plot change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct InformationGap {
    /// Kind of meaning lost
    category: GapCategory,
    /// The element as it exists in the ground truth
    original_element: String,
    /// What the reader understood, or "NOT DETECTED"
    reader_interpretation: String,
    /// Damage to comprehension
    severity: GapSeverity,
    /// How the scripter should close this gap
    suggested_fix: String,
}

impl InformationGap {
    /// Create an information gap.
    pub fn new(
        category: GapCategory,
        original_element: impl Into<String>,
        reader_interpretation: impl Into<String>,
        severity: GapSeverity,
        suggested_fix: impl Into<String>,
    ) -> Self {
        Self {
            category,
            original_element: original_element.into(),
            reader_interpretation: reader_interpretation.into(),
            severity,
            suggested_fix: suggested_fix.into(),
        }
    }
}

/// Category weights for the fidelity score. Weights sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ScoreRubric {
    /// Weight for plot accuracy
    plot: u32,
    /// Weight for motivation clarity
    motivation: u32,
    /// Weight for conflict recognition
    conflict: u32,
    /// Weight for emotional-beat capture
    emotion: u32,
    /// Weight for overall coherence
    coherence: u32,
}

impl Default for ScoreRubric {
    fn default() -> Self {
        Self {
            plot: 30,
            motivation: 25,
            conflict: 20,
            emotion: 15,
            coherence: 10,
        }
    }
}

impl ScoreRubric {
    /// Sum of all weights.
    pub fn total(&self) -> u32 {
        self.plot + self.motivation + self.conflict + self.emotion + self.coherence
    }
}

/// Outcome of one evaluator pass.
///
/// Created fresh each iteration; prior reports survive only in the run
/// history. The threshold comparison is performed here, never trusted from
/// model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct FidelityReport {
    /// Weighted score, clamped to [0, 100]
    score: f32,
    /// Whether the score met the configured threshold
    #[getter(skip)]
    is_valid: bool,
    /// Gaps found, ordered as the evaluator reported them
    gaps: Vec<InformationGap>,
    /// Actionable feedback aimed at the scripter
    critique: String,
}

impl FidelityReport {
    /// Create a report, clamping the score and applying the threshold.
    ///
    /// # Examples
    ///
    /// ```
    /// use hokusai_fidelity::FidelityReport;
    ///
    /// let report = FidelityReport::new(85.0, Vec::new(), "Clear enough.".to_string(), 80.0);
    /// assert!(report.is_valid());
    ///
    /// let report = FidelityReport::new(62.0, Vec::new(), String::new(), 80.0);
    /// assert!(!report.is_valid());
    /// ```
    pub fn new(score: f32, gaps: Vec<InformationGap>, critique: String, threshold: f32) -> Self {
        let score = score.clamp(0.0, 100.0);
        Self {
            score,
            is_valid: score >= threshold,
            gaps,
            critique,
        }
    }

    /// Whether the score met the threshold this report was built with.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }
}

/// Immutable snapshot of one completed iteration.
///
/// Appended to the run history after each evaluator call and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct IterationRecord {
    /// Iteration number, 1-based
    iteration: u32,
    /// Fidelity score for this iteration
    score: f32,
    /// Number of gaps identified
    gap_count: usize,
    /// Critique given to the scripter
    critique: String,
    /// The reader's self-reported confidence, in [0, 1]
    reader_confidence: f32,
    /// When this iteration completed
    completed_at: DateTime<Utc>,
}

impl IterationRecord {
    /// Create an iteration record stamped with the current time.
    pub fn new(
        iteration: u32,
        score: f32,
        gap_count: usize,
        critique: impl Into<String>,
        reader_confidence: f32,
    ) -> Self {
        Self {
            iteration,
            score,
            gap_count,
            critique: critique.into(),
            reader_confidence,
            completed_at: Utc::now(),
        }
    }
}
