//! Ground-truth and reconstruction types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a character wants, why, and what stands in the way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters)]
pub struct Motivation {
    /// What the character wants to achieve
    goal: String,
    /// Why they want it
    reason: String,
    /// What stands in their way
    obstacle: String,
}

impl Motivation {
    /// Create a motivation.
    pub fn new(
        goal: impl Into<String>,
        reason: impl Into<String>,
        obstacle: impl Into<String>,
    ) -> Self {
        Self {
            goal: goal.into(),
            reason: reason.into(),
            obstacle: obstacle.into(),
        }
    }
}

/// The reference narrative every later stage is measured against.
///
/// Generated exactly once per run by the architect stage. Never passed, in
/// whole or in part, to the blind reader.
///
/// Motivations use a `BTreeMap` so prompt assembly iterates in a stable
/// order across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct GroundTruth {
    /// Full narrative text
    narrative: String,
    /// 3-5 sentence digest of the key events
    summary: String,
    /// Motivation per named character
    motivations: BTreeMap<String, Motivation>,
    /// Main conflicts driving the story
    conflicts: Vec<String>,
    /// Key plot beats in order
    plot_points: Vec<String>,
}

impl GroundTruth {
    /// Create a ground truth record.
    pub fn new(
        narrative: impl Into<String>,
        summary: impl Into<String>,
        motivations: BTreeMap<String, Motivation>,
        conflicts: Vec<String>,
        plot_points: Vec<String>,
    ) -> Self {
        Self {
            narrative: narrative.into(),
            summary: summary.into(),
            motivations,
            conflicts,
            plot_points,
        }
    }
}

/// What the blind reader believes a character wants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct InferredMotivation {
    /// The goal as inferred from panels alone; "Unknown" when unreadable
    apparent_goal: String,
    /// Self-reported confidence in this inference, 0-100
    confidence: f32,
}

impl InferredMotivation {
    /// Create an inferred motivation.
    pub fn new(apparent_goal: impl Into<String>, confidence: f32) -> Self {
        Self {
            apparent_goal: apparent_goal.into(),
            confidence,
        }
    }
}

/// The blind reader's independent interpretation of the panels.
///
/// Replaced each iteration. Confidence is self-reported and advisory only;
/// the evaluator records it for diagnostics but never scores with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Reconstruction {
    /// The reader's narrative interpretation
    narrative: String,
    /// Inferred motivation per character the reader could identify
    motivations: BTreeMap<String, InferredMotivation>,
    /// Conflicts the reader identified
    conflicts: Vec<String>,
    /// Elements the reader found confusing or ambiguous
    unclear: Vec<String>,
    /// Overall confidence in the interpretation, in [0, 1]
    confidence: f32,
}

impl Reconstruction {
    /// Create a reconstruction.
    pub fn new(
        narrative: impl Into<String>,
        motivations: BTreeMap<String, InferredMotivation>,
        conflicts: Vec<String>,
        unclear: Vec<String>,
        confidence: f32,
    ) -> Self {
        Self {
            narrative: narrative.into(),
            motivations,
            conflicts,
            unclear,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}
