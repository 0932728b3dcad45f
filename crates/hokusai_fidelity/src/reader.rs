//! Blind reader stage: reconstructs the story from panels alone.
//!
//! The reader receives a [`ReaderView`](crate::ReaderView) and nothing else.
//! This is the invariant the whole pipeline rests on: a reader that can see
//! the ground truth reports perfect fidelity no matter how bad the panels
//! are, and the score stops meaning anything.

use crate::prompt;
use crate::stage::{Stage, StageBackend};
use crate::state::ReaderView;
use crate::story::{InferredMotivation, Reconstruction};
use hokusai_error::{HokusaiResult, JsonError};
use hokusai_interface::HokusaiDriver;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Fallback confidence when the model omits or garbles one, 0-100.
const DEFAULT_CONFIDENCE: f32 = 50.0;

/// Inferred motivation as the model reports it.
#[derive(Debug, Deserialize)]
struct RawInferredMotivation {
    #[serde(default)]
    apparent_goal: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Reader output as the model reports it, before normalization.
#[derive(Debug, Deserialize)]
struct RawReconstruction {
    #[serde(default)]
    reconstructed_story: Option<String>,
    #[serde(default)]
    inferred_motivations: BTreeMap<String, RawInferredMotivation>,
    #[serde(default)]
    inferred_conflicts: Vec<String>,
    #[serde(default)]
    unclear_elements: Vec<String>,
    #[serde(default)]
    overall_confidence: Option<f32>,
}

/// Reconstruct the story from the isolated view.
#[tracing::instrument(skip(backend, view), fields(panels = view.panels().len()))]
pub(crate) async fn reconstruct<D: HokusaiDriver>(
    backend: &StageBackend<'_, D>,
    view: &ReaderView,
) -> HokusaiResult<Reconstruction> {
    // Fatal if the view ever carries ground-truth keys.
    view.ensure_isolated();

    let panels_json = serde_json::to_string_pretty(view.panels())
        .map_err(|e| JsonError::new(format!("Failed to serialize panels: {}", e)))?;
    let characters_json = serde_json::to_string_pretty(view.characters())
        .map_err(|e| JsonError::new(format!("Failed to serialize character sheets: {}", e)))?;

    let rendered = prompt::render(
        prompt::READER,
        &[("panels", &panels_json), ("characters", &characters_json)],
    )?;

    let raw: RawReconstruction = backend.call(Stage::Reader, rendered).await?;
    Ok(normalize(raw))
}

/// Fill defaultable fields and clamp confidences.
///
/// A missing narrative is replaced with an explicit failure marker rather
/// than an error: an unreadable panel set is exactly what the evaluator
/// needs to see, and it will score accordingly.
fn normalize(raw: RawReconstruction) -> Reconstruction {
    let narrative = match raw
        .reconstructed_story
        .filter(|story| !story.trim().is_empty())
    {
        Some(story) => story,
        None => {
            warn!("Reader returned no reconstruction text");
            "Unable to reconstruct a story from the panels alone.".to_string()
        }
    };

    let mut motivations = BTreeMap::new();
    for (name, raw_motivation) in raw.inferred_motivations {
        let apparent_goal = match raw_motivation
            .apparent_goal
            .filter(|goal| !goal.trim().is_empty())
        {
            Some(goal) => goal,
            None => {
                warn!(character = %name, "Reader inferred a motivation without a goal");
                "Unknown".to_string()
            }
        };
        let confidence = raw_motivation
            .confidence
            .filter(|c| c.is_finite())
            .unwrap_or(DEFAULT_CONFIDENCE)
            .clamp(0.0, 100.0);
        motivations.insert(name, InferredMotivation::new(apparent_goal, confidence));
    }

    let overall = raw
        .overall_confidence
        .filter(|c| c.is_finite())
        .unwrap_or_else(|| {
            warn!("Reader returned no overall confidence");
            DEFAULT_CONFIDENCE
        })
        .clamp(0.0, 100.0);

    Reconstruction::new(
        narrative,
        motivations,
        raw.inferred_conflicts,
        raw.unclear_elements,
        overall / 100.0,
    )
}
