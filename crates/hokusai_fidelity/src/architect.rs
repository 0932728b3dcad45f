//! Architect stage: generates the ground-truth story from a seed.
//!
//! Runs exactly once per run, never re-invoked during revision.

use crate::stage::{Stage, StageBackend};
use crate::story::{GroundTruth, Motivation};
use crate::prompt;
use hokusai_error::{HokusaiResult, PipelineError, PipelineErrorKind};
use hokusai_interface::HokusaiDriver;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Motivation as the model reports it, before normalization.
#[derive(Debug, Deserialize)]
struct RawMotivation {
    #[serde(default)]
    goal: Option<String>,
    #[serde(default)]
    motivation: Option<String>,
    #[serde(default)]
    obstacle: Option<String>,
}

/// Architect output as the model reports it, before normalization.
#[derive(Debug, Deserialize)]
struct RawArchitectOutput {
    #[serde(default)]
    story: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    character_motivations: BTreeMap<String, RawMotivation>,
    #[serde(default)]
    key_conflicts: Vec<String>,
    #[serde(default)]
    plot_points: Vec<String>,
}

/// Generate the ground truth for a run.
#[tracing::instrument(skip(backend, seed), fields(seed_chars = seed.len()))]
pub(crate) async fn generate<D: HokusaiDriver>(
    backend: &StageBackend<'_, D>,
    seed: &str,
) -> HokusaiResult<GroundTruth> {
    let rendered = prompt::render(prompt::ARCHITECT, &[("seed", seed)])?;
    let raw: RawArchitectOutput = backend.call(Stage::Architect, rendered).await?;
    normalize(raw)
}

/// Fill defaultable fields and validate the rest.
///
/// A missing narrative has no safe default and fails the stage. A missing
/// summary is derived from the narrative's leading sentences. Missing
/// motivation sub-fields are marked "Unknown" with a log. An empty conflict
/// list is a data-quality condition, not a failure: the run proceeds and
/// the evaluator reports the absence as a plot-category gap.
fn normalize(raw: RawArchitectOutput) -> HokusaiResult<GroundTruth> {
    let narrative = raw
        .story
        .filter(|story| !story.trim().is_empty())
        .ok_or_else(|| PipelineError::new(PipelineErrorKind::MissingNarrative))?;

    let summary = match raw.summary.filter(|s| !s.trim().is_empty()) {
        Some(summary) => summary,
        None => {
            warn!("Architect returned no summary, deriving one from the narrative");
            leading_sentences(&narrative, 3)
        }
    };

    let mut motivations = BTreeMap::new();
    for (name, raw_motivation) in raw.character_motivations {
        let motivation = Motivation::new(
            field_or_unknown(raw_motivation.goal, &name, "goal"),
            field_or_unknown(raw_motivation.motivation, &name, "motivation"),
            field_or_unknown(raw_motivation.obstacle, &name, "obstacle"),
        );
        motivations.insert(name, motivation);
    }
    if motivations.is_empty() {
        warn!("Architect returned no character motivations");
    }

    if raw.key_conflicts.is_empty() {
        warn!("Architect returned no conflicts; evaluator will flag this as a plot gap");
    }
    if raw.plot_points.is_empty() {
        warn!("Architect returned no plot points");
    }

    Ok(GroundTruth::new(
        narrative,
        summary,
        motivations,
        raw.key_conflicts,
        raw.plot_points,
    ))
}

fn field_or_unknown(value: Option<String>, character: &str, field: &str) -> String {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(value) => value,
        None => {
            warn!(character, field, "Architect left a motivation field empty");
            "Unknown".to_string()
        }
    }
}

/// First `count` sentences of a text, as a crude summary fallback.
fn leading_sentences(text: &str, count: usize) -> String {
    let mut summary: String = text
        .split_inclusive('.')
        .take(count)
        .collect::<String>()
        .trim()
        .to_string();
    if summary.is_empty() {
        summary = text.chars().take(240).collect();
    }
    summary
}
