//! Scripter stage: converts the story into panels, and revises them under
//! evaluator critique.
//!
//! Revision may only change how information is presented: visual cues,
//! dialogue, framing. The story itself is fixed by the ground truth. That
//! rule is carried by the prompt, not by structure; drift shows up as
//! plot-category gaps at the next evaluation.

use crate::panel::{self, CharacterSheet, DialogueLine, PanelSpec, ShotFraming};
use crate::prompt;
use crate::report::FidelityReport;
use crate::stage::{Stage, StageBackend};
use crate::story::{GroundTruth, Motivation};
use hokusai_error::{HokusaiResult, JsonError, PipelineError, PipelineErrorKind};
use hokusai_interface::HokusaiDriver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Dialogue entry as the model reports it.
#[derive(Debug, Deserialize)]
struct RawDialogue {
    #[serde(default)]
    character: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Panel as the model reports it, before normalization.
#[derive(Debug, Deserialize)]
struct RawPanel {
    #[serde(default)]
    panel_number: Option<u32>,
    #[serde(default)]
    visual_description: Option<String>,
    #[serde(default)]
    dialogue: Vec<RawDialogue>,
    #[serde(default)]
    shot_type: Option<String>,
    #[serde(default)]
    environment: Option<String>,
}

/// Character sheet as the model reports it.
#[derive(Debug, Deserialize)]
struct RawCharacter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    visual_description: Option<String>,
}

/// Full scripter output as the model reports it.
#[derive(Debug, Deserialize)]
struct RawScript {
    #[serde(default)]
    characters: Vec<RawCharacter>,
    #[serde(default)]
    panels: Vec<RawPanel>,
}

/// The current script rendered back into the revision prompt.
#[derive(Serialize)]
struct ScriptSnapshot<'a> {
    characters: &'a [CharacterSheet],
    panels: &'a [PanelSpec],
}

/// Initial conversion: story to panels.
#[tracing::instrument(skip(backend, ground_truth))]
pub(crate) async fn convert<D: HokusaiDriver>(
    backend: &StageBackend<'_, D>,
    ground_truth: &GroundTruth,
) -> HokusaiResult<(Vec<CharacterSheet>, Vec<PanelSpec>)> {
    let min_visual = backend.config().min_visual_chars().to_string();
    let motivations = prompt::format_motivations(ground_truth.motivations());
    let conflicts = prompt::format_bullets(ground_truth.conflicts(), "None defined.");
    let rendered = prompt::render(
        prompt::SCRIPTER_INITIAL,
        &[
            ("story", ground_truth.narrative()),
            ("character_motivations", &motivations),
            ("key_conflicts", &conflicts),
            ("min_visual", &min_visual),
        ],
    )?;

    let raw: RawScript = backend.call(Stage::Scripter, rendered).await?;
    normalize_script(raw, backend.config().min_visual_chars())
}

/// Revision: close the report's gaps without touching the story.
#[tracing::instrument(
    skip(backend, panels, characters, report, motivations),
    fields(gaps = report.gaps().len(), panels = panels.len())
)]
pub(crate) async fn revise<D: HokusaiDriver>(
    backend: &StageBackend<'_, D>,
    panels: &[PanelSpec],
    characters: &[CharacterSheet],
    report: &FidelityReport,
    motivations: &BTreeMap<String, Motivation>,
) -> HokusaiResult<(Vec<CharacterSheet>, Vec<PanelSpec>)> {
    let snapshot = ScriptSnapshot { characters, panels };
    let current_script = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| JsonError::new(format!("Failed to serialize current script: {}", e)))?;

    let min_visual = backend.config().min_visual_chars().to_string();
    let gaps = prompt::format_gaps(report.gaps());
    let motivations_text = prompt::format_motivations(motivations);
    let rendered = prompt::render(
        prompt::SCRIPTER_REVISION,
        &[
            ("critique", report.critique()),
            ("specific_gaps", &gaps),
            ("current_script", &current_script),
            ("character_motivations", &motivations_text),
            ("min_visual", &min_visual),
        ],
    )?;

    let raw: RawScript = backend.call(Stage::Scripter, rendered).await?;
    let (revised_characters, revised_panels) =
        normalize_script(raw, backend.config().min_visual_chars())?;

    if revised_panels == panels && !report.critique().is_empty() {
        warn!("Revision returned panels identical to the previous iteration");
    }

    Ok((revised_characters, revised_panels))
}

/// Fill defaultable fields, renumber, and validate the panel contract.
///
/// Renumbering and shot-framing fallback are logged default fills. An empty
/// panel list, an empty visual description, or a too-short visual
/// description fail the stage: fabricating what the reader sees would be
/// inventing plot.
fn normalize_script(
    raw: RawScript,
    min_visual_chars: usize,
) -> HokusaiResult<(Vec<CharacterSheet>, Vec<PanelSpec>)> {
    if raw.panels.is_empty() {
        return Err(PipelineError::new(PipelineErrorKind::EmptyPanelList).into());
    }

    let mut characters = Vec::with_capacity(raw.characters.len());
    for raw_character in raw.characters {
        let name = match raw_character.name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name,
            None => {
                warn!("Scripter returned a character without a name");
                "Unknown".to_string()
            }
        };
        let visual = match raw_character
            .visual_description
            .filter(|v| !v.trim().is_empty())
        {
            Some(visual) => visual,
            None => {
                warn!(character = %name, "Scripter returned a character without appearance");
                format!("A character named {}", name)
            }
        };
        characters.push(CharacterSheet::new(name, visual));
    }

    let mut panels = Vec::with_capacity(raw.panels.len());
    for (position, raw_panel) in raw.panels.into_iter().enumerate() {
        let index = position as u32 + 1;
        if raw_panel.panel_number != Some(index) {
            debug!(
                reported = ?raw_panel.panel_number,
                assigned = index,
                "Renumbering panel to keep the sequence contiguous"
            );
        }

        let visual = raw_panel
            .visual_description
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::new(PipelineErrorKind::EmptyVisualDescription(index))
            })?;

        let mut dialogue = Vec::new();
        for entry in raw_panel.dialogue {
            match (entry.character, entry.text) {
                (Some(speaker), Some(line))
                    if !speaker.trim().is_empty() && !line.trim().is_empty() =>
                {
                    dialogue.push(DialogueLine::new(speaker, line));
                }
                _ => warn!(panel = index, "Dropping malformed dialogue entry"),
            }
        }

        let shot = match raw_panel.shot_type.as_deref() {
            Some(text) => match ShotFraming::parse_lenient(text) {
                Some(shot) => shot,
                None => {
                    debug!(panel = index, shot = %text, "Unrecognized shot type, defaulting");
                    ShotFraming::default()
                }
            },
            None => ShotFraming::default(),
        };

        panels.push(PanelSpec::new(
            index,
            visual,
            dialogue,
            shot,
            raw_panel.environment.unwrap_or_default(),
        ));
    }

    panel::validate_sequence(&panels, min_visual_chars)?;
    Ok((characters, panels))
}
