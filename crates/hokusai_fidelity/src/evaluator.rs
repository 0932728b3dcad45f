//! Evaluator stage: compares ground truth to the reconstruction and scores
//! what survived.
//!
//! Scores from a generative judge are not exactly reproducible across calls
//! on identical input; the contract here is the shape of the report, the
//! clamping, and the locally enforced threshold, not bit-equal scores.

use crate::prompt;
use crate::report::{
    FidelityReport, GapCategory, GapSeverity, InformationGap, ScoreRubric,
};
use crate::stage::{Stage, StageBackend};
use crate::story::{GroundTruth, Reconstruction};
use hokusai_error::HokusaiResult;
use hokusai_interface::HokusaiDriver;
use serde::Deserialize;
use tracing::warn;

/// Fallback score when the model omits or garbles one.
const DEFAULT_SCORE: f32 = 50.0;

/// Gap as the model reports it, before normalization.
#[derive(Debug, Deserialize)]
struct RawGap {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    original_element: Option<String>,
    #[serde(default)]
    reader_interpretation: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    suggested_fix: Option<String>,
}

/// Evaluator output as the model reports it. The model's own `is_valid`
/// claim is deliberately not deserialized; the threshold comparison is
/// recomputed locally.
#[derive(Debug, Deserialize)]
struct RawEvaluation {
    #[serde(default)]
    fidelity_score: Option<f32>,
    #[serde(default)]
    gaps: Vec<RawGap>,
    #[serde(default)]
    critique: Option<String>,
}

/// Compare ground truth against the reconstruction.
#[tracing::instrument(skip(backend, ground_truth, reconstruction))]
pub(crate) async fn evaluate<D: HokusaiDriver>(
    backend: &StageBackend<'_, D>,
    ground_truth: &GroundTruth,
    reconstruction: &Reconstruction,
) -> HokusaiResult<FidelityReport> {
    let rubric = ScoreRubric::default();
    let motivations = prompt::format_motivations(ground_truth.motivations());
    let conflicts = prompt::format_bullets(ground_truth.conflicts(), "None defined.");
    let plot_points = prompt::format_numbered(ground_truth.plot_points(), "None defined.");
    let inferred_motivations =
        prompt::format_inferred_motivations(reconstruction.motivations());
    let inferred_conflicts =
        prompt::format_bullets(reconstruction.conflicts(), "None identified.");
    let unclear = prompt::format_bullets(reconstruction.unclear(), "None reported.");
    let reader_confidence = format!("{:.0}", reconstruction.confidence() * 100.0);

    let rendered = prompt::render(
        prompt::EVALUATOR,
        &[
            ("original_story", ground_truth.narrative()),
            ("story_summary", ground_truth.summary()),
            ("character_motivations", &motivations),
            ("key_conflicts", &conflicts),
            ("plot_points", &plot_points),
            ("reconstructed_story", reconstruction.narrative()),
            ("inferred_motivations", &inferred_motivations),
            ("inferred_conflicts", &inferred_conflicts),
            ("unclear_elements", &unclear),
            ("reader_confidence", &reader_confidence),
            ("weight_plot", &rubric.plot().to_string()),
            ("weight_motivation", &rubric.motivation().to_string()),
            ("weight_conflict", &rubric.conflict().to_string()),
            ("weight_emotion", &rubric.emotion().to_string()),
            ("weight_coherence", &rubric.coherence().to_string()),
        ],
    )?;

    let raw: RawEvaluation = backend.call(Stage::Evaluator, rendered).await?;
    Ok(normalize(
        raw,
        ground_truth,
        backend.config().score_threshold(),
    ))
}

/// Fill defaultable fields and rebuild the report with the local threshold.
fn normalize(raw: RawEvaluation, ground_truth: &GroundTruth, threshold: f32) -> FidelityReport {
    let score = raw
        .fidelity_score
        .filter(|s| s.is_finite())
        .unwrap_or_else(|| {
            warn!("Evaluator returned no usable score, assuming {}", DEFAULT_SCORE);
            DEFAULT_SCORE
        });

    let mut gaps: Vec<InformationGap> = raw.gaps.into_iter().map(normalize_gap).collect();

    // A ground truth with no conflicts cannot have had them conveyed; report
    // the absence deterministically instead of relying on the judge.
    if ground_truth.conflicts().is_empty() {
        gaps.push(InformationGap::new(
            GapCategory::Plot,
            "At least one explicit story conflict",
            "No conflicts were available to convey",
            GapSeverity::Major,
            "Stage the central tension directly: give it a panel whose visuals \
             and dialogue make the opposing pulls unmistakable",
        ));
    }

    let critique = match raw.critique.filter(|c| !c.trim().is_empty()) {
        Some(critique) => critique,
        None if gaps.is_empty() => {
            "The panels effectively convey the story. No significant gaps identified."
                .to_string()
        }
        None => synthesize_critique(&gaps),
    };

    FidelityReport::new(score, gaps, critique, threshold)
}

/// Apply lenient parsing and defaults to one gap.
fn normalize_gap(raw: RawGap) -> InformationGap {
    let category = match raw.category.as_deref().and_then(GapCategory::parse_lenient) {
        Some(category) => category,
        None => {
            warn!(category = ?raw.category, "Unrecognized gap category, defaulting to plot");
            GapCategory::Plot
        }
    };
    let severity = match raw.severity.as_deref().and_then(GapSeverity::parse_lenient) {
        Some(severity) => severity,
        None => {
            warn!(severity = ?raw.severity, "Unrecognized gap severity, defaulting to major");
            GapSeverity::Major
        }
    };
    InformationGap::new(
        category,
        raw.original_element
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "Unknown element".to_string()),
        raw.reader_interpretation
            .filter(|i| !i.trim().is_empty())
            .unwrap_or_else(|| "NOT DETECTED".to_string()),
        severity,
        raw.suggested_fix
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| "Clarify this element in the panels".to_string()),
    )
}

/// Build a critique from the gaps when the model did not provide one.
fn synthesize_critique(gaps: &[InformationGap]) -> String {
    let mut lines = vec!["REVISION NEEDED - The following gaps were identified:".to_string()];

    for (severity, heading) in [
        (GapSeverity::Critical, "CRITICAL ISSUES (must fix):"),
        (GapSeverity::Major, "MAJOR ISSUES (should fix):"),
        (GapSeverity::Minor, "MINOR ISSUES (nice to fix):"),
    ] {
        let matching: Vec<&InformationGap> =
            gaps.iter().filter(|gap| *gap.severity() == severity).collect();
        if matching.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(heading.to_string());
        for gap in matching {
            lines.push(format!("  - [{}] {}", gap.category(), gap.original_element()));
            if severity != GapSeverity::Minor {
                lines.push(format!("    Fix: {}", gap.suggested_fix()));
            }
        }
    }

    lines.join("\n")
}
