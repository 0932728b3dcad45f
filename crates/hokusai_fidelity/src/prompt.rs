//! Prompt templates and assembly for the pipeline stages.
//!
//! Templates use `{{name}}` placeholders. [`render`] substitutes values and
//! rejects any template with a placeholder left unresolved, so a missing
//! variable fails the stage instead of leaking template syntax to the model.

use crate::{InformationGap, InferredMotivation, Motivation};
use hokusai_error::{ConfigError, HokusaiResult, PipelineError, PipelineErrorKind};
use std::collections::BTreeMap;

/// Architect stage: seed to ground-truth story.
pub(crate) const ARCHITECT: &str = r#"You are a story architect writing a complete short narrative.

Seed idea: "{{seed}}"

Write a full one-page story (400-600 words) that satisfies all of the following:

1. For every named character, establish explicitly:
   - their goal (what they want)
   - their reason (why they want it)
   - their obstacle (what stands in the way)
2. Drive the narrative through 5-7 distinct plot beats.
3. Include at least one internal conflict (doubt, fear, a moral dilemma) and
   at least one external conflict (another character, the environment, or
   circumstance).
4. Mark clear moments where emotion shifts or intensifies.
5. Write scenes that can be drawn: no internal monologue that could not be
   conveyed through visuals and dialogue.

Respond with only a JSON object in this exact shape:
{
    "story": "<full narrative text, 400-600 words>",
    "summary": "<3-5 sentence summary of the key events>",
    "character_motivations": {
        "<character name>": {
            "goal": "<what they want>",
            "motivation": "<why they want it>",
            "obstacle": "<what stands in their way>"
        }
    },
    "key_conflicts": ["<conflict description>", "..."],
    "plot_points": ["<beat 1>", "<beat 2>", "..."]
}

All JSON must be valid and properly escaped."#;

/// Scripter stage, initial conversion: story to panels.
pub(crate) const SCRIPTER_INITIAL: &str = r#"You are a webtoon scripter converting a story into visual panels.

STORY:
{{story}}

CHARACTER MOTIVATIONS (each must be evident from the panels):
{{character_motivations}}

KEY CONFLICTS (each must be visible in at least one panel):
{{key_conflicts}}

---

Produce a script of 8-12 panels. For every panel:

1. Visual description, at least {{min_visual}} characters: what the reader
   SEES. Describe facial expressions, body language, and environmental
   detail that carry the emotion; never narrate what a character thinks.
2. Dialogue: what characters SAY, used to reveal motivation, advance plot,
   and show relationships. A panel may have no dialogue.
3. Shot type: Close-up for reactions, Medium Shot for interaction,
   Wide Shot for establishing moments, Bird's Eye or Low Angle when the
   staging calls for it.

Show, do not tell. Anger is clenched fists and a set jaw, not the word
"angry" in a caption.

Respond with only a JSON object in this exact shape:
{
    "characters": [
        {
            "name": "<character name>",
            "visual_description": "<appearance detailed enough for art generation, 100+ chars>"
        }
    ],
    "panels": [
        {
            "panel_number": 1,
            "visual_description": "<what the reader sees, {{min_visual}}+ chars>",
            "dialogue": [
                {"character": "<name>", "text": "<spoken line>"}
            ],
            "shot_type": "<Close-up|Medium Shot|Wide Shot|Bird's Eye|Low Angle>",
            "environment": "<location or setting>"
        }
    ]
}"#;

/// Scripter stage, revision mode: close gaps without changing the story.
pub(crate) const SCRIPTER_REVISION: &str = r#"You are revising webtoon panels after feedback from a blind reader
(someone who saw only the panels, never the original story) and an
evaluator comparing the two.

EVALUATOR CRITIQUE:
{{critique}}

SPECIFIC GAPS TO CLOSE:
{{specific_gaps}}

---

CURRENT SCRIPT:
{{current_script}}

CHARACTER MOTIVATIONS (each must remain evident):
{{character_motivations}}

---

Revision rules:
1. Do NOT change the story. Only change HOW it is presented: visual cues,
   added or reworded dialogue, framing, environmental detail. Add a panel
   only when a critical gap cannot be closed inside an existing one.
2. Close every gap listed above through presentation, not new plot.
3. Keep every visual description at or above {{min_visual}} characters.
4. Return the COMPLETE revised script: all panels, not only the changed ones.

Respond with only a JSON object in this exact shape:
{
    "characters": [
        {
            "name": "<character name>",
            "visual_description": "<appearance, 100+ chars>"
        }
    ],
    "panels": [
        {
            "panel_number": 1,
            "visual_description": "<what the reader sees, {{min_visual}}+ chars>",
            "dialogue": [
                {"character": "<name>", "text": "<spoken line>"}
            ],
            "shot_type": "<Close-up|Medium Shot|Wide Shot|Bird's Eye|Low Angle>",
            "environment": "<location or setting>"
        }
    ]
}"#;

/// Blind reader stage: panels to independent reconstruction.
pub(crate) const READER: &str = r#"You have never seen the story these panels were drawn from. You can see
ONLY the panels and character sheets below.

===== PANELS =====
{{panels}}

===== CHARACTER SHEETS =====
{{characters}}

===== TASK =====
Working only from what is visible and spoken in the panels:

1. Reconstruct the plot as a narrative summary (100-300 words), as
   detailed as the panels allow.
2. For each character you can identify, state what they appear to want and
   your confidence in that reading (0-100). Use "Unknown" when the panels
   give you nothing.
3. List the conflicts or tensions you can identify.
4. List anything confusing, ambiguous, or unreadable from the panels alone.
5. Give your overall confidence in the interpretation (0-100).

Be honest about what you cannot tell. Your value is in exposing what the
panels fail to convey, not in guessing well.

Respond with only a JSON object in this exact shape:
{
    "reconstructed_story": "<your interpretation, 100-300 words>",
    "inferred_motivations": {
        "<character name>": {
            "apparent_goal": "<what they seem to want>",
            "confidence": 0
        }
    },
    "inferred_conflicts": ["<conflict>", "..."],
    "unclear_elements": ["<confusing element>", "..."],
    "overall_confidence": 0
}"#;

/// Evaluator stage: ground truth vs. reconstruction.
pub(crate) const EVALUATOR: &str = r#"You are comparing an ORIGINAL story against a READER'S reconstruction.
The reader saw only the webtoon panels, never the original text. Identify
what was lost or distorted in translation.

===== ORIGINAL STORY =====
{{original_story}}

===== ORIGINAL SUMMARY =====
{{story_summary}}

===== ORIGINAL CHARACTER MOTIVATIONS =====
{{character_motivations}}

===== ORIGINAL KEY CONFLICTS =====
{{key_conflicts}}

===== ORIGINAL PLOT POINTS =====
{{plot_points}}

===== READER'S RECONSTRUCTION =====
{{reconstructed_story}}

===== READER'S INFERRED MOTIVATIONS =====
{{inferred_motivations}}

===== READER'S INFERRED CONFLICTS =====
{{inferred_conflicts}}

===== READER'S UNCLEAR ELEMENTS =====
{{unclear_elements}}

===== READER'S SELF-REPORTED CONFIDENCE =====
{{reader_confidence}}% (advisory only; do not score with it)

---

TASK:

1. Score fidelity 0-100 as a weighted sum. An element counts as recovered
   when the reconstruction conveys the same meaning, not the same words.
   - plot accuracy: {{weight_plot}} points
   - motivation clarity: {{weight_motivation}} points
   - conflict recognition: {{weight_conflict}} points
   - emotional-beat capture: {{weight_emotion}} points
   - overall coherence: {{weight_coherence}} points

2. For every original element the reader missed or materially
   misunderstood, report one gap:
   - category: plot, motivation, emotion, relationship, or conflict
   - severity: critical (story breaks without it), major (a specific
     motivation or conflict is misread), minor (detail-level)
   - a suggested fix phrased as a PRESENTATION change (a visual cue or
     dialogue addition), never a plot change.

3. Write a critique for the scripter (100-300 words): specific, ordered by
   severity, each point actionable.

Respond with only a JSON object in this exact shape:
{
    "fidelity_score": 0,
    "gaps": [
        {
            "category": "<plot|motivation|emotion|relationship|conflict>",
            "original_element": "<what the original established>",
            "reader_interpretation": "<what the reader understood, or 'NOT DETECTED'>",
            "severity": "<critical|major|minor>",
            "suggested_fix": "<presentation change that closes the gap>"
        }
    ],
    "critique": "<feedback for the scripter>"
}"#;

/// Substitute `{{name}}` placeholders and reject unresolved ones.
///
/// # Errors
///
/// Returns an error when a placeholder survives substitution.
pub(crate) fn render(template: &str, vars: &[(&str, &str)]) -> HokusaiResult<String> {
    let mut rendered = template.to_string();
    for (key, value) in vars {
        rendered = rendered.replace(&format!("{{{{{}}}}}", key), value);
    }

    let leftover = regex::Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}")
        .map_err(|e| ConfigError::new(format!("Invalid placeholder pattern: {}", e)))?;
    if let Some(cap) = leftover.captures(&rendered) {
        return Err(PipelineError::new(PipelineErrorKind::UnresolvedPlaceholder(
            cap[1].to_string(),
        ))
        .into());
    }
    Ok(rendered)
}

/// Render ground-truth motivations for a prompt.
pub(crate) fn format_motivations(motivations: &BTreeMap<String, Motivation>) -> String {
    if motivations.is_empty() {
        return "No character motivations defined.".to_string();
    }
    let mut lines = Vec::new();
    for (name, motivation) in motivations {
        lines.push(format!("- {}:", name));
        lines.push(format!("  Goal: {}", motivation.goal()));
        lines.push(format!("  Why: {}", motivation.reason()));
        lines.push(format!("  Obstacle: {}", motivation.obstacle()));
    }
    lines.join("\n")
}

/// Render the reader's inferred motivations for the evaluator prompt.
pub(crate) fn format_inferred_motivations(
    motivations: &BTreeMap<String, InferredMotivation>,
) -> String {
    if motivations.is_empty() {
        return "No motivations inferred.".to_string();
    }
    motivations
        .iter()
        .map(|(name, inferred)| {
            format!(
                "- {}: {} (confidence: {:.0}%)",
                name,
                inferred.apparent_goal(),
                inferred.confidence()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a bullet list, with a fallback line when empty.
pub(crate) fn format_bullets(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        return fallback.to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a numbered list, with a fallback line when empty.
pub(crate) fn format_numbered(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        return fallback.to_string();
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render gaps for the revision prompt.
pub(crate) fn format_gaps(gaps: &[InformationGap]) -> String {
    if gaps.is_empty() {
        return "No specific gaps identified.".to_string();
    }
    let mut lines = Vec::new();
    for (i, gap) in gaps.iter().enumerate() {
        lines.push(format!(
            "\n{}. [{}] {} gap:",
            i + 1,
            gap.severity().to_string().to_uppercase(),
            gap.category()
        ));
        lines.push(format!("   Original: {}", gap.original_element()));
        lines.push(format!("   Reader saw: {}", gap.reader_interpretation()));
        lines.push(format!("   Fix: {}", gap.suggested_fix()));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GapCategory, GapSeverity};

    #[test]
    fn render_substitutes_placeholders() {
        let rendered = render("Seed: {{seed}}!", &[("seed", "two classmates")]).unwrap();
        assert_eq!(rendered, "Seed: two classmates!");
    }

    #[test]
    fn render_rejects_unresolved_placeholders() {
        let err = render(ARCHITECT, &[]).unwrap_err();
        assert!(format!("{}", err).contains("seed"));
    }

    #[test]
    fn json_braces_in_templates_are_not_placeholders() {
        // The JSON shape blocks inside templates must survive rendering.
        let rendered = render(ARCHITECT, &[("seed", "x")]).unwrap();
        assert!(rendered.contains("\"character_motivations\""));
    }

    #[test]
    fn all_templates_render_with_full_variable_sets() {
        render(SCRIPTER_INITIAL, &[
            ("story", "s"),
            ("character_motivations", "m"),
            ("key_conflicts", "c"),
            ("min_visual", "150"),
        ])
        .unwrap();
        render(SCRIPTER_REVISION, &[
            ("critique", "c"),
            ("specific_gaps", "g"),
            ("current_script", "p"),
            ("character_motivations", "m"),
            ("min_visual", "150"),
        ])
        .unwrap();
        render(READER, &[("panels", "p"), ("characters", "c")]).unwrap();
        render(EVALUATOR, &[
            ("original_story", "o"),
            ("story_summary", "s"),
            ("character_motivations", "m"),
            ("key_conflicts", "k"),
            ("plot_points", "p"),
            ("reconstructed_story", "r"),
            ("inferred_motivations", "im"),
            ("inferred_conflicts", "ic"),
            ("unclear_elements", "u"),
            ("reader_confidence", "55"),
            ("weight_plot", "30"),
            ("weight_motivation", "25"),
            ("weight_conflict", "20"),
            ("weight_emotion", "15"),
            ("weight_coherence", "10"),
        ])
        .unwrap();
    }

    #[test]
    fn bullet_and_numbered_fallbacks() {
        assert_eq!(format_bullets(&[], "None identified"), "None identified");
        assert_eq!(format_numbered(&[], "None"), "None");
        let items = vec!["first".to_string(), "second".to_string()];
        assert_eq!(format_bullets(&items, ""), "- first\n- second");
        assert_eq!(format_numbered(&items, ""), "1. first\n2. second");
    }

    #[test]
    fn gap_formatting_includes_severity_and_fix() {
        let gaps = vec![InformationGap::new(
            GapCategory::Motivation,
            "Mina paints to honor her sister",
            "NOT DETECTED",
            GapSeverity::Critical,
            "Add a close-up of the photo taped inside her paint box",
        )];
        let text = format_gaps(&gaps);
        assert!(text.contains("[CRITICAL] motivation gap:"));
        assert!(text.contains("paint box"));
    }
}
