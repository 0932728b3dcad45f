//! Presentation unit types: panels, dialogue, framing, character sheets.

use hokusai_error::{HokusaiResult, PipelineError, PipelineErrorKind};
use serde::{Deserialize, Serialize};

/// Camera framing for a panel.
///
/// Model output is free text; use [`ShotFraming::parse_lenient`] to map it
/// onto a variant, falling back to [`ShotFraming::Medium`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
pub enum ShotFraming {
    /// Tight framing on a face or detail, for reactions and emotional beats
    #[serde(rename = "Close-up")]
    #[strum(serialize = "Close-up")]
    CloseUp,
    /// Standard framing for dialogue and character interaction
    #[default]
    #[serde(rename = "Medium Shot")]
    #[strum(serialize = "Medium Shot")]
    Medium,
    /// Establishing shots and action sequences
    #[serde(rename = "Wide Shot")]
    #[strum(serialize = "Wide Shot")]
    Wide,
    /// Overhead view
    #[serde(rename = "Bird's Eye")]
    #[strum(serialize = "Bird's Eye")]
    BirdsEye,
    /// Upward-looking view
    #[serde(rename = "Low Angle")]
    #[strum(serialize = "Low Angle")]
    LowAngle,
}

impl ShotFraming {
    /// Map free-text framing from model output onto a variant.
    ///
    /// Returns `None` when the text matches nothing recognizable; callers
    /// decide the fallback (the scripter defaults to `Medium` with a log).
    ///
    /// # Examples
    ///
    /// ```
    /// use hokusai_fidelity::ShotFraming;
    ///
    /// assert_eq!(ShotFraming::parse_lenient("close-up"), Some(ShotFraming::CloseUp));
    /// assert_eq!(ShotFraming::parse_lenient("extreme wide"), Some(ShotFraming::Wide));
    /// assert_eq!(ShotFraming::parse_lenient("dutch tilt"), None);
    /// ```
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let lowered = text.trim().to_ascii_lowercase();
        if lowered.contains("close") {
            Some(Self::CloseUp)
        } else if lowered.contains("wide") || lowered.contains("establish") {
            Some(Self::Wide)
        } else if lowered.contains("bird") || lowered.contains("overhead") {
            Some(Self::BirdsEye)
        } else if lowered.contains("low") {
            Some(Self::LowAngle)
        } else if lowered.contains("medium") || lowered.contains("mid") {
            Some(Self::Medium)
        } else {
            None
        }
    }
}

/// One spoken line inside a panel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters)]
pub struct DialogueLine {
    /// Who speaks
    speaker: String,
    /// What they say
    line: String,
}

impl DialogueLine {
    /// Create a dialogue line.
    pub fn new(speaker: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            line: line.into(),
        }
    }
}

/// One presentation unit: what a reader sees and reads in a single panel.
///
/// Panels are owned by a pipeline run and replaced wholesale on revision;
/// there is no partial in-place editing from outside the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct PanelSpec {
    /// 1-based position in the panel sequence, contiguous and unique
    index: u32,
    /// What the reader sees (non-empty, minimum length configurable)
    visual: String,
    /// Spoken lines, possibly empty
    dialogue: Vec<DialogueLine>,
    /// Camera framing
    shot: ShotFraming,
    /// Location or setting tag
    environment: String,
}

impl PanelSpec {
    /// Create a panel.
    pub fn new(
        index: u32,
        visual: impl Into<String>,
        dialogue: Vec<DialogueLine>,
        shot: ShotFraming,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            index,
            visual: visual.into(),
            dialogue,
            shot,
            environment: environment.into(),
        }
    }
}

/// Public character metadata: display name and appearance.
///
/// Character sheets are presentation data, visible to the blind reader the
/// same way a printed cast page would be.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters)]
pub struct CharacterSheet {
    /// Display name
    name: String,
    /// Visual appearance, detailed enough for art generation
    visual: String,
}

impl CharacterSheet {
    /// Create a character sheet.
    pub fn new(name: impl Into<String>, visual: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visual: visual.into(),
        }
    }
}

/// Check the panel contract over a finished sequence.
///
/// Ensures indices are 1-based and contiguous, and every visual description
/// meets the configured minimum length.
///
/// # Errors
///
/// Returns a pipeline error naming the first offending panel.
pub fn validate_sequence(panels: &[PanelSpec], min_visual_chars: usize) -> HokusaiResult<()> {
    if panels.is_empty() {
        return Err(PipelineError::new(PipelineErrorKind::EmptyPanelList).into());
    }
    for (position, panel) in panels.iter().enumerate() {
        let expected = position as u32 + 1;
        debug_assert_eq!(
            *panel.index(),
            expected,
            "panel sequence must be renumbered before validation"
        );
        let visual_len = panel.visual().chars().count();
        if panel.visual().trim().is_empty() {
            return Err(PipelineError::new(PipelineErrorKind::EmptyVisualDescription(
                *panel.index(),
            ))
            .into());
        }
        if visual_len < min_visual_chars {
            return Err(PipelineError::new(PipelineErrorKind::VisualDescriptionTooShort {
                panel: *panel.index(),
                len: visual_len,
                min: min_visual_chars,
            })
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel(index: u32, visual: &str) -> PanelSpec {
        PanelSpec::new(index, visual, Vec::new(), ShotFraming::Medium, "rooftop")
    }

    #[test]
    fn framing_parses_common_variants() {
        assert_eq!(ShotFraming::parse_lenient("Close-Up"), Some(ShotFraming::CloseUp));
        assert_eq!(ShotFraming::parse_lenient("wide shot"), Some(ShotFraming::Wide));
        assert_eq!(ShotFraming::parse_lenient("Bird's Eye"), Some(ShotFraming::BirdsEye));
        assert_eq!(ShotFraming::parse_lenient("low angle"), Some(ShotFraming::LowAngle));
        assert_eq!(ShotFraming::parse_lenient(" MEDIUM "), Some(ShotFraming::Medium));
    }

    #[test]
    fn framing_rejects_unknown_text() {
        assert_eq!(ShotFraming::parse_lenient("fisheye"), None);
        assert_eq!(ShotFraming::parse_lenient(""), None);
    }

    #[test]
    fn empty_sequence_fails_validation() {
        assert!(validate_sequence(&[], 10).is_err());
    }

    #[test]
    fn short_visual_fails_validation() {
        let panels = vec![panel(1, "too short")];
        assert!(validate_sequence(&panels, 50).is_err());
    }

    #[test]
    fn valid_sequence_passes() {
        let visual = "A narrow alley at dusk, rain pooling between cobblestones while a \
                      single lamp flickers over a shuttered noodle stall.";
        let panels = vec![panel(1, visual), panel(2, visual)];
        assert!(validate_sequence(&panels, 50).is_ok());
    }
}
