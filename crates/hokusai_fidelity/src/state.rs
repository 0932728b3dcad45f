//! Run state, the isolated reader view, and terminal result types.

use crate::{
    CharacterSheet, FidelityReport, GroundTruth, IterationRecord, PanelSpec, Reconstruction,
};
use chrono::{DateTime, Utc};
use hokusai_error::{HokusaiResult, PipelineError, PipelineErrorKind};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Full state of one pipeline run.
///
/// Owned exclusively by the orchestrator for the duration of the run. Other
/// components receive scoped views ([`ReaderView`] for the blind reader) or
/// individual references, and return plain result objects; all transitions
/// happen here.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineState {
    /// The seed the run started from
    seed: String,
    /// Reference narrative, set exactly once
    ground_truth: Option<GroundTruth>,
    /// Character sheets, replaced together with the panels
    characters: Vec<CharacterSheet>,
    /// Current panel sequence, replaced wholesale on revision
    panels: Vec<PanelSpec>,
    /// Latest reconstruction, replaced each iteration
    reconstruction: Option<Reconstruction>,
    /// Latest fidelity report, replaced each iteration
    report: Option<FidelityReport>,
    /// Current iteration, 1-based, monotonically increasing
    iteration: u32,
    /// Hard ceiling on iterations, fixed at run start
    max_iterations: u32,
    /// Whether the run reached a terminal state
    terminal: bool,
    /// Append-only record of completed iterations
    history: Vec<IterationRecord>,
}

impl PipelineState {
    /// Initialize state for a fresh run.
    pub fn new(seed: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            seed: seed.into(),
            ground_truth: None,
            characters: Vec::new(),
            panels: Vec::new(),
            reconstruction: None,
            report: None,
            iteration: 1,
            max_iterations,
            terminal: false,
            history: Vec::new(),
        }
    }

    /// Install the ground truth. Callable exactly once per run.
    ///
    /// # Errors
    ///
    /// Returns an error if ground truth was already installed.
    pub fn install_ground_truth(&mut self, ground_truth: GroundTruth) -> HokusaiResult<()> {
        if self.ground_truth.is_some() {
            return Err(PipelineError::new(PipelineErrorKind::GroundTruthAlreadySet).into());
        }
        self.ground_truth = Some(ground_truth);
        Ok(())
    }

    /// Replace the panel sequence and character sheets wholesale.
    pub fn replace_script(&mut self, characters: Vec<CharacterSheet>, panels: Vec<PanelSpec>) {
        debug!(
            panels = panels.len(),
            characters = characters.len(),
            iteration = self.iteration,
            "Replacing script"
        );
        self.characters = characters;
        self.panels = panels;
    }

    /// Commit one completed iteration: reconstruction, report, and history
    /// record land together, never one field at a time.
    pub fn commit_iteration(
        &mut self,
        reconstruction: Reconstruction,
        report: FidelityReport,
        record: IterationRecord,
    ) {
        self.reconstruction = Some(reconstruction);
        self.report = Some(report);
        self.history.push(record);
    }

    /// Advance to the next iteration.
    ///
    /// The ceiling is enforced by the orchestrator's decision logic; this
    /// only moves the counter.
    pub fn advance_iteration(&mut self) {
        debug_assert!(
            self.iteration < self.max_iterations,
            "iteration counter must stay within the ceiling on a live run"
        );
        self.iteration += 1;
    }

    /// Mark the run terminal.
    pub fn mark_terminal(&mut self) {
        self.terminal = true;
    }

    /// The seed the run started from.
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// The reference narrative, if the architect has run.
    pub fn ground_truth(&self) -> Option<&GroundTruth> {
        self.ground_truth.as_ref()
    }

    /// Current character sheets.
    pub fn characters(&self) -> &[CharacterSheet] {
        &self.characters
    }

    /// Current panel sequence.
    pub fn panels(&self) -> &[PanelSpec] {
        &self.panels
    }

    /// Latest reconstruction, if an iteration has completed.
    pub fn reconstruction(&self) -> Option<&Reconstruction> {
        self.reconstruction.as_ref()
    }

    /// Latest fidelity report, if an iteration has completed.
    pub fn report(&self) -> Option<&FidelityReport> {
        self.report.as_ref()
    }

    /// Current iteration, 1-based.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Hard ceiling on iterations.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Whether the run reached a terminal state.
    pub fn terminal(&self) -> bool {
        self.terminal
    }

    /// Records of completed iterations, oldest first.
    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }
}

/// Key names that must never appear in the serialized reader view.
///
/// The view is built by explicit field copy, so under normal operation none
/// of these can occur; the scan guards against a future field addition
/// smuggling ground truth past the type system.
const FORBIDDEN_VIEW_KEYS: &[&str] = &[
    "seed",
    "ground_truth",
    "narrative",
    "summary",
    "motivations",
    "conflicts",
    "plot_points",
    "reconstruction",
    "report",
    "critique",
];

/// The deliberately minimal view handed to the blind reader.
///
/// Contains only the presentation units and public character metadata —
/// never the ground truth, the seed, or any prior report. Built by explicit
/// field copy, not by passing the full state and trusting the reader.
#[derive(Debug, Clone, Serialize)]
pub struct ReaderView {
    panels: Vec<PanelSpec>,
    characters: Vec<CharacterSheet>,
}

impl ReaderView {
    /// Build the view by copying the panel sequence and character sheets
    /// out of the run state. Nothing else crosses this boundary.
    pub fn from_state(state: &PipelineState) -> Self {
        Self {
            panels: state.panels().to_vec(),
            characters: state.characters().to_vec(),
        }
    }

    /// The panel sequence visible to the reader.
    pub fn panels(&self) -> &[PanelSpec] {
        &self.panels
    }

    /// The character sheets visible to the reader.
    pub fn characters(&self) -> &[CharacterSheet] {
        &self.characters
    }

    /// Scan the serialized view for ground-truth key names.
    ///
    /// A hit means the orchestrator's view construction is broken. That is a
    /// programming error, not a recoverable condition, so this panics rather
    /// than returning a `Result` that a caller could swallow.
    ///
    /// # Panics
    ///
    /// Panics if a forbidden key appears in the serialized view, or if the
    /// view cannot be serialized at all.
    pub fn ensure_isolated(&self) {
        match serde_json::to_string(self) {
            Ok(serialized) => {
                if let Err(key) = scan_for_forbidden_keys(&serialized) {
                    panic!(
                        "isolation violation: reader view contains forbidden key '{}'",
                        key
                    );
                }
            }
            Err(e) => panic!("isolation check could not serialize reader view: {}", e),
        }
    }
}

/// Check serialized JSON for forbidden ground-truth key names.
fn scan_for_forbidden_keys(serialized: &str) -> Result<(), &'static str> {
    for key in FORBIDDEN_VIEW_KEYS.iter().copied() {
        let pattern = format!("\"{}\":", key);
        if serialized.contains(&pattern) {
            return Err(key);
        }
    }
    Ok(())
}

/// Terminal status of a pipeline run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    /// The fidelity score cleared the threshold
    Validated,
    /// The iteration budget ran out below the threshold
    MaxIterationsReached,
    /// A stage failed or the run was cancelled
    Error,
}

/// Externally observable snapshot of a running pipeline.
///
/// Published over a watch channel once per completed iteration, so pollers
/// never observe a half-committed iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunProgress {
    /// Current iteration, 1-based; 0 before the first stage completes
    pub iteration: u32,
    /// Most recent fidelity score, if any iteration has completed
    pub latest_score: Option<f32>,
    /// Number of panels in the current script
    pub panel_count: usize,
    /// Whether the run has reached a terminal state
    pub terminal: bool,
}

/// Terminal result of a pipeline run, returned to the caller.
#[derive(Debug, Clone, Serialize, derive_getters::Getters)]
pub struct RunResult {
    /// Unique run identifier
    run_id: Uuid,
    /// Terminal status
    status: RunStatus,
    /// Final fidelity score, if any iteration completed
    final_score: Option<f32>,
    /// Number of evaluator iterations executed
    iterations_used: u32,
    /// The generated ground-truth narrative, empty if the architect failed
    narrative: String,
    /// Best available panel sequence (the last revision produced)
    panels: Vec<PanelSpec>,
    /// Character sheets for the final panels
    characters: Vec<CharacterSheet>,
    /// Per-iteration records, oldest first
    history: Vec<IterationRecord>,
    /// Failure description when status is `Error`
    error: Option<String>,
    /// When the run completed
    completed_at: DateTime<Utc>,
}

impl RunResult {
    /// Assemble the terminal result from finished run state.
    pub(crate) fn from_state(
        run_id: Uuid,
        status: RunStatus,
        state: &PipelineState,
        error: Option<String>,
    ) -> Self {
        Self {
            run_id,
            status,
            final_score: state.report().map(|r| *r.score()),
            iterations_used: state.history().len() as u32,
            narrative: state
                .ground_truth()
                .map(|gt| gt.narrative().clone())
                .unwrap_or_default(),
            panels: state.panels().to_vec(),
            characters: state.characters().to_vec(),
            history: state.history().to_vec(),
            error,
            completed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DialogueLine, ShotFraming};

    fn seeded_state() -> PipelineState {
        let mut state = PipelineState::new("a quiet rivalry", 3);
        state
            .install_ground_truth(GroundTruth::new(
                "The full narrative.",
                "A short summary.",
                Default::default(),
                vec!["rivals clash".to_string()],
                vec!["opening".to_string()],
            ))
            .unwrap();
        state.replace_script(
            vec![CharacterSheet::new("Mina", "short hair, paint-stained apron")],
            vec![PanelSpec::new(
                1,
                "Mina glares across the studio at a rival easel.",
                vec![DialogueLine::new("Mina", "Not this time.")],
                ShotFraming::Medium,
                "art studio",
            )],
        );
        state
    }

    #[test]
    fn ground_truth_installs_exactly_once() {
        let mut state = seeded_state();
        let second = GroundTruth::new("other", "other", Default::default(), vec![], vec![]);
        assert!(state.install_ground_truth(second).is_err());
    }

    #[test]
    fn reader_view_carries_only_panels_and_characters() {
        let state = seeded_state();
        let view = ReaderView::from_state(&state);
        assert_eq!(view.panels().len(), 1);
        assert_eq!(view.characters().len(), 1);

        let serialized = serde_json::to_string(&view).unwrap();
        assert!(!serialized.contains("quiet rivalry"));
        assert!(!serialized.contains("The full narrative."));
        assert!(!serialized.contains("rivals clash"));
    }

    #[test]
    fn reader_view_passes_isolation_check() {
        let view = ReaderView::from_state(&seeded_state());
        view.ensure_isolated();
    }

    #[test]
    fn forbidden_key_scan_rejects_ground_truth_keys() {
        let leaked = r#"{"panels":[],"ground_truth":{"narrative":"secret"}}"#;
        assert!(scan_for_forbidden_keys(leaked).is_err());
    }

    #[test]
    fn forbidden_key_scan_accepts_clean_view() {
        let clean = r#"{"panels":[{"index":1,"visual":"x","dialogue":[],"shot":"Medium Shot","environment":""}],"characters":[]}"#;
        assert!(scan_for_forbidden_keys(clean).is_ok());
    }

    #[test]
    fn forbidden_key_inside_value_text_is_allowed() {
        // Only key positions count; dialogue may mention the words.
        let clean = r#"{"panels":[{"index":1,"visual":"a summary of conflicts","dialogue":[],"shot":"Wide Shot","environment":""}],"characters":[]}"#;
        assert!(scan_for_forbidden_keys(clean).is_ok());
    }

    #[test]
    fn commit_appends_history_atomically() {
        let mut state = seeded_state();
        let report = FidelityReport::new(70.0, Vec::new(), "tighten panel 1".to_string(), 80.0);
        let reconstruction = Reconstruction::new(
            "A painter wants to win.",
            Default::default(),
            vec![],
            vec![],
            0.6,
        );
        let record = IterationRecord::new(1, 70.0, 0, "tighten panel 1", 0.6);
        state.commit_iteration(reconstruction, report, record);

        assert_eq!(state.history().len(), 1);
        assert!(state.report().is_some());
        assert!(state.reconstruction().is_some());
    }
}
