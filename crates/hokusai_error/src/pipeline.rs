//! Fidelity pipeline error types.

/// Specific error conditions for pipeline operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PipelineErrorKind {
    /// The architect stage returned no narrative text
    #[display("Architect returned no narrative text")]
    MissingNarrative,
    /// The scripter stage returned an empty panel list
    #[display("Scripter returned an empty panel list")]
    EmptyPanelList,
    /// A panel carries no visual description
    #[display("Panel {} has an empty visual description", _0)]
    EmptyVisualDescription(u32),
    /// A panel's visual description falls below the configured minimum
    #[display(
        "Panel {} visual description is {} chars, minimum is {}",
        panel,
        len,
        min
    )]
    VisualDescriptionTooShort {
        /// Panel sequence index
        panel: u32,
        /// Actual description length in characters
        len: usize,
        /// Configured minimum length
        min: usize,
    },
    /// A stage call exceeded its request timeout
    #[display("Stage '{}' timed out after {}s", stage, secs)]
    StageTimeout {
        /// Stage name
        stage: String,
        /// Configured timeout in seconds
        secs: u64,
    },
    /// A stage call failed after exhausting its retry budget
    #[display("Stage '{}' failed after {} attempts: {}", stage, attempts, message)]
    RetriesExhausted {
        /// Stage name
        stage: String,
        /// Total attempts made (initial call plus retries)
        attempts: u32,
        /// Last error message
        message: String,
    },
    /// The run was cancelled before reaching a terminal state
    #[display("Run cancelled before iteration {}", _0)]
    Cancelled(u32),
    /// Ground truth was installed more than once for the same run
    #[display("Ground truth already set for this run")]
    GroundTruthAlreadySet,
    /// A prompt template was rendered with placeholders left unresolved
    #[display("Unresolved placeholder '{}' in prompt template", _0)]
    UnresolvedPlaceholder(String),
}

/// Error type for pipeline operations.
///
/// # Examples
///
/// ```
/// use hokusai_error::{PipelineError, PipelineErrorKind};
///
/// let err = PipelineError::new(PipelineErrorKind::EmptyPanelList);
/// assert!(format!("{}", err).contains("empty panel list"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    /// The specific error condition
    pub kind: PipelineErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl PipelineError {
    /// Create a new PipelineError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
