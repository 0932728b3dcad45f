//! The orchestrator: owns run state and drives the convergence loop.
//!
//! One orchestrator drives one run. The backend driver is shared freely
//! across concurrent runs (wrap it in an `Arc`); run state is not.

use crate::stage::StageBackend;
use crate::state::{PipelineState, ReaderView, RunProgress, RunResult, RunStatus};
use crate::{FidelityConfig, IterationRecord, architect, evaluator, reader, scripter};
use hokusai_error::{ConfigError, HokusaiResult, PipelineError, PipelineErrorKind};
use hokusai_interface::HokusaiDriver;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// Drives the architect → scripter → reader → evaluator loop for one run.
///
/// The orchestrator is the only component that ever sees the whole
/// [`PipelineState`]. Each stage receives a scoped input (the blind reader
/// an explicit [`ReaderView`]) and returns a plain result object; all state
/// transitions happen here.
///
/// # Examples
///
/// ```rust,ignore
/// use hokusai_fidelity::{FidelityConfig, Orchestrator};
///
/// # async fn example(driver: impl hokusai_interface::HokusaiDriver) -> hokusai_error::HokusaiResult<()> {
/// let orchestrator = Orchestrator::new(driver, FidelityConfig::load()?);
/// let result = orchestrator.run("A simple love story between two classmates", 3).await?;
/// println!("{}: {:?}", result.status(), result.final_score());
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator<D> {
    driver: D,
    config: FidelityConfig,
    cancel: CancellationToken,
    progress: watch::Sender<RunProgress>,
}

impl<D: HokusaiDriver> Orchestrator<D> {
    /// Create an orchestrator with the given backend driver and settings.
    pub fn new(driver: D, config: FidelityConfig) -> Self {
        let (progress, _) = watch::channel(RunProgress::default());
        Self {
            driver,
            config,
            cancel: CancellationToken::new(),
            progress,
        }
    }

    /// Use an externally owned cancellation token.
    ///
    /// Cancellation is checked at the top of each loop turn; an in-flight
    /// backend call is allowed to finish and its result is discarded.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this run when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Subscribe to per-iteration progress snapshots.
    ///
    /// Snapshots are published only after a full iteration commits, so an
    /// observer never sees panels from one iteration paired with a score
    /// from another.
    pub fn subscribe(&self) -> watch::Receiver<RunProgress> {
        self.progress.subscribe()
    }

    /// The settings this orchestrator runs with.
    pub fn config(&self) -> &FidelityConfig {
        &self.config
    }

    /// Execute one full run.
    ///
    /// Always returns a terminal [`RunResult`] for failures inside the
    /// pipeline (`status == Error`, partial history preserved); an `Err` is
    /// reserved for invalid arguments rejected before the run starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation, the seed is
    /// empty, or `max_iterations` is zero.
    #[tracing::instrument(skip(self, seed), fields(run_id))]
    pub async fn run(&self, seed: &str, max_iterations: u32) -> HokusaiResult<RunResult> {
        self.config.validate()?;
        if seed.trim().is_empty() {
            return Err(ConfigError::new("seed must not be empty").into());
        }
        if max_iterations == 0 {
            return Err(ConfigError::new("max_iterations must be at least 1").into());
        }

        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));

        info!(
            seed_chars = seed.len(),
            max_iterations,
            threshold = self.config.score_threshold(),
            "Starting fidelity run"
        );

        let mut state = PipelineState::new(seed, max_iterations);
        let outcome = self.drive(&mut state).await;
        state.mark_terminal();
        self.publish(&state);

        let (status, failure) = match outcome {
            Ok(status) => (status, None),
            Err(e) => {
                error!(error = %e, "Run terminated with a stage failure");
                (RunStatus::Error, Some(e.to_string()))
            }
        };

        let result = RunResult::from_state(run_id, status, &state, failure);
        info!(
            status = %result.status(),
            final_score = ?result.final_score(),
            iterations = result.iterations_used(),
            "Fidelity run complete"
        );
        Ok(result)
    }

    /// Execute one full run with the configured default iteration budget.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Orchestrator::run`].
    pub async fn run_with_defaults(&self, seed: &str) -> HokusaiResult<RunResult> {
        self.run(seed, self.config.max_iterations()).await
    }

    /// The loop proper. Returns the terminal status, or the first stage
    /// error; the caller folds either into a `RunResult`.
    async fn drive(&self, state: &mut PipelineState) -> HokusaiResult<RunStatus> {
        let backend = StageBackend::new(&self.driver, &self.config);

        // Ground truth is generated once and kept local for the whole run;
        // the state holds its own copy for the terminal result.
        let ground_truth = architect::generate(&backend, state.seed()).await?;
        state.install_ground_truth(ground_truth.clone())?;

        let (characters, panels) = scripter::convert(&backend, &ground_truth).await?;
        state.replace_script(characters, panels);

        loop {
            if self.cancel.is_cancelled() {
                return Err(PipelineError::new(PipelineErrorKind::Cancelled(
                    state.iteration(),
                ))
                .into());
            }

            // The reader sees this view and nothing else.
            let view = ReaderView::from_state(state);
            let reconstruction = reader::reconstruct(&backend, &view).await?;
            let report = evaluator::evaluate(&backend, &ground_truth, &reconstruction).await?;

            let record = IterationRecord::new(
                state.iteration(),
                *report.score(),
                report.gaps().len(),
                report.critique().clone(),
                *reconstruction.confidence(),
            );
            let validated = report.is_valid();
            let report_for_revision = report.clone();
            state.commit_iteration(reconstruction, report, record);
            self.publish(state);

            info!(
                iteration = state.iteration(),
                score = state.report().map(|r| *r.score()),
                validated,
                "Iteration evaluated"
            );

            if validated {
                return Ok(RunStatus::Validated);
            }
            if state.iteration() >= state.max_iterations() {
                info!(
                    max_iterations = state.max_iterations(),
                    "Iteration budget exhausted below threshold"
                );
                return Ok(RunStatus::MaxIterationsReached);
            }

            state.advance_iteration();
            let (characters, panels) = scripter::revise(
                &backend,
                state.panels(),
                state.characters(),
                &report_for_revision,
                ground_truth.motivations(),
            )
            .await?;
            state.replace_script(characters, panels);
        }
    }

    /// Publish a progress snapshot. Send never fails: a watch channel keeps
    /// the latest value even with no receivers.
    fn publish(&self, state: &PipelineState) {
        self.progress.send_replace(RunProgress {
            iteration: state.iteration(),
            latest_score: state.report().map(|r| *r.score()),
            panel_count: state.panels().len(),
            terminal: state.terminal(),
        });
    }
}
