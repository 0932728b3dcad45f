//! Iterative fidelity validation pipeline for panel-based storytelling.
//!
//! This crate turns a short seed into a validated panel script through a
//! bounded, critique-guided convergence loop:
//!
//! 1. **Architect** generates the ground-truth story (once per run)
//! 2. **Scripter** converts it into panels, or revises them under critique
//! 3. **Blind reader** reconstructs the story from the panels alone,
//!    behind a one-way information barrier
//! 4. **Evaluator** scores how much meaning survived and reports gaps
//! 5. The loop revises and repeats until the score clears the threshold or
//!    the iteration budget runs out
//!
//! The barrier in step 3 is what makes the score meaningful: the reader
//! never sees the ground truth, so a high score can only come from panels
//! that actually carry the story.
//!
//! # Example
//!
//! ```rust,ignore
//! use hokusai_fidelity::{FidelityConfig, Orchestrator, RunStatus};
//!
//! # async fn example(driver: impl hokusai_interface::HokusaiDriver) -> hokusai_error::HokusaiResult<()> {
//! let orchestrator = Orchestrator::new(driver, FidelityConfig::load()?);
//! let result = orchestrator
//!     .run("A simple love story between two classmates", 3)
//!     .await?;
//!
//! match result.status() {
//!     RunStatus::Validated => println!("Panels carry the story."),
//!     RunStatus::MaxIterationsReached => println!("Best effort after budget."),
//!     RunStatus::Error => eprintln!("{:?}", result.error()),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod architect;
mod config;
mod evaluator;
mod extraction;
mod orchestrator;
mod panel;
mod prompt;
mod reader;
mod report;
mod scripter;
mod stage;
mod state;
mod story;

pub use config::FidelityConfig;
pub use extraction::{extract_json, parse_json};
pub use orchestrator::Orchestrator;
pub use panel::{CharacterSheet, DialogueLine, PanelSpec, ShotFraming, validate_sequence};
pub use report::{
    FidelityReport, GapCategory, GapSeverity, InformationGap, IterationRecord, ScoreRubric,
};
pub use stage::Stage;
pub use state::{PipelineState, ReaderView, RunProgress, RunResult, RunStatus};
pub use story::{GroundTruth, InferredMotivation, Motivation, Reconstruction};
