//! Shared machinery for backend stage calls.
//!
//! Every stage call follows the same path: build a request, call the
//! backend under a timeout, retry transient failures within a bounded
//! budget, then extract and parse the JSON payload. Malformed output is
//! never retried; that budget belongs to transport failures only.

use crate::{FidelityConfig, extraction};
use hokusai_core::{GenerateRequest, Input, MessageBuilder, Output, Role};
use hokusai_error::{
    BackendError, HokusaiError, HokusaiErrorKind, HokusaiResult, PipelineError, PipelineErrorKind,
};
use hokusai_interface::HokusaiDriver;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_retry2::strategy::{FixedInterval, jitter};
use tokio_retry2::{Retry, RetryError};

/// Fixed backoff between retry attempts, jittered.
const RETRY_BACKOFF_MS: u64 = 500;

/// The four generative stages of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Ground-truth story generation
    Architect,
    /// Story-to-panel conversion and revision
    Scripter,
    /// Blind reconstruction from panels
    Reader,
    /// Ground truth vs. reconstruction comparison
    Evaluator,
}

/// Bundles the driver and configuration behind one stage-call entry point.
pub(crate) struct StageBackend<'a, D> {
    driver: &'a D,
    config: &'a FidelityConfig,
}

impl<'a, D: HokusaiDriver> StageBackend<'a, D> {
    pub(crate) fn new(driver: &'a D, config: &'a FidelityConfig) -> Self {
        Self { driver, config }
    }

    pub(crate) fn config(&self) -> &FidelityConfig {
        self.config
    }

    /// Run one stage call end to end: generate, extract, parse.
    #[tracing::instrument(
        skip_all,
        fields(stage = %stage, provider = self.driver.provider_name(), prompt_chars = prompt.len())
    )]
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        stage: Stage,
        prompt: String,
    ) -> HokusaiResult<T> {
        let text = self.generate_with_retry(stage, &prompt).await?;
        let json = extraction::extract_json(&text)?;
        extraction::parse_json(&json)
    }

    /// Call the backend, retrying transient failures within the configured
    /// budget.
    async fn generate_with_retry(&self, stage: Stage, prompt: &str) -> HokusaiResult<String> {
        let retries = self.config.stage_retries();
        let strategy = FixedInterval::from_millis(RETRY_BACKOFF_MS)
            .map(jitter)
            .take(retries as usize);

        let attempt = || async {
            match self.generate_once(stage, prompt).await {
                Ok(text) => Ok(text),
                Err(e) if is_transient(&e) => {
                    tracing::warn!(stage = %stage, error = %e, "Transient stage failure");
                    Err(RetryError::transient(e))
                }
                Err(e) => Err(RetryError::permanent(e)),
            }
        };

        Retry::spawn(strategy, attempt).await.map_err(|e| {
            if retries > 0 && is_transient(&e) {
                PipelineError::new(PipelineErrorKind::RetriesExhausted {
                    stage: stage.to_string(),
                    attempts: retries + 1,
                    message: e.to_string(),
                })
                .into()
            } else {
                e
            }
        })
    }

    /// One backend request under the configured timeout.
    async fn generate_once(&self, stage: Stage, prompt: &str) -> HokusaiResult<String> {
        let message = MessageBuilder::default()
            .role(Role::User)
            .content(vec![Input::Text(prompt.to_string())])
            .build()
            .map_err(|e| BackendError::new(format!("Failed to build message: {}", e)))?;

        let request = GenerateRequest::builder()
            .messages(vec![message])
            .max_tokens(self.config.max_tokens())
            .temperature(self.config.temperature())
            .model(self.config.model().map(str::to_string))
            .build()
            .map_err(|e| BackendError::new(format!("Failed to build request: {}", e)))?;

        let timeout = Duration::from_secs(self.config.stage_timeout_secs());
        let response = tokio::time::timeout(timeout, self.driver.generate(&request))
            .await
            .map_err(|_| {
                PipelineError::new(PipelineErrorKind::StageTimeout {
                    stage: stage.to_string(),
                    secs: self.config.stage_timeout_secs(),
                })
            })??;

        Ok(collect_text(&response.outputs))
    }
}

/// Whether an error is worth retrying: backend transport failures and
/// timeouts, never malformed output.
fn is_transient(error: &HokusaiError) -> bool {
    match error.kind() {
        HokusaiErrorKind::Backend(_) => true,
        HokusaiErrorKind::Pipeline(p) => {
            matches!(p.kind, PipelineErrorKind::StageTimeout { .. })
        }
        _ => false,
    }
}

/// Concatenate all text outputs with newlines between them.
fn collect_text(outputs: &[Output]) -> String {
    outputs
        .iter()
        .filter_map(|output| match output {
            Output::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
