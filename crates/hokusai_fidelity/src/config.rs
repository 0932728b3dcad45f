//! Configuration for the fidelity pipeline.
//!
//! Settings load from bundled TOML defaults, merged with an optional
//! `hokusai.toml` in the working directory or under the user config
//! directory (`~/.config/hokusai/` on Linux). User values take precedence.

use config::{Config, File, FileFormat};
use hokusai_error::{ConfigError, HokusaiResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../hokusai.toml");

/// Settings that govern a fidelity pipeline run.
///
/// Validated once at run start, not per iteration.
///
/// # Examples
///
/// ```
/// use hokusai_fidelity::FidelityConfig;
///
/// let config = FidelityConfig::default();
/// assert_eq!(config.score_threshold(), 80.0);
/// assert_eq!(config.max_iterations(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FidelityConfig {
    /// Score a reconstruction must reach before the run validates (0-100)
    #[serde(default = "default_score_threshold")]
    score_threshold: f32,

    /// Default revision budget when the caller does not supply one
    #[serde(default = "default_max_iterations")]
    max_iterations: u32,

    /// Shortest visual description accepted from the scripter, in characters
    #[serde(default = "default_min_visual_chars")]
    min_visual_chars: usize,

    /// Additional attempts per stage call after a transient backend failure
    #[serde(default = "default_stage_retries")]
    stage_retries: u32,

    /// Per-call timeout for backend requests, in seconds
    #[serde(default = "default_stage_timeout_secs")]
    stage_timeout_secs: u64,

    /// Model identifier passed to the backend, if the driver honors one
    #[serde(default)]
    model: Option<String>,

    /// Sampling temperature for stage calls
    #[serde(default)]
    temperature: Option<f32>,

    /// Token ceiling for stage calls
    #[serde(default)]
    max_tokens: Option<u32>,
}

fn default_score_threshold() -> f32 {
    80.0
}

fn default_max_iterations() -> u32 {
    3
}

fn default_min_visual_chars() -> usize {
    150
}

fn default_stage_retries() -> u32 {
    1
}

fn default_stage_timeout_secs() -> u64 {
    120
}

impl Default for FidelityConfig {
    fn default() -> Self {
        Self {
            score_threshold: default_score_threshold(),
            max_iterations: default_max_iterations(),
            min_visual_chars: default_min_visual_chars(),
            stage_retries: default_stage_retries(),
            stage_timeout_secs: default_stage_timeout_secs(),
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl FidelityConfig {
    /// Load configuration from bundled defaults plus user overrides.
    ///
    /// Merge order (later wins): bundled defaults, the user config directory,
    /// then `./hokusai.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if an override file is malformed or the merged
    /// configuration fails validation.
    pub fn load() -> HokusaiResult<Self> {
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(config_dir) = dirs::config_dir() {
            let user_path = config_dir.join("hokusai").join("hokusai.toml");
            debug!(path = %user_path.display(), "Checking user config path");
            builder = builder.add_source(File::from(user_path).required(false));
        }

        builder = builder.add_source(File::with_name("hokusai").required(false));

        let merged = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to load configuration: {}", e)))?;

        let settings: Self = merged
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate the configuration surface.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is outside its accepted range.
    pub fn validate(&self) -> HokusaiResult<()> {
        if !(0.0..=100.0).contains(&self.score_threshold) {
            return Err(ConfigError::new(format!(
                "score_threshold must be in [0, 100], got {}",
                self.score_threshold
            ))
            .into());
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::new("max_iterations must be at least 1").into());
        }
        if self.min_visual_chars == 0 {
            return Err(ConfigError::new("min_visual_chars must be at least 1").into());
        }
        if self.stage_timeout_secs == 0 {
            return Err(ConfigError::new("stage_timeout_secs must be at least 1").into());
        }
        if let Some(temperature) = self.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ConfigError::new(format!(
                "temperature must be in [0, 2], got {}",
                temperature
            ))
            .into());
        }
        Ok(())
    }

    /// Score a reconstruction must reach before the run validates.
    pub fn score_threshold(&self) -> f32 {
        self.score_threshold
    }

    /// Default revision budget.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Shortest visual description accepted from the scripter.
    pub fn min_visual_chars(&self) -> usize {
        self.min_visual_chars
    }

    /// Additional attempts per stage call after a transient failure.
    pub fn stage_retries(&self) -> u32 {
        self.stage_retries
    }

    /// Per-call backend timeout in seconds.
    pub fn stage_timeout_secs(&self) -> u64 {
        self.stage_timeout_secs
    }

    /// Model identifier passed to the backend.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Sampling temperature for stage calls.
    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Token ceiling for stage calls.
    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    /// Builder method to set the validation threshold.
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Builder method to set the default revision budget.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Builder method to set the minimum visual description length.
    pub fn with_min_visual_chars(mut self, min: usize) -> Self {
        self.min_visual_chars = min;
        self
    }

    /// Builder method to set the retry budget for stage calls.
    pub fn with_stage_retries(mut self, retries: u32) -> Self {
        self.stage_retries = retries;
        self
    }

    /// Builder method to set the per-call backend timeout.
    pub fn with_stage_timeout_secs(mut self, secs: u64) -> Self {
        self.stage_timeout_secs = secs;
        self
    }

    /// Builder method to set the model override.
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }
}
