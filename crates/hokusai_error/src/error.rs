//! Top-level error wrapper types.

use crate::{BackendError, ConfigError, JsonError, PipelineError};

/// The foundation error enum for the Hokusai workspace.
///
/// # Examples
///
/// ```
/// use hokusai_error::{BackendError, HokusaiError};
///
/// let backend_err = BackendError::new("Connection failed");
/// let err: HokusaiError = backend_err.into();
/// assert!(format!("{}", err).contains("Backend Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum HokusaiErrorKind {
    /// Generative backend error
    #[from(BackendError)]
    Backend(BackendError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Fidelity pipeline error
    #[from(PipelineError)]
    Pipeline(PipelineError),
}

/// Hokusai error with kind discrimination.
///
/// # Examples
///
/// ```
/// use hokusai_error::{ConfigError, HokusaiResult};
///
/// fn might_fail() -> HokusaiResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Hokusai Error: {}", _0)]
pub struct HokusaiError(Box<HokusaiErrorKind>);

impl HokusaiError {
    /// Create a new error from a kind.
    pub fn new(kind: HokusaiErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &HokusaiErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to HokusaiErrorKind
impl<T> From<T> for HokusaiError
where
    T: Into<HokusaiErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Hokusai operations.
///
/// # Examples
///
/// ```
/// use hokusai_error::{BackendError, HokusaiResult};
///
/// fn call_backend() -> HokusaiResult<String> {
///     Err(BackendError::new("429 Too Many Requests"))?
/// }
/// ```
pub type HokusaiResult<T> = std::result::Result<T, HokusaiError>;
