//! Error types for the Hokusai library.
//!
//! This crate provides the foundation error types used throughout the Hokusai
//! workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error
//! handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use hokusai_error::{BackendError, HokusaiResult};
//!
//! fn call_backend() -> HokusaiResult<String> {
//!     Err(BackendError::new("Connection refused"))?
//! }
//!
//! match call_backend() {
//!     Ok(text) => println!("Got: {}", text),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod error;
mod json;
mod pipeline;

pub use backend::BackendError;
pub use config::ConfigError;
pub use error::{HokusaiError, HokusaiErrorKind, HokusaiResult};
pub use json::JsonError;
pub use pipeline::{PipelineError, PipelineErrorKind};
