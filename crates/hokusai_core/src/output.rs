//! Output types from backend responses.

use serde::{Deserialize, Serialize};

/// Supported output types from the generative backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Output {
    /// Plain text output.
    Text(String),

    /// Generated image output (character art, panel renders).
    Image {
        /// MIME type of the image
        mime: Option<String>,
        /// Binary image data
        data: Vec<u8>,
    },

    /// Structured JSON output.
    Json(serde_json::Value),
}
