//! Request and response types for backend generation.

use crate::{Message, Output};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Generic generation request (multimodal-safe).
///
/// # Examples
///
/// ```
/// use hokusai_core::{GenerateRequest, Input, Message, Role};
///
/// let request = GenerateRequest::builder()
///     .messages(vec![Message {
///         role: Role::User,
///         content: vec![Input::Text("Hello!".to_string())],
///     }])
///     .max_tokens(Some(100))
///     .build()
///     .unwrap();
///
/// assert_eq!(request.messages.len(), 1);
/// assert_eq!(request.max_tokens, Some(100));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, Builder)]
pub struct GenerateRequest {
    /// The conversation messages to send
    pub messages: Vec<Message>,
    /// Maximum number of tokens to generate
    #[builder(default)]
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0 to 1.0)
    #[builder(default)]
    pub temperature: Option<f32>,
    /// Model identifier to use
    #[builder(default)]
    pub model: Option<String>,
}

impl GenerateRequest {
    /// Creates a new request builder.
    pub fn builder() -> GenerateRequestBuilder {
        GenerateRequestBuilder::default()
    }
}

/// The unified response object.
///
/// # Examples
///
/// ```
/// use hokusai_core::{GenerateResponse, Output};
///
/// let response = GenerateResponse {
///     outputs: vec![Output::Text("A quiet rooftop at dusk.".to_string())],
/// };
///
/// assert_eq!(response.outputs.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The generated outputs from the model
    pub outputs: Vec<Output>,
}
