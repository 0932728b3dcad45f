//! Trait definitions for generative backends.

use async_trait::async_trait;
use hokusai_core::{GenerateRequest, GenerateResponse};
use hokusai_error::HokusaiResult;
use std::sync::Arc;

/// Core trait that all generative backends must implement.
///
/// This provides the minimal interface the fidelity pipeline needs: given a
/// structured request, return model output, fallibly. Implementations must
/// be safely callable from many concurrent pipeline runs; per-call mutable
/// state belongs inside the implementation, behind its own synchronization.
#[async_trait]
pub trait HokusaiDriver: Send + Sync {
    /// Generate model output given a multimodal request.
    async fn generate(&self, req: &GenerateRequest) -> HokusaiResult<GenerateResponse>;

    /// Provider name (e.g., "gemini", "anthropic", "mock").
    fn provider_name(&self) -> &'static str;

    /// Model identifier (e.g., "gemini-2.0-flash-lite").
    fn model_name(&self) -> &str;
}

// Shared clients are the common case: one backend connection serves many
// concurrent runs, each holding an Arc to it.
#[async_trait]
impl<T: HokusaiDriver + ?Sized> HokusaiDriver for Arc<T> {
    async fn generate(&self, req: &GenerateRequest) -> HokusaiResult<GenerateResponse> {
        (**self).generate(req).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
