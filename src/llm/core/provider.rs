//! Provider trait for model service implementations

use async_trait::async_trait;

use super::{
    error::LlmError,
    types::{GenerateRequest, GenerateResponse},
};

/// Main interface that all model providers must satisfy
///
/// The chat flow treats the model as an opaque text-completion function: one
/// request carrying the whole transcript, one response, no retries.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for the conversation in `request`
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the service rejects it.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError>;
}
