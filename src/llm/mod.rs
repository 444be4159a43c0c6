//! Model service layer
//!
//! A provider-neutral request/response shape plus the Google Gemini client the
//! chat flow talks to.

pub mod core;
pub mod gemini;

// Re-export commonly used types
pub use core::{
    config::GenerationConfig,
    error::LlmError,
    provider::LlmProvider,
    types::{FinishReason, GenerateRequest, GenerateResponse, Message, MessageRole, UsageMetadata},
};

pub use gemini::GeminiClient;
