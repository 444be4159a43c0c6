//! Gemini provider implementation
//!
//! Client for Google's Generative Language API authenticated with an API key,
//! implementing the LlmProvider trait.

pub mod client;
pub mod mapper;
pub mod types;

// Re-export main types for convenience
pub use client::GeminiClient;
