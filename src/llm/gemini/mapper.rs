//! Mapping between abstraction types and Gemini types

use crate::llm::core::{
    config::GenerationConfig,
    types::{FinishReason, GenerateRequest, GenerateResponse, Message, MessageRole, UsageMetadata},
};

use super::types::{
    Content, GeminiGenerationConfig, GenerateContentRequest, GenerateContentResponse, Part,
};

/// Convert our abstraction request to Gemini's request format
pub fn to_gemini_request(request: GenerateRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: request.messages.into_iter().map(to_gemini_content).collect(),
        system_instruction: request.system.map(|s| Content {
            role: None,
            parts: vec![Part::text(s)],
        }),
        generation_config: to_gemini_generation_config(request.config),
    }
}

/// Convert a message to Gemini's content format
fn to_gemini_content(message: Message) -> Content {
    let role = match message.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "model",
    };

    Content {
        role: Some(role.to_string()),
        parts: vec![Part::text(message.text)],
    }
}

/// Convert generation config, omitting it entirely when nothing is set
fn to_gemini_generation_config(config: GenerationConfig) -> Option<GeminiGenerationConfig> {
    if config == GenerationConfig::default() {
        return None;
    }

    Some(GeminiGenerationConfig {
        max_output_tokens: config.max_tokens,
        temperature: config.temperature,
    })
}

/// Convert a Gemini response to our abstraction
///
/// Text parts of the first candidate are concatenated. A response without any
/// text part (blocked prompt, empty candidate) yields `text: None`.
pub fn from_gemini_response(response: GenerateContentResponse) -> GenerateResponse {
    let usage = response.usage_metadata.map(|u| UsageMetadata {
        input_tokens: u.prompt_token_count,
        output_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    let Some(candidate) = response.candidates.into_iter().next() else {
        let finish_reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|reason| map_finish_reason(&reason));
        return GenerateResponse {
            text: None,
            finish_reason,
            usage,
        };
    };

    let texts: Vec<String> = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    GenerateResponse {
        text: if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        },
        finish_reason: candidate.finish_reason.as_deref().map(map_finish_reason),
        usage,
    }
}

/// Map Gemini's finish reason to our abstraction
fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::MaxTokens,
        "SAFETY" => FinishReason::Safety,
        other => FinishReason::Other(other.to_string()),
    }
}
