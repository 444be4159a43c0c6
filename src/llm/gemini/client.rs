//! Gemini client implementation

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

use crate::llm::core::{
    error::LlmError,
    provider::LlmProvider,
    types::{GenerateRequest, GenerateResponse},
};

use super::mapper::{from_gemini_response, to_gemini_request};
use super::types::{ErrorResponse, GenerateContentResponse};

/// Public Generative Language API endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for interacting with Gemini models through an API key
pub struct GeminiClient {
    /// HTTP client for making requests
    http_client: Client,
    /// API key sent with every request
    api_key: String,
    /// Model identifier, e.g. `gemini-2.0-flash`
    model: String,
    /// API root, overridable for proxies
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the key is empty.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::AuthenticationError(
                "GEMINI_API_KEY is empty".to_string(),
            ));
        }

        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LlmError::HttpError {
                status: 0,
                body: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Model identifier this client sends requests to
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the endpoint URL for a single completion
    fn build_endpoint_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Translate a non-success response into the matching error variant
async fn error_from_response(response: Response) -> LlmError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return LlmError::RateLimitExceeded { retry_after };
    }

    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
            LlmError::AuthenticationError(parsed.error.message)
        }
        Ok(parsed) => LlmError::ProviderError {
            code: if parsed.error.status.is_empty() {
                status.as_u16().to_string()
            } else {
                parsed.error.status
            },
            message: parsed.error.message,
        },
        Err(_) => LlmError::HttpError {
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        if request.messages.is_empty() {
            return Err(LlmError::InvalidRequest(
                "at least one message is required".to_string(),
            ));
        }

        let gemini_request = to_gemini_request(request);

        let response = self
            .http_client
            .post(self.build_endpoint_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: GenerateContentResponse = response.json().await?;
        Ok(from_gemini_response(body))
    }
}
