use std::time::Duration;
use serde::{Serialize, Deserialize};
use reqwest::{Client, StatusCode};
use async_trait::async_trait;
use log::{error, debug};

use crate::errors::ProviderError;
use crate::translation::backend::TokenUsage;
use super::{ChatRequest, ChatResponse, Provider};

/// Default Groq endpoint
pub const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1";
/// Default OpenAI endpoint
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
/// Default LM Studio endpoint
pub const LMSTUDIO_ENDPOINT: &str = "http://localhost:1234/v1";

/// Client for OpenAI-compatible chat completion APIs (Groq, OpenAI, LM Studio)
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication, may be empty for local servers
    api_key: String,
    /// Base URL up to and including the version segment
    endpoint: String,
}

/// Chat completion request body
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// OpenAI message format
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage information
#[derive(Debug, Default, Deserialize)]
pub struct OpenAIUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// Chat completion response body
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
}

impl OpenAIRequest {
    /// Build the request body for a chat request
    pub fn from_chat(request: &ChatRequest) -> Self {
        let mut messages = Vec::new();
        if !request.system.is_empty() {
            messages.push(OpenAIMessage { role: "system".into(), content: Some(request.system.clone()) });
        }
        messages.push(OpenAIMessage { role: "user".into(), content: Some(request.user.clone()) });

        Self {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            response_format: request
                .json_response
                .then(|| ResponseFormat { format_type: "json_object".to_string() }),
        }
    }
}

impl OpenAI {
    /// Create a new client; an empty endpoint selects Groq
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: if endpoint.is_empty() { GROQ_ENDPOINT.to_string() } else { endpoint },
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), path)
    }

    /// Map an error status to a provider error
    pub fn map_status(status: StatusCode, body: String) -> ProviderError {
        match status.as_u16() {
            401 | 403 => ProviderError::AuthenticationError(body),
            429 => ProviderError::RateLimitExceeded(body),
            code => ProviderError::ApiError { status_code: code, message: body },
        }
    }

    fn map_send_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::RequestFailed(format!("HTTP timeout: {}", e))
        } else if e.is_connect() {
            ProviderError::ConnectionError(e.to_string())
        } else {
            ProviderError::RequestFailed(e.to_string())
        }
    }
}

#[async_trait]
impl Provider for OpenAI {
    type Request = ChatRequest;
    type Response = ChatResponse;

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = OpenAIRequest::from_chat(&request);
        let mut builder = self.client.post(self.url("chat/completions")).json(&body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(Self::map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Chat API error ({}): {}", status, error_text);
            return Err(Self::map_status(status, error_text));
        }

        let parsed = response.json::<OpenAIResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse chat response: {}", e)))?;

        let usage = parsed.usage.as_ref()
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();
        let text = parsed.choices.into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!("Chat completion used {} tokens", usage.total());

        Ok(ChatResponse { text, usage })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let mut builder = self.client.get(self.url("models"));
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        let response = builder.send().await.map_err(Self::map_send_error)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(Self::map_status(status, text))
        }
    }

    fn extract_text(response: &ChatResponse) -> String {
        response.text.clone()
    }
}
