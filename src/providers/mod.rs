/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for chat model providers:
 * - OpenAI-compatible: Groq, OpenAI and LM Studio chat completion APIs
 * - Mock: scripted providers and backends for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::translation::backend::TokenUsage;

/// A single-turn chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// System prompt
    pub system: String,
    /// User message
    pub user: String,
    pub temperature: f32,
    /// Ask the provider to answer with a JSON object
    pub json_response: bool,
}

/// Text answer of a chat completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub text: String,
    pub usage: TokenUsage,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the chat backend.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

pub mod mock;
pub mod openai;
