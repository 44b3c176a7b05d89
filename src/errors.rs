/*!
 * Error types for the lingobatch application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 *
 * - `ProviderError`: failures of a translation backend call, classified as
 *   transient (worth retrying) or permanent
 * - `TranslationError`: per-request failures captured on a request
 * - `AppError`: run-level failures (configuration, persistence) that stop a run
 */

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when working with translation backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The attempt did not complete within the per-attempt timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered but left out some requested languages
    #[error("Incomplete response, missing translations for: {}", .0.join(", "))]
    IncompleteResponse(Vec<String>),

    /// The backend cannot translate into the requested language
    #[error("Unsupported target language: {0}")]
    UnsupportedLanguage(String),
}

impl ProviderError {
    /// Whether retrying the same request can reasonably succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::ParseError(_)
            | Self::ConnectionError(_)
            | Self::RateLimitExceeded(_)
            | Self::Timeout(_)
            | Self::IncompleteResponse(_) => true,
            Self::ApiError { status_code, .. } => {
                *status_code >= 500 || *status_code == 408 || *status_code == 429
            }
            Self::AuthenticationError(_) | Self::UnsupportedLanguage(_) => false,
        }
    }
}

/// Errors that can occur while processing a single translation request
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The request was rejected before reaching the backend
    #[error("validation: {0}")]
    Validation(String),

    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid or missing configuration; fatal before any work starts
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure writing durable run state; fatal to the run
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Whether this error must stop the current run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Persistence(_) | Self::File(_))
    }
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(format!("{:#}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
