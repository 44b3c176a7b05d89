/*!
 * Tests for error classification
 */

use std::time::Duration;
use lingobatch::errors::{AppError, ProviderError, TranslationError};

/// Test that retryable provider errors are transient
#[test]
fn test_providerError_isTransient_shouldClassifyRetryableErrors() {
    assert!(ProviderError::ConnectionError("reset".into()).is_transient());
    assert!(ProviderError::RateLimitExceeded("slow down".into()).is_transient());
    assert!(ProviderError::Timeout(Duration::from_secs(60)).is_transient());
    assert!(ProviderError::IncompleteResponse(vec!["ja".into()]).is_transient());
    assert!(ProviderError::ApiError { status_code: 502, message: String::new() }.is_transient());
    assert!(ProviderError::ApiError { status_code: 408, message: String::new() }.is_transient());
}

/// Test that errors a retry cannot fix are permanent
#[test]
fn test_providerError_isTransient_shouldClassifyPermanentErrors() {
    assert!(!ProviderError::AuthenticationError("bad key".into()).is_transient());
    assert!(!ProviderError::UnsupportedLanguage("tlh".into()).is_transient());
    assert!(!ProviderError::ApiError { status_code: 400, message: String::new() }.is_transient());
}

/// Test that only run-level errors are fatal
#[test]
fn test_appError_isFatal_shouldOnlyStopOnRunLevelErrors() {
    assert!(AppError::Persistence("disk full".into()).is_fatal());
    assert!(AppError::Configuration("no key".into()).is_fatal());
    assert!(!AppError::Provider(ProviderError::ConnectionError("reset".into())).is_fatal());
    assert!(!AppError::Translation(TranslationError::Validation("empty".into())).is_fatal());
}

/// Test error messages
#[test]
fn test_errorMessages_shouldDescribeCause() {
    let missing = ProviderError::IncompleteResponse(vec!["en".into(), "ja".into()]);
    assert_eq!(missing.to_string(), "Incomplete response, missing translations for: en, ja");

    let validation = TranslationError::Validation("source text is empty".into());
    assert_eq!(validation.to_string(), "validation: source text is empty");
}
