/*!
 * Tests for the chat backend adapter and the mock providers
 */

use std::sync::Arc;
use anyhow::Result;

use lingobatch::errors::ProviderError;
use lingobatch::providers::mock::{MockBackend, MockChatProvider, MOCK_USAGE};
use lingobatch::translation::{
    BackendRequest, ChatBackend, PipelineBuilder, PromptTemplate, RecordingSleeper, RequestStatus,
    RetryPolicy, RunContext, TranslationBackend, TranslationRequest,
};

fn request(text: &str, langs: &[&str]) -> BackendRequest {
    BackendRequest {
        source_text: text.to_string(),
        context: "앞 줄".to_string(),
        target_langs: langs.iter().map(|l| l.to_string()).collect(),
        model_hint: None,
    }
}

/// Test that the chat backend returns parsed translations and usage
#[tokio::test]
async fn test_chatBackend_translate_shouldParseModelAnswer() -> Result<()> {
    let provider = MockChatProvider::replying(r#"{"translations": {"en": "Goodbye", "de": "Tschüss"}}"#);
    let backend = ChatBackend::new(provider.clone(), "qwen/qwen3-32b", 0.3, PromptTemplate::default());

    let response = backend.translate(&request("잘 가요", &["en", "de"])).await?;

    assert_eq!(response.translations["de"], "Tschüss");
    assert_eq!(response.usage.total(), 18);
    assert_eq!(provider.last_model().as_deref(), Some("qwen/qwen3-32b"));
    Ok(())
}

/// Test that the model hint overrides the configured model
#[tokio::test]
async fn test_chatBackend_translate_withModelHint_shouldUseHint() -> Result<()> {
    let provider = MockChatProvider::replying(r#"{"en": "Bye"}"#);
    let backend = ChatBackend::new(provider.clone(), "gemma2-9b-it", 0.3, PromptTemplate::default());
    let mut call = request("잘 가요", &["en"]);
    call.model_hint = Some("llama-3.3-70b-versatile".to_string());

    backend.translate(&call).await?;

    assert_eq!(provider.last_model().as_deref(), Some("llama-3.3-70b-versatile"));
    Ok(())
}

/// Test that commentary answers are retryable parse errors
#[tokio::test]
async fn test_chatBackend_translate_withCommentary_shouldReturnParseError() {
    let provider = MockChatProvider::replying("Let me check the context first. {\"en\": \"Bye\"}");
    let backend = ChatBackend::new(provider, "m", 0.3, PromptTemplate::default());

    let result = backend.translate(&request("잘 가요", &["en"])).await;

    assert!(matches!(result, Err(ProviderError::ParseError(_))));
}

/// Test that a chat answer missing a language fails the request through the chain
#[tokio::test]
async fn test_chatBackend_inPipeline_withMissingLanguage_shouldFail() -> Result<()> {
    let provider = MockChatProvider::replying(r#"{"translations": {"en": "Bye"}}"#);
    let backend = ChatBackend::new(provider, "m", 0.3, PromptTemplate::default());
    let pipeline = PipelineBuilder::new()
        .add_execution(
            Arc::new(backend),
            RetryPolicy { max_attempts: 2, ..RetryPolicy::default() },
            Arc::new(RecordingSleeper::new()),
            None,
        )
        .build()?;

    let mut req = TranslationRequest::new(1, "잘 가요", "", ["en", "ja"]);
    pipeline.process(&mut req, &RunContext::new()).await;

    assert_eq!(req.status(), RequestStatus::Failed);
    assert_eq!(req.attempts().len(), 2);
    assert_eq!(req.usage().input_tokens, 24);
    Ok(())
}

/// Test that the user prompt template is filled from the request
#[test]
fn test_promptTemplate_renderUser_shouldFillPlaceholders() {
    let template = PromptTemplate {
        system: String::new(),
        user: "{target_langs}|{context}|{text}".to_string(),
    };

    assert_eq!(template.render_user(&request("줄", &["en", "ja"])), "en,ja|앞 줄|줄");

    let mut without_context = request("줄", &["en"]);
    without_context.context = String::new();
    assert_eq!(template.render_user(&without_context), "en|(none)|줄");
}

/// Test the mock backend behaviors and counters
#[tokio::test]
async fn test_mockBackend_shouldCountCallsPerText() -> Result<()> {
    let backend = MockBackend::fail_first(1);
    let shared = backend.clone();

    assert!(backend.translate(&request("하나", &["en"])).await.is_err());
    let response = backend.translate(&request("하나", &["en"])).await?;

    assert_eq!(response.translations["en"], "[en] 하나");
    assert_eq!(response.usage, MOCK_USAGE);
    assert_eq!(shared.calls(), 2);
    assert_eq!(shared.calls_for("하나"), 2);
    assert_eq!(shared.calls_for("둘"), 0);
    Ok(())
}
