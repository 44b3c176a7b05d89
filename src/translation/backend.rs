/*!
 * Translation backend capability and the chat-model adapter.
 *
 * `TranslationBackend` is the seam the execution stage calls: one source line
 * in, one line per target language out, plus token usage. `ChatBackend`
 * implements it on top of any chat completion `Provider` by asking the model
 * for a JSON object and parsing it.
 */

use std::collections::HashMap;
use std::fmt::Debug;
use std::ops::{Add, AddAssign};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;

use crate::errors::ProviderError;
use crate::providers::{ChatRequest, ChatResponse, Provider};

/// Token usage of one or more backend calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self { input_tokens, output_tokens }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, other: TokenUsage) -> TokenUsage {
        TokenUsage::new(
            self.input_tokens + other.input_tokens,
            self.output_tokens + other.output_tokens,
        )
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: TokenUsage) {
        *self = *self + other;
    }
}

/// One translation call
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub source_text: String,
    pub context: String,
    pub target_langs: Vec<String>,
    pub model_hint: Option<String>,
}

/// Translations keyed by language code
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendResponse {
    pub translations: HashMap<String, String>,
    pub usage: TokenUsage,
}

/// A service able to translate one line into several languages
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    async fn translate(&self, request: &BackendRequest) -> Result<BackendResponse, ProviderError>;
}

// @const: Text around the JSON answer that signals model commentary
const COMMENTARY_PATTERNS: &[&str] = &[
    "a proper translation would be",
    "should be a statement matching",
    "is not appropriate",
    "let me check",
    "i need to",
    "looking at the",
    "calling tool",
    "using tool",
    "tool call",
];

/// Default system prompt for chat models
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert translator of short subtitle lines.\n\
Translate the given line into every requested language accurately and naturally, \
keeping the tone and nuance of the original and using the context only as a reference.\n\
Answer with a single JSON object of the form {\"translations\": {\"<lang>\": \"<text>\", ...}} \
containing exactly the requested language codes and nothing else.";

/// Default user prompt; `{target_langs}`, `{context}` and `{text}` are substituted
pub const DEFAULT_USER_PROMPT: &str = "Target languages: {target_langs}\n\nContext:\n{context}\n\nLine to translate:\n{text}";

/// Prompt templates for `ChatBackend`
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            user: DEFAULT_USER_PROMPT.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Fill the user template for a request
    pub fn render_user(&self, request: &BackendRequest) -> String {
        let context = if request.context.trim().is_empty() { "(none)" } else { request.context.as_str() };
        self.user
            .replace("{target_langs}", &request.target_langs.join(","))
            .replace("{context}", context)
            .replace("{text}", &request.source_text)
    }
}

/// `TranslationBackend` over a chat completion provider
#[derive(Debug)]
pub struct ChatBackend<P> {
    provider: P,
    model: String,
    temperature: f32,
    prompt: PromptTemplate,
}

impl<P> ChatBackend<P>
where
    P: Provider<Request = ChatRequest, Response = ChatResponse>,
{
    pub fn new(provider: P, model: impl Into<String>, temperature: f32, prompt: PromptTemplate) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            prompt,
        }
    }

    /// Parse a model answer into translations for the requested languages.
    ///
    /// Accepts `{"translations": {...}}` or a flat `{lang: text}` object,
    /// optionally wrapped in a code fence.
    pub fn parse_translations(text: &str, target_langs: &[String]) -> Result<HashMap<String, String>, ProviderError> {
        let trimmed = text.trim();
        if trimmed.len() < 5 {
            return Err(ProviderError::ParseError("response is empty or too short".to_string()));
        }

        let (start, end) = match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if start < end => (start, end),
            _ => return Err(ProviderError::ParseError("response contains no JSON object".to_string())),
        };

        let surrounding = format!("{} {}", &trimmed[..start], &trimmed[end + 1..]).to_lowercase();
        if let Some(pattern) = COMMENTARY_PATTERNS.iter().find(|p| surrounding.contains(*p)) {
            return Err(ProviderError::ParseError(format!("response looks like commentary ({:?})", pattern)));
        }

        let value: Value = serde_json::from_str(&trimmed[start..=end])
            .map_err(|e| ProviderError::ParseError(format!("invalid JSON: {}", e)))?;
        let object = match value.get("translations") {
            Some(Value::Object(map)) => map,
            Some(_) => return Err(ProviderError::ParseError("\"translations\" is not an object".to_string())),
            None => value
                .as_object()
                .ok_or_else(|| ProviderError::ParseError("response is not a JSON object".to_string()))?,
        };

        let mut translations = HashMap::new();
        for lang in target_langs {
            let found = object
                .iter()
                .find(|(key, _)| key.trim().eq_ignore_ascii_case(lang))
                .and_then(|(_, v)| v.as_str());
            if let Some(text) = found {
                translations.insert(lang.clone(), text.trim().to_string());
            }
        }
        Ok(translations)
    }
}

#[async_trait]
impl<P> TranslationBackend for ChatBackend<P>
where
    P: Provider<Request = ChatRequest, Response = ChatResponse>,
{
    async fn translate(&self, request: &BackendRequest) -> Result<BackendResponse, ProviderError> {
        let model = request.model_hint.clone().unwrap_or_else(|| self.model.clone());
        let chat = ChatRequest {
            model,
            system: self.prompt.system.clone(),
            user: self.prompt.render_user(request),
            temperature: self.temperature,
            json_response: true,
        };

        let response = self.provider.complete(chat).await?;
        let text = P::extract_text(&response);
        debug!("Model answer: {}", text);

        let translations = Self::parse_translations(&text, &request.target_langs)?;
        Ok(BackendResponse {
            translations,
            usage: response.usage,
        })
    }
}
