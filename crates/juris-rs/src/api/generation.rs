//! Text-generation and chat ports.
//!
//! The pipeline never talks to a provider directly. Decomposition, per-tool
//! synthesis and composition go through [`TextGenerator`]; the agent loop
//! goes through [`ChatModel`]. Both are dyn-compatible so tests can swap in
//! scripted stubs.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use super::retry::{RetryConfig, retry_with_backoff};
use crate::{
    ChatCompletion, ChatRequest, GenerateError, Message, OpenRouterClient, ResponseFormat,
    ResponseFormatType,
};

/// Boxed future returned by [`TextGenerator::generate`].
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<String, GenerateError>> + Send + 'a>>;

/// Boxed future returned by [`ChatModel::complete`].
pub type ChatFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ChatCompletion, GenerateError>> + Send + 'a>>;

/// Single-prompt text generation.
///
/// `schema_hint` is a JSON Schema the output should conform to. Providers
/// that support structured output use it; others may ignore it, so callers
/// still validate what comes back.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str, schema_hint: Option<&'a str>) -> GenerateFuture<'a>;
}

impl<G: TextGenerator + ?Sized> TextGenerator for Arc<G> {
    fn generate<'a>(&'a self, prompt: &'a str, schema_hint: Option<&'a str>) -> GenerateFuture<'a> {
        (**self).generate(prompt, schema_hint)
    }
}

/// Multi-turn chat completion with tool calling, used by the agent loop.
pub trait ChatModel: Send + Sync {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> ChatFuture<'a>;
}

impl ChatModel for OpenRouterClient {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> ChatFuture<'a> {
        Box::pin(self.chat(request))
    }
}

impl<C: ChatModel + ?Sized> ChatModel for Arc<C> {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> ChatFuture<'a> {
        (**self).complete(request)
    }
}

// ── OpenRouterGenerator ────────────────────────────────────────────

/// [`TextGenerator`] backed by the OpenRouter chat completions endpoint.
///
/// Each prompt is sent as one user message. When a schema hint is given the
/// request asks for a JSON object and carries the schema in a system message.
pub struct OpenRouterGenerator {
    client: Arc<OpenRouterClient>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenRouterGenerator {
    pub fn new(client: Arc<OpenRouterClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: 2048,
            temperature: 0.0,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt: &str, schema_hint: Option<&str>) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(schema) = schema_hint {
            messages.push(Message::system(format!(
                "Respond only with a JSON object that conforms to this JSON Schema:\n{schema}"
            )));
        }
        messages.push(Message::user(prompt));

        ChatRequest {
            model: Some(self.model.clone()),
            messages,
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
            response_format: schema_hint.map(|_| ResponseFormat {
                fmt_type: ResponseFormatType::JsonObject,
            }),
            ..Default::default()
        }
    }
}

impl fmt::Debug for OpenRouterGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterGenerator")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl TextGenerator for OpenRouterGenerator {
    fn generate<'a>(&'a self, prompt: &'a str, schema_hint: Option<&'a str>) -> GenerateFuture<'a> {
        Box::pin(async move {
            let body = self.request(prompt, schema_hint);
            let completion = self.client.chat(&body).await?;
            match completion.content {
                Some(text) if !text.trim().is_empty() => Ok(text),
                _ => {
                    debug!("Generator received empty completion from {}", self.model);
                    Err(GenerateError::Content("model returned no text".into()))
                }
            }
        })
    }
}

// ── RetryingGenerator ──────────────────────────────────────────────

/// Wraps a generator with bounded exponential backoff on transient errors.
pub struct RetryingGenerator<G> {
    inner: G,
    retry: RetryConfig,
}

impl<G: TextGenerator> RetryingGenerator<G> {
    pub fn new(inner: G, retry: RetryConfig) -> Self {
        Self { inner, retry }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

impl<G: TextGenerator> TextGenerator for RetryingGenerator<G> {
    fn generate<'a>(&'a self, prompt: &'a str, schema_hint: Option<&'a str>) -> GenerateFuture<'a> {
        Box::pin(retry_with_backoff(&self.retry, move || {
            self.inner.generate(prompt, schema_hint)
        }))
    }
}

// ── FnGenerator ────────────────────────────────────────────────────

type GenerateHandler = Box<dyn Fn(&str, Option<&str>) -> Result<String, GenerateError> + Send + Sync>;

/// A closure-backed [`TextGenerator`].
///
/// Handy for scripted tests and offline runs where the answer can be
/// computed from the prompt alone.
///
/// ```
/// use juris_rs::api::generation::FnGenerator;
///
/// let echo = FnGenerator::new(|prompt, _schema| Ok(format!("echo: {prompt}")));
/// ```
pub struct FnGenerator {
    handler: GenerateHandler,
}

impl FnGenerator {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, Option<&str>) -> Result<String, GenerateError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
        }
    }
}

impl fmt::Debug for FnGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnGenerator").finish_non_exhaustive()
    }
}

impl TextGenerator for FnGenerator {
    fn generate<'a>(&'a self, prompt: &'a str, schema_hint: Option<&'a str>) -> GenerateFuture<'a> {
        let result = (self.handler)(prompt, schema_hint);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn schema_hint_requests_json_output() {
        let client = Arc::new(OpenRouterClient::new("test-key").unwrap());
        let generator = OpenRouterGenerator::new(client, "openai/gpt-4");

        let plain = generator.request("hello", None);
        assert_eq!(plain.messages.len(), 1);
        assert!(plain.response_format.is_none());
        // Deterministic synthesis: zero must reach the provider, not its default.
        assert_eq!(serde_json::to_value(&plain).unwrap()["temperature"], 0.0);

        let structured = generator.request("hello", Some(r#"{"type":"object"}"#));
        assert_eq!(structured.messages.len(), 2);
        assert!(
            structured.messages[0]
                .content
                .as_deref()
                .unwrap()
                .contains(r#"{"type":"object"}"#)
        );
        assert_eq!(
            structured.response_format.unwrap().fmt_type,
            ResponseFormatType::JsonObject
        );
    }

    #[tokio::test]
    async fn fn_generator_sees_prompt_and_hint() {
        let generator = FnGenerator::new(|prompt, hint| {
            Ok(format!("{prompt}|{}", hint.unwrap_or("-")))
        });
        assert_eq!(generator.generate("q", None).await.unwrap(), "q|-");
        assert_eq!(generator.generate("q", Some("s")).await.unwrap(), "q|s");
    }

    #[tokio::test]
    async fn retrying_generator_recovers_from_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let flaky = FnGenerator::new(move |_, _| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(GenerateError::Transient("HTTP 429".into()))
            } else {
                Ok("answer".into())
            }
        });
        let generator = RetryingGenerator::new(flaky, RetryConfig::immediate(2));

        assert_eq!(generator.generate("q", None).await.unwrap(), "answer");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retrying_generator_passes_content_errors_through() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let broken = FnGenerator::new(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Err(GenerateError::Content("refused".into()))
        });
        let generator = RetryingGenerator::new(broken, RetryConfig::immediate(5));

        let err = generator.generate("q", None).await.unwrap_err();
        assert_eq!(err, GenerateError::Content("refused".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
