//! OpenAI-compatible client using the `/chat/completions` API.
//!
//! Groq, OpenAI, and most self-hosted servers accept this wire format.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::prompt::PromptPair;

use super::{check_http_response, LlmClient, ProviderError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Chat completions request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// System and user messages.
    pub messages: Vec<ChatMessage>,
    /// Maximum completion tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// A message in chat format.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct ChatMessage {
    /// Role (`system` or `user`).
    pub role: &'static str,
    /// Message text.
    pub content: String,
}

/// Chat completions response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Response choices.
    pub choices: Vec<ChatChoice>,
    /// Model that served the response.
    #[serde(default)]
    pub model: Option<String>,
    /// Token usage.
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

/// A response choice.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// Assistant message for this choice.
    pub message: ChatResponseMessage,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ChatResponseMessage {
    /// Text content.
    pub content: Option<String>,
}

/// Token usage statistics.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ChatUsage {
    /// Prompt token count.
    pub prompt_tokens: Option<u32>,
    /// Completion token count.
    pub completion_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Completion token limit.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    model_spec: String,
    model_name: String,
    endpoint: String,
    api_key: String,
    params: GenerationParams,
    client: reqwest::Client,
}

impl fmt::Debug for OpenAiCompatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatClient")
            .field("model_spec", &self.model_spec)
            .field("endpoint", &self.endpoint)
            .field("api_key", &"__REDACTED__")
            .field("params", &self.params)
            .finish()
    }
}

impl OpenAiCompatClient {
    /// Create a client for `model_name` at `base_url` (without the
    /// `/chat/completions` suffix).
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Request` if the HTTP client cannot be built.
    pub fn new(
        model_spec: String,
        model_name: String,
        base_url: String,
        api_key: String,
        params: GenerationParams,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            model_spec,
            model_name,
            endpoint: chat_completions_url(&base_url),
            api_key,
            params,
            client,
        })
    }

    /// Full chat completions URL this client posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Join a base URL and the `/chat/completions` path.
pub fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build the API request body for a prompt pair.
#[doc(hidden)]
pub fn build_request(model: &str, prompt: &PromptPair, params: GenerationParams) -> ChatRequest {
    ChatRequest {
        model: model.to_owned(),
        messages: vec![
            ChatMessage {
                role: "system",
                content: prompt.system_prompt.clone(),
            },
            ChatMessage {
                role: "user",
                content: prompt.user_prompt.clone(),
            },
        ],
        max_tokens: params.max_tokens,
        temperature: params.temperature,
    }
}

/// Extract the reply text from an API response body.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if the body cannot be deserialized or the
/// first choice carries no text.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<String, ProviderError> {
    let resp: ChatResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("missing choices[0]".to_owned()))?;

    debug!(
        model = resp.model.as_deref().unwrap_or("unknown"),
        finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
        prompt_tokens = resp.usage.as_ref().and_then(|u| u.prompt_tokens).unwrap_or(0),
        completion_tokens = resp
            .usage
            .as_ref()
            .and_then(|u| u.completion_tokens)
            .unwrap_or(0),
        "completion received"
    );

    choice
        .message
        .content
        .ok_or_else(|| ProviderError::Parse("missing choices[0].message.content".to_owned()))
}

// ---------------------------------------------------------------------------
// Trait impl
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn generate(&self, prompt: &PromptPair) -> Result<String, ProviderError> {
        let api_request = build_request(&self.model_name, prompt, self.params);

        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await?;

        let payload = check_http_response(response).await?;
        parse_response(&payload)
    }

    fn model_id(&self) -> &str {
        &self.model_spec
    }
}
