//! LLM client abstraction layer.
//!
//! Defines the [`LlmClient`] trait the phrasing service calls, the shared
//! [`ProviderError`] type, and HTTP helpers for provider implementations.
//!
//! Two clients are implemented:
//! - [`openai::OpenAiCompatClient`]: OpenAI-compatible `/chat/completions`
//!   (Groq, OpenAI, local servers)
//! - [`echo::TemplateEchoClient`]: no LLM; returns the rendered template

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::config::{LlmConfig, LlmProviderKind};
use crate::prompt::PromptPair;

pub mod echo;
pub mod openai;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by LLM clients.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match expected schema.
    #[error("provider response parse error: {0}")]
    Parse(String),
    /// Upstream provider responded with an error status.
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// Client cannot satisfy the request with current configuration.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Check HTTP response status and return body text or a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure, `ProviderError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

const MAX_ERROR_BODY_CHARS: usize = 256;

fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"gsk_[A-Za-z0-9]{20,}",
        r"sk-proj-[A-Za-z0-9_\-]{20,}",
        r"sk-[A-Za-z0-9]{32,}",
        r"Bearer\s+[A-Za-z0-9._\-]{16,}",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Text generation backend used by the phrasing service.
///
/// Implementations must be `Send + Sync` so one instance can serve
/// concurrent requests. Credentials belong to the implementation and never
/// travel inside the prompt.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate the reply text for a prompt pair.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on API, network, or parse failure.
    async fn generate(&self, prompt: &PromptPair) -> Result<String, ProviderError>;

    /// Identifier of the backing model, for logs.
    fn model_id(&self) -> &str;
}

/// Instantiate the client selected by `config`.
///
/// # Errors
///
/// Returns `ProviderError::Unavailable` when a hosted provider has no API key
/// or base URL, or `ProviderError::Request` if the HTTP client cannot be
/// built.
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, ProviderError> {
    match config.provider {
        LlmProviderKind::None => Ok(Arc::new(echo::TemplateEchoClient)),
        LlmProviderKind::Groq | LlmProviderKind::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    ProviderError::Unavailable(format!(
                        "no API key configured for provider '{}'",
                        config.provider
                    ))
                })?;
            let base_url = config.resolved_base_url().ok_or_else(|| {
                ProviderError::Unavailable(format!(
                    "no base URL configured for provider '{}'",
                    config.provider
                ))
            })?;
            let client = openai::OpenAiCompatClient::new(
                format!("{}/{}", config.provider, config.model),
                config.model.clone(),
                base_url,
                api_key,
                openai::GenerationParams {
                    max_tokens: config.max_tokens,
                    temperature: config.temperature,
                },
            )?;
            Ok(Arc::new(client))
        }
    }
}
