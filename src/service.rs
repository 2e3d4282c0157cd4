//! Phrasing service: validated input in, phrased sentence out.
//!
//! Builds the prompt pair, calls the LLM client under a bounded timeout, and
//! checks the reply against the disclosure guardrail. Only failures of the
//! LLM step surface as errors; the prompt core never fails.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, DecisionKey};
use crate::config::PhraserConfig;
use crate::guardrail;
use crate::prompt::{PhraserInput, PromptBuilder};
use crate::providers::{self, LlmClient, ProviderError};

/// Inbound request body for `POST /phrase`.
///
/// Fields other than the key and price (strategy metadata such as `action`
/// or `policy_version`) are accepted and ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhraseRequest {
    /// Outcome to phrase.
    #[serde(default)]
    pub decision_key: Option<String>,
    /// Upstream name for the outcome; used when `decision_key` is absent.
    #[serde(default)]
    pub response_key: Option<String>,
    /// Price to state, if any.
    #[serde(default)]
    pub counter_price: Option<f64>,
}

/// Rejections of a request that parsed but is not a valid input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// Price below zero.
    #[error("counter_price must be non-negative, got {0}")]
    NegativePrice(f64),
    /// Price is NaN or infinite.
    #[error("counter_price must be a finite number")]
    NonFinitePrice,
}

impl PhraseRequest {
    /// Validate into a [`PhraserInput`].
    ///
    /// `decision_key` wins over `response_key`. With neither, the fallback
    /// key is used; unknown keys pass through and resolve to the fallback
    /// family later.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] when the price is negative or not finite.
    pub fn into_input(self) -> Result<PhraserInput, InputError> {
        if let Some(price) = self.counter_price {
            if !price.is_finite() {
                return Err(InputError::NonFinitePrice);
            }
            if price < 0.0 {
                return Err(InputError::NegativePrice(price));
            }
        }
        Ok(PhraserInput {
            decision_key: self
                .decision_key
                .or(self.response_key)
                .map(DecisionKey::from)
                .unwrap_or_default(),
            counter_price: self.counter_price,
        })
    }
}

/// Successful phrasing result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraserOutput {
    /// Sentence to send to the buyer.
    pub response_text: String,
}

/// Failures of the LLM step.
#[derive(Debug, Error)]
pub enum PhraseError {
    /// The client returned an error.
    #[error("LLM call failed: {0}")]
    Provider(#[from] ProviderError),
    /// The client did not answer in time.
    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),
    /// The client answered with blank text.
    #[error("LLM returned an empty response")]
    EmptyResponse,
    /// The reply contains disclosure terms.
    #[error("LLM response contains disclosure terms: {terms:?}")]
    Disclosure {
        /// Matched terms.
        terms: Vec<&'static str>,
    },
}

/// Request handler core shared by all HTTP tasks.
#[derive(Clone)]
pub struct PhrasingService {
    builder: Arc<PromptBuilder>,
    client: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl PhrasingService {
    /// Create a service from its parts.
    pub fn new(builder: Arc<PromptBuilder>, client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self {
            builder,
            client,
            timeout,
        }
    }

    /// Wire up catalog, prompt builder, and LLM client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured catalog cannot be loaded or the
    /// LLM client cannot be built.
    pub fn from_config(config: &PhraserConfig) -> anyhow::Result<Self> {
        let builder = Arc::new(load_builder(config)?);
        let client = providers::build_client(&config.llm).context("failed to build LLM client")?;
        info!(
            model = client.model_id(),
            prompt_mode = %builder.mode(),
            catalog_version = builder.catalog().version(),
            "phrasing service ready"
        );
        Ok(Self::new(
            builder,
            client,
            Duration::from_secs(config.llm.timeout_seconds),
        ))
    }

    /// Prompt builder in use.
    pub fn builder(&self) -> &PromptBuilder {
        &self.builder
    }

    /// Phrase one validated input.
    ///
    /// # Errors
    ///
    /// Returns [`PhraseError`] when the LLM call fails, times out, returns
    /// nothing, or returns text that trips the disclosure guardrail.
    pub async fn phrase(&self, input: &PhraserInput) -> Result<PhraserOutput, PhraseError> {
        let prompt = self.builder.build(input);

        let generated = tokio::time::timeout(self.timeout, self.client.generate(&prompt))
            .await
            .map_err(|_| PhraseError::Timeout(self.timeout))??;

        let text = generated.trim();
        if text.is_empty() {
            return Err(PhraseError::EmptyResponse);
        }

        let hits = guardrail::scan(text);
        if !hits.is_empty() {
            let terms: Vec<&'static str> = hits.iter().map(|h| h.term).collect();
            warn!(
                decision_key = %input.decision_key,
                terms = ?terms,
                "LLM response blocked by disclosure guardrail"
            );
            return Err(PhraseError::Disclosure { terms });
        }

        debug!(
            decision_key = %input.decision_key,
            model = self.client.model_id(),
            text_len = text.len(),
            "response phrased"
        );
        Ok(PhraserOutput {
            response_text: text.to_owned(),
        })
    }
}

/// Build the prompt builder for the configured mode and catalog.
///
/// # Errors
///
/// Returns an error if `prompt.catalog_path` is set and the file cannot be
/// loaded or fails validation.
pub fn load_builder(config: &PhraserConfig) -> anyhow::Result<PromptBuilder> {
    let mode = config.prompt.mode;
    let catalog = match &config.prompt.catalog_path {
        Some(path) => {
            let catalog = Catalog::load(path)
                .with_context(|| format!("failed to load catalog {}", path.display()))?;
            info!(path = %path.display(), version = catalog.version(), "loaded template catalog");
            catalog
        }
        None => Catalog::builtin(mode),
    };
    Ok(PromptBuilder::new(mode, catalog))
}
