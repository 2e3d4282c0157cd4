//! Catalog-only client: no LLM call, the rendered template is the reply.

use async_trait::async_trait;

use crate::prompt::{strip_template_prefix, PromptPair};

use super::{LlmClient, ProviderError};

/// Returns the user prompt with any `Template:` prefix removed.
///
/// Meant for paraphrase mode, where the user prompt is the finished
/// sentence; `PhraserConfig::validate` rejects it in instruction mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateEchoClient;

#[async_trait]
impl LlmClient for TemplateEchoClient {
    async fn generate(&self, prompt: &PromptPair) -> Result<String, ProviderError> {
        Ok(strip_template_prefix(&prompt.user_prompt).to_owned())
    }

    fn model_id(&self) -> &str {
        "none/template-echo"
    }
}
