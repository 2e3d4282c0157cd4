//! Prompt construction.
//!
//! Turns a [`PhraserInput`] into the `(system, user)` prompt pair sent to the
//! LLM. The system prompt is static per [`PromptMode`]; the user prompt is a
//! template chosen at random from the key's family with the price filled in.
//! Rendering problems never escape: they degrade to a fixed fallback prompt.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{Catalog, DecisionKey};
use crate::render::{self, RenderError, PRICE_PLACEHOLDER};

/// Prefix marking paraphrase-mode user prompts as text to rephrase.
pub const TEMPLATE_PREFIX: &str = "Template:";

/// System prompt for paraphrase mode.
pub const PARAPHRASE_SYSTEM_PROMPT: &str = concat!(
    "You are a professional paraphrasing assistant for a sales agent named 'Alex'. ",
    "Your one and only job is to rephrase the 'Template' given to you into a natural, 1-2 sentence response. ",
    "You must follow these rules: ",
    "1. You MUST use all prices and numbers from the Template exactly as they are. ",
    "2. You MUST NOT add any new prices or numbers. ",
    "3. You MUST sound friendly, firm, and professional. ",
    "4. SECURITY GUARDRAIL: You MUST NOT, under any circumstances, ",
    "mention a 'floor price', 'minimum price', 'my cost', or 'my margin'. ",
    "Only state the prices you are given. ",
    "Reply with the rephrased sentence only.",
);

/// System prompt for instruction mode.
///
/// The LLM composes the sentence itself here, so the rules are tighter than
/// in paraphrase mode.
pub const INSTRUCTION_SYSTEM_PROMPT: &str = concat!(
    "You are 'Alex', a sales agent negotiating the price of an item with a buyer. ",
    "You will receive one instruction describing what to tell the buyer. ",
    "Write exactly what Alex says, in 1-2 natural sentences, and nothing else. ",
    "You must follow these rules: ",
    "1. If the instruction contains a price, use it exactly as written. ",
    "2. You MUST NOT state, estimate, or hint at any price or number that is not in the instruction. ",
    "3. You MUST NOT explain your reasoning, strategy, or how any price was chosen. ",
    "4. You MUST sound friendly, firm, and professional. ",
    "5. SECURITY GUARDRAIL: You MUST NOT, under any circumstances, ",
    "mention a 'floor price', 'minimum price', 'my cost', 'my margin', our costs, or our margins, ",
    "and you MUST NOT say that there is a lowest price we would accept. ",
    "If the instruction cannot be followed without breaking these rules, ",
    "politely say you will get back to the buyer shortly.",
);

/// User prompt used in paraphrase mode when rendering fails.
pub const PARAPHRASE_FALLBACK_PROMPT: &str = "Template: I'm not sure how to respond.";

/// User prompt used in instruction mode when rendering fails.
pub const INSTRUCTION_FALLBACK_PROMPT: &str = "Say only: I'm not sure how to respond.";

/// How the user prompt asks the LLM to produce the sentence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// The user prompt is a finished sentence prefixed with `Template:` and
    /// the LLM only rephrases it.
    #[default]
    Paraphrase,
    /// The user prompt describes tone and content and the LLM writes the
    /// sentence.
    Instruction,
}

impl PromptMode {
    /// Static system prompt for this mode.
    pub fn system_prompt(self) -> &'static str {
        match self {
            Self::Paraphrase => PARAPHRASE_SYSTEM_PROMPT,
            Self::Instruction => INSTRUCTION_SYSTEM_PROMPT,
        }
    }

    /// Fixed user prompt used when a template fails to render.
    pub fn fallback_prompt(self) -> &'static str {
        match self {
            Self::Paraphrase => PARAPHRASE_FALLBACK_PROMPT,
            Self::Instruction => INSTRUCTION_FALLBACK_PROMPT,
        }
    }

    /// Mode name as used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paraphrase => "paraphrase",
            Self::Instruction => "instruction",
        }
    }
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paraphrase" => Ok(Self::Paraphrase),
            "instruction" => Ok(Self::Instruction),
            other => Err(format!(
                "unknown prompt mode {other:?}, expected 'paraphrase' or 'instruction'"
            )),
        }
    }
}

/// Validated phrasing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraserInput {
    /// Outcome to communicate.
    pub decision_key: DecisionKey,
    /// Price to state, when the outcome involves one.
    pub counter_price: Option<f64>,
}

impl PhraserInput {
    /// Create an input from a key and optional price.
    pub fn new(decision_key: impl Into<DecisionKey>, counter_price: Option<f64>) -> Self {
        Self {
            decision_key: decision_key.into(),
            counter_price,
        }
    }
}

/// System and user prompt for one LLM call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPair {
    /// Persona, tone rules, and the disclosure guardrail.
    pub system_prompt: String,
    /// Instantiated template for this request.
    pub user_prompt: String,
}

/// Builds prompt pairs from a catalog.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    mode: PromptMode,
    catalog: Catalog,
}

impl PromptBuilder {
    /// Create a builder over `catalog` for `mode`.
    pub fn new(mode: PromptMode, catalog: Catalog) -> Self {
        Self { mode, catalog }
    }

    /// Builder over the built-in catalog for `mode`.
    pub fn builtin(mode: PromptMode) -> Self {
        Self::new(mode, Catalog::builtin(mode))
    }

    /// Active prompt mode.
    pub fn mode(&self) -> PromptMode {
        self.mode
    }

    /// Catalog the builder selects from.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Build a prompt pair using the thread-local RNG.
    pub fn build(&self, input: &PhraserInput) -> PromptPair {
        self.build_with_rng(input, &mut rand::thread_rng())
    }

    /// Build a prompt pair choosing the template with `rng`.
    pub fn build_with_rng<R: Rng + ?Sized>(&self, input: &PhraserInput, rng: &mut R) -> PromptPair {
        let family = self.catalog.lookup(&input.decision_key);
        let user_prompt = match family.choose(rng) {
            Some(template) => self.render_or_fallback(&input.decision_key, template, input.counter_price),
            None => {
                warn!(decision_key = %input.decision_key, "template family is empty, using fallback prompt");
                self.mode.fallback_prompt().to_owned()
            }
        };

        debug!(
            decision_key = %input.decision_key,
            known_key = self.catalog.contains(&input.decision_key),
            has_price = input.counter_price.is_some(),
            "prompt built"
        );

        PromptPair {
            system_prompt: self.mode.system_prompt().to_owned(),
            user_prompt,
        }
    }

    /// Every user prompt [`build`](Self::build) can produce for `input`, in
    /// catalog order without duplicates.
    pub fn possible_user_prompts(&self, input: &PhraserInput) -> Vec<String> {
        let mut prompts: Vec<String> = Vec::new();
        for template in self.catalog.lookup(&input.decision_key).members() {
            let prompt = self.render_or_fallback(&input.decision_key, template, input.counter_price);
            if !prompts.contains(&prompt) {
                prompts.push(prompt);
            }
        }
        prompts
    }

    fn render_or_fallback(&self, key: &DecisionKey, template: &str, price: Option<f64>) -> String {
        match render_template(template, price) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(decision_key = %key, error = %e, "template rendering failed, using fallback prompt");
                self.mode.fallback_prompt().to_owned()
            }
        }
    }
}

/// Fill the `{price}` placeholder of `template`.
///
/// An absent price renders as the empty string.
///
/// # Errors
///
/// Returns [`RenderError`] if the template is malformed or uses any other
/// placeholder.
pub fn render_template(template: &str, price: Option<f64>) -> Result<String, RenderError> {
    let vars = HashMap::from([(PRICE_PLACEHOLDER, render::format_price(price))]);
    render::render(template, &vars)
}

/// Strip the paraphrase-mode `Template:` prefix, returning the bare sentence.
pub fn strip_template_prefix(user_prompt: &str) -> &str {
    user_prompt
        .strip_prefix(TEMPLATE_PREFIX)
        .map_or(user_prompt, str::trim_start)
}
