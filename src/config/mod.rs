//! Configuration loading and management.
//!
//! Loads configuration from `./phraser.toml` (or `$PHRASER_CONFIG_PATH`).
//! Environment variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::prompt::PromptMode;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "phraser.toml";

// ── Top-level config ────────────────────────────────────────────

/// Top-level service configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PhraserConfig {
    /// HTTP listener settings (`[server]`).
    pub server: ServerConfig,
    /// LLM client settings (`[llm]`).
    pub llm: LlmConfig,
    /// Prompt construction settings (`[prompt]`).
    pub prompt: PromptConfig,
    /// Logging settings (`[logging]`).
    pub logging: LoggingConfig,
}

impl PhraserConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// `path` overrides `$PHRASER_CONFIG_PATH`. If the file does not exist,
    /// defaults are used. A `.env` file in the working directory is read
    /// first so its variables take part in the overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "failed to read .env file");
            }
        }

        let path = path.unwrap_or_else(|| Self::config_path_with(|key| std::env::var(key).ok()));
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from TOML file only, no env overrides.
    fn load_from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve config path using a custom env resolver (for testing).
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("PHRASER_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids unsafe `set_var` in tests).
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        // Server.
        if let Some(v) = env("PHRASER_BIND") {
            self.server.bind = v;
        }

        // LLM.
        if let Some(v) = env("PHRASER_LLM_PROVIDER") {
            parse_override("PHRASER_LLM_PROVIDER", &v, &mut self.llm.provider);
        }
        if let Some(v) = env("PHRASER_LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Some(v) = env("PHRASER_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = env("PHRASER_LLM_TIMEOUT_SECS") {
            parse_override("PHRASER_LLM_TIMEOUT_SECS", &v, &mut self.llm.timeout_seconds);
        }

        // API key: the generic variable wins, then the provider's own.
        let provider_key_var = match self.llm.provider {
            LlmProviderKind::Groq => Some("GROQ_API_KEY"),
            LlmProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            LlmProviderKind::None => None,
        };
        if let Some(key) = env("PHRASER_LLM_API_KEY").or_else(|| provider_key_var.and_then(&env)) {
            self.llm.api_key = Some(key);
        }

        // Prompt.
        if let Some(v) = env("PHRASER_PROMPT_MODE") {
            parse_override("PHRASER_PROMPT_MODE", &v, &mut self.prompt.mode);
        }
        if let Some(v) = env("PHRASER_CATALOG_PATH") {
            self.prompt.catalog_path = Some(PathBuf::from(v));
        }

        // Logging.
        if let Some(v) = env("PHRASER_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("PHRASER_LOGS_DIR") {
            self.logging.logs_dir = Some(PathBuf::from(v));
        }
    }

    /// Parse a TOML string into config (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has the wrong shape.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: PhraserConfig =
            toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Check cross-field constraints needed to serve requests.
    ///
    /// # Errors
    ///
    /// Returns an error when a hosted provider has no API key, when the
    /// template echo provider is combined with instruction mode, or when the
    /// LLM timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.llm.timeout_seconds == 0 {
            anyhow::bail!("llm.timeout_seconds must be greater than zero");
        }
        match self.llm.provider {
            LlmProviderKind::Groq | LlmProviderKind::OpenAi => {
                if self.llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                    anyhow::bail!(
                        "missing API key for LLM provider '{}': set PHRASER_LLM_API_KEY or {}",
                        self.llm.provider,
                        match self.llm.provider {
                            LlmProviderKind::OpenAi => "OPENAI_API_KEY",
                            _ => "GROQ_API_KEY",
                        }
                    );
                }
            }
            LlmProviderKind::None => {
                if self.prompt.mode == PromptMode::Instruction {
                    anyhow::bail!(
                        "llm.provider = \"none\" echoes templates and requires prompt.mode = \"paraphrase\""
                    );
                }
            }
        }
        Ok(())
    }
}

fn parse_override<T: FromStr>(var: &str, value: &str, target: &mut T) {
    match value.parse() {
        Ok(parsed) => *target = parsed,
        Err(_) => tracing::warn!(var, value, "ignoring invalid env override"),
    }
}

// ── Server config ───────────────────────────────────────────────

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:8000`.
    pub bind: String,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            max_body_bytes: 16_384,
        }
    }
}

// ── LLM config ──────────────────────────────────────────────────

/// Which LLM backend phrases the prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// Groq's OpenAI-compatible API.
    #[default]
    Groq,
    /// OpenAI chat completions API.
    #[serde(rename = "openai")]
    OpenAi,
    /// No LLM: return the rendered template sentence as-is.
    None,
}

impl LlmProviderKind {
    /// Default chat completions base URL for the provider.
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::Groq => Some("https://api.groq.com/openai/v1"),
            Self::OpenAi => Some("https://api.openai.com/v1"),
            Self::None => None,
        }
    }
}

impl fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
            Self::None => "none",
        })
    }
}

impl FromStr for LlmProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAi),
            "none" => Ok(Self::None),
            other => Err(format!("unknown LLM provider {other:?}")),
        }
    }
}

/// LLM client settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend selection.
    pub provider: LlmProviderKind,
    /// Chat completions base URL; defaults per provider.
    pub base_url: Option<String>,
    /// Model name.
    pub model: String,
    /// API key. Prefer supplying it through the environment.
    pub api_key: Option<String>,
    /// Upper bound on one LLM call, in seconds.
    pub timeout_seconds: u64,
    /// Completion token limit.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl LlmConfig {
    /// Base URL to use: explicit setting, else the provider default.
    pub fn resolved_base_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| self.provider.default_base_url().map(str::to_owned))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::Groq,
            base_url: None,
            model: "llama-3.1-8b-instant".to_string(),
            api_key: None,
            timeout_seconds: 15,
            max_tokens: 120,
            temperature: 0.7,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "__REDACTED__"))
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

// ── Prompt config ───────────────────────────────────────────────

/// Prompt construction settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Paraphrase (default) or instruction mode.
    pub mode: PromptMode,
    /// Optional TOML catalog replacing the built-in templates.
    pub catalog_path: Option<PathBuf>,
}

// ── Logging config ──────────────────────────────────────────────

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily-rotated JSON logs; stderr only when unset.
    pub logs_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            logs_dir: None,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
