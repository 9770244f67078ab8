//! # Configuration Module
//!
//! Loads process configuration from the environment (and a `.env` file when
//! present), validates it, and derives the engine's [`ResearchSettings`].

use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::time::Duration;

use crate::limiter::DEFAULT_CONCURRENCY;
use crate::research::ResearchSettings;
use crate::text::DEFAULT_CONTEXT_SIZE;
use crate::tools::DEFAULT_FIRECRAWL_BASE_URL;

// =============================================================================
// LLM PROVIDER
// =============================================================================
/// Which LLM backend drives planning, analysis and synthesis.
///
/// # Rust Concept: Deriving ValueEnum
/// `clap::ValueEnum` lets the same enum back the `--provider` flag, while the
/// `FromStr` impl below parses the `LLM_PROVIDER` environment variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LlmProvider {
    /// Local models via Ollama
    #[default]
    Ollama,
    /// OpenAI API
    #[value(name = "openai")]
    OpenAI,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::Ollama => write!(f, "ollama"),
            LlmProvider::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" => Ok(LlmProvider::OpenAI),
            other => anyhow::bail!("LLM_PROVIDER must be 'ollama' or 'openai', got: {}", other),
        }
    }
}

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Main configuration for the research agent.
///
/// Everything here can come from the environment (or `.env`); the CLI then
/// overrides provider, model and concurrency. The engine itself only sees the
/// [`ResearchSettings`] derived from it.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: LlmProvider,

    /// The Ollama model to use (e.g., "llama3.2")
    pub ollama_model: String,

    /// Ollama server URL (default: http://localhost:11434)
    pub ollama_host: String,

    /// The OpenAI model to use (e.g., "gpt-4o-mini")
    pub openai_model: String,

    /// Required when the provider is OpenAI
    pub openai_api_key: Option<String>,

    /// Temperature for LLM responses (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// Firecrawl API key; optional for self-hosted instances
    pub firecrawl_key: Option<String>,

    /// Firecrawl endpoint; point it at a self-hosted instance if needed
    pub firecrawl_base_url: String,

    /// Branches in flight at once
    pub concurrency: usize,

    /// Default token budget for trimming
    pub context_size: usize,

    /// Delay before each search request
    pub rate_limit_delay_ms: u64,

    /// Log filter used when `--verbose` is not given (from RUST_LOG)
    pub log_level: String,
}

// =============================================================================
// DEFAULT IMPLEMENTATION
// =============================================================================
/// Defaults target a local Ollama install and the hosted Firecrawl API.
impl Default for Config {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            ollama_model: "llama3.2".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_api_key: None,
            temperature: 0.7,
            firecrawl_key: None,
            firecrawl_base_url: DEFAULT_FIRECRAWL_BASE_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            context_size: DEFAULT_CONTEXT_SIZE,
            rate_limit_delay_ms: 1000,
            log_level: "info".to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first, if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup, starting from defaults.
    ///
    /// # Rust Concept: Generic Closures
    /// Taking `F: Fn(&str) -> Option<String>` instead of reading `std::env`
    /// directly keeps this function pure, so tests can feed it a `HashMap`.
    /// Empty API keys are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(val) = lookup("LLM_PROVIDER") {
            config.provider = val.parse()?;
        }

        if let Some(val) = lookup("OLLAMA_MODEL") {
            config.ollama_model = val;
        }

        if let Some(val) = lookup("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        if let Some(val) = lookup("OPENAI_MODEL") {
            config.openai_model = val;
        }

        config.openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty());

        if let Some(val) = lookup("TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g., 0.7)")?;
        }

        config.firecrawl_key = lookup("FIRECRAWL_KEY").filter(|k| !k.is_empty());

        if let Some(val) = lookup("FIRECRAWL_BASE_URL") {
            config.firecrawl_base_url = val;
        }

        if let Some(val) = lookup("FIRECRAWL_CONCURRENCY") {
            config.concurrency = val
                .parse()
                .context("FIRECRAWL_CONCURRENCY must be a valid positive integer")?;
        }

        if let Some(val) = lookup("CONTEXT_SIZE") {
            config.context_size = val
                .parse()
                .context("CONTEXT_SIZE must be a valid positive integer")?;
        }

        if let Some(val) = lookup("RATE_LIMIT_DELAY_MS") {
            config.rate_limit_delay_ms = val
                .parse()
                .context("RATE_LIMIT_DELAY_MS must be a number of milliseconds")?;
        }

        if let Some(val) = lookup("RUST_LOG") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// The model name for the active provider.
    pub fn model(&self) -> &str {
        match self.provider {
            LlmProvider::Ollama => &self.ollama_model,
            LlmProvider::OpenAI => &self.openai_model,
        }
    }

    /// Override the model name for the active provider.
    pub fn set_model(&mut self, model: impl Into<String>) {
        match self.provider {
            LlmProvider::Ollama => self.ollama_model = model.into(),
            LlmProvider::OpenAI => self.openai_model = model.into(),
        }
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================
    /// Validate the configuration before the agent starts.
    ///
    /// Catches mistakes early with a readable message instead of a failed
    /// HTTP call halfway through a research run.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if self.concurrency == 0 {
            anyhow::bail!("FIRECRAWL_CONCURRENCY must be at least 1");
        }

        if self.context_size == 0 {
            anyhow::bail!("CONTEXT_SIZE must be at least 1");
        }

        if self.model().is_empty() {
            anyhow::bail!("Model name cannot be empty for provider {}", self.provider);
        }

        if self.provider == LlmProvider::OpenAI && self.openai_api_key.is_none() {
            anyhow::bail!("OPENAI_API_KEY must be set when LLM_PROVIDER is openai");
        }

        if self.firecrawl_base_url.is_empty() {
            anyhow::bail!("FIRECRAWL_BASE_URL cannot be empty");
        }

        Ok(())
    }

    /// Engine settings derived from this configuration.
    pub fn research_settings(&self) -> ResearchSettings {
        ResearchSettings::default()
            .with_concurrency(self.concurrency)
            .with_context_size(self.context_size)
            .with_rate_limit_delay(Duration::from_millis(self.rate_limit_delay_ms))
    }
}
