//! # Configuration Module
//!
//! Loads the binary's settings from the environment (and `.env`) once at
//! startup. The library never reads environment variables; everything it
//! needs is handed over as [`AgentConfig`] and [`LLMConfig`].

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use rig_skills::llm::{DEEPSEEK_BASE_URL, DEFAULT_ANTHROPIC_MODEL, OPENAI_BASE_URL};
use rig_skills::{AgentConfig, BackendKind, DiscoveryMode, LLMConfig};

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Main configuration for the skill agent.
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider name as given (`anthropic`, `openai`, `deepseek`)
    pub provider: String,

    /// Model override; `None` picks the provider default
    pub model: Option<String>,

    /// API key for the selected provider
    pub api_key: Option<String>,

    /// Base URL for OpenAI-compatible providers
    pub api_base: Option<String>,

    /// Directory holding one sub-directory per skill
    pub skills_dir: PathBuf,

    /// Maximum tool rounds per user turn
    pub max_rounds: usize,

    /// Wall-clock limit for one script run, in seconds
    pub script_timeout_secs: u64,

    /// Sampling temperature (0.0 = deterministic)
    pub temperature: Option<f64>,

    /// How skills are selected for a turn
    pub discovery: DiscoveryMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: None,
            api_key: None,
            api_base: None,
            skills_dir: PathBuf::from("skills"),
            max_rounds: 10,
            script_timeout_secs: 60,
            temperature: None,
            discovery: DiscoveryMode::Keyword,
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(val) = lookup("LLM_PROVIDER") {
            config.provider = val.trim().to_lowercase();
        }

        match config.provider.as_str() {
            "deepseek" => {
                config.api_key = lookup("DEEPSEEK_API_KEY");
                config.api_base = lookup("DEEPSEEK_BASE_URL");
                config.model = lookup("DEEPSEEK_MODEL_NAME");
            }
            "anthropic" | "claude" | "native" => {
                config.api_key = lookup("ANTHROPIC_API_KEY");
            }
            _ => {
                config.api_key = lookup("OPENAI_API_KEY");
                config.api_base = lookup("OPENAI_BASE_URL");
            }
        }

        if let Some(val) = lookup("LLM_MODEL") {
            config.model = Some(val);
        }

        if let Some(val) = lookup("SKILLS_DIR") {
            config.skills_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("MAX_ROUNDS") {
            config.max_rounds = val
                .parse()
                .context("MAX_ROUNDS must be a valid positive integer")?;
        }

        if let Some(val) = lookup("SCRIPT_TIMEOUT_SECS") {
            config.script_timeout_secs = val
                .parse()
                .context("SCRIPT_TIMEOUT_SECS must be a whole number of seconds")?;
        }

        if let Some(val) = lookup("LLM_TEMPERATURE") {
            config.temperature = Some(
                val.parse()
                    .context("LLM_TEMPERATURE must be a valid floating-point number (e.g., 0.2)")?,
            );
        }

        if let Some(val) = lookup("DISCOVERY_MODE") {
            config.discovery = val.parse()?;
        }

        Ok(config)
    }

    pub fn backend_kind(&self) -> Result<BackendKind> {
        Ok(self.provider.parse()?)
    }

    /// Model name, falling back to the provider default
    pub fn model_name(&self) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        match self.provider.as_str() {
            "deepseek" => "deepseek-chat".to_string(),
            "openai" | "openai-compatible" => "gpt-4o-mini".to_string(),
            _ => DEFAULT_ANTHROPIC_MODEL.to_string(),
        }
    }

    pub fn base_url(&self) -> String {
        if let Some(base) = &self.api_base {
            return base.clone();
        }
        match self.provider.as_str() {
            "deepseek" => DEEPSEEK_BASE_URL.to_string(),
            _ => OPENAI_BASE_URL.to_string(),
        }
    }

    /// Fail fast before anything is loaded
    pub fn validate(&self) -> Result<()> {
        let kind = self.backend_kind()?;

        if self.api_key.is_none() {
            let var = match (kind, self.provider.as_str()) {
                (BackendKind::Native, _) => "ANTHROPIC_API_KEY",
                (_, "deepseek") => "DEEPSEEK_API_KEY",
                _ => "OPENAI_API_KEY",
            };
            anyhow::bail!("{} is not set (provider: {})", var, self.provider);
        }

        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                anyhow::bail!("LLM_TEMPERATURE must be between 0.0 and 2.0, got: {}", t);
            }
        }

        self.agent_config().validate()?;
        Ok(())
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig::new(&self.skills_dir)
            .with_max_rounds(self.max_rounds)
            .with_script_timeout(Duration::from_secs(self.script_timeout_secs))
            .with_discovery(self.discovery)
    }

    pub fn llm_config(&self) -> LLMConfig {
        let mut config = LLMConfig::new(self.model_name());
        if let Some(t) = self.temperature {
            config = config.with_temperature(t);
        }
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key.clone());
        }
        if matches!(self.backend_kind(), Ok(BackendKind::OpenAICompatible)) {
            config = config.with_api_base(self.base_url());
        }
        config
    }
}
