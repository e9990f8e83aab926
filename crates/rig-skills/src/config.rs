//! Orchestrator configuration
//!
//! Built once at startup and handed to the [`Router`](crate::Router). The
//! library never reads environment variables; the binary does that and
//! fills in this struct.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// How the router decides which skill a user turn targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Match skill names against the user input (no token cost)
    #[default]
    Keyword,
    /// Ask the backend, showing only the metadata catalog
    Backend,
}

impl DiscoveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Backend => "backend",
        }
    }
}

impl std::str::FromStr for DiscoveryMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keyword" | "heuristic" => Ok(Self::Keyword),
            "backend" | "model" | "llm" => Ok(Self::Backend),
            other => Err(ConfigError::Invalid(format!("unknown discovery mode: {}", other))),
        }
    }
}

/// Bounds for the activation context file walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    /// Maximum directory depth below the skill root
    pub max_depth: usize,
    /// Maximum number of files visited
    pub max_entries: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_entries: 500,
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Directory holding one sub-directory per skill package
    pub skills_root: PathBuf,
    /// Maximum tool-call rounds per user turn
    pub max_rounds: usize,
    /// Wall-clock limit for a single script run
    pub script_timeout: Duration,
    /// Cap on the text returned by one tool call
    pub max_tool_output_chars: usize,
    /// File walk bounds for activation contexts
    pub context_limits: ContextLimits,
    /// Skill selection strategy
    pub discovery: DiscoveryMode,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            skills_root: PathBuf::from("skills"),
            max_rounds: 10,
            script_timeout: Duration::from_secs(60),
            max_tool_output_chars: 20_000,
            context_limits: ContextLimits::default(),
            discovery: DiscoveryMode::Keyword,
        }
    }
}

impl AgentConfig {
    pub fn new(skills_root: impl Into<PathBuf>) -> Self {
        Self {
            skills_root: skills_root.into(),
            ..Default::default()
        }
    }

    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max;
        self
    }

    pub fn with_script_timeout(mut self, timeout: Duration) -> Self {
        self.script_timeout = timeout;
        self
    }

    pub fn with_max_tool_output_chars(mut self, max: usize) -> Self {
        self.max_tool_output_chars = max;
        self
    }

    pub fn with_context_limits(mut self, limits: ContextLimits) -> Self {
        self.context_limits = limits;
        self
    }

    pub fn with_discovery(mut self, mode: DiscoveryMode) -> Self {
        self.discovery = mode;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 {
            return Err(ConfigError::Invalid("max_rounds must be at least 1".to_string()));
        }
        if self.script_timeout.is_zero() {
            return Err(ConfigError::Invalid("script_timeout must be positive".to_string()));
        }
        if self.max_tool_output_chars == 0 {
            return Err(ConfigError::Invalid(
                "max_tool_output_chars must be at least 1".to_string(),
            ));
        }
        if self.context_limits.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "context max_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_rounds, 10);
        assert_eq!(config.script_timeout, Duration::from_secs(60));
        assert_eq!(config.max_tool_output_chars, 20_000);
        assert_eq!(config.context_limits.max_depth, 8);
        assert_eq!(config.discovery, DiscoveryMode::Keyword);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = AgentConfig::new("/opt/skills")
            .with_max_rounds(3)
            .with_discovery(DiscoveryMode::Backend);

        assert_eq!(config.skills_root, PathBuf::from("/opt/skills"));
        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.discovery, DiscoveryMode::Backend);
    }

    #[test]
    fn test_validate_rejects_zero_rounds() {
        let config = AgentConfig::default().with_max_rounds(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discovery_mode_from_str() {
        assert_eq!("keyword".parse::<DiscoveryMode>().unwrap(), DiscoveryMode::Keyword);
        assert_eq!("LLM".parse::<DiscoveryMode>().unwrap(), DiscoveryMode::Backend);
        assert!("random".parse::<DiscoveryMode>().is_err());
    }
}
