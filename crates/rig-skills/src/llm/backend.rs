//! Backend abstraction

use async_trait::async_trait;

use super::config::TokenUsage;
use crate::error::{AgentError, ConfigError};
use crate::state::Message;
use crate::tools::ToolDefinition;

/// One completion: the assistant message plus optional usage
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub message: Message,
    pub usage: Option<TokenUsage>,
}

impl LLMResponse {
    pub fn new(message: Message) -> Self {
        Self { message, usage: None }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Chat backend with tool calling
///
/// Receives the whole conversation every round; implementations keep no
/// conversation state of their own.
#[async_trait]
pub trait LLMBackend: Send + Sync {
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse, AgentError>;

    /// Provider name for logs
    fn name(&self) -> &str;

    fn default_model(&self) -> &str;
}

/// Which backend implementation to build at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// rig-core agent with native tool calling (Anthropic)
    Native,
    /// Chat Completions over HTTP (OpenAI, DeepSeek, ...)
    OpenAICompatible,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::OpenAICompatible => "openai-compatible",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" | "native" => Ok(Self::Native),
            "openai" | "deepseek" | "openai-compatible" => Ok(Self::OpenAICompatible),
            other => Err(ConfigError::Invalid(format!("unknown LLM provider: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("anthropic".parse::<BackendKind>().unwrap(), BackendKind::Native);
        assert_eq!("DeepSeek".parse::<BackendKind>().unwrap(), BackendKind::OpenAICompatible);
        assert!("gemini".parse::<BackendKind>().is_err());
    }
}
