//! OpenAI-compatible Chat Completions backend
//!
//! Talks plain HTTP to any endpoint that implements `/chat/completions` with
//! function tools (OpenAI, DeepSeek, local gateways). Transient failures
//! (timeouts, connection errors, 429, 5xx) are retried with exponential
//! backoff.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::backend::{LLMBackend, LLMResponse};
use super::config::{LLMConfig, TokenUsage};
use crate::error::AgentError;
use crate::state::{Message, Role, ToolCall};
use crate::tools::ToolDefinition;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Typed HTTP backend errors
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check API key")]
    Unauthorized,

    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Response contained no choices")]
    EmptyResponse,
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Timeout | LlmError::Connection(_) | LlmError::RateLimited | LlmError::ServerError(_, _)
        )
    }
}

impl From<LlmError> for AgentError {
    fn from(e: LlmError) -> Self {
        AgentError::Llm(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChatToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChatToolCall {
    id: String,
    function: ChatFunction,
}

#[derive(Debug, Deserialize)]
struct ChatFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Chat Completions backend
#[derive(Debug, Clone)]
pub struct OpenAICompatibleBackend {
    client: Client,
    api_key: String,
    base_url: String,
    provider_name: String,
    config: LLMConfig,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl OpenAICompatibleBackend {
    pub fn new(api_key: impl Into<String>, config: LLMConfig) -> Self {
        let base_url = config
            .api_base
            .clone()
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            provider_name: "openai-compatible".to_string(),
            config,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn execute_with_retry(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let mut last_error = LlmError::EmptyResponse;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_base_delay * 2u32.pow(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis(), "Retrying chat completion");
                tokio::time::sleep(delay).await;
            }

            match self.execute_single_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    warn!(attempt, error = %e, provider = %self.provider_name, "chat completion failed, will retry");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn execute_single_request(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else if e.is_connect() {
                    LlmError::Connection(e.to_string())
                } else {
                    LlmError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<ChatResponse>()
                .await
                .map_err(|e| LlmError::ParseError(e.to_string()));
        }

        let error_text = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(LlmError::Unauthorized),
            429 => Err(LlmError::RateLimited),
            400 => Err(LlmError::BadRequest(error_text)),
            500..=599 => Err(LlmError::ServerError(status.as_u16(), error_text)),
            _ => Err(LlmError::HttpError(status.as_u16(), error_text)),
        }
    }
}

#[async_trait]
impl LLMBackend for OpenAICompatibleBackend {
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse, AgentError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: messages.iter().map(to_wire_message).collect(),
            tools: tools.iter().map(to_wire_tool).collect(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self.execute_with_retry(&request).await?;
        let usage = response
            .usage
            .as_ref()
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));
        let choice = response.choices.into_iter().next().ok_or(LlmError::EmptyResponse)?;

        let message = from_wire_message(choice.message);
        debug!(
            provider = %self.provider_name,
            tool_calls = message.tool_calls.as_ref().map_or(0, Vec::len),
            "completion received"
        );

        let mut llm_response = LLMResponse::new(message);
        if let Some(usage) = usage.filter(|u| !u.is_empty()) {
            llm_response = llm_response.with_usage(usage);
        }
        Ok(llm_response)
    }

    fn name(&self) -> &str {
        &self.provider_name
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }
}

fn to_wire_message(message: &Message) -> Value {
    match message.role {
        Role::System => serde_json::json!({"role": "system", "content": message.content}),
        Role::User => serde_json::json!({"role": "user", "content": message.content}),
        Role::Tool => serde_json::json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id.clone().unwrap_or_default(),
            "content": message.content,
        }),
        Role::Assistant => {
            let mut wire = serde_json::json!({"role": "assistant", "content": message.content});
            if let Some(calls) = message.tool_calls.as_ref().filter(|c| !c.is_empty()) {
                let calls: Vec<Value> = calls
                    .iter()
                    .map(|call| {
                        let arguments = match &call.arguments {
                            Value::String(raw) => raw.clone(),
                            other => other.to_string(),
                        };
                        serde_json::json!({
                            "id": call.id,
                            "type": "function",
                            "function": {"name": call.name, "arguments": arguments},
                        })
                    })
                    .collect();
                wire["tool_calls"] = Value::Array(calls);
                if message.content.is_empty() {
                    wire["content"] = Value::Null;
                }
            }
            wire
        }
    }
}

fn to_wire_tool(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

/// Arguments that are not valid JSON stay a string; the dispatcher reports them
fn from_wire_message(message: ChatMessage) -> Message {
    let content = message.content.unwrap_or_default();
    if message.tool_calls.is_empty() {
        return Message::assistant(&content);
    }

    let calls = message
        .tool_calls
        .into_iter()
        .map(|call| ToolCall {
            id: call.id,
            name: call.function.name,
            arguments: serde_json::from_str(&call.function.arguments)
                .unwrap_or(Value::String(call.function.arguments)),
        })
        .collect();
    Message::assistant_with_tool_calls(&content, calls)
}
