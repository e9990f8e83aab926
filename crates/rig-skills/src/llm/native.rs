//! Native tool-calling backend on top of a rig-core agent
//!
//! The rig agent is used only for single completions: tool definitions are
//! passed per request and the router runs the tool loop itself.

use async_trait::async_trait;
use std::sync::Arc;

use rig::agent::Agent;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::{
    Completion, CompletionModel, Message as RigMessage, ToolDefinition as RigToolDefinition,
};
use rig::message::{AssistantContent, ToolCall as RigToolCall};
use rig::OneOrMany;
use tracing::debug;

use super::backend::{LLMBackend, LLMResponse};
use super::config::{LLMConfig, TokenUsage};
use crate::error::AgentError;
use crate::state::{Message, Role, ToolCall};
use crate::tools::ToolDefinition;

/// Anthropic requires max_tokens on every request
pub const DEFAULT_MAX_TOKENS: u64 = 4096;

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";

/// Wraps a rig `Agent<M>` as an [`LLMBackend`]
pub struct NativeToolCallingBackend<M>
where
    M: CompletionModel + Send + Sync,
{
    agent: Arc<Agent<M>>,
    provider_name: String,
    config: LLMConfig,
}

impl<M> NativeToolCallingBackend<M>
where
    M: CompletionModel + Send + Sync,
{
    pub fn new(agent: Agent<M>, provider_name: impl Into<String>, config: LLMConfig) -> Self {
        Self {
            agent: Arc::new(agent),
            provider_name: provider_name.into(),
            config,
        }
    }

    pub fn agent(&self) -> &Agent<M> {
        &self.agent
    }
}

/// Anthropic backend from an explicit API key
pub fn anthropic_backend(api_key: &str, config: LLMConfig) -> Arc<dyn LLMBackend> {
    let client = rig::providers::anthropic::Client::from_val(api_key.to_string());
    let model = if config.model.is_empty() {
        DEFAULT_ANTHROPIC_MODEL.to_string()
    } else {
        config.model.clone()
    };
    let max_tokens = config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

    let agent = client.agent(&model).max_tokens(max_tokens).build();
    let config = LLMConfig {
        model,
        max_tokens: Some(max_tokens),
        ..config
    };
    Arc::new(NativeToolCallingBackend::new(agent, "anthropic", config))
}

#[async_trait]
impl<M> LLMBackend for NativeToolCallingBackend<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse, AgentError> {
        let conversation = build_rig_conversation(messages);
        let mut builder = self
            .agent
            .completion(conversation.prompt, conversation.history)
            .await
            .map_err(|e| AgentError::Llm(format!("{} completion failed: {}", self.provider_name, e)))?;

        if let Some(preamble) = conversation.preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        let rig_tools = to_rig_tool_definitions(tools);
        if !rig_tools.is_empty() {
            builder = builder.tools(rig_tools);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AgentError::Llm(format!("{} completion failed: {}", self.provider_name, e)))?;

        let message = message_from_rig_choice(&response.choice);
        let usage = TokenUsage::from_rig_usage(&response.usage);
        debug!(
            provider = %self.provider_name,
            tool_calls = message.tool_calls.as_ref().map_or(0, Vec::len),
            total_tokens = usage.total_tokens,
            "completion received"
        );

        let mut llm_response = LLMResponse::new(message);
        if !usage.is_empty() {
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

impl<M> std::fmt::Debug for NativeToolCallingBackend<M>
where
    M: CompletionModel + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeToolCallingBackend")
            .field("provider_name", &self.provider_name)
            .field("model", &self.config.model)
            .finish()
    }
}

struct RigConversation {
    prompt: RigMessage,
    history: Vec<RigMessage>,
    preamble: Option<String>,
}

/// System messages become the preamble; the last message is the prompt
fn build_rig_conversation(messages: &[Message]) -> RigConversation {
    let mut system_parts = Vec::new();
    let mut rig_messages = Vec::new();

    for message in messages {
        match message.role {
            Role::System => {
                if !message.content.trim().is_empty() {
                    system_parts.push(message.content.clone());
                }
            }
            Role::User => rig_messages.push(RigMessage::user(message.content.clone())),
            Role::Assistant => rig_messages.push(convert_assistant_message(message)),
            Role::Tool => rig_messages.push(convert_tool_message(message)),
        }
    }

    let prompt = rig_messages.pop().unwrap_or_else(|| RigMessage::user(""));
    let preamble = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };

    RigConversation {
        prompt,
        history: rig_messages,
        preamble,
    }
}

fn convert_assistant_message(message: &Message) -> RigMessage {
    let mut contents = Vec::new();

    if !message.content.is_empty() {
        contents.push(AssistantContent::text(message.content.clone()));
    }
    for call in message.tool_calls.iter().flatten() {
        contents.push(AssistantContent::tool_call(
            call.id.clone(),
            call.name.clone(),
            call.arguments.clone(),
        ));
    }

    let content = OneOrMany::many(contents).unwrap_or_else(|_| OneOrMany::one(AssistantContent::text("")));
    RigMessage::Assistant { id: None, content }
}

fn convert_tool_message(message: &Message) -> RigMessage {
    let tool_id = message
        .tool_call_id
        .clone()
        .unwrap_or_else(|| "tool".to_string());
    RigMessage::tool_result(tool_id, message.content.clone())
}

fn to_rig_tool_definitions(tools: &[ToolDefinition]) -> Vec<RigToolDefinition> {
    tools
        .iter()
        .map(|tool| RigToolDefinition {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        })
        .collect()
}

fn message_from_rig_choice(choice: &OneOrMany<AssistantContent>) -> Message {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for item in choice.iter() {
        match item {
            AssistantContent::Text(t) => text.push_str(&t.text),
            AssistantContent::ToolCall(call) => tool_calls.push(convert_rig_tool_call(call)),
            _ => {}
        }
    }

    if tool_calls.is_empty() {
        Message::assistant(&text)
    } else {
        Message::assistant_with_tool_calls(&text, tool_calls)
    }
}

fn convert_rig_tool_call(tool_call: &RigToolCall) -> ToolCall {
    ToolCall {
        id: tool_call.id.clone(),
        name: tool_call.function.name.clone(),
        arguments: tool_call.function.arguments.clone(),
    }
}
