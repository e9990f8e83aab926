//! Per-user session state

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::context::ActivationContext;
use crate::skills::SkillDescriptor;
use crate::state::ConversationState;
use crate::tools::{ToolDefinition, ToolDescriptor};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    /// No active skill, general chat
    Idle,
    /// Selecting a skill for the current input
    Discovering,
    /// A skill is active, waiting for the next turn
    Active,
    /// Running the tool loop of the current turn
    Executing,
}

impl RouterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Active => "active",
            Self::Executing => "executing",
        }
    }
}

impl fmt::Display for RouterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conversation with the orchestrator
///
/// Owns its [`ConversationState`] and the activation context of the active
/// skill. Created by [`Router::session`](super::Router::session).
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    pub(crate) state: RouterState,
    pub(crate) conversation: ConversationState,
    pub(crate) activation: Option<ActivationContext>,
    pub(crate) span: tracing::Span,
}

impl Session {
    pub(crate) fn new(system_prompt: &str) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            state: RouterState::Idle,
            conversation: ConversationState::with_system_prompt(system_prompt),
            activation: None,
            span: tracing::info_span!("session", id = %id),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> RouterState {
        self.state
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn active_skill(&self) -> Option<&Arc<SkillDescriptor>> {
        self.conversation.active_skill()
    }

    pub fn active_skill_name(&self) -> Option<&str> {
        self.active_skill().map(|s| s.name())
    }

    pub fn activation(&self) -> Option<&ActivationContext> {
        self.activation.as_ref()
    }

    /// Tools of the active skill; empty while idle
    pub fn tools(&self) -> &[ToolDescriptor] {
        self.activation.as_ref().map(|a| a.tools()).unwrap_or(&[])
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools().iter().map(|t| t.definition.clone()).collect()
    }

    /// One-line status for the shell
    pub fn status(&self) -> String {
        match self.active_skill_name() {
            Some(name) => format!(
                "Active skill: {} ({} tools, {} messages)",
                name,
                self.tools().len(),
                self.conversation.messages().len()
            ),
            None => format!("No active skill ({})", self.state),
        }
    }

    /// Back to `Active` or `Idle` once a turn ends, however it ended
    pub(crate) fn settle(&mut self) {
        self.state = if self.activation.is_some() {
            RouterState::Active
        } else {
            RouterState::Idle
        };
    }
}
