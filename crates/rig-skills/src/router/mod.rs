//! Skill lifecycle state machine
//!
//! Each user turn goes through up to three stages:
//!
//! ```text
//!  Idle ──input──▶ Discovering ──skill chosen──▶ Active ──▶ Executing ─┐
//!   ▲                  │                           ▲                   │
//!   │                  └──no candidate─────────────┼───────────────────┤
//!   └──────────── deactivate ──────────────────────┴──── turn done ◀───┘
//! ```
//!
//! Discovery only sees the metadata catalog. Activation builds the
//! [`ActivationContext`] once and injects it as a system message. Execution
//! sends the conversation to the backend and resolves tool calls in emission
//! order until the model answers or `max_rounds` is reached.

mod discovery;
mod session;

pub use discovery::{choose_skill, BackendSelector, KeywordSelector, SkillSelector};
pub use session::{RouterState, Session};

use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

use crate::config::{AgentConfig, DiscoveryMode};
use crate::context::{ActivationContext, ContextBuilder};
use crate::error::AgentError;
use crate::exec::{ProcessExecutor, ScriptExecutor};
use crate::llm::{LLMBackend, TokenUsage};
use crate::reader::UniversalReader;
use crate::skills::SkillRegistry;
use crate::state::Message;
use crate::tools::{ToolDescriptor, ToolDispatcher};

/// Result of one user turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The model answered without further tool calls
    Answer {
        text: String,
        rounds: usize,
        usage: TokenUsage,
    },
    /// The round limit was hit; the session stays usable
    RoundLimitExceeded { rounds: usize, usage: TokenUsage },
}

impl TurnOutcome {
    /// Text to show the user
    pub fn text(&self) -> String {
        match self {
            Self::Answer { text, .. } => text.clone(),
            Self::RoundLimitExceeded { rounds, .. } => incomplete_notice(*rounds),
        }
    }

    pub fn rounds(&self) -> usize {
        match self {
            Self::Answer { rounds, .. } | Self::RoundLimitExceeded { rounds, .. } => *rounds,
        }
    }

    pub fn usage(&self) -> TokenUsage {
        match self {
            Self::Answer { usage, .. } | Self::RoundLimitExceeded { usage, .. } => *usage,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Answer { .. })
    }
}

fn incomplete_notice(rounds: usize) -> String {
    format!(
        "Task incomplete: stopped after {} tool round(s) without a final answer. \
         Ask me to continue or narrow the request.",
        rounds
    )
}

/// Drives sessions through Discovery, Activation and Execution
///
/// Shared state (registry, reader, executor, backend) is read-only behind
/// `Arc`; everything mutable lives in the [`Session`].
pub struct Router {
    config: AgentConfig,
    registry: Arc<SkillRegistry>,
    backend: Arc<dyn LLMBackend>,
    selector: Arc<dyn SkillSelector>,
    context_builder: ContextBuilder,
    reader: Arc<UniversalReader>,
    executor: Arc<dyn ScriptExecutor>,
    dispatcher: ToolDispatcher,
}

impl Router {
    pub fn new(config: AgentConfig, registry: Arc<SkillRegistry>, backend: Arc<dyn LLMBackend>) -> Self {
        let selector: Arc<dyn SkillSelector> = match config.discovery {
            DiscoveryMode::Keyword => Arc::new(KeywordSelector),
            DiscoveryMode::Backend => Arc::new(BackendSelector::new(backend.clone())),
        };
        let reader = Arc::new(UniversalReader::new());
        let executor: Arc<dyn ScriptExecutor> = Arc::new(ProcessExecutor::new());
        let dispatcher = build_dispatcher(&config, reader.clone(), executor.clone());

        Self {
            context_builder: ContextBuilder::new(config.context_limits),
            config,
            registry,
            backend,
            selector,
            reader,
            executor,
            dispatcher,
        }
    }

    pub fn with_selector(mut self, selector: Arc<dyn SkillSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Replace the script runner (e.g. with an isolated one)
    pub fn with_executor(mut self, executor: Arc<dyn ScriptExecutor>) -> Self {
        self.executor = executor;
        self.dispatcher = build_dispatcher(&self.config, self.reader.clone(), self.executor.clone());
        self
    }

    pub fn with_reader(mut self, reader: UniversalReader) -> Self {
        self.reader = Arc::new(reader);
        self.dispatcher = build_dispatcher(&self.config, self.reader.clone(), self.executor.clone());
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &Arc<dyn LLMBackend> {
        &self.backend
    }

    /// Metadata-only catalog
    pub fn catalog(&self) -> String {
        self.registry.summary()
    }

    /// New session with the orchestrator prompt installed
    pub fn session(&self) -> Session {
        let session = Session::new(&self.system_prompt());
        info!(
            session = %session.id(),
            skills = self.registry.len(),
            selector = self.selector.name(),
            backend = self.backend.name(),
            "session started"
        );
        session
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a skill orchestrator. Each skill is a folder with a procedure (SKILL.md), \
reference documents and scripts.\n\n\
## Available Skills\n{}\n\n\
## Tool Protocol\n\
- When a skill is activated, its procedure, its markdown knowledge and a map of its other \
files are added to the conversation.\n\
- Files in the map are NOT loaded. Use `read_file` with a path relative to the skill root to \
view any of them (text, PDF, Word, PowerPoint, Excel, CSV).\n\
- Use `execute_script` (or a `run_*` tool) to run a script from the skill's `scripts/` folder.\n\
- If a procedure names a tool that does not exist (like `run_code` or `bash`), use \
`execute_script` instead.\n\
- Without an active skill, answer directly.",
            self.registry.summary()
        )
    }

    /// Handle one user turn
    ///
    /// Backend errors end the turn with `Err`; the session remains usable.
    pub async fn handle_turn(&self, session: &mut Session, input: &str) -> Result<TurnOutcome, AgentError> {
        let span = session.span.clone();
        let result = self.run_turn(session, input).instrument(span).await;
        session.settle();
        result
    }

    async fn run_turn(&self, session: &mut Session, input: &str) -> Result<TurnOutcome, AgentError> {
        session.state = RouterState::Discovering;
        self.discover(session, input).await?;

        session.conversation.push(Message::user(input));
        self.execute(session).await
    }

    async fn discover(&self, session: &mut Session, input: &str) -> Result<(), AgentError> {
        let candidates = self.selector.candidates(input, &self.registry).await?;
        let active = session.active_skill_name().map(str::to_string);
        debug!(?candidates, active = ?active, "discovery");

        let Some(chosen) = choose_skill(&candidates, active.as_deref()) else {
            return Ok(());
        };
        if active.as_deref() == Some(chosen) {
            debug!(skill = %chosen, "skill already active");
            return Ok(());
        }
        let chosen = chosen.to_string();

        if active.is_some() {
            self.deactivate(session);
        }
        self.activate(session, &chosen)
    }

    fn activate(&self, session: &mut Session, name: &str) -> Result<(), AgentError> {
        let skill = self.registry.get(name)?.clone();
        let context: ActivationContext = self.context_builder.build(&skill);

        session.conversation.push(Message::system(context.text()));
        session.conversation.push(Message::system(&format!(
            "[SKILL ACTIVATED: {}] Files listed in the map are not loaded yet. Use `read_file` to \
             inspect documents and `execute_script` to run scripts; paths are relative to the \
             skill root.",
            skill.name()
        )));

        info!(
            skill = %skill.name(),
            inlined = context.inlined().len(),
            mapped = context.map().len(),
            tools = context.tools().len(),
            "skill activated"
        );
        session.conversation.set_active_skill(skill);
        session.activation = Some(context);
        session.state = RouterState::Active;
        Ok(())
    }

    /// Drop the active skill and return to `Idle`
    ///
    /// Returns the name of the skill that was active, if any.
    pub fn deactivate(&self, session: &mut Session) -> Option<String> {
        let skill = session.conversation.clear_active_skill()?;
        session.activation = None;
        session.state = RouterState::Idle;
        session.conversation.push(Message::system(&format!(
            "[SKILL DEACTIVATED: {}] Its tools are no longer available.",
            skill.name()
        )));
        info!(skill = %skill.name(), "skill deactivated");
        Some(skill.name().to_string())
    }

    async fn execute(&self, session: &mut Session) -> Result<TurnOutcome, AgentError> {
        let skill = session.active_skill().cloned();
        let tools: Vec<ToolDescriptor> = session.tools().to_vec();
        let definitions = session.tool_definitions();
        let mut usage = TokenUsage::default();

        for round in 1..=self.config.max_rounds {
            session.state = RouterState::Executing;
            debug!(round, tools = definitions.len(), "backend round");

            let response = self
                .backend
                .generate(session.conversation.messages(), &definitions)
                .await?;
            if let Some(round_usage) = response.usage {
                usage += round_usage;
            }

            let message = response.message;
            let calls = message.tool_calls.clone().unwrap_or_default();
            session.conversation.push(message.clone());

            if calls.is_empty() {
                info!(rounds = round, total_tokens = usage.total_tokens, "turn answered");
                return Ok(TurnOutcome::Answer {
                    text: message.content,
                    rounds: round,
                    usage,
                });
            }

            for call in &calls {
                let result = self.dispatcher.dispatch(skill.as_deref(), &tools, call).await;
                session.conversation.push(Message::tool(&result.content, &result.call_id));
            }
        }

        let rounds = self.config.max_rounds;
        warn!(rounds, "round limit reached");
        session.conversation.push(Message::assistant(&incomplete_notice(rounds)));
        Ok(TurnOutcome::RoundLimitExceeded { rounds, usage })
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("skills", &self.registry.len())
            .field("backend", &self.backend.name())
            .field("selector", &self.selector.name())
            .field("max_rounds", &self.config.max_rounds)
            .finish_non_exhaustive()
    }
}

fn build_dispatcher(
    config: &AgentConfig,
    reader: Arc<UniversalReader>,
    executor: Arc<dyn ScriptExecutor>,
) -> ToolDispatcher {
    ToolDispatcher::new(reader, executor)
        .with_script_timeout(config.script_timeout)
        .with_max_output_chars(config.max_tool_output_chars)
}
