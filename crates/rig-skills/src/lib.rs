//! rig-skills: skill lifecycle orchestrator for Rig agents
//!
//! Loads self-contained skill packages (a `SKILL.md` procedure plus optional
//! reference documents, scripts and custom folders) and exposes them to an
//! LLM backend through progressive disclosure:
//!
//! 1. **Discovery** - only `{name, description}` of each skill is shown
//! 2. **Activation** - the selected skill's procedure, markdown knowledge and
//!    a file-tree map are injected into the conversation
//! 3. **Execution** - the model explores the map with `read_file` and runs
//!    scripts with `execute_script` (or a synthesized per-script tool)
//!
//! ```text
//! user input ─▶ Router ──Discovery──▶ SkillSelector (metadata only)
//!                  │
//!                  ├──Activation──▶ ContextBuilder + ToolBridge
//!                  │
//!                  └──Execution──▶ LLMBackend ◀─▶ ToolDispatcher
//!                                                   ├─ UniversalReader
//!                                                   └─ ScriptExecutor
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rig_skills::{AgentConfig, Router, SkillRegistry};
//!
//! let config = AgentConfig::new("skills");
//! let registry = Arc::new(SkillRegistry::scan(&config.skills_root).await?);
//! let router = Router::new(config, registry, backend);
//!
//! let mut session = router.session();
//! let outcome = router.handle_turn(&mut session, "analyze report.csv").await?;
//! println!("{}", outcome.text());
//! ```

pub mod error;
pub mod state;
pub mod config;
pub mod paths;
pub mod skills;
pub mod context;
pub mod reader;
pub mod exec;
pub mod tools;
pub mod llm;
pub mod router;

// Re-exports for convenience
pub use error::{AgentError, ConfigError, ReadError, ToolFailure};
pub use state::{ConversationState, Message, Role, ToolCall};
pub use config::{AgentConfig, ContextLimits, DiscoveryMode};
pub use skills::{CapabilityDir, SkillDescriptor, SkillMetadata, SkillRegistry};
pub use context::{ActivationContext, ContextBuilder, SizeClass};
pub use reader::{DocumentParser, UniversalReader};
pub use exec::{ExecError, ProcessExecutor, ScriptExecutor, ScriptInvocation, ScriptOutput};
pub use tools::{
    ToolAction, ToolBridge, ToolCallResult, ToolDefinition, ToolDescriptor, ToolDispatcher,
    script_tool_descriptor, universal_tools,
};
pub use llm::{
    BackendKind, LLMBackend, LLMConfig, LLMResponse, LlmError, NativeToolCallingBackend,
    OpenAICompatibleBackend, TokenUsage,
};
pub use router::{
    BackendSelector, KeywordSelector, Router, RouterState, Session, SkillSelector, TurnOutcome,
};
