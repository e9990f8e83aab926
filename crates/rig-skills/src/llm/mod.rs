//! LLM backends
//!
//! The router only sees [`LLMBackend`]. Two implementations exist, picked
//! once at startup via [`BackendKind`]:
//!
//! - [`NativeToolCallingBackend`]: a rig-core agent (Anthropic)
//! - [`OpenAICompatibleBackend`]: Chat Completions over HTTP (OpenAI, DeepSeek)

mod backend;
mod config;
mod native;
mod openai_compat;

pub use backend::{BackendKind, LLMBackend, LLMResponse};
pub use config::{LLMConfig, TokenUsage};
pub use native::{anthropic_backend, NativeToolCallingBackend, DEFAULT_ANTHROPIC_MODEL, DEFAULT_MAX_TOKENS};
pub use openai_compat::{LlmError, OpenAICompatibleBackend, DEEPSEEK_BASE_URL, OPENAI_BASE_URL};
