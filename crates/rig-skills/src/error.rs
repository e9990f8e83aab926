// src/error.rs
//! Error types
//!
//! Configuration-time failures (`ConfigError`) are fatal only for the package
//! or setting they describe. Everything a tool call can run into is a
//! `ToolFailure`, which is rendered back to the model as a tool result.

use thiserror::Error;

/// Skill metadata / configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Skill file must start with YAML frontmatter (---)")]
    MissingFrontmatter,

    #[error("Missing closing --- in frontmatter (must be on its own line)")]
    UnclosedFrontmatter,

    #[error("Invalid YAML frontmatter: {0}")]
    InvalidYaml(String),

    #[error("Duplicate skill name '{name}' (already defined at {existing})")]
    DuplicateName { name: String, existing: String },

    #[error("Skills root is not a directory: {0}")]
    NotADirectory(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Skill not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Reader failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

/// Structured failure of a single tool call
///
/// Always converted into a tool result so the model can adapt; only
/// `PathEscape` is a refusal that happens before any I/O.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolFailure {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Access denied, path is outside the active skill: {0}")]
    PathEscape(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Could not parse {0}")]
    ParseError(String),

    #[error("Script failed with exit code {exit_code}")]
    ExecutionError {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// Carries whatever the script printed before it was killed
    #[error("Script timed out after {}", format_elapsed(.after_ms))]
    Timeout {
        after_ms: u64,
        stdout: String,
        stderr: String,
    },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool '{0}' not found. Use 'read_file' or 'execute_script'.")]
    UnknownTool(String),

    #[error("No skill is active")]
    NoActiveSkill,
}

impl ToolFailure {
    /// Short machine-readable kind, used as the tool result prefix
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::PathEscape(_) => "PathEscape",
            Self::UnsupportedFormat(_) => "UnsupportedFormat",
            Self::ParseError(_) => "ParseError",
            Self::ExecutionError { .. } => "ExecutionError",
            Self::Timeout { .. } => "Timeout",
            Self::InvalidArguments(_) => "InvalidArguments",
            Self::UnknownTool(_) => "UnknownTool",
            Self::NoActiveSkill => "NoActiveSkill",
        }
    }

    /// Render the failure as tool-result text for the model
    pub fn to_tool_text(&self) -> String {
        match self {
            Self::ExecutionError { exit_code, stdout, stderr } => with_streams(
                format!("Error [ExecutionError]: script exited with code {}", exit_code),
                stdout,
                stderr,
            ),
            Self::Timeout { stdout, stderr, .. } => {
                with_streams(format!("Error [Timeout]: {}", self), stdout, stderr)
            }
            other => format!("Error [{}]: {}", other.kind(), other),
        }
    }
}

fn with_streams(mut text: String, stdout: &str, stderr: &str) -> String {
    if !stdout.is_empty() {
        text.push_str(&format!("\nSTDOUT:\n{}", stdout));
    }
    if !stderr.is_empty() {
        text.push_str(&format!("\nSTDERR:\n{}", stderr));
    }
    text
}

/// `2s` for whole seconds, `250ms` otherwise
fn format_elapsed(ms: &u64) -> String {
    if *ms >= 1000 && ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{}ms", ms)
    }
}

impl From<ReadError> for ToolFailure {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::NotFound(path) => ToolFailure::NotFound(path),
            ReadError::UnsupportedFormat(path) => ToolFailure::UnsupportedFormat(path),
            // Parser detail stays in the logs; the model gets the file name only
            ReadError::Parse { path, .. } => ToolFailure::ParseError(path),
        }
    }
}

/// Top-level agent error
///
/// Returned by a turn only when the turn itself cannot continue (backend
/// failure); the session stays usable.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(String),
}
