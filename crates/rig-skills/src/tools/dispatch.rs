//! Tool call resolution
//!
//! Every call ends up as a [`ToolCallResult`]; failures are rendered as
//! text for the model instead of aborting the turn.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::descriptor::{canonical_tool_name, ToolAction, ToolDescriptor, EXECUTE_SCRIPT, READ_FILE};
use crate::error::ToolFailure;
use crate::exec::{split_args, ScriptExecutor, ScriptInvocation};
use crate::paths::{relative_display, resolve_within};
use crate::reader::UniversalReader;
use crate::skills::SkillDescriptor;
use crate::state::ToolCall;

pub const TRUNCATION_MARKER: &str = "...[TRUNCATED]";

/// Outcome of one tool call, ready to append as a tool message
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub call_id: String,
    pub tool_name: String,
    /// Text for the model (capped)
    pub content: String,
    pub failure: Option<ToolFailure>,
}

impl ToolCallResult {
    pub fn is_error(&self) -> bool {
        self.failure.is_some()
    }
}

/// Resolves tool calls for the active skill
#[derive(Clone)]
pub struct ToolDispatcher {
    reader: Arc<UniversalReader>,
    executor: Arc<dyn ScriptExecutor>,
    script_timeout: Duration,
    max_output_chars: usize,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("script_timeout", &self.script_timeout)
            .field("max_output_chars", &self.max_output_chars)
            .finish_non_exhaustive()
    }
}

impl ToolDispatcher {
    pub fn new(reader: Arc<UniversalReader>, executor: Arc<dyn ScriptExecutor>) -> Self {
        Self {
            reader,
            executor,
            script_timeout: Duration::from_secs(60),
            max_output_chars: 20_000,
        }
    }

    pub fn with_script_timeout(mut self, timeout: Duration) -> Self {
        self.script_timeout = timeout;
        self
    }

    pub fn with_max_output_chars(mut self, max: usize) -> Self {
        self.max_output_chars = max;
        self
    }

    pub fn reader(&self) -> &Arc<UniversalReader> {
        &self.reader
    }

    /// Resolve one call against the active skill and its tool set
    pub async fn dispatch(
        &self,
        skill: Option<&SkillDescriptor>,
        tools: &[ToolDescriptor],
        call: &ToolCall,
    ) -> ToolCallResult {
        let outcome = self.run(skill, tools, call).await;

        let (content, failure) = match outcome {
            Ok(text) => (cap_chars(&text, self.max_output_chars), None),
            Err(failure) => {
                warn!(tool = %call.name, kind = failure.kind(), "tool call failed: {}", failure);
                (cap_chars(&failure.to_tool_text(), self.max_output_chars), Some(failure))
            }
        };

        ToolCallResult {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            content,
            failure,
        }
    }

    async fn run(
        &self,
        skill: Option<&SkillDescriptor>,
        tools: &[ToolDescriptor],
        call: &ToolCall,
    ) -> Result<String, ToolFailure> {
        let action = resolve_action(tools, &call.name);

        let Some(skill) = skill else {
            return match action {
                Some(_) => Err(ToolFailure::NoActiveSkill),
                None if is_known_name(&call.name) => Err(ToolFailure::NoActiveSkill),
                None => Err(ToolFailure::UnknownTool(call.name.clone())),
            };
        };
        let action = action.ok_or_else(|| ToolFailure::UnknownTool(call.name.clone()))?;
        let args = normalize_arguments(&call.arguments)?;

        debug!(tool = %call.name, skill = %skill.name(), "dispatching tool call");

        match action {
            ToolAction::ReadFile => {
                let requested = string_arg(&args, &["path", "file_path", "filename", "file"])
                    .ok_or_else(|| ToolFailure::InvalidArguments("read_file requires 'path'".to_string()))?;
                self.read_file(skill, &requested).await
            }
            ToolAction::ExecuteScript => {
                let requested = string_arg(&args, &["path", "script_name", "script", "file_path"])
                    .ok_or_else(|| {
                        ToolFailure::InvalidArguments("execute_script requires 'path'".to_string())
                    })?;
                let raw_args = script_args(&args)?;
                self.execute_script(skill, &requested, raw_args).await
            }
            ToolAction::RunScript { path } => {
                let raw_args = script_args(&args)?;
                self.execute_script(skill, &path, raw_args).await
            }
        }
    }

    async fn read_file(&self, skill: &SkillDescriptor, requested: &str) -> Result<String, ToolFailure> {
        let path = resolve_within(skill.root(), requested)?;
        let shown = relative_display(skill.root(), &path);

        let reader = self.reader.clone();
        let read_path = path.clone();
        let result = tokio::task::spawn_blocking(move || reader.read(&read_path))
            .await
            .map_err(|e| {
                warn!("reader task failed for {}: {}", shown, e);
                ToolFailure::ParseError(shown.clone())
            })?;

        // Report skill-relative paths, never absolute ones
        result.map_err(|e| match ToolFailure::from(e) {
            ToolFailure::NotFound(_) => ToolFailure::NotFound(shown.clone()),
            ToolFailure::UnsupportedFormat(_) => ToolFailure::UnsupportedFormat(shown.clone()),
            ToolFailure::ParseError(_) => ToolFailure::ParseError(shown.clone()),
            other => other,
        })
    }

    async fn execute_script(
        &self,
        skill: &SkillDescriptor,
        requested: &str,
        raw_args: Vec<String>,
    ) -> Result<String, ToolFailure> {
        let script = locate_script(skill.root(), requested)?;

        let invocation = ScriptInvocation::new(script, skill.root())
            .with_args(raw_args)
            .with_timeout(self.script_timeout);
        let output = self.executor.execute(&invocation).await?;

        if !output.success() {
            return Err(ToolFailure::ExecutionError {
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        let mut text = if output.stdout.trim().is_empty() {
            "(script finished with no output)".to_string()
        } else {
            output.stdout
        };
        if !output.stderr.trim().is_empty() {
            text.push_str("\nSTDERR:\n");
            text.push_str(&output.stderr);
        }
        Ok(text)
    }
}

fn resolve_action(tools: &[ToolDescriptor], name: &str) -> Option<ToolAction> {
    let find = |n: &str| tools.iter().find(|t| t.name() == n).map(|t| t.action.clone());
    find(name).or_else(|| find(canonical_tool_name(name)))
}

fn is_known_name(name: &str) -> bool {
    let canonical = canonical_tool_name(name);
    canonical == READ_FILE || canonical == EXECUTE_SCRIPT || name.starts_with("run_")
}

/// Arguments as a JSON object; a string payload is parsed once more
fn normalize_arguments(arguments: &Value) -> Result<serde_json::Map<String, Value>, ToolFailure> {
    match arguments {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(serde_json::Map::new()),
        Value::String(raw) if raw.trim().is_empty() => Ok(serde_json::Map::new()),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(ToolFailure::InvalidArguments(format!(
                "arguments are not a JSON object: {}",
                raw
            ))),
        },
        other => Err(ToolFailure::InvalidArguments(format!(
            "arguments are not a JSON object: {}",
            other
        ))),
    }
}

fn string_arg(args: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| args.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// `args` as a shell-quoted string or as an array of strings
fn script_args(args: &serde_json::Map<String, Value>) -> Result<Vec<String>, ToolFailure> {
    let value = args.get("args").or_else(|| args.get("arguments"));
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(raw)) => Ok(split_args(raw)?),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                other => Err(ToolFailure::InvalidArguments(format!("unsupported argument: {}", other))),
            })
            .collect(),
        Some(other) => Err(ToolFailure::InvalidArguments(format!(
            "args must be a string or an array: {}",
            other
        ))),
    }
}

/// Resolve a script path; a bare name is also looked up in `scripts/`
fn locate_script(root: &Path, requested: &str) -> Result<PathBuf, ToolFailure> {
    let direct = resolve_within(root, requested)?;
    if direct.is_file() {
        return Ok(direct);
    }

    let bare = !requested.contains('/') && !requested.contains('\\');
    if bare {
        let in_scripts = resolve_within(root, &format!("scripts/{}", requested.trim()))?;
        if in_scripts.is_file() {
            return Ok(in_scripts);
        }
    }

    Err(ToolFailure::NotFound(format!(
        "{} (no such script; to view a document use read_file)",
        relative_display(root, &direct)
    )))
}

/// Keep at most `max` characters, marking the cut
pub(crate) fn cap_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}\n{}", &text[..byte_idx], TRUNCATION_MARKER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{ExecError, ScriptOutput};
    use crate::tools::{ToolBridge, universal_tools};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records invocations instead of spawning anything
    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<ScriptInvocation>>,
        output: ScriptOutput,
    }

    #[async_trait]
    impl ScriptExecutor for RecordingExecutor {
        async fn execute(&self, invocation: &ScriptInvocation) -> Result<ScriptOutput, ExecError> {
            self.calls.lock().unwrap().push(invocation.clone());
            Ok(self.output.clone())
        }
    }

    fn setup() -> (TempDir, SkillDescriptor) {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("reference")).unwrap();
        std::fs::create_dir_all(root.join("scripts")).unwrap();
        std::fs::write(root.join("reference/guide.md"), "# Guide").unwrap();
        std::fs::write(root.join("scripts/analyze.py"), "print('ok')").unwrap();
        let skill = SkillDescriptor::new("demo", "d", root.canonicalize().unwrap(), "");
        (temp, skill)
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments,
        }
    }

    fn dispatcher(executor: Arc<RecordingExecutor>) -> ToolDispatcher {
        ToolDispatcher::new(Arc::new(UniversalReader::new()), executor)
    }

    #[test]
    fn test_cap_chars() {
        assert_eq!(cap_chars("short", 10), "short");
        assert_eq!(cap_chars("héllo world", 5), format!("héllo\n{}", TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_read_file_and_alias() {
        let (_temp, skill) = setup();
        let d = dispatcher(Arc::new(RecordingExecutor::default()));
        let tools = universal_tools();

        let result = d
            .dispatch(Some(&skill), &tools, &call("read_file", serde_json::json!({"path": "reference/guide.md"})))
            .await;
        assert_eq!(result.content, "# Guide");
        assert_eq!(result.call_id, "call_1");

        let result = d
            .dispatch(Some(&skill), &tools, &call("view", serde_json::json!({"file_path": "reference/guide.md"})))
            .await;
        assert!(!result.is_error());
        assert_eq!(result.content, "# Guide");
    }

    #[tokio::test]
    async fn test_read_file_escape_is_refused() {
        let (_temp, skill) = setup();
        let d = dispatcher(Arc::new(RecordingExecutor::default()));

        let result = d
            .dispatch(Some(&skill), &universal_tools(), &call("read_file", serde_json::json!({"path": "../../etc/passwd"})))
            .await;
        assert!(matches!(result.failure, Some(ToolFailure::PathEscape(_))));
        assert!(result.content.starts_with("Error [PathEscape]"));
    }

    #[tokio::test]
    async fn test_read_missing_reports_relative_path() {
        let (_temp, skill) = setup();
        let d = dispatcher(Arc::new(RecordingExecutor::default()));

        let result = d
            .dispatch(Some(&skill), &universal_tools(), &call("read_file", serde_json::json!({"path": "nope.txt"})))
            .await;
        assert_eq!(result.failure, Some(ToolFailure::NotFound("nope.txt".to_string())));
    }

    #[tokio::test]
    async fn test_string_arguments_are_parsed() {
        let (_temp, skill) = setup();
        let d = dispatcher(Arc::new(RecordingExecutor::default()));

        let result = d
            .dispatch(
                Some(&skill),
                &universal_tools(),
                &call("read_file", Value::String(r#"{"path":"reference/guide.md"}"#.to_string())),
            )
            .await;
        assert_eq!(result.content, "# Guide");

        let result = d
            .dispatch(Some(&skill), &universal_tools(), &call("read_file", Value::String("{broken".to_string())))
            .await;
        assert!(matches!(result.failure, Some(ToolFailure::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn test_unknown_tool_and_no_active_skill() {
        let (_temp, skill) = setup();
        let d = dispatcher(Arc::new(RecordingExecutor::default()));

        let result = d
            .dispatch(Some(&skill), &universal_tools(), &call("delete_everything", serde_json::json!({})))
            .await;
        assert_eq!(result.failure, Some(ToolFailure::UnknownTool("delete_everything".to_string())));
        assert!(result.content.contains("Use 'read_file' or 'execute_script'"));

        let result = d
            .dispatch(None, &[], &call("read_file", serde_json::json!({"path": "x"})))
            .await;
        assert_eq!(result.failure, Some(ToolFailure::NoActiveSkill));
    }

    #[tokio::test]
    async fn test_execute_script_bare_name_and_args() {
        let (_temp, skill) = setup();
        let executor = Arc::new(RecordingExecutor {
            output: ScriptOutput {
                stdout: "rows: 3".to_string(),
                ..Default::default()
            },
            ..Default::default()
        });
        let d = dispatcher(executor.clone());

        let result = d
            .dispatch(
                Some(&skill),
                &universal_tools(),
                &call("bash", serde_json::json!({"script_name": "analyze.py", "args": "data.csv --top 3"})),
            )
            .await;

        assert_eq!(result.content, "rows: 3");
        let calls = executor.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].script.ends_with("scripts/analyze.py"));
        assert_eq!(calls[0].args, vec!["data.csv", "--top", "3"]);
        assert_eq!(calls[0].cwd, skill.root());
    }

    #[tokio::test]
    async fn test_run_script_tool_and_failure_output() {
        let (_temp, skill) = setup();
        let executor = Arc::new(RecordingExecutor {
            output: ScriptOutput {
                exit_code: 2,
                stderr: "FileNotFoundError: report.csv".to_string(),
                ..Default::default()
            },
            ..Default::default()
        });
        let d = dispatcher(executor);
        let tools = ToolBridge::tool_set(&skill);

        let result = d
            .dispatch(Some(&skill), &tools, &call("run_analyze", serde_json::json!({"args": ["report.csv"]})))
            .await;

        assert!(matches!(
            result.failure,
            Some(ToolFailure::ExecutionError { exit_code: 2, .. })
        ));
        assert!(result.content.contains("FileNotFoundError: report.csv"));
    }

    #[tokio::test]
    async fn test_execute_missing_script_hint() {
        let (_temp, skill) = setup();
        let d = dispatcher(Arc::new(RecordingExecutor::default()));

        let result = d
            .dispatch(Some(&skill), &universal_tools(), &call("execute_script", serde_json::json!({"path": "missing.py"})))
            .await;

        assert!(matches!(result.failure, Some(ToolFailure::NotFound(_))));
        assert!(result.content.contains("read_file"));
    }

    #[tokio::test]
    async fn test_output_is_capped() {
        let (_temp, skill) = setup();
        std::fs::write(skill.root().join("big.txt"), "x".repeat(500)).unwrap();
        let d = dispatcher(Arc::new(RecordingExecutor::default())).with_max_output_chars(100);

        let result = d
            .dispatch(Some(&skill), &universal_tools(), &call("read_file", serde_json::json!({"path": "big.txt"})))
            .await;

        assert!(result.content.ends_with(TRUNCATION_MARKER));
        assert_eq!(result.content.len(), 100 + 1 + TRUNCATION_MARKER.len());
    }
}
