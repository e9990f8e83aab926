//! Script execution
//!
//! [`ScriptExecutor`] is the boundary between the orchestrator and whatever
//! actually runs a skill script. [`ProcessExecutor`] spawns a direct child
//! process; it is not a sandbox.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ToolFailure;

/// Per-stream output cap
pub const MAX_OUTPUT_BYTES: usize = 32 * 1024;

/// How long stream readers may run after the child has exited or been killed
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Script execution failures (non-zero exit is not one of them)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecError {
    #[error("Failed to spawn {program}: {message}")]
    Spawn { program: String, message: String },

    /// `partial` holds what was captured before the child was killed
    #[error("Timed out after {after:?}")]
    Timeout { after: Duration, partial: ScriptOutput },

    #[error("Invalid script arguments: {0}")]
    InvalidArguments(String),

    #[error("No interpreter for {0} and it is not executable")]
    NotExecutable(String),
}

impl From<ExecError> for ToolFailure {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::Timeout { after, partial } => ToolFailure::Timeout {
                after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
                stdout: partial.stdout,
                stderr: partial.stderr,
            },
            ExecError::InvalidArguments(msg) => ToolFailure::InvalidArguments(msg),
            other => ToolFailure::ExecutionError {
                exit_code: -1,
                stdout: String::new(),
                stderr: other.to_string(),
            },
        }
    }
}

/// Interpreter for a script extension, `None` for direct execution
pub fn interpreter_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|e| e.to_str())?;
    match ext.to_ascii_lowercase().as_str() {
        "py" => Some("python3"),
        "sh" => Some("sh"),
        "bash" => Some("bash"),
        "js" => Some("node"),
        "rb" => Some("ruby"),
        _ => None,
    }
}

#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(_path: &Path) -> bool {
    false
}

/// A file that can be run: known interpreter or executable bit
pub fn is_runnable(path: &Path) -> bool {
    interpreter_for(path).is_some() || is_executable(path)
}

/// Split a free-form argument string with shell-word rules
pub fn split_args(raw: &str) -> Result<Vec<String>, ExecError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    shlex::split(raw).ok_or_else(|| ExecError::InvalidArguments(format!("unbalanced quotes in: {}", raw)))
}

/// What to run and how
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptInvocation {
    /// Absolute script path, already resolved inside the skill root
    pub script: PathBuf,
    pub args: Vec<String>,
    /// Working directory (the skill root)
    pub cwd: PathBuf,
    pub timeout: Duration,
}

impl ScriptInvocation {
    pub fn new(script: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Captured result of a finished script
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub truncated_stdout: bool,
    pub truncated_stderr: bool,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs skill scripts
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    async fn execute(&self, invocation: &ScriptInvocation) -> Result<ScriptOutput, ExecError>;
}

/// Runs scripts as direct child processes
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    max_output_bytes: usize,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self {
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = max;
        self
    }
}

#[async_trait]
impl ScriptExecutor for ProcessExecutor {
    async fn execute(&self, invocation: &ScriptInvocation) -> Result<ScriptOutput, ExecError> {
        let script = &invocation.script;
        let mut cmd = match interpreter_for(script) {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(script);
                cmd
            }
            None if is_executable(script) => Command::new(script),
            None => return Err(ExecError::NotExecutable(script.display().to_string())),
        };
        let program = cmd.as_std().get_program().to_string_lossy().to_string();

        cmd.args(&invocation.args);
        cmd.current_dir(&invocation.cwd);
        cmd.kill_on_drop(true);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| ExecError::Spawn {
            program: program.clone(),
            message: e.to_string(),
        })?;

        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let readers = [
            tokio::spawn(drain(child.stdout.take(), stdout_buf.clone(), self.max_output_bytes)),
            tokio::spawn(drain(child.stderr.take(), stderr_buf.clone(), self.max_output_bytes)),
        ];

        let status = match tokio::time::timeout(invocation.timeout, child.wait()).await {
            Ok(status) => Some(status.map_err(|e| ExecError::Spawn {
                program: program.clone(),
                message: e.to_string(),
            })?),
            Err(_) => {
                warn!(script = %script.display(), timeout = ?invocation.timeout, "script timed out, killing it");
                if let Err(e) = child.kill().await {
                    warn!(script = %script.display(), error = %e, "failed to kill timed out script");
                }
                None
            }
        };

        // A grandchild can keep the pipes open after the child is gone
        finish_readers(readers).await;

        let stdout_bytes = take_buffer(&stdout_buf);
        let stderr_bytes = take_buffer(&stderr_buf);
        let (stdout, truncated_stdout) = truncate_bytes(&stdout_bytes, self.max_output_bytes);
        let (stderr, truncated_stderr) = truncate_bytes(&stderr_bytes, self.max_output_bytes);

        if truncated_stdout || truncated_stderr {
            warn!(
                script = %script.display(),
                truncated_stdout = truncated_stdout,
                truncated_stderr = truncated_stderr,
                "script output truncated"
            );
        }

        let mut output = ScriptOutput {
            exit_code: -1,
            stdout,
            stderr,
            truncated_stdout,
            truncated_stderr,
        };

        let Some(status) = status else {
            return Err(ExecError::Timeout {
                after: invocation.timeout,
                partial: output,
            });
        };
        output.exit_code = status.code().unwrap_or(-1);

        debug!(
            script = %script.display(),
            program = %program,
            exit_code = output.exit_code,
            captured_stdout_bytes = stdout_bytes.len(),
            captured_stderr_bytes = stderr_bytes.len(),
            "executed skill script"
        );

        Ok(output)
    }
}

/// Copy a child stream into `buf` until EOF
///
/// Stores at most `cap + 1` bytes but keeps reading, so a chatty script never
/// blocks on a full pipe.
async fn drain<R: AsyncRead + Unpin>(stream: Option<R>, buf: Arc<Mutex<Vec<u8>>>, cap: usize) {
    let Some(mut stream) = stream else {
        return;
    };
    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if let Ok(mut bytes) = buf.lock() {
                    let room = cap.saturating_add(1).saturating_sub(bytes.len());
                    bytes.extend_from_slice(&chunk[..n.min(room)]);
                }
            }
        }
    }
}

async fn finish_readers(readers: [JoinHandle<()>; 2]) {
    for mut reader in readers {
        if tokio::time::timeout(DRAIN_GRACE, &mut reader).await.is_err() {
            reader.abort();
        }
    }
}

fn take_buffer(buf: &Mutex<Vec<u8>>) -> Vec<u8> {
    buf.lock().map(|mut bytes| std::mem::take(&mut *bytes)).unwrap_or_default()
}

fn truncate_bytes(bytes: &[u8], max: usize) -> (String, bool) {
    if bytes.len() <= max {
        return (String::from_utf8_lossy(bytes).to_string(), false);
    }
    (String::from_utf8_lossy(&bytes[..max]).to_string(), true)
}
