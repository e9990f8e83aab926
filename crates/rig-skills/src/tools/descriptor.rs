//! Tool descriptors and the universal tool set

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::exec::interpreter_for;
use crate::paths::relative_display;

pub const READ_FILE: &str = "read_file";
pub const EXECUTE_SCRIPT: &str = "execute_script";

/// Schema sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// What a tool call does once resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAction {
    /// Read any file inside the skill root
    ReadFile,
    /// Run a script whose path the caller supplies
    ExecuteScript,
    /// Run one specific script (path relative to the skill root)
    RunScript { path: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub definition: ToolDefinition,
    pub action: ToolAction,
}

impl ToolDescriptor {
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

/// Map tool names used by upstream skill procedures onto the universal tools
pub fn canonical_tool_name(name: &str) -> &str {
    match name {
        "read_resource" | "view" | "open" => READ_FILE,
        "run_code" | "bash" | "python" | "repl" | "computer" => EXECUTE_SCRIPT,
        other => other,
    }
}

/// `read_file` and `execute_script`
pub fn universal_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            definition: ToolDefinition {
                name: READ_FILE.to_string(),
                description: "Read any file inside the active skill (text, markdown, source, PDF, \
                              DOCX, PPTX, XLSX, CSV) and return its text. Paths are relative to \
                              the skill root, as shown in the Project Structure map."
                    .to_string(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "File path relative to the skill root, e.g. reference/forms.md"
                        }
                    },
                    "required": ["path"]
                }),
            },
            action: ToolAction::ReadFile,
        },
        ToolDescriptor {
            definition: ToolDefinition {
                name: EXECUTE_SCRIPT.to_string(),
                description: "Run a script from the active skill (usually under scripts/) with \
                              the skill root as working directory. Returns stdout, or the exit \
                              code with stdout and stderr on failure."
                    .to_string(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Script path relative to the skill root, e.g. scripts/analyze.py"
                        },
                        "args": {
                            "type": "string",
                            "description": "Command-line arguments, shell-quoted"
                        }
                    },
                    "required": ["path"]
                }),
            },
            action: ToolAction::ExecuteScript,
        },
    ]
}

/// Lowercase, `[a-z0-9_]` only, no repeated or edge underscores
pub fn sanitize_tool_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "script".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Synthesize the `run_<stem>` tool for one script
///
/// Pure: inspects only the path, never the file.
pub fn script_tool_descriptor(script: &Path, root: &Path) -> ToolDescriptor {
    let stem = script
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut name = format!("run_{}", sanitize_tool_name(&stem));
    name.truncate(64);

    let rel = relative_display(root, script);
    let runner = interpreter_for(script)
        .map(|i| format!(" with {}", i))
        .unwrap_or_default();

    ToolDescriptor {
        definition: ToolDefinition {
            name,
            description: format!(
                "Run the skill script `{}`{}. Pass command-line arguments in `args`.",
                rel, runner
            ),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "args": {
                        "type": "string",
                        "description": "Command-line arguments, shell-quoted"
                    }
                }
            }),
        },
        action: ToolAction::RunScript { path: rel },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universal_tools() {
        let tools = universal_tools();
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec![READ_FILE, EXECUTE_SCRIPT]);
        assert_eq!(tools[0].definition.parameters["required"][0], "path");
    }

    #[test]
    fn test_canonical_tool_name() {
        assert_eq!(canonical_tool_name("read_resource"), READ_FILE);
        assert_eq!(canonical_tool_name("view"), READ_FILE);
        assert_eq!(canonical_tool_name("bash"), EXECUTE_SCRIPT);
        assert_eq!(canonical_tool_name("computer"), EXECUTE_SCRIPT);
        assert_eq!(canonical_tool_name("run_analyze"), "run_analyze");
    }

    #[test]
    fn test_sanitize_tool_name() {
        assert_eq!(sanitize_tool_name("fill-PDF form"), "fill_pdf_form");
        assert_eq!(sanitize_tool_name("__x__"), "x");
        assert_eq!(sanitize_tool_name("日本"), "script");
    }

    #[test]
    fn test_script_tool_descriptor_is_pure() {
        let root = Path::new("/nonexistent/skills/data_analyst");
        let tool = script_tool_descriptor(&root.join("scripts/analyze-sales.py"), root);

        assert_eq!(tool.name(), "run_analyze_sales");
        assert_eq!(
            tool.action,
            ToolAction::RunScript {
                path: "scripts/analyze-sales.py".to_string()
            }
        );
        assert!(tool.definition.description.contains("python3"));
        assert!(tool.definition.parameters["properties"]["args"].is_object());
    }
}
