//! Tools exposed to the model while a skill is active
//!
//! - [`universal_tools`]: `read_file` and `execute_script`, always present
//! - [`ToolBridge`]: one synthesized `run_<name>` tool per script in `scripts/`
//! - [`ToolDispatcher`]: resolves a model-issued call against the active
//!   skill root and runs it through the reader or the script executor

mod bridge;
mod descriptor;
mod dispatch;

pub use bridge::ToolBridge;
pub use descriptor::{
    canonical_tool_name, sanitize_tool_name, script_tool_descriptor, universal_tools, ToolAction,
    ToolDefinition, ToolDescriptor, EXECUTE_SCRIPT, READ_FILE,
};
pub use dispatch::{ToolCallResult, ToolDispatcher, TRUNCATION_MARKER};
