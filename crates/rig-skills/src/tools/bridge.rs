//! Per-skill tool discovery

use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

use super::descriptor::{sanitize_tool_name, script_tool_descriptor, universal_tools, ToolDescriptor};
use crate::exec::is_runnable;
use crate::skills::SkillDescriptor;

pub struct ToolBridge;

impl ToolBridge {
    /// One `run_<name>` descriptor per runnable file directly under `scripts/`,
    /// in lexical order
    pub fn discover(skill: &SkillDescriptor) -> Vec<ToolDescriptor> {
        let scripts_dir = skill.root().join("scripts");
        let Ok(entries) = std::fs::read_dir(&scripts_dir) else {
            return Vec::new();
        };

        let mut scripts: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                let hidden = p
                    .file_name()
                    .map(|n| n.to_string_lossy().starts_with('.'))
                    .unwrap_or(true);
                !hidden && p.is_file() && is_runnable(p)
            })
            .collect();
        scripts.sort();

        let mut used: HashSet<String> = HashSet::new();
        let mut tools = Vec::with_capacity(scripts.len());
        for script in scripts {
            let mut tool = script_tool_descriptor(&script, skill.root());
            if used.contains(tool.name()) {
                // analyze.py and analyze.sh: keep the extension for the later one
                let file_name = script
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let mut name = format!("run_{}", sanitize_tool_name(&file_name));
                name.truncate(64);
                tool.definition.name = name;
            }
            if !used.insert(tool.name().to_string()) {
                debug!("Skipping {:?}: tool name {} already taken", script, tool.name());
                continue;
            }
            tools.push(tool);
        }

        debug!("Discovered {} script tool(s) for {}", tools.len(), skill.name());
        tools
    }

    /// Universal tools followed by the discovered script tools
    pub fn tool_set(skill: &SkillDescriptor) -> Vec<ToolDescriptor> {
        let mut tools = universal_tools();
        tools.extend(Self::discover(skill));
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolAction;
    use tempfile::TempDir;

    fn skill(root: &std::path::Path) -> SkillDescriptor {
        SkillDescriptor::new("demo", "d", root.canonicalize().unwrap(), "")
    }

    #[test]
    fn test_discover_scripts_in_order() {
        let temp = TempDir::new().unwrap();
        let scripts = temp.path().join("scripts");
        std::fs::create_dir_all(scripts.join("lib")).unwrap();
        std::fs::write(scripts.join("zeta.sh"), "echo z").unwrap();
        std::fs::write(scripts.join("analyze.py"), "print(1)").unwrap();
        std::fs::write(scripts.join("notes.txt"), "not a script").unwrap();
        std::fs::write(scripts.join("lib/helper.py"), "").unwrap();

        let tools = ToolBridge::discover(&skill(temp.path()));
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();

        assert_eq!(names, vec!["run_analyze", "run_zeta"]);
        assert_eq!(
            tools[0].action,
            ToolAction::RunScript {
                path: "scripts/analyze.py".to_string()
            }
        );
    }

    #[test]
    fn test_discover_name_collision() {
        let temp = TempDir::new().unwrap();
        let scripts = temp.path().join("scripts");
        std::fs::create_dir_all(&scripts).unwrap();
        std::fs::write(scripts.join("report.py"), "").unwrap();
        std::fs::write(scripts.join("report.sh"), "").unwrap();

        let tools = ToolBridge::discover(&skill(temp.path()));
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();

        assert_eq!(names, vec!["run_report", "run_report_sh"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let scripts = temp.path().join("scripts");
        std::fs::create_dir_all(&scripts).unwrap();
        let tool = scripts.join("convert");
        std::fs::write(&tool, "#!/bin/sh\necho hi").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(scripts.join("README"), "plain").unwrap();

        let tools = ToolBridge::discover(&skill(temp.path()));
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["run_convert"]);
    }

    #[test]
    fn test_tool_set_without_scripts() {
        let temp = TempDir::new().unwrap();
        let tools = ToolBridge::tool_set(&skill(temp.path()));
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["read_file", "execute_script"]);
    }
}
