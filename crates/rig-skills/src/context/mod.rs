//! Activation context ("the map")
//!
//! When a skill is activated the model gets, in one system message:
//!
//! 1. The procedure body of `SKILL.md`, verbatim
//! 2. Every other markdown file under the skill root, inlined
//! 3. A listing of every remaining file with a size class (never inlined)
//! 4. The script tools synthesized for the skill
//!
//! Output is a pure function of the filesystem state: the walk is sorted and
//! bounded, so two builds over the same tree are byte-identical.

use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ContextLimits;
use crate::paths::relative_display;
use crate::skills::{SkillDescriptor, SKILL_FILE};
use crate::tools::{ToolAction, ToolBridge, ToolDescriptor};

/// Coarse file size bucket shown in the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SizeClass {
    Tiny,
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn from_len(len: u64) -> Self {
        match len {
            0..=1023 => Self::Tiny,
            1024..=65_535 => Self::Small,
            65_536..=1_048_575 => Self::Medium,
            _ => Self::Large,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

/// One non-inlined file in the map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    /// Path relative to the skill root, `/`-separated
    pub path: String,
    /// `None` when the file could not be inspected
    pub size: Option<SizeClass>,
}

impl MapEntry {
    fn render(&self) -> String {
        match self.size {
            Some(size) => format!("{} ({})", self.path, size.as_str()),
            None => format!("{} [unreadable]", self.path),
        }
    }
}

/// Rendered payload for one activated skill
#[derive(Debug, Clone)]
pub struct ActivationContext {
    skill_name: String,
    text: String,
    inlined: Vec<String>,
    map: Vec<MapEntry>,
    omitted: usize,
    unexpanded: Vec<String>,
    tools: Vec<ToolDescriptor>,
}

impl ActivationContext {
    pub fn skill_name(&self) -> &str {
        &self.skill_name
    }

    /// Full text injected as a system message
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Relative paths of the markdown files that were inlined
    pub fn inlined(&self) -> &[String] {
        &self.inlined
    }

    pub fn map(&self) -> &[MapEntry] {
        &self.map
    }

    /// Files not visited because the entry limit was hit
    pub fn omitted(&self) -> usize {
        self.omitted
    }

    /// Non-empty directories at the depth limit, listed but not walked
    pub fn unexpanded(&self) -> &[String] {
        &self.unexpanded
    }

    /// Universal tools followed by the per-script tools
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn script_tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools
            .iter()
            .filter(|t| matches!(t.action, ToolAction::RunScript { .. }))
    }
}

/// Builds [`ActivationContext`]s
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    limits: ContextLimits,
}

impl ContextBuilder {
    pub fn new(limits: ContextLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ContextLimits {
        self.limits
    }

    pub fn build(&self, skill: &SkillDescriptor) -> ActivationContext {
        let root = skill.root();
        let mut knowledge: Vec<(String, String)> = Vec::new();
        let mut map: Vec<MapEntry> = Vec::new();
        let mut visited = 0usize;
        let mut omitted = 0usize;
        let mut unexpanded: Vec<String> = Vec::new();
        let max_depth = self.limits.max_depth.max(1);

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_string_lossy().as_ref()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let rel = e
                        .path()
                        .map(|p| relative_display(root, p))
                        .unwrap_or_else(|| "?".to_string());
                    warn!("Unreadable entry {} in skill {}: {}", rel, skill.name(), e);
                    if visited < self.limits.max_entries {
                        visited += 1;
                        map.push(MapEntry { path: rel, size: None });
                    } else {
                        omitted += 1;
                    }
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if entry.depth() == max_depth && has_visible_children(entry.path()) {
                    unexpanded.push(relative_display(root, entry.path()));
                }
                continue;
            }
            let rel = relative_display(root, entry.path());
            if rel == SKILL_FILE {
                continue;
            }

            if visited >= self.limits.max_entries {
                omitted += 1;
                continue;
            }
            visited += 1;

            if is_markdown(entry.path()) && !entry.path_is_symlink() {
                match std::fs::read_to_string(entry.path()) {
                    Ok(content) => knowledge.push((rel, content)),
                    Err(e) => {
                        warn!("Could not inline {}: {}", rel, e);
                        map.push(MapEntry { path: rel, size: None });
                    }
                }
            } else {
                let size = entry.metadata().ok().map(|m| SizeClass::from_len(m.len()));
                map.push(MapEntry { path: rel, size });
            }
        }

        let tools = ToolBridge::tool_set(skill);
        let text = render(skill, &knowledge, &map, omitted, &unexpanded, max_depth, &tools);

        debug!(
            "Built context for {}: {} inlined, {} mapped, {} omitted, {} unexpanded",
            skill.name(),
            knowledge.len(),
            map.len(),
            omitted,
            unexpanded.len()
        );

        ActivationContext {
            skill_name: skill.name().to_string(),
            text,
            inlined: knowledge.into_iter().map(|(rel, _)| rel).collect(),
            map,
            omitted,
            unexpanded,
            tools,
        }
    }
}

fn render(
    skill: &SkillDescriptor,
    knowledge: &[(String, String)],
    map: &[MapEntry],
    omitted: usize,
    unexpanded: &[String],
    max_depth: usize,
    tools: &[ToolDescriptor],
) -> String {
    let mut parts: Vec<String> = vec![
        format!("# Active Skill Protocol: {}", skill.name().to_uppercase()),
        "## 1. Primary Instructions (SOP)".to_string(),
        skill.procedure().to_string(),
    ];

    if !knowledge.is_empty() {
        parts.push("## 2. Knowledge & References".to_string());
        for (rel, content) in knowledge {
            parts.push(format!("### File: {}\n{}", rel, content.trim_end()));
        }
    }

    let mut listing = String::new();
    for entry in map {
        let _ = writeln!(listing, "{}", entry.render());
    }
    for dir in unexpanded {
        let _ = writeln!(listing, "{}/ ... [contents below depth {} not listed]", dir, max_depth);
    }
    if omitted > 0 {
        let _ = writeln!(listing, "... [{} more entries omitted]", omitted);
    }
    if listing.is_empty() {
        listing.push_str("(no additional files)\n");
    }
    parts.push("## 3. Project Structure (Map)".to_string());
    parts.push(format!("```text\n{}```", listing));

    let scripts: Vec<&ToolDescriptor> = tools
        .iter()
        .filter(|t| matches!(t.action, ToolAction::RunScript { .. }))
        .collect();
    if !scripts.is_empty() {
        parts.push("## 4. Available Tools (Scripts)".to_string());
        let lines = scripts
            .iter()
            .map(|t| match &t.action {
                ToolAction::RunScript { path } => {
                    format!("- `{}` runs `{}`", t.definition.name, path)
                }
                _ => String::new(),
            })
            .collect::<Vec<_>>()
            .join("\n");
        parts.push(lines);
    }

    parts.join("\n\n")
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}

fn has_visible_children(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.any(|e| e.is_ok_and(|e| !is_hidden(&e.file_name().to_string_lossy()))))
        .unwrap_or(false)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn skill_at(root: &Path, body: &str) -> SkillDescriptor {
        SkillDescriptor::new("demo", "Demo skill", root.canonicalize().unwrap(), body)
    }

    #[test]
    fn test_size_class_boundaries() {
        assert_eq!(SizeClass::from_len(0), SizeClass::Tiny);
        assert_eq!(SizeClass::from_len(1023), SizeClass::Tiny);
        assert_eq!(SizeClass::from_len(1024), SizeClass::Small);
        assert_eq!(SizeClass::from_len(64 * 1024), SizeClass::Medium);
        assert_eq!(SizeClass::from_len(1024 * 1024), SizeClass::Large);
    }

    #[test]
    fn test_build_sections() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::write(root.join(SKILL_FILE), "---\nname: demo\n---\nDo the thing.").unwrap();
        std::fs::create_dir_all(root.join("reference")).unwrap();
        std::fs::write(root.join("reference/guide.md"), "# Guide\nUse care.").unwrap();
        std::fs::create_dir_all(root.join("scripts")).unwrap();
        std::fs::write(root.join("scripts/analyze.py"), "print('ok')").unwrap();
        std::fs::write(root.join("data.bin"), vec![0u8; 2048]).unwrap();

        let ctx = ContextBuilder::default().build(&skill_at(root, "Do the thing."));
        let text = ctx.text();

        assert!(text.starts_with("# Active Skill Protocol: DEMO"));
        assert!(text.contains("## 1. Primary Instructions (SOP)\n\nDo the thing."));
        assert!(text.contains("### File: reference/guide.md\n# Guide\nUse care."));
        assert!(text.contains("data.bin (small)"));
        assert!(text.contains("scripts/analyze.py (tiny)"));
        assert!(text.contains("## 4. Available Tools (Scripts)"));
        assert!(text.contains("`run_analyze`"));
        assert!(!text.contains("SKILL.md ("));

        assert_eq!(ctx.inlined(), &["reference/guide.md".to_string()]);
        assert_eq!(ctx.script_tools().count(), 1);
    }

    #[test]
    fn test_build_without_extras() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(SKILL_FILE), "---\nname: demo\n---\nBody").unwrap();

        let ctx = ContextBuilder::default().build(&skill_at(temp.path(), "Body"));

        assert!(!ctx.text().contains("## 2. Knowledge"));
        assert!(!ctx.text().contains("## 4. Available Tools"));
        assert!(ctx.text().contains("(no additional files)"));
    }

    #[test]
    fn test_entry_limit_emits_omitted_marker() {
        let temp = TempDir::new().unwrap();
        for i in 0..5 {
            std::fs::write(temp.path().join(format!("file{}.txt", i)), "x").unwrap();
        }

        let builder = ContextBuilder::new(ContextLimits {
            max_depth: 8,
            max_entries: 2,
        });
        let ctx = builder.build(&skill_at(temp.path(), ""));

        assert_eq!(ctx.map().len(), 2);
        assert_eq!(ctx.omitted(), 3);
        assert!(ctx.text().contains("... [3 more entries omitted]"));
    }

    #[test]
    fn test_depth_limit() {
        let temp = TempDir::new().unwrap();
        let deep = temp.path().join("a/b/c");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(deep.join("deep.txt"), "x").unwrap();
        std::fs::write(temp.path().join("a/top.txt"), "x").unwrap();

        let builder = ContextBuilder::new(ContextLimits {
            max_depth: 2,
            max_entries: 100,
        });
        let ctx = builder.build(&skill_at(temp.path(), ""));

        let paths: Vec<&str> = ctx.map().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a/top.txt"]);
        assert_eq!(ctx.unexpanded(), &["a/b".to_string()]);
        assert!(ctx.text().contains("a/b/ ... [contents below depth 2 not listed]"));
    }

    #[test]
    fn test_depth_limit_skips_marker_for_empty_dirs() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("a/empty")).unwrap();
        std::fs::create_dir_all(temp.path().join("a/dotted/.cache")).unwrap();

        let builder = ContextBuilder::new(ContextLimits {
            max_depth: 2,
            max_entries: 100,
        });
        let ctx = builder.build(&skill_at(temp.path(), ""));

        assert!(ctx.unexpanded().is_empty());
        assert!(!ctx.text().contains("not listed"));
    }

    #[test]
    fn test_hidden_entries_skipped() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".git")).unwrap();
        std::fs::write(temp.path().join(".git/HEAD"), "ref").unwrap();
        std::fs::write(temp.path().join("visible.txt"), "x").unwrap();

        let ctx = ContextBuilder::default().build(&skill_at(temp.path(), ""));

        assert_eq!(ctx.map().len(), 1);
        assert_eq!(ctx.map()[0].path, "visible.txt");
    }
}
