//! Skill registry: one-shot scan of the skills root
//!
//! The registry is built once at startup and is read-only afterwards. Each
//! qualifying sub-directory (one with a `SKILL.md`) becomes one
//! [`SkillDescriptor`]. Listing is name-ordered so system prompts are
//! reproducible.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::types::{CapabilityDir, SkillDescriptor, SkillMetadata, DEFAULT_DESCRIPTION, SKILL_FILE};
use crate::error::ConfigError;

/// Catalog of discovered skill packages
#[derive(Debug, Default)]
pub struct SkillRegistry {
    root: PathBuf,
    skills: BTreeMap<String, Arc<SkillDescriptor>>,
    skipped: Vec<(PathBuf, ConfigError)>,
}

impl SkillRegistry {
    /// Scan one level of sub-directories under `root`
    ///
    /// A missing root yields an empty registry. A root that is not a
    /// directory is an error. Packages with malformed frontmatter or a
    /// duplicate name are skipped and recorded in [`skipped`](Self::skipped).
    pub async fn scan(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let root = root.as_ref();

        let meta = match tokio::fs::metadata(root).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Skills root {:?} does not exist, starting with an empty catalog", root);
                return Ok(Self {
                    root: root.to_path_buf(),
                    ..Default::default()
                });
            }
            Err(e) => return Err(ConfigError::Io(format!("{}: {}", root.display(), e))),
        };
        if !meta.is_dir() {
            return Err(ConfigError::NotADirectory(root.display().to_string()));
        }

        let mut dirs = Vec::new();
        let mut entries = tokio::fs::read_dir(root)
            .await
            .map_err(|e| ConfigError::Io(format!("{}: {}", root.display(), e)))?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if let Ok(metadata) = tokio::fs::metadata(&path).await {
                if metadata.is_dir() {
                    dirs.push(path);
                }
            }
        }
        // First wins, so the visiting order has to be stable
        dirs.sort();

        let mut registry = Self {
            root: root.to_path_buf(),
            ..Default::default()
        };

        for dir in dirs {
            let skill_file = dir.join(SKILL_FILE);
            if tokio::fs::metadata(&skill_file).await.is_err() {
                debug!("Skipping {:?}: no {}", dir, SKILL_FILE);
                continue;
            }

            match load_package(&dir, &skill_file).await {
                Ok(skill) => registry.insert(skill, dir),
                Err(e) => {
                    warn!("Failed to load skill {:?}: {}", skill_file, e);
                    registry.skipped.push((dir, e));
                }
            }
        }

        info!("Loaded {} skill(s) from {:?}", registry.skills.len(), root);
        Ok(registry)
    }

    /// Build a registry from already constructed descriptors
    ///
    /// Same first-wins rule as [`scan`](Self::scan).
    pub fn from_descriptors(skills: impl IntoIterator<Item = SkillDescriptor>) -> Self {
        let mut registry = Self::default();
        for skill in skills {
            let root = skill.root().to_path_buf();
            registry.insert(skill, root);
        }
        registry
    }

    fn insert(&mut self, skill: SkillDescriptor, dir: PathBuf) {
        if let Some(existing) = self.skills.get(skill.name()) {
            let err = ConfigError::DuplicateName {
                name: skill.name().to_string(),
                existing: existing.root().display().to_string(),
            };
            warn!("Skipping {:?}: {}", dir, err);
            self.skipped.push((dir, err));
            return;
        }
        debug!("Loaded skill metadata: {} from {:?}", skill.name(), skill.root());
        self.skills.insert(skill.name().to_string(), Arc::new(skill));
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, name: &str) -> Result<&Arc<SkillDescriptor>, ConfigError> {
        self.skills
            .get(name)
            .ok_or_else(|| ConfigError::NotFound(name.to_string()))
    }

    /// Descriptors in name order
    pub fn list(&self) -> Vec<&Arc<SkillDescriptor>> {
        self.skills.values().collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.skills.keys().map(String::as_str).collect()
    }

    /// Metadata-only catalog text, one line per skill
    pub fn summary(&self) -> String {
        if self.skills.is_empty() {
            return "(no skills installed)".to_string();
        }
        self.skills
            .values()
            .map(|s| s.summary())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Packages that were skipped during the scan, with the reason
    pub fn skipped(&self) -> &[(PathBuf, ConfigError)] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

async fn load_package(dir: &Path, skill_file: &Path) -> Result<SkillDescriptor, ConfigError> {
    let content = tokio::fs::read_to_string(skill_file)
        .await
        .map_err(|e| ConfigError::Io(format!("Failed to read skill: {}", e)))?;

    let metadata = parse_frontmatter(&content)?;
    let body = parse_body(&content);

    let root = tokio::fs::canonicalize(dir)
        .await
        .map_err(|e| ConfigError::Io(format!("{}: {}", dir.display(), e)))?;

    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = metadata
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or(dir_name);
    let description = metadata
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION)
        .to_string();

    let capabilities = scan_capabilities(&root).await;

    Ok(SkillDescriptor::new(name, description, root, body)
        .with_metadata(metadata)
        .with_capabilities(capabilities))
}

async fn scan_capabilities(root: &Path) -> BTreeSet<CapabilityDir> {
    let mut found = BTreeSet::new();
    let Ok(mut entries) = tokio::fs::read_dir(root).await else {
        return found;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Ok(file_type) = entry.file_type().await {
            if file_type.is_dir() {
                let name = entry.file_name().to_string_lossy().to_string();
                if !name.starts_with('.') {
                    found.insert(CapabilityDir::from_dir_name(&name));
                }
            }
        }
    }
    found
}

/// Parse YAML frontmatter from markdown content
///
/// Expected format:
/// ```markdown
/// ---
/// name: skill-name
/// description: Skill description
/// ---
/// Body content here...
/// ```
///
/// The closing `---` must be on its own line (possibly with trailing whitespace).
pub fn parse_frontmatter(content: &str) -> Result<SkillMetadata, ConfigError> {
    let content = content.trim();

    if !content.starts_with("---") {
        return Err(ConfigError::MissingFrontmatter);
    }

    let rest = &content[3..];
    let rest = rest.strip_prefix('\n').unwrap_or(rest);

    let end_idx = find_closing_frontmatter(rest).ok_or(ConfigError::UnclosedFrontmatter)?;
    let yaml_str = rest[..end_idx].trim();

    if yaml_str.is_empty() {
        return Ok(SkillMetadata::default());
    }

    serde_yaml::from_str(yaml_str).map_err(|e| ConfigError::InvalidYaml(e.to_string()))
}

/// Position of the closing `---` line, relative to `content`
fn find_closing_frontmatter(content: &str) -> Option<usize> {
    let mut pos = 0;
    for line in content.split_inclusive('\n') {
        if line.trim() == "---" {
            return Some(pos);
        }
        pos += line.len();
    }
    None
}

/// Body after the frontmatter, or the whole document when there is none
pub fn parse_body(content: &str) -> String {
    let content = content.trim();

    if !content.starts_with("---") {
        return content.to_string();
    }

    let rest = &content[3..];
    let rest = rest.strip_prefix('\n').unwrap_or(rest);

    match find_closing_frontmatter(rest) {
        Some(end_idx) => {
            let after_yaml = &rest[end_idx..];
            match after_yaml.find('\n') {
                Some(newline_pos) => after_yaml[newline_pos + 1..].trim().to_string(),
                None => String::new(),
            }
        }
        None => String::new(),
    }
}
