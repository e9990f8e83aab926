//! Skill type definitions

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Name of the required procedure descriptor
pub const SKILL_FILE: &str = "SKILL.md";

/// Description used when the frontmatter omits one
pub const DEFAULT_DESCRIPTION: &str = "No description.";

/// Description characters kept in a discovery summary line
pub const SUMMARY_DESCRIPTION_CHARS: usize = 100;

/// Skill metadata from YAML frontmatter
///
/// # Example SKILL.md:
/// ```markdown
/// ---
/// name: data_analyst
/// description: Analyze CSV and Excel reports
/// ---
/// [Procedure...]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SkillMetadata {
    /// Skill name, falls back to the directory name
    #[serde(default)]
    pub name: Option<String>,

    /// Routing signal shown during discovery
    #[serde(default)]
    pub description: Option<String>,

    /// A YAML list, a single string or a comma-separated string
    #[serde(default, deserialize_with = "string_or_list")]
    pub tags: Vec<String>,

    #[serde(default, deserialize_with = "scalar_string")]
    pub version: Option<String>,

    #[serde(default, deserialize_with = "scalar_string")]
    pub author: Option<String>,
}

fn scalar_text(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accepts `version: 1.0` as well as `version: "1.0"`
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<serde_yaml::Value>::deserialize(deserializer)?.and_then(scalar_text))
}

fn string_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let tags = match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        Some(serde_yaml::Value::Sequence(items)) => items.into_iter().filter_map(scalar_text).collect(),
        Some(value) => scalar_text(value)
            .map(|s| s.split(',').map(|t| t.trim().to_string()).collect())
            .unwrap_or_default(),
        None => Vec::new(),
    };
    Ok(tags.into_iter().filter(|t: &String| !t.is_empty()).collect())
}

/// Well-known and custom directories found in a skill package
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CapabilityDir {
    Reference,
    Scripts,
    Forms,
    Custom(String),
}

impl CapabilityDir {
    pub fn from_dir_name(name: &str) -> Self {
        match name {
            "reference" => Self::Reference,
            "scripts" => Self::Scripts,
            "forms" => Self::Forms,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn dir_name(&self) -> &str {
        match self {
            Self::Reference => "reference",
            Self::Scripts => "scripts",
            Self::Forms => "forms",
            Self::Custom(name) => name,
        }
    }
}

/// A discovered skill package
///
/// Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillDescriptor {
    name: String,
    description: String,
    root: PathBuf,
    procedure: String,
    capabilities: BTreeSet<CapabilityDir>,
    metadata: SkillMetadata,
}

impl SkillDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        root: impl Into<PathBuf>,
        procedure: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let description = description.into();
        Self {
            metadata: SkillMetadata {
                name: Some(name.clone()),
                description: Some(description.clone()),
                tags: vec![],
                version: None,
                author: None,
            },
            name,
            description,
            root: root.into(),
            procedure: procedure.into(),
            capabilities: BTreeSet::new(),
        }
    }

    pub(crate) fn with_metadata(mut self, metadata: SkillMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_capabilities(mut self, capabilities: BTreeSet<CapabilityDir>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Canonical skill root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn skill_file(&self) -> PathBuf {
        self.root.join(SKILL_FILE)
    }

    /// Procedure body (SKILL.md without frontmatter)
    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn capabilities(&self) -> &BTreeSet<CapabilityDir> {
        &self.capabilities
    }

    pub fn has_capability(&self, capability: &CapabilityDir) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn metadata(&self) -> &SkillMetadata {
        &self.metadata
    }

    /// Metadata-only summary line for discovery prompts
    pub fn summary(&self) -> String {
        let flat = self.description.split_whitespace().collect::<Vec<_>>().join(" ");
        let desc = if flat.chars().count() > SUMMARY_DESCRIPTION_CHARS {
            format!("{}...", flat.chars().take(SUMMARY_DESCRIPTION_CHARS).collect::<String>())
        } else {
            flat
        };
        format!("- **{}**: {}", self.name, desc)
    }
}
