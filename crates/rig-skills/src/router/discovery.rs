//! Skill selection
//!
//! Selectors only ever see the metadata catalog (`name` + `description`).
//! They return candidates; [`choose_skill`] applies the fallback policy.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::AgentError;
use crate::llm::LLMBackend;
use crate::skills::SkillRegistry;
use crate::state::Message;

/// Proposes candidate skills for one user input
#[async_trait]
pub trait SkillSelector: Send + Sync {
    async fn candidates(&self, input: &str, registry: &SkillRegistry) -> Result<Vec<String>, AgentError>;

    fn name(&self) -> &str;
}

/// Matches skill names against the lowercased input
///
/// `data_analyst` matches "use data_analyst" as well as "ask the data analyst".
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordSelector;

impl KeywordSelector {
    pub fn matches(skill_name: &str, input: &str) -> bool {
        let input = input.to_lowercase();
        let name = skill_name.to_lowercase();
        if name.is_empty() {
            return false;
        }
        let spaced = name.replace(['-', '_'], " ");
        input.contains(&name) || input.contains(&spaced)
    }
}

#[async_trait]
impl SkillSelector for KeywordSelector {
    async fn candidates(&self, input: &str, registry: &SkillRegistry) -> Result<Vec<String>, AgentError> {
        Ok(registry
            .names()
            .into_iter()
            .filter(|name| Self::matches(name, input))
            .map(str::to_string)
            .collect())
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

const SELECTOR_PROMPT: &str = "You route user requests to skills. Reply with exactly one skill \
name from the catalog below, or `none` if no skill fits. Reply with the name only.";

/// Asks the backend to pick a skill from the metadata catalog
pub struct BackendSelector {
    backend: Arc<dyn LLMBackend>,
}

impl BackendSelector {
    pub fn new(backend: Arc<dyn LLMBackend>) -> Self {
        Self { backend }
    }
}

impl std::fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSelector")
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[async_trait]
impl SkillSelector for BackendSelector {
    async fn candidates(&self, input: &str, registry: &SkillRegistry) -> Result<Vec<String>, AgentError> {
        if registry.is_empty() {
            return Ok(Vec::new());
        }

        let messages = vec![
            Message::system(&format!("{}\n\nAvailable skills:\n{}", SELECTOR_PROMPT, registry.summary())),
            Message::user(input),
        ];
        let response = self.backend.generate(&messages, &[]).await?;
        let answer = clean_answer(&response.message.content);
        debug!(answer = %answer, "backend selector answered");

        Ok(registry
            .names()
            .into_iter()
            .find(|name| name.eq_ignore_ascii_case(&answer))
            .map(|name| vec![name.to_string()])
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "backend"
    }
}

/// Strip markdown emphasis, quotes and trailing punctuation from a one-word answer
fn clean_answer(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .trim_matches(|c: char| matches!(c, '`' | '*' | '"' | '\'' | '.' | '-' | ' '))
        .to_string()
}

/// Fallback policy over the candidates
///
/// The active skill wins when it is a candidate. Otherwise the longest name
/// is the most specific match; ties go to the lexically first name. `None`
/// means no new selection: the caller keeps the active skill (or stays idle).
pub fn choose_skill<'a>(candidates: &'a [String], active: Option<&str>) -> Option<&'a str> {
    if let Some(active) = active {
        if let Some(keep) = candidates.iter().find(|c| c.as_str() == active) {
            return Some(keep.as_str());
        }
    }

    candidates
        .iter()
        .min_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)))
        .map(String::as_str)
}
