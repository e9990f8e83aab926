//! Skill packages and the registry
//!
//! A skill package is a directory with a `SKILL.md` procedure descriptor:
//!
//! ```text
//! skills/
//! ├── data_analyst/
//! │   ├── SKILL.md          # frontmatter + procedure (required)
//! │   ├── reference/        # markdown knowledge (inlined on activation)
//! │   ├── scripts/          # executables (become tools)
//! │   └── forms/            # anything else is map-only
//! └── pdf/
//!     └── SKILL.md
//! ```
//!
//! # SKILL.md Format
//!
//! ```markdown
//! ---
//! name: data_analyst
//! description: Analyze CSV and Excel reports
//! ---
//! # Procedure
//!
//! Step-by-step instructions...
//! ```
//!
//! Only `name` and `description` are shown to the model during discovery;
//! the body is injected on activation.

pub mod types;
pub mod registry;

pub use types::{
    CapabilityDir, SkillDescriptor, SkillMetadata, DEFAULT_DESCRIPTION, SKILL_FILE, SUMMARY_DESCRIPTION_CHARS,
};
pub use registry::{parse_body, parse_frontmatter, SkillRegistry};
