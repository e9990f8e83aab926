// src/paths.rs
//! Path containment for tool calls
//!
//! # Security Model
//!
//! Every path a tool call names is resolved against the active skill root
//! before anything touches the filesystem or spawns a process.
//!
//! ## Guarantees
//! - `..` segments are folded lexically; a result outside the root is refused
//!   without any I/O
//! - Home directory expansion (`~`) is refused
//! - Absolute paths are accepted only when they already point inside the root
//! - The nearest existing ancestor is canonicalized so a symlink inside the
//!   root cannot redirect to a location outside it
//!
//! ## Limitations
//! - Time-of-check/time-of-use races are not handled (no sandbox)
//! - URL-encoded segments are taken literally

use std::path::{Component, Path, PathBuf};

use crate::error::ToolFailure;

/// Strip whitespace and stray quotes that models like to wrap paths in
pub fn clean_requested_path(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim_matches('\'').trim()
}

/// Fold `.` and `..` segments without consulting the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

/// Resolve `requested` inside `root`
///
/// Relative paths are joined to the root. Returns `PathEscape` for anything
/// that would leave it.
pub fn resolve_within(root: &Path, requested: &str) -> Result<PathBuf, ToolFailure> {
    let cleaned = clean_requested_path(requested);
    if cleaned.is_empty() {
        return Err(ToolFailure::InvalidArguments("path must not be empty".to_string()));
    }
    if cleaned.starts_with('~') {
        return Err(ToolFailure::PathEscape(cleaned.to_string()));
    }

    let root = normalize_lexically(root);
    let candidate = Path::new(cleaned);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };

    let normalized = normalize_lexically(&joined);
    if !normalized.starts_with(&root) {
        return Err(ToolFailure::PathEscape(cleaned.to_string()));
    }

    ensure_no_symlink_escape(&root, &normalized, cleaned)?;
    Ok(normalized)
}

/// Canonicalize the nearest existing ancestor of `target` and make sure it
/// is still under the canonical root
fn ensure_no_symlink_escape(root: &Path, target: &Path, display: &str) -> Result<(), ToolFailure> {
    let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

    let mut ancestor = Some(target);
    while let Some(path) = ancestor {
        if path.symlink_metadata().is_ok() {
            if let Ok(resolved) = path.canonicalize() {
                if !resolved.starts_with(&canonical_root) {
                    return Err(ToolFailure::PathEscape(format!(
                        "symlink escape detected: {}",
                        display
                    )));
                }
            }
            return Ok(());
        }
        if path == root {
            break;
        }
        ancestor = path.parent();
    }

    Ok(())
}

/// Relative path of `path` under `root`, always with `/` separators
pub fn relative_display(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(segment.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/skills/pdf/./reference/../SKILL.md")),
            PathBuf::from("/skills/pdf/SKILL.md")
        );
        assert_eq!(
            normalize_lexically(Path::new("/skills/pdf/../../etc/passwd")),
            PathBuf::from("/etc/passwd")
        );
    }

    #[test]
    fn test_clean_requested_path() {
        assert_eq!(clean_requested_path("  \"scripts/run.py\" "), "scripts/run.py");
        assert_eq!(clean_requested_path("'notes.md'"), "notes.md");
    }

    #[test]
    fn test_resolve_relative_inside_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let resolved = resolve_within(root, "reference/guide.md").unwrap();
        assert!(resolved.ends_with("reference/guide.md"));

        let resolved = resolve_within(root, "reference/../SKILL.md").unwrap();
        assert!(resolved.ends_with("SKILL.md"));
    }

    #[test]
    fn test_resolve_traversal_is_refused() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        for attempt in ["../secret.txt", "reference/../../secret.txt", "~/.ssh/id_rsa", "/etc/passwd"] {
            let result = resolve_within(root, attempt);
            assert!(
                matches!(result, Err(ToolFailure::PathEscape(_))),
                "expected PathEscape for {}",
                attempt
            );
        }
    }

    #[test]
    fn test_resolve_absolute_inside_root() {
        let temp = TempDir::new().unwrap();
        let inside = temp.path().join("scripts").join("run.sh");
        let resolved = resolve_within(temp.path(), &inside.to_string_lossy()).unwrap();
        assert_eq!(resolved, normalize_lexically(&inside));
    }

    #[test]
    fn test_resolve_empty_path() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            resolve_within(temp.path(), "  "),
            Err(ToolFailure::InvalidArguments(_))
        ));
    }

    #[test]
    #[cfg(unix)]
    fn test_resolve_symlink_escape() {
        use std::os::unix::fs::symlink;

        let root = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "secret data").unwrap();
        symlink(outside.path(), root.path().join("escape")).unwrap();

        let result = resolve_within(root.path(), "escape/secret.txt");
        assert!(matches!(result, Err(ToolFailure::PathEscape(_))));
    }

    #[test]
    fn test_relative_display() {
        let root = Path::new("/skills/pdf");
        assert_eq!(
            relative_display(root, Path::new("/skills/pdf/reference/forms.md")),
            "reference/forms.md"
        );
    }
}
