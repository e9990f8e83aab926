//! Skill package validator
//!
//! Checks `SKILL.md` frontmatter, skill names and the `scripts/` folder of
//! one package or a whole skills directory.
//!
//! # Usage
//!
//! ```bash
//! # Validate a single skill file
//! skill-validator skills/data_analyst/SKILL.md
//!
//! # Validate every package below a directory
//! skill-validator --dir skills/
//!
//! # Strict mode (warnings become errors), JSON output
//! skill-validator --strict --json skills/
//! ```
//!
//! # Exit Codes
//!
//! - 0: All validations passed
//! - 1: Validation errors found
//! - 2: CLI usage error

use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rig_skills::exec::is_runnable;
use rig_skills::skills::{parse_body, parse_frontmatter, SKILL_FILE, SUMMARY_DESCRIPTION_CHARS};
use rig_skills::ConfigError;

/// Skill package validator
#[derive(Parser, Debug)]
#[command(name = "skill-validator")]
#[command(about = "Validates SKILL.md frontmatter and skill package layout")]
#[command(version)]
struct Args {
    /// Path to a SKILL.md file or a directory containing skills
    #[arg(required_unless_present = "dir")]
    path: Option<PathBuf>,

    /// Validate all skills in a directory (recursively)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Strict mode: treat warnings as errors
    #[arg(short, long)]
    strict: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Quiet mode: only output on errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Serialize)]
struct ValidationResult {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    valid: bool,
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    fn failed(path: &Path, issue: ValidationIssue) -> Self {
        Self {
            path: path.display().to_string(),
            name: None,
            valid: false,
            errors: vec![issue],
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ValidationIssue {
    code: &'static str,
    message: String,
}

impl ValidationIssue {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let files = match collect_files(&args) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    if files.is_empty() {
        if !args.quiet {
            eprintln!("No {} files found", SKILL_FILE);
        }
        return ExitCode::from(2);
    }

    let mut results: Vec<ValidationResult> = files.iter().map(|path| validate_skill_file(path)).collect();
    check_duplicate_names(&mut results);

    let total_errors: usize = results.iter().map(|r| r.errors.len()).sum();
    let total_warnings: usize = results.iter().map(|r| r.warnings.len()).sum();

    if args.json {
        match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(2);
            }
        }
    } else {
        for result in &results {
            print_result(result, args.quiet);
        }

        if !args.quiet {
            println!();
            println!(
                "Validated {} file(s): {} error(s), {} warning(s)",
                results.len(),
                total_errors,
                total_warnings
            );
        }
    }

    if total_errors > 0 || (args.strict && total_warnings > 0) {
        ExitCode::from(1)
    } else {
        ExitCode::from(0)
    }
}

fn collect_files(args: &Args) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();

    if let Some(dir) = &args.dir {
        collect_skills_in_dir(dir, &mut files)?;
    }

    if let Some(path) = &args.path {
        if path.is_dir() {
            collect_skills_in_dir(path, &mut files)?;
        } else if path.exists() {
            files.push(path.clone());
        } else {
            return Err(format!("Path does not exist: {}", path.display()));
        }
    }

    Ok(files)
}

/// Find `SKILL.md` files, in lexical order; a package directory is not
/// searched further once its `SKILL.md` is found
fn collect_skills_in_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), String> {
    if !dir.is_dir() {
        return Err(format!("Not a directory: {}", dir.display()));
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("Failed to read directory {}: {}", dir.display(), e))?;
    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            let skill_file = path.join(SKILL_FILE);
            if skill_file.exists() {
                files.push(skill_file);
            } else {
                collect_skills_in_dir(&path, files)?;
            }
        } else if path.file_name().is_some_and(|n| n == SKILL_FILE) {
            files.push(path);
        }
    }

    Ok(())
}

fn validate_skill_file(path: &Path) -> ValidationResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return ValidationResult::failed(path, ValidationIssue::new("E001", format!("Failed to read file: {}", e)))
        }
    };

    let metadata = match parse_frontmatter(&content) {
        Ok(m) => m,
        Err(e) => {
            let code = match e {
                ConfigError::MissingFrontmatter => "E002",
                ConfigError::UnclosedFrontmatter => "E003",
                _ => "E004",
            };
            return ValidationResult::failed(path, ValidationIssue::new(code, e.to_string()));
        }
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let dir_name = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string());

    match &metadata.name {
        None => warnings.push(ValidationIssue::new(
            "W004",
            "Missing name: the directory name will be used",
        )),
        Some(name) => {
            if !is_valid_skill_name(name) {
                errors.push(ValidationIssue::new(
                    "E007",
                    format!(
                        "Skill name '{}' must be lowercase letters, digits, '-' or '_', starting with a letter",
                        name
                    ),
                ));
            }
            if is_reserved_name(name) {
                errors.push(ValidationIssue::new("E008", format!("Skill name '{}' is reserved", name)));
            }
            if dir_name.as_deref().is_some_and(|d| d != name) {
                warnings.push(ValidationIssue::new(
                    "W005",
                    format!("Skill name '{}' differs from its directory name", name),
                ));
            }
        }
    }

    match metadata.description.as_deref().map(str::trim) {
        None | Some("") => errors.push(ValidationIssue::new(
            "E006",
            "Missing required field: description (used for routing)",
        )),
        Some(d) if d.chars().count() > SUMMARY_DESCRIPTION_CHARS => warnings.push(ValidationIssue::new(
            "W001",
            format!(
                "Description is cut to {} characters in the skill list the router sees",
                SUMMARY_DESCRIPTION_CHARS
            ),
        )),
        Some(d) if d.chars().count() < 10 => warnings.push(ValidationIssue::new(
            "W002",
            "Description is too short to route on (< 10 characters)",
        )),
        Some(_) => {}
    }

    if parse_body(&content).is_empty() {
        warnings.push(ValidationIssue::new("W003", "Procedure body is empty"));
    }

    if let Some(root) = path.parent() {
        for script in unrunnable_scripts(root) {
            warnings.push(ValidationIssue::new(
                "W006",
                format!("scripts/{} has no known interpreter and is not executable", script),
            ));
        }
    }

    ValidationResult {
        path: path.display().to_string(),
        name: metadata.name.or(dir_name),
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// First occurrence wins, the same way the registry resolves duplicates
fn check_duplicate_names(results: &mut [ValidationResult]) {
    let mut seen: HashMap<String, String> = HashMap::new();
    for result in results.iter_mut() {
        let Some(name) = result.name.clone() else {
            continue;
        };
        match seen.get(&name) {
            Some(first) => {
                result.errors.push(ValidationIssue::new(
                    "E009",
                    format!("Duplicate skill name '{}' (first defined in {})", name, first),
                ));
                result.valid = false;
            }
            None => {
                seen.insert(name, result.path.clone());
            }
        }
    }
}

fn unrunnable_scripts(root: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(root.join("scripts")) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && !is_runnable(p))
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();
    names
}

/// Lowercase letters, digits and single `-`/`_` separators
fn is_valid_skill_name(s: &str) -> bool {
    let mut chars = s.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_lowercase()) {
        return false;
    }
    if !s.chars().last().is_some_and(|c| c.is_ascii_alphanumeric()) {
        return false;
    }

    let mut prev_separator = false;
    for c in s.chars() {
        if c == '-' || c == '_' {
            if prev_separator {
                return false;
            }
            prev_separator = true;
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
            prev_separator = false;
        } else {
            return false;
        }
    }

    true
}

fn is_reserved_name(name: &str) -> bool {
    matches!(
        name,
        "help" | "status" | "skills" | "deactivate" | "exit" | "q" | "none"
    )
}

fn print_result(result: &ValidationResult, quiet: bool) {
    if quiet && result.valid && result.warnings.is_empty() {
        return;
    }

    if result.valid {
        println!("{} {}", "✓".green(), result.path);
    } else {
        println!("{} {}", "✗".red(), result.path);
    }

    for error in &result.errors {
        println!("  {}: {}", format!("error[{}]", error.code).red(), error.message);
    }
    for warning in &result.warnings {
        println!("  {}: {}", format!("warn[{}]", warning.code).yellow(), warning.message);
    }
}
