//! # Skill Agent
//!
//! Interactive shell around the `rig-skills` orchestrator: loads the skill
//! packages, picks an LLM backend once at startup and routes each user turn
//! through Discovery, Activation and Execution.
//!
//! ## Quick Start
//! ```bash
//! export ANTHROPIC_API_KEY=...
//! cargo run -- --skills-dir ./skills
//!
//! # One-shot
//! cargo run -- --provider deepseek "use data_analyst on report.csv"
//! ```

/// Configuration management
mod config;

// =============================================================================
// IMPORTS
// =============================================================================
use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rig_skills::llm::anthropic_backend;
use rig_skills::{
    BackendKind, DiscoveryMode, LLMBackend, OpenAICompatibleBackend, Router, Session, SkillRegistry,
    TurnOutcome,
};

use crate::config::Config;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "skill-agent",
    version,
    about = "Chat with an LLM that discovers, activates and runs local skill packages",
    long_about = r#"
Skill Agent - progressive disclosure for local skill packages.

Each skill is a folder with a SKILL.md procedure plus optional reference
documents and scripts. Only names and descriptions are shown to the model
until a skill is activated; then its procedure, markdown knowledge and a
map of its files are injected, and the model can read any file or run
any script inside that folder.

SHELL COMMANDS:
  status       show the active skill
  skills       list installed skills
  deactivate   drop the active skill
  help         show this list
  exit, q      quit

EXAMPLES:
  skill-agent --skills-dir ./skills
  skill-agent --provider deepseek --discovery backend
  skill-agent "use data_analyst on report.csv"
"#
)]
struct Args {
    /// Run a single turn and exit instead of starting the shell
    #[arg(value_name = "PROMPT")]
    prompt: Option<String>,

    /// Skills directory (overrides SKILLS_DIR)
    #[arg(short = 's', long = "skills-dir", env = "SKILLS_DIR")]
    skills_dir: Option<PathBuf>,

    /// LLM provider: anthropic, openai or deepseek (overrides LLM_PROVIDER)
    #[arg(short = 'p', long = "provider", env = "LLM_PROVIDER")]
    provider: Option<String>,

    /// Model name (overrides LLM_MODEL)
    #[arg(short = 'm', long = "model", env = "LLM_MODEL")]
    model: Option<String>,

    /// Maximum tool rounds per turn (overrides MAX_ROUNDS)
    #[arg(long = "max-rounds")]
    max_rounds: Option<usize>,

    /// Skill selection: keyword or backend (overrides DISCOVERY_MODE)
    #[arg(long = "discovery")]
    discovery: Option<DiscoveryMode>,

    /// Enable verbose/debug logging
    #[arg(short = 'v', long = "verbose", default_value = "false")]
    verbose: bool,
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let mut config = Config::from_env()?;
    apply_overrides(&mut config, &args)?;
    config.validate()?;

    info!(
        provider = %config.provider,
        model = %config.model_name(),
        skills_dir = %config.skills_dir.display(),
        "Configuration loaded"
    );

    let registry = SkillRegistry::scan(&config.skills_dir)
        .await
        .with_context(|| format!("Failed to load skills from {}", config.skills_dir.display()))?;
    for (path, err) in registry.skipped() {
        warn!(path = %path.display(), error = %err, "Skipped skill package");
    }

    let backend = build_backend(&config)?;
    let router = Router::new(config.agent_config(), Arc::new(registry), backend);
    let mut session = router.session();

    if let Some(prompt) = args.prompt.as_deref() {
        let outcome = router.handle_turn(&mut session, prompt).await?;
        print_outcome(&outcome);
        return Ok(());
    }

    run_shell(&router, &mut session).await
}

/// CLI flags win over the environment
fn apply_overrides(config: &mut Config, args: &Args) -> Result<()> {
    if let Some(provider) = &args.provider {
        let provider = provider.trim().to_lowercase();
        if provider != config.provider {
            // Re-read provider-specific keys for the new provider
            let reloaded = Config::from_lookup(|key| {
                if key == "LLM_PROVIDER" {
                    Some(provider.clone())
                } else {
                    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
                }
            })?;
            *config = reloaded;
        }
    }
    if let Some(dir) = &args.skills_dir {
        config.skills_dir = dir.clone();
    }
    if let Some(model) = &args.model {
        info!(model = %model, "Using model from command line");
        config.model = Some(model.clone());
    }
    if let Some(max_rounds) = args.max_rounds {
        config.max_rounds = max_rounds;
    }
    if let Some(discovery) = args.discovery {
        config.discovery = discovery;
    }
    Ok(())
}

fn build_backend(config: &Config) -> Result<Arc<dyn LLMBackend>> {
    let api_key = config
        .api_key
        .clone()
        .context("API key missing for the selected provider")?;
    let llm_config = config.llm_config();

    let backend: Arc<dyn LLMBackend> = match config.backend_kind()? {
        BackendKind::Native => anthropic_backend(&api_key, llm_config),
        BackendKind::OpenAICompatible => Arc::new(
            OpenAICompatibleBackend::new(api_key, llm_config).with_provider_name(config.provider.clone()),
        ),
    };
    info!(backend = backend.name(), model = backend.default_model(), "LLM backend ready");
    Ok(backend)
}

// =============================================================================
// INTERACTIVE SHELL
// =============================================================================
/// What a line of shell input asks for
#[derive(Debug, PartialEq)]
enum ShellCommand<'a> {
    Exit,
    Status,
    Skills,
    Deactivate,
    Help,
    Empty,
    Prompt(&'a str),
}

fn parse_command(line: &str) -> ShellCommand<'_> {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "" => ShellCommand::Empty,
        "exit" | "q" | "quit" => ShellCommand::Exit,
        "status" => ShellCommand::Status,
        "skills" => ShellCommand::Skills,
        "deactivate" => ShellCommand::Deactivate,
        "help" | "?" => ShellCommand::Help,
        _ => ShellCommand::Prompt(trimmed),
    }
}

async fn run_shell(router: &Router, session: &mut Session) -> Result<()> {
    println!(
        "{} Loaded {} skill(s). Type {} for commands.",
        "System ready.".green(),
        router.registry().len(),
        "help".bold()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n{} ", "User >".bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            ShellCommand::Empty => continue,
            ShellCommand::Exit => break,
            ShellCommand::Status => println!("{}", session.status()),
            ShellCommand::Skills => println!("{}", router.catalog()),
            ShellCommand::Deactivate => match router.deactivate(session) {
                Some(name) => println!("{} {}", "Deactivated:".yellow(), name),
                None => println!("No active skill"),
            },
            ShellCommand::Help => print_help(),
            ShellCommand::Prompt(input) => {
                let before = session.active_skill_name().map(str::to_string);
                let result = router.handle_turn(session, input).await;

                let after = session.active_skill_name();
                if after.is_some() && after != before.as_deref() {
                    println!("{} {}", "Activated:".green(), after.unwrap_or_default());
                }

                match result {
                    Ok(outcome) => print_outcome(&outcome),
                    Err(e) => {
                        error!(error = %e, "Turn failed");
                        eprintln!("{} {}", "Error:".red(), e);
                    }
                }
            }
        }
    }

    info!(session = %session.id(), "Session ended");
    Ok(())
}

fn print_outcome(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Answer { text, .. } => println!("\n{}", text),
        TurnOutcome::RoundLimitExceeded { .. } => println!("\n{}", outcome.text().yellow()),
    }
    let usage = outcome.usage();
    if !usage.is_empty() {
        println!(
            "{}",
            format!(
                "[{} round(s), {} tokens in / {} out]",
                outcome.rounds(),
                usage.input_tokens,
                usage.output_tokens
            )
            .dimmed()
        );
    }
}

fn print_help() {
    println!("  status       show the active skill");
    println!("  skills       list installed skills");
    println!("  deactivate   drop the active skill");
    println!("  help         show this list");
    println!("  exit, q      quit");
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Logs go to stderr so they do not interleave with answers on stdout.
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
