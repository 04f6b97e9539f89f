//! Vertical agent factory CLI.
//!
//! Keeps one run per working directory in `.factory/run_state.json` so the
//! approval gates can span separate invocations:
//!
//! ```text
//! factory start "Veterinary Clinics"
//! factory run                 # discovery
//! factory approve specification --select "Patient Intake"
//! factory run                 # specification
//! factory approve build
//! factory run && factory run  # build, delivery
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use factory::core::types::Phase;
use factory::exit_codes;
use factory::io::config::{FactoryConfig, load_config};
use factory::io::run_state::{RunState, load_run_state, write_run_state};
use factory::io::store::FsArtifactStore;
use factory::logging;
use factory::orchestrator::{Orchestrator, WorkflowStatus};
use factory::phases::PhaseHandlers;

const STATE_DIR: &str = ".factory";

#[derive(Parser)]
#[command(
    name = "factory",
    version,
    about = "Turn a subject description into a generated vertical agent"
)]
struct Cli {
    /// Config file (defaults to `.factory/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Begin a new run, replacing any run in this directory.
    Start {
        subject: String,
        /// Write the generated package here instead of `<output_directory>/<slug>`.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Execute the current phase (or the named one) and print its artifact.
    Run {
        #[arg(long)]
        phase: Option<Phase>,
    },
    /// Pass the approval gate in front of a phase.
    Approve {
        phase: Phase,
        /// Workflow option to build (required for `specification`).
        #[arg(long = "select")]
        selection: Option<String>,
    },
    /// Print the saved run's position.
    Status,
    /// Start a run and execute phases until completion or the next gate.
    Auto {
        subject: String,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Pass gates automatically (default: `!require_approval`).
        #[arg(long)]
        auto_approve: bool,
    },
}

/// Paths of the per-directory factory state.
struct FactoryPaths {
    config_path: PathBuf,
    run_state_path: PathBuf,
}

impl FactoryPaths {
    fn new(root: &Path, config_override: Option<PathBuf>) -> Self {
        let state_dir = root.join(STATE_DIR);
        Self {
            config_path: config_override.unwrap_or_else(|| state_dir.join("config.toml")),
            run_state_path: state_dir.join("run_state.json"),
        }
    }
}

#[derive(Serialize)]
struct StatusReport<'a> {
    subject: &'a str,
    slug: &'a str,
    current_phase: Phase,
    awaiting_approval: Option<Phase>,
    output_location: &'a Path,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let paths = FactoryPaths::new(Path::new("."), cli.config);
    let config = load_config(&paths.config_path)?;
    debug!(config = %paths.config_path.display(), "config loaded");

    match cli.command {
        Command::Start {
            subject,
            output_dir,
        } => cmd_start(&paths, config, &subject, output_dir.as_deref()),
        Command::Run { phase } => cmd_run(&paths, config, phase),
        Command::Approve { phase, selection } => {
            cmd_approve(&paths, config, phase, selection.as_deref())
        }
        Command::Status => cmd_status(&paths),
        Command::Auto {
            subject,
            output_dir,
            auto_approve,
        } => {
            let auto_approve = auto_approve || !config.require_approval;
            cmd_auto(&paths, config, &subject, output_dir.as_deref(), auto_approve)
        }
    }
}

fn new_orchestrator(config: FactoryConfig) -> Orchestrator<FsArtifactStore> {
    Orchestrator::new(config, PhaseHandlers::default(), FsArtifactStore)
}

fn resume_orchestrator(
    paths: &FactoryPaths,
    config: FactoryConfig,
) -> Result<Orchestrator<FsArtifactStore>> {
    let state = load_run_state(&paths.run_state_path)
        .context("no saved run (run `factory start` first)")?;
    Ok(Orchestrator::resume(
        config,
        PhaseHandlers::default(),
        FsArtifactStore,
        state,
    ))
}

fn save(paths: &FactoryPaths, state: Option<&RunState>) -> Result<()> {
    match state {
        Some(state) => write_run_state(&paths.run_state_path, state),
        None => Ok(()),
    }
}

fn gate_code(awaiting: Option<Phase>) -> i32 {
    match awaiting {
        Some(_) => exit_codes::AWAITING_APPROVAL,
        None => exit_codes::OK,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{payload}");
    Ok(())
}

fn cmd_start(
    paths: &FactoryPaths,
    config: FactoryConfig,
    subject: &str,
    output_dir: Option<&Path>,
) -> Result<i32> {
    let mut orch = new_orchestrator(config);
    let slug = orch.start(subject, output_dir)?.subject_slug.clone();
    save(paths, orch.state())?;
    println!("{slug}");
    Ok(exit_codes::OK)
}

fn cmd_run(paths: &FactoryPaths, config: FactoryConfig, phase: Option<Phase>) -> Result<i32> {
    let mut orch = resume_orchestrator(paths, config)?;
    let phase = match phase {
        Some(phase) => phase,
        None => orch
            .current_phase()
            .context("saved run has no current phase")?,
    };
    let artifact = orch.run_phase(phase)?;
    save(paths, orch.state())?;
    print_json(&artifact)?;
    Ok(gate_code(orch.awaiting_approval()))
}

fn cmd_approve(
    paths: &FactoryPaths,
    config: FactoryConfig,
    phase: Phase,
    selection: Option<&str>,
) -> Result<i32> {
    let mut orch = resume_orchestrator(paths, config)?;
    orch.approve(phase, selection)?;
    save(paths, orch.state())?;
    println!("approved {phase}");
    Ok(exit_codes::OK)
}

fn cmd_status(paths: &FactoryPaths) -> Result<i32> {
    let state = load_run_state(&paths.run_state_path)
        .context("no saved run (run `factory start` first)")?;
    let awaiting = state.awaiting_approval();
    print_json(&StatusReport {
        subject: &state.subject_name,
        slug: &state.subject_slug,
        current_phase: state.current_phase,
        awaiting_approval: awaiting,
        output_location: &state.output_location,
    })?;
    Ok(gate_code(awaiting))
}

fn cmd_auto(
    paths: &FactoryPaths,
    config: FactoryConfig,
    subject: &str,
    output_dir: Option<&Path>,
    auto_approve: bool,
) -> Result<i32> {
    let mut orch = new_orchestrator(config);
    let outcome = orch.run_full_workflow(subject, output_dir, auto_approve);
    // Progress made before a failure is kept so the run can be resumed.
    save(paths, orch.state())?;
    let outcome = outcome?;
    print_json(&outcome.status)?;
    for result in &outcome.results {
        println!("completed {}", result.phase);
    }
    Ok(match outcome.status {
        WorkflowStatus::Complete => exit_codes::OK,
        WorkflowStatus::AwaitingApproval(_) => exit_codes::AWAITING_APPROVAL,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_start_with_output_dir() {
        let cli = Cli::parse_from([
            "factory",
            "start",
            "Veterinary Clinics",
            "--output-dir",
            "out",
        ]);
        match cli.command {
            Command::Start {
                subject,
                output_dir,
            } => {
                assert_eq!(subject, "Veterinary Clinics");
                assert_eq!(output_dir, Some(PathBuf::from("out")));
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn parse_approve_with_selection() {
        let cli = Cli::parse_from(["factory", "approve", "Specification", "--select", "Intake"]);
        assert!(matches!(
            cli.command,
            Command::Approve {
                phase: Phase::Specification,
                selection: Some(ref name),
            } if name == "Intake"
        ));
    }

    #[test]
    fn parse_run_with_phase_and_global_config() {
        let cli = Cli::parse_from(["factory", "run", "--phase", "build", "--config", "c.toml"]);
        assert!(matches!(
            cli.command,
            Command::Run {
                phase: Some(Phase::Build)
            }
        ));
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }

    #[test]
    fn unknown_phase_is_a_parse_error() {
        assert!(Cli::try_parse_from(["factory", "approve", "deploy"]).is_err());
    }

    #[test]
    fn parse_auto_defaults() {
        let cli = Cli::parse_from(["factory", "auto", "Dental"]);
        assert!(matches!(
            cli.command,
            Command::Auto {
                auto_approve: false,
                output_dir: None,
                ..
            }
        ));
    }
}
