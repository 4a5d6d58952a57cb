//! Supervisor-routed team runner.
//!
//! Loads a team file (`team.toml`), routes the task through its executors
//! and nested teams, and prints the run as JSON.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use teamloop::core::types::Message;
use teamloop::error::RunError;
use teamloop::exit_codes;
use teamloop::graph::Turn;
use teamloop::io::config::{load_team, write_default_team};
use teamloop::logging;
use teamloop::team::build_team;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "teamloop",
    version,
    about = "Supervisor-routed team orchestration"
)]
struct Cli {
    /// Team file to load or create.
    #[arg(long, global = true, default_value = "team.toml")]
    team: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default team file if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the routing menu of the top-level team.
    Roster,
    /// Run a task through the team and print the result as JSON.
    Run {
        /// Task text seeding the conversation.
        task: String,
        /// Override the top-level `max_iterations`.
        #[arg(long)]
        max_iterations: Option<u32>,
        /// Print each decision and executor turn to stderr and log at info.
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(matches!(cli.command, Command::Run { verbose: true, .. }));
    let result = match cli.command {
        Command::Init { force } => cmd_init(&cli.team, force),
        Command::Roster => cmd_roster(&cli.team),
        Command::Run {
            task,
            max_iterations,
            verbose,
        } => cmd_run(&cli.team, &task, max_iterations, verbose),
    };
    match result {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::from(exit_codes::INVALID as u8)
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if write_default_team(path, force)? {
        println!("wrote {}", path.display());
    } else {
        println!("{} already exists (use --force to overwrite)", path.display());
    }
    Ok(exit_codes::OK)
}

fn cmd_roster(path: &Path) -> Result<i32> {
    let spec = load_team(path)?;
    let graph = build_team(&spec, &CancellationToken::new())?;
    println!("{}", graph.roster().render());
    Ok(exit_codes::OK)
}

fn cmd_run(path: &Path, task: &str, max_iterations: Option<u32>, verbose: bool) -> Result<i32> {
    let mut spec = load_team(path)?;
    if let Some(max_iterations) = max_iterations {
        spec.graph.max_iterations = max_iterations;
        spec.validate()?;
    }

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone())?;
    let graph = build_team(&spec, &cancel)?;

    let outcome = graph.run_observed(task, |turn| {
        if verbose {
            print_turn(turn);
        }
    });
    match outcome {
        Ok(state) => {
            print_json(&state.into_output())?;
            Ok(exit_codes::OK)
        }
        Err(err) => {
            report_failure(&err)?;
            Ok(exit_codes::for_run_error(&err))
        }
    }
}

fn print_turn(turn: Turn<'_>) {
    match turn {
        Turn::Decided {
            iteration,
            decision,
            ..
        } => eprintln!(
            "[{}] supervisor -> {} ({})",
            iteration + 1,
            decision.route,
            decision.rationale
        ),
        Turn::Executed { id, response, .. } => eprintln!("    {id}: {response}"),
    }
}

#[derive(Serialize)]
struct FailureReport<'a> {
    error: String,
    messages: &'a [Message],
}

/// Print the error chain to stderr and the partial transcript to stdout.
fn report_failure(err: &RunError) -> Result<()> {
    let error = error_chain(err);
    eprintln!("run failed: {error}");
    print_json(&FailureReport {
        error,
        messages: &err.state.messages,
    })
}

fn error_chain(err: &RunError) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = std::error::Error::source(cause);
    }
    parts.join(": ")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize run output")?;
    println!("{payload}");
    Ok(())
}

/// Cancel `cancel` on the first Ctrl-C. The loop notices at its next node entry.
fn cancel_on_ctrl_c(cancel: CancellationToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build signal runtime")?;
    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });
        })
        .context("spawn signal thread")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["teamloop", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
        assert_eq!(cli.team, PathBuf::from("team.toml"));
    }

    #[test]
    fn parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "teamloop",
            "--team",
            "teams/math.toml",
            "run",
            "--max-iterations",
            "5",
            "Calculate 15 * 8",
        ]);
        assert_eq!(cli.team, PathBuf::from("teams/math.toml"));
        match cli.command {
            Command::Run {
                task,
                max_iterations,
                verbose,
            } => {
                assert_eq!(task, "Calculate 15 * 8");
                assert_eq!(max_iterations, Some(5));
                assert!(!verbose);
            }
            _ => panic!("expected run"),
        }
    }
}
