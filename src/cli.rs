use crate::config::config::ProbeConfig;
use crate::config::types::FixtureKind;
use crate::evidence::{inspect_all, EvidenceCheck};
use crate::handler;
use crate::runtime::host::{Host, InvocationOutcome};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Probe config file (defaults to $LAMBDA_PROBE_CONFIG, then ./probe.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke a fixture through a local host that keeps one process state
    Invoke {
        /// Fixture to run (greeting, timeout, reuse)
        #[arg(long, default_value = "reuse")]
        fixture: FixtureKind,
        /// Number of invocations against the same process state
        #[arg(long, default_value_t = 1)]
        times: u32,
        /// Input payload; parsed as JSON, taken as a plain string otherwise
        #[arg(long)]
        input: Option<String>,
        /// Execution budget in milliseconds enforced by the host
        #[arg(long)]
        budget_ms: Option<u64>,
        /// Enforce the configured assumed budget (assumed_budget_seconds)
        #[arg(long, conflicts_with = "budget_ms")]
        enforce_budget: bool,
    },
    /// Inspect the configured check paths for earlier evidence
    Evidence,
    /// Print the effective configuration
    Config,
}

/// SIGUSR1 cuts a sleeping timeout fixture short instead of killing the process
fn install_interrupt_handler() {
    use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

    extern "C" fn interrupt(_: libc::c_int) {}

    // No SA_RESTART: the sleeping nanosleep must see EINTR.
    let action = SigAction::new(SigHandler::Handler(interrupt), SaFlags::empty(), SigSet::empty());
    if let Err(e) = unsafe { signal::sigaction(Signal::SIGUSR1, &action) } {
        log::warn!("Failed to install SIGUSR1 handler: {}", e);
    }
}

fn load_config(path: Option<PathBuf>) -> Result<ProbeConfig> {
    let config = match path {
        Some(path) => ProbeConfig::load_from_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ProbeConfig::load_default()?,
    };
    Ok(config)
}

fn parse_input(raw: Option<String>) -> Value {
    match raw {
        None => Value::Null,
        Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
    }
}

pub fn run() -> Result<()> {
    env_logger::init();
    install_interrupt_handler();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Invoke {
            fixture,
            times,
            input,
            budget_ms,
            enforce_budget,
        } => {
            let budget = match (budget_ms, enforce_budget) {
                (Some(ms), _) => Some(Duration::from_millis(ms)),
                (None, true) => Some(config.assumed_budget()),
                (None, false) => None,
            };

            let mut host = Host::new(handler::build(fixture, &config));
            if let Some(budget) = budget {
                host = host.with_budget(budget)?;
            }
            if let Some(budget) = host.budget() {
                eprintln!("Execution budget: {} ms", budget.as_millis());
            }

            let input = parse_input(input);
            for _ in 0..times {
                let outcome = host.invoke(input.clone());
                print_outcome(&outcome, cli.json)?;
            }
            Ok(())
        }
        Commands::Evidence => {
            let checks = inspect_all(&config.check_paths);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&checks)?);
            } else {
                for check in &checks {
                    println!("{}", describe_check(check));
                }
            }
            Ok(())
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn print_outcome(outcome: &InvocationOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(outcome)?);
        return Ok(());
    }

    match outcome {
        InvocationOutcome::Completed {
            request_id,
            response,
            elapsed_ms,
        } => println!("[{}] ({} ms) {}", request_id, elapsed_ms, response),
        InvocationOutcome::TimedOut {
            request_id,
            budget_ms,
        } => println!(
            "[{}] Task timed out after {:.2} seconds",
            request_id,
            *budget_ms as f64 / 1000.0
        ),
        InvocationOutcome::Failed { request_id, error } => {
            println!("[{}] handler failed: {}", request_id, error)
        }
    }
    Ok(())
}

fn describe_check(check: &EvidenceCheck) -> String {
    match check {
        EvidenceCheck::Present {
            path,
            size_bytes,
            lines,
        } => format!("{}: {} bytes, {} lines", path.display(), size_bytes, lines),
        EvidenceCheck::Absent { path } => format!("{}: absent", path.display()),
        EvidenceCheck::Unreadable { path, error } => {
            format!("{}: unreadable ({})", path.display(), error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_invoke_args() {
        let cli = Cli::try_parse_from([
            "probe", "invoke", "--fixture", "timeout", "--times", "2", "--budget-ms", "500",
        ])
        .unwrap();
        match cli.command {
            Commands::Invoke {
                fixture,
                times,
                budget_ms,
                ..
            } => {
                assert_eq!(fixture, FixtureKind::Timeout);
                assert_eq!(times, 2);
                assert_eq!(budget_ms, Some(500));
            }
            _ => panic!("expected invoke"),
        }
    }

    #[test]
    fn test_budget_flags_conflict() {
        let result = Cli::try_parse_from([
            "probe", "invoke", "--budget-ms", "500", "--enforce-budget",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_input_parsing() {
        assert_eq!(parse_input(None), Value::Null);
        assert_eq!(parse_input(Some("\"World\"".into())), Value::String("World".into()));
        assert_eq!(parse_input(Some("World".into())), Value::String("World".into()));
        assert_eq!(parse_input(Some("null".into())), Value::Null);
    }

    #[test]
    fn test_describe_absent() {
        let check = EvidenceCheck::Absent {
            path: PathBuf::from("/tmp/x.log"),
        };
        assert_eq!(describe_check(&check), "/tmp/x.log: absent");
    }
}
