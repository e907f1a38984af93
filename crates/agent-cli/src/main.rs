//! Command-line entry point for simple-agent
//!
//! ```bash
//! simple-agent --config configs/agents/collector.json
//! ```
//!
//! Exits with 0 after the agent finishes its tasks, 1 when loading the
//! configuration or running the agent fails, and 2 (from clap) on invalid
//! arguments.

use std::path::PathBuf;
use std::process::ExitCode;

use agent_core::{AgentRunner, load_config};
use anyhow::Context;
use clap::Parser;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "simple-agent")]
#[command(about = "Run a simple agent from a JSON configuration file", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the agent's JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let log = match agent_utils::init_tracing() {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args, &log) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Runner errors were already reported by `AgentRunner::fail`
            if e.downcast_ref::<agent_core::Error>().is_none() {
                error!("CRITICAL: Critical error while running agent: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, log: &agent_utils::LogHandle) -> anyhow::Result<()> {
    let config = load_config(&args.config)
        .with_context(|| format!("cannot load {}", args.config.display()))?;

    AgentRunner::new(config).run(log)?;

    Ok(())
}
