//! snipbox: run untrusted Python snippets from the command line
//!
//! Usage:
//!   snipbox run script.py
//!   echo "print(1 + 1)" | snipbox run
//!   snipbox check script.py
//!   snipbox stats
//!
//! Results are printed as JSON on stdout; logs go to stderr.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use snipbox_core::CodeExecutor;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "snipbox", version, about = "Run untrusted Python snippets under time and output limits")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file [default: <config dir>/snipbox/config.toml]
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a snippet and print the result
    Run {
        /// Source file; stdin when omitted or "-"
        file: Option<PathBuf>,
    },
    /// Validate a snippet without running it
    Check { file: Option<PathBuf> },
    /// Show limits, allowed modules and interpreter version
    Stats,
    /// Print the effective configuration as TOML
    Config,
}

fn read_source(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut code = String::new();
            std::io::stdin()
                .read_to_string(&mut code)
                .context("Failed to read code from stdin")?;
            Ok(code)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    debug!("Loaded configuration: {:?}", config.executor);

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Stats => {
            let executor = CodeExecutor::new(config.executor);
            print_json(&executor.stats().await)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { file } => {
            let code = read_source(file.as_ref())?;
            let executor = CodeExecutor::new(config.executor);
            let outcome = executor.validate(&code).await;
            print_json(&outcome)?;
            Ok(exit_code(outcome.is_valid()))
        }
        Command::Run { file } => {
            let code = read_source(file.as_ref())?;
            let executor = CodeExecutor::new(config.executor);
            let result = executor.execute(&code).await;
            print_json(&result)?;
            Ok(exit_code(result.success))
        }
    }
}
