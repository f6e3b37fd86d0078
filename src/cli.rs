// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `jobflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobflow",
    version,
    about = "Schedule recurring processes and run their task graphs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the definition file (TOML).
    ///
    /// Default: `Jobflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Jobflow.toml")]
    pub config: String,

    /// Trigger this process immediately at startup, skipping its recurrence
    /// check (overlap/error gating still applies).
    #[arg(long, value_name = "NAME")]
    pub run: Option<String>,

    /// Exit once no job or task instance can make progress without operator
    /// intervention. Typically combined with `--run`.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print processes and task graphs, but don't
    /// schedule or execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
