// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, ValueEnum};

use crate::types::{CyclePolicy, FailurePolicy};

/// Command-line arguments for `pipedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipedag",
    version,
    about = "Run declarative pipelines of fetch/parse/persist steps in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `$PIPEDAG_CONFIG`, else `Pipedag.toml` in the current working
    /// directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run only this pipeline instead of every configured one.
    #[arg(long, value_name = "NAME")]
    pub pipeline: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Override `[config].on_cycle` ("reject" or "skip").
    #[arg(long, value_name = "POLICY", value_parser = CyclePolicy::from_str)]
    pub on_cycle: Option<CyclePolicy>,

    /// Override `[config].on_step_failure` ("degrade" or "abort").
    #[arg(long, value_name = "POLICY", value_parser = FailurePolicy::from_str)]
    pub on_step_failure: Option<FailurePolicy>,

    /// Parse + validate, print the graphs, but don't execute any step.
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

impl LogLevel {
    /// The matching `EnvFilter` directive.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
