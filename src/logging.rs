// src/logging.rs

//! Logging setup: `tracing` events rendered by `tracing-subscriber` on stderr.
//!
//! The filter is taken from, in order:
//! 1. `--log-level` on the command line,
//! 2. the `PIPEDAG_LOG` environment variable, which accepts full
//!    `EnvFilter` directives (`debug`, `pipedag=debug,reqwest=warn`, ...),
//! 3. `info`.
//!
//! Stdout stays free for `--dry-run` output.

use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Environment variable read when no `--log-level` is given.
pub const LOG_ENV: &str = "PIPEDAG_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> anyhow::Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = log_filter(cli_level, env.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("initialising logging: {e}"))
}

/// Resolve the filter from the flag and the raw `PIPEDAG_LOG` value.
///
/// An unparsable environment value falls back to `info`.
pub fn log_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.directive());
    }
    env.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
