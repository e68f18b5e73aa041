// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Only configuration problems (and, in `abort` mode, step failures) surface
//! here. Recoverable fetch/parse/store problems are reported by steps as
//! [`StepFailure`](crate::step::StepFailure) values instead.

use thiserror::Error;

use crate::step::StepFailure;

#[derive(Error, Debug)]
pub enum PipedagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("link '{from}' -> '{to}' references unknown node '{missing}'")]
    UnknownNode {
        from: String,
        to: String,
        missing: String,
    },

    #[error("node '{node}' uses unknown step '{step}'")]
    UnknownStep { node: String, step: String },

    #[error("Cycle detected in pipeline '{pipeline}': nodes never scheduled: {nodes:?}")]
    DagCycle { pipeline: String, nodes: Vec<String> },

    #[error("node '{node}' failed and on_step_failure = \"abort\": {failure}")]
    StepAborted { node: String, failure: StepFailure },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipedagError>;
