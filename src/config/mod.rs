// src/config/mod.rs

//! Configuration loading and validation for pipedag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like link targets and acyclicity (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    CONFIG_ENV, default_config_path, load_and_validate, load_from_path, load_from_str,
};
pub use model::{
    ConfigFile, ConfigSection, FetchSection, LinkConfig, NodeConfig, PersistenceConfig,
    PipelineConfig, RawConfigFile,
};
pub use validate::starved_nodes;
