// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{CyclePolicy, FailurePolicy, Record};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// on_cycle = "reject"
/// on_step_failure = "degrade"
///
/// [fetch]
/// timeout_secs = 10
/// delay_ms = 6000
///
/// [pipeline.draws]
/// links = [{ from = "latest", to = "details" }]
///
/// [[pipeline.draws.nodes]]
/// id = "latest"
/// step_name = "fetch_json_list"
/// resource_locator = "https://example.com/api/latest"
/// ```
///
/// This is the unvalidated form; use [`ConfigFile::try_from`] (or
/// [`crate::config::load_and_validate`]) to obtain a checked [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub fetch: FetchSection,

    /// Pipelines keyed by name. Runs happen in key order.
    #[serde(default)]
    pub pipeline: BTreeMap<String, PipelineConfig>,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see
/// `config::validate`), so holders can rely on link targets existing and on
/// the cycle policy having been applied.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub fetch: FetchSection,
    pub pipeline: BTreeMap<String, PipelineConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        fetch: FetchSection,
        pipeline: BTreeMap<String, PipelineConfig>,
    ) -> Self {
        Self {
            config,
            fetch,
            pipeline,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    #[serde(default)]
    pub on_cycle: CyclePolicy,

    #[serde(default)]
    pub on_step_failure: FailurePolicy,
}

/// `[fetch]` section: settings for the shared HTTP client.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchSection {
    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Fixed pause after every call, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_delay_ms() -> u64 {
    6000
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            delay_ms: default_delay_ms(),
            user_agent: None,
        }
    }
}

/// `[pipeline.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,

    #[serde(default)]
    pub links: Vec<LinkConfig>,
}

/// One entry of `[[pipeline.<name>.nodes]]`.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub id: String,

    /// Name of the registered step this node runs.
    pub step_name: String,

    /// Opaque string handed to the step, usually a URL or URL template.
    #[serde(default)]
    pub resource_locator: String,

    /// Output the node starts with; accumulating steps build on top of it.
    #[serde(default)]
    pub initial_output: Vec<Record>,

    #[serde(default)]
    pub persistence: Option<PersistenceConfig>,

    /// Step-specific settings (JSON pointers, field lists, limits...).
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Where a node keeps its tabular snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    pub path: String,
    pub column_names: Vec<String>,
}

/// One directed dependency: `to` runs after `from` and receives its output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkConfig {
    pub from: String,
    pub to: String,
}

impl LinkConfig {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}
