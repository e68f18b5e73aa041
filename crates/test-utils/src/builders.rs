#![allow(dead_code)]

use std::collections::BTreeMap;

use pipedag::config::{
    ConfigFile, ConfigSection, FetchSection, LinkConfig, NodeConfig, PersistenceConfig,
    PipelineConfig, RawConfigFile,
};
use pipedag::types::{CyclePolicy, FailurePolicy};
use serde_json::Value;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                fetch: FetchSection::default(),
                pipeline: BTreeMap::new(),
            },
        }
    }

    pub fn with_pipeline(mut self, name: &str, pipeline: PipelineConfig) -> Self {
        self.config.pipeline.insert(name.to_string(), pipeline);
        self
    }

    pub fn on_cycle(mut self, policy: CyclePolicy) -> Self {
        self.config.config.on_cycle = policy;
        self
    }

    pub fn on_step_failure(mut self, policy: FailurePolicy) -> Self {
        self.config.config.on_step_failure = policy;
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `PipelineConfig`.
#[derive(Default)]
pub struct PipelineBuilder {
    pipeline: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, node: NodeConfig) -> Self {
        self.pipeline.nodes.push(node);
        self
    }

    pub fn link(mut self, from: &str, to: &str) -> Self {
        self.pipeline.links.push(LinkConfig::new(from, to));
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.pipeline
    }
}

/// Builder for `NodeConfig`.
pub struct NodeConfigBuilder {
    node: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn new(id: &str, step_name: &str) -> Self {
        Self {
            node: NodeConfig {
                id: id.to_string(),
                step_name: step_name.to_string(),
                resource_locator: String::new(),
                initial_output: Vec::new(),
                persistence: None,
                params: serde_json::Map::new(),
            },
        }
    }

    pub fn locator(mut self, locator: &str) -> Self {
        self.node.resource_locator = locator.to_string();
        self
    }

    pub fn initial_output(mut self, records: Vec<Value>) -> Self {
        self.node.initial_output = records;
        self
    }

    pub fn persistence(mut self, path: &str, columns: &[&str]) -> Self {
        self.node.persistence = Some(PersistenceConfig {
            path: path.to_string(),
            column_names: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn param(mut self, key: &str, value: Value) -> Self {
        self.node.params.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> NodeConfig {
        self.node
    }
}
