// src/config/validate.rs

use std::collections::HashSet;

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Topo;

use crate::config::model::{ConfigFile, PipelineConfig, RawConfigFile};
use crate::errors::{PipedagError, Result};
use crate::types::CyclePolicy;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipedagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.fetch, raw.pipeline))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_pipelines(cfg)?;
    validate_fetch_section(cfg)?;

    for (name, pipeline) in cfg.pipeline.iter() {
        validate_nodes(name, pipeline)?;
        validate_links(pipeline)?;
        if cfg.config.on_cycle == CyclePolicy::Reject {
            validate_acyclic(name, pipeline)?;
        }
    }
    Ok(())
}

fn ensure_has_pipelines(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipeline.is_empty() {
        return Err(PipedagError::ConfigError(
            "config must contain at least one [pipeline.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_fetch_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.fetch.timeout_secs == 0 {
        return Err(PipedagError::ConfigError(
            "[fetch].timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_nodes(name: &str, pipeline: &PipelineConfig) -> Result<()> {
    if pipeline.nodes.is_empty() {
        return Err(PipedagError::ConfigError(format!(
            "pipeline '{}' has no nodes",
            name
        )));
    }

    let mut seen = HashSet::new();
    for node in pipeline.nodes.iter() {
        if node.id.trim().is_empty() {
            return Err(PipedagError::ConfigError(format!(
                "pipeline '{}' has a node with an empty id",
                name
            )));
        }
        if node.step_name.trim().is_empty() {
            return Err(PipedagError::ConfigError(format!(
                "node '{}' in pipeline '{}' has an empty step_name",
                node.id, name
            )));
        }
        if !seen.insert(node.id.as_str()) {
            return Err(PipedagError::ConfigError(format!(
                "pipeline '{}' defines node '{}' more than once",
                name, node.id
            )));
        }
        if let Some(ref p) = node.persistence {
            if p.path.trim().is_empty() || p.column_names.is_empty() {
                return Err(PipedagError::ConfigError(format!(
                    "node '{}' persistence needs a path and at least one column name",
                    node.id
                )));
            }
        }
    }
    Ok(())
}

fn validate_links(pipeline: &PipelineConfig) -> Result<()> {
    let ids: HashSet<&str> = pipeline.nodes.iter().map(|n| n.id.as_str()).collect();

    for link in pipeline.links.iter() {
        for end in [&link.from, &link.to] {
            if !ids.contains(end.as_str()) {
                return Err(PipedagError::UnknownNode {
                    from: link.from.clone(),
                    to: link.to.clone(),
                    missing: end.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_acyclic(name: &str, pipeline: &PipelineConfig) -> Result<()> {
    let starved = starved_nodes(pipeline);
    if starved.is_empty() {
        Ok(())
    } else {
        Err(PipedagError::DagCycle {
            pipeline: name.to_string(),
            nodes: starved,
        })
    }
}

/// Node ids that a topological walk never reaches: the nodes on a cycle plus
/// everything downstream of one. Returned in config order.
pub fn starved_nodes(pipeline: &PipelineConfig) -> Vec<String> {
    // Edge direction: from -> to.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for node in pipeline.nodes.iter() {
        graph.add_node(node.id.as_str());
    }
    for link in pipeline.links.iter() {
        graph.add_edge(link.from.as_str(), link.to.as_str(), ());
    }

    let mut visited = HashSet::new();
    let mut topo = Topo::new(&graph);
    while let Some(id) = topo.next(&graph) {
        visited.insert(id);
    }

    pipeline
        .nodes
        .iter()
        .filter(|n| !visited.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect()
}
