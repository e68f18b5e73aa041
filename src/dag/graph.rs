// src/dag/graph.rs

use std::collections::HashMap;

use tracing::debug;

use crate::config::PipelineConfig;
use crate::dag::node::Node;
use crate::errors::{PipedagError, Result};
use crate::step::StepRegistry;

/// Nodes plus directed links, with per-node indegree.
///
/// Nodes keep their insertion (config) order; that order breaks ties between
/// nodes that become ready at the same time. Cycles are not rejected here;
/// see `config::validate` for the configurable check.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    /// `successors[i]`: indices linked from node `i`, one entry per link.
    successors: Vec<Vec<usize>>,
    indegree: Vec<usize>,
    edge_count: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from one pipeline's config, resolving every node's step
    /// in `registry`.
    ///
    /// Fails with `UnknownStep` for an unregistered step name and with
    /// `UnknownNode` for a link whose end is not a configured node.
    pub fn build(pipeline: &PipelineConfig, registry: &StepRegistry) -> Result<Self> {
        let mut graph = Graph::new();

        for cfg in pipeline.nodes.iter() {
            let step = registry
                .get(&cfg.step_name)
                .ok_or_else(|| PipedagError::UnknownStep {
                    node: cfg.id.clone(),
                    step: cfg.step_name.clone(),
                })?;
            graph.add_node(Node::new(cfg, step))?;
        }

        for link in pipeline.links.iter() {
            graph.add_link(&link.from, &link.to)?;
        }

        debug!(
            nodes = graph.len(),
            links = graph.edge_count(),
            "built pipeline graph"
        );
        Ok(graph)
    }

    /// Add a node with indegree 0.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.index.contains_key(node.id()) {
            return Err(PipedagError::ConfigError(format!(
                "node '{}' is defined more than once",
                node.id()
            )));
        }
        self.index.insert(node.id().to_string(), self.nodes.len());
        self.nodes.push(node);
        self.successors.push(Vec::new());
        self.indegree.push(0);
        Ok(())
    }

    /// Add the link `from -> to` and bump `to`'s indegree.
    pub fn add_link(&mut self, from: &str, to: &str) -> Result<()> {
        let unknown = |missing: &str| PipedagError::UnknownNode {
            from: from.to_string(),
            to: to.to_string(),
            missing: missing.to_string(),
        };
        let f = self.position(from).ok_or_else(|| unknown(from))?;
        let t = self.position(to).ok_or_else(|| unknown(to))?;

        self.successors[f].push(t);
        self.indegree[t] += 1;
        self.edge_count += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Sum of all indegrees; always equal to [`Graph::edge_count`].
    pub fn indegree_total(&self) -> usize {
        self.indegree.iter().sum()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.position(id).map(|i| &self.nodes[i])
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn indegree_of(&self, id: &str) -> Option<usize> {
        self.position(id).map(|i| self.indegree[i])
    }

    /// Direct successors of `id`, one entry per link.
    pub fn successors_of(&self, id: &str) -> Vec<&str> {
        self.position(id)
            .map(|i| {
                self.successors[i]
                    .iter()
                    .map(|&s| self.nodes[s].id())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nodes with no incoming links, in insertion order.
    pub fn roots(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .zip(self.indegree.iter())
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| n.id())
            .collect()
    }

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn indegrees(&self) -> Vec<usize> {
        self.indegree.clone()
    }

    pub(crate) fn successor_indices(&self, i: usize) -> &[usize] {
        &self.successors[i]
    }

    pub(crate) fn node_at(&self, i: usize) -> &Node {
        &self.nodes[i]
    }

    pub(crate) fn node_at_mut(&mut self, i: usize) -> &mut Node {
        &mut self.nodes[i]
    }
}
