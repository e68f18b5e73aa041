// src/dag/node.rs

use std::sync::Arc;

use crate::config::{NodeConfig, PersistenceConfig};
use crate::context::StepContext;
use crate::dag::propagate::merge_unique;
use crate::step::{Params, Step, StepCall, StepOutcome};
use crate::types::Record;

/// One unit of pipeline work bound to a resolved step.
///
/// `input` only grows through propagation from predecessors; `output` is
/// assigned once, by the scheduler, from the step's outcome.
#[derive(Debug, Clone)]
pub struct Node {
    id: String,
    step_name: String,
    resource_locator: String,
    input: Vec<Record>,
    output: Vec<Record>,
    seed: Vec<Record>,
    persistence: Option<PersistenceConfig>,
    params: Params,
    step: Arc<dyn Step>,
}

impl Node {
    pub fn new(cfg: &NodeConfig, step: Arc<dyn Step>) -> Self {
        Self {
            id: cfg.id.clone(),
            step_name: cfg.step_name.clone(),
            resource_locator: cfg.resource_locator.clone(),
            input: Vec::new(),
            output: cfg.initial_output.clone(),
            seed: cfg.initial_output.clone(),
            persistence: cfg.persistence.clone(),
            params: cfg.params.clone(),
            step,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    pub fn resource_locator(&self) -> &str {
        &self.resource_locator
    }

    pub fn input(&self) -> &[Record] {
        &self.input
    }

    /// Before execution this is the configured `initial_output`.
    pub fn output(&self) -> &[Record] {
        &self.output
    }

    pub fn persistence(&self) -> Option<&PersistenceConfig> {
        self.persistence.as_ref()
    }

    /// Run the bound step against the current input.
    ///
    /// The node itself is left untouched; the caller decides what to do with
    /// the outcome.
    pub async fn execute(&self, ctx: &StepContext) -> StepOutcome {
        let call = StepCall {
            node_id: &self.id,
            input: &self.input,
            resource_locator: &self.resource_locator,
            seed: &self.seed,
            persistence: self.persistence.as_ref(),
            params: &self.params,
        };
        self.step.run(call, ctx).await
    }

    pub(crate) fn set_output(&mut self, output: Vec<Record>) {
        self.output = output;
    }

    /// Merge a predecessor's output into this node's input.
    pub(crate) fn absorb(&mut self, records: &[Record]) -> usize {
        merge_unique(&mut self.input, records)
    }
}
