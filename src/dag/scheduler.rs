// src/dag/scheduler.rs

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::context::StepContext;
use crate::dag::graph::Graph;
use crate::errors::{PipedagError, Result};
use crate::step::{StepFailure, StepOutcome};
use crate::types::FailurePolicy;

/// How a run was driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One node, no links: executed directly without a ready queue.
    FastPath,
    /// Kahn's algorithm over the ready queue.
    Topological,
}

/// A step failure the scheduler degraded past.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFailure {
    pub node: String,
    pub failure: StepFailure,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerOptions {
    pub on_step_failure: FailurePolicy,
}

/// What happened during one pass over a pipeline.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub pipeline: String,
    pub mode: ExecutionMode,
    /// Node ids in execution order; a valid topological order.
    pub order: Vec<String>,
    /// Nodes that never became ready (on or behind a cycle), in config order.
    pub starved: Vec<String>,
    pub failures: Vec<NodeFailure>,
    /// Final state of every node, inputs and outputs included.
    pub graph: Graph,
}

/// Single-threaded topological executor for one pipeline.
///
/// Responsibilities:
/// - execute ready nodes (indegree 0) one at a time, in queue order
/// - assign each step's outcome to its node's output
/// - merge that output, deduplicated, into every direct successor's input
/// - release successors whose last incoming link has been resolved
///
/// Nodes caught in a cycle never reach indegree 0; they are reported in
/// [`RunReport::starved`] instead of being executed.
#[derive(Debug)]
pub struct Scheduler {
    pipeline: String,
    graph: Graph,
    options: SchedulerOptions,
}

impl Scheduler {
    pub fn new(pipeline: impl Into<String>, graph: Graph, options: SchedulerOptions) -> Self {
        Self {
            pipeline: pipeline.into(),
            graph,
            options,
        }
    }

    /// Whether [`Scheduler::run`] will take the fast path.
    pub fn is_single_node(&self) -> bool {
        self.graph.len() == 1 && self.graph.edge_count() == 0
    }

    /// Execute the pipeline once.
    ///
    /// Only fails in `abort` mode, when a step reports a failure.
    pub async fn run(mut self, ctx: &StepContext) -> Result<RunReport> {
        let mut report = RunReport {
            pipeline: self.pipeline.clone(),
            mode: ExecutionMode::Topological,
            order: Vec::new(),
            starved: Vec::new(),
            failures: Vec::new(),
            graph: Graph::new(),
        };

        if self.is_single_node() {
            report.mode = ExecutionMode::FastPath;
            self.execute_at(0, ctx, &mut report).await?;
        } else {
            self.run_topological(ctx, &mut report).await?;
        }

        if !report.starved.is_empty() {
            warn!(
                pipeline = %self.pipeline,
                starved = ?report.starved,
                "some nodes never became ready (cycle); they were not executed"
            );
        }

        report.graph = self.graph;
        Ok(report)
    }

    async fn run_topological(&mut self, ctx: &StepContext, report: &mut RunReport) -> Result<()> {
        let mut indegree = self.graph.indegrees();
        let mut queue: VecDeque<usize> = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();

        debug!(
            pipeline = %self.pipeline,
            ready = queue.len(),
            "scheduler: initial ready set"
        );

        while let Some(current) = queue.pop_front() {
            self.execute_at(current, ctx, report).await?;

            let output = self.graph.node_at(current).output().to_vec();
            let successors = self.graph.successor_indices(current).to_vec();

            for next in successors {
                let added = self.graph.node_at_mut(next).absorb(&output);
                indegree[next] -= 1;
                debug!(
                    from = %self.graph.node_at(current).id(),
                    to = %self.graph.node_at(next).id(),
                    added,
                    remaining = indegree[next],
                    "propagated output"
                );
                if indegree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        report.starved = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d > 0)
            .map(|(i, _)| self.graph.node_at(i).id().to_string())
            .collect();
        Ok(())
    }

    async fn execute_at(
        &mut self,
        index: usize,
        ctx: &StepContext,
        report: &mut RunReport,
    ) -> Result<()> {
        let node = self.graph.node_at(index);
        let id = node.id().to_string();
        debug!(
            pipeline = %self.pipeline,
            node = %id,
            step = %node.step_name(),
            inputs = node.input().len(),
            "executing node"
        );

        let outcome = node.execute(ctx).await;
        report.order.push(id.clone());

        let output = match outcome {
            StepOutcome::Completed(records) => records,
            StepOutcome::Failed(failure) => {
                if self.options.on_step_failure == FailurePolicy::Abort {
                    return Err(PipedagError::StepAborted { node: id, failure });
                }
                warn!(
                    pipeline = %self.pipeline,
                    node = %id,
                    kind = %failure.kind,
                    detail = %failure.detail,
                    kept = failure.partial.len(),
                    "step failed; continuing with partial output"
                );
                let partial = failure.partial.clone();
                report.failures.push(NodeFailure {
                    node: id.clone(),
                    failure,
                });
                partial
            }
        };

        info!(
            pipeline = %self.pipeline,
            node = %id,
            records = output.len(),
            "node completed"
        );
        self.graph.node_at_mut(index).set_output(output);
        Ok(())
    }
}
