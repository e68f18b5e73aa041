// src/dag/mod.rs

//! Pipeline graph and execution.
//!
//! - [`node`] wraps one resolved step with its input and output.
//! - [`graph`] holds nodes, links and indegrees.
//! - [`scheduler`] runs a graph in dependency order (Kahn's algorithm, or a
//!   direct call for single-node pipelines).
//! - [`propagate`] is the deduplicating merge between producer and consumer.

pub mod graph;
pub mod node;
pub mod propagate;
pub mod scheduler;

pub use graph::Graph;
pub use node::Node;
pub use scheduler::{ExecutionMode, NodeFailure, RunReport, Scheduler, SchedulerOptions};
