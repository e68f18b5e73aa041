// src/step/mod.rs

//! The step contract.
//!
//! A step is the pluggable unit of work bound to a node by its `step_name`.
//! It receives the node's accumulated input and resource locator, may do I/O
//! through the injected [`StepContext`], and returns a [`StepOutcome`]. The
//! scheduler assigns the returned records to the node's output; steps never
//! touch the node themselves.
//!
//! - [`registry`] maps step names to implementations.
//! - [`builtin`] holds the steps every registry starts with.
//! - [`params`] reads typed values out of a node's `params` table.

pub mod builtin;
pub mod params;
pub mod registry;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::config::PersistenceConfig;
use crate::context::StepContext;
use crate::fetch::FetchError;
use crate::store::StoreError;
use crate::types::Record;

pub use params::Params;
pub use registry::StepRegistry;

/// Everything a step gets to see about the node it runs for.
#[derive(Debug, Clone, Copy)]
pub struct StepCall<'a> {
    pub node_id: &'a str,
    /// Deduplicated union of all direct predecessors' outputs.
    pub input: &'a [Record],
    pub resource_locator: &'a str,
    /// The node's configured `initial_output`.
    pub seed: &'a [Record],
    pub persistence: Option<&'a PersistenceConfig>,
    pub params: &'a Params,
}

/// Recoverable failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RetrievalTimeout,
    RetrievalFailure,
    ExtractionMiss,
    StoreFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::RetrievalTimeout => "retrieval timeout",
            FailureKind::RetrievalFailure => "retrieval failure",
            FailureKind::ExtractionMiss => "extraction miss",
            FailureKind::StoreFailure => "store failure",
        };
        f.write_str(s)
    }
}

/// A step that could not do all of its work.
///
/// `partial` is what the step managed to produce anyway; in `degrade` mode
/// it becomes the node's output.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {detail}")]
pub struct StepFailure {
    pub kind: FailureKind,
    pub detail: String,
    pub partial: Vec<Record>,
}

impl StepFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            partial: Vec::new(),
        }
    }

    pub fn with_partial(mut self, partial: Vec<Record>) -> Self {
        self.partial = partial;
        self
    }

    pub fn extraction_miss(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::ExtractionMiss, detail)
    }
}

impl From<FetchError> for StepFailure {
    fn from(err: FetchError) -> Self {
        let kind = match err {
            FetchError::Timeout { .. } => FailureKind::RetrievalTimeout,
            FetchError::Status { .. } | FetchError::Transport { .. } => {
                FailureKind::RetrievalFailure
            }
            FetchError::Decode { .. } => FailureKind::ExtractionMiss,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<StoreError> for StepFailure {
    fn from(err: StoreError) -> Self {
        Self::new(FailureKind::StoreFailure, err.to_string())
    }
}

/// Result of running a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Completed(Vec<Record>),
    Failed(StepFailure),
}

pub type StepFuture<'a> = Pin<Box<dyn Future<Output = StepOutcome> + Send + 'a>>;

/// A named, pluggable unit of work.
///
/// Returns a boxed future so registries can hold `Arc<dyn Step>`.
pub trait Step: Send + Sync + fmt::Debug {
    /// Name nodes refer to in `step_name`.
    fn name(&self) -> &str;

    fn run<'a>(&'a self, call: StepCall<'a>, ctx: &'a StepContext) -> StepFuture<'a>;
}

type StepFn = dyn Fn(StepCall<'_>) -> StepOutcome + Send + Sync;

/// Adapter turning a plain synchronous closure into a [`Step`].
///
/// Handy for steps that only reshape their input, and for tests.
#[derive(Clone)]
pub struct FnStep {
    name: String,
    f: Arc<StepFn>,
}

impl FnStep {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(StepCall<'_>) -> StepOutcome + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }
}

impl fmt::Debug for FnStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish()
    }
}

impl Step for FnStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(&'a self, call: StepCall<'a>, _ctx: &'a StepContext) -> StepFuture<'a> {
        let outcome = (self.f)(call);
        Box::pin(async move { outcome })
    }
}
