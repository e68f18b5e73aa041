use std::sync::{Arc, Mutex};

use pipedag::context::StepContext;
use pipedag::step::{Step, StepCall, StepFailure, StepFuture, StepOutcome};
use serde_json::Value;

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub node: String,
    pub input: Vec<Value>,
}

/// A step that:
/// - records which node ran it and with what input
/// - emits the node's `initial_output` (or fails, if built with `failing`)
#[derive(Debug, Clone)]
pub struct RecordingStep {
    name: String,
    failure: Option<StepFailure>,
    log: Arc<Mutex<Vec<Invocation>>>,
}

impl RecordingStep {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            failure: None,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Same recording, but every call reports `failure`.
    pub fn failing(name: &str, failure: StepFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(name)
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.log.lock().unwrap().clone()
    }

    /// Node ids in the order they ran.
    pub fn order(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.node).collect()
    }
}

impl Step for RecordingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(&'a self, call: StepCall<'a>, _ctx: &'a StepContext) -> StepFuture<'a> {
        self.log.lock().unwrap().push(Invocation {
            node: call.node_id.to_string(),
            input: call.input.to_vec(),
        });
        let outcome = match &self.failure {
            Some(failure) => StepOutcome::Failed(failure.clone()),
            None => StepOutcome::Completed(call.seed.to_vec()),
        };
        Box::pin(async move { outcome })
    }
}
