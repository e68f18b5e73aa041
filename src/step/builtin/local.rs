// src/step/builtin/local.rs

use tracing::warn;

use crate::context::StepContext;
use crate::dag::propagate::concat_unique;
use crate::step::{Step, StepCall, StepFailure, StepFuture, StepOutcome};

/// Emits the node's `initial_output` unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Seed;

impl Step for Seed {
    fn name(&self) -> &str {
        "seed"
    }

    fn run<'a>(&'a self, call: StepCall<'a>, _ctx: &'a StepContext) -> StepFuture<'a> {
        let out = call.seed.to_vec();
        Box::pin(async move { StepOutcome::Completed(out) })
    }
}

/// Join point: `initial_output` followed by the input, deduplicated.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Step for Passthrough {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn run<'a>(&'a self, call: StepCall<'a>, _ctx: &'a StepContext) -> StepFuture<'a> {
        let out = concat_unique(call.seed, call.input);
        Box::pin(async move { StepOutcome::Completed(out) })
    }
}

/// Writes the node's input to its persistence target and passes it on.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveInput;

impl Step for SaveInput {
    fn name(&self) -> &str {
        "save_input"
    }

    fn run<'a>(&'a self, call: StepCall<'a>, ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            let records = call.input.to_vec();
            let Some(target) = call.persistence else {
                warn!(node = %call.node_id, "save_input without persistence; nothing written");
                return StepOutcome::Completed(records);
            };

            match ctx.store.save(target, &records) {
                Ok(()) => StepOutcome::Completed(records),
                Err(err) => StepOutcome::Failed(StepFailure::from(err).with_partial(records)),
            }
        })
    }
}
