use std::str::FromStr;

use serde::Deserialize;

/// A single unit of data flowing between nodes.
///
/// Records are compared by value when merging a producer's output into a
/// consumer's input, so any JSON shape works: rows are usually arrays of
/// strings, extracted items are usually objects.
pub type Record = serde_json::Value;

/// What to do when the configured links contain a cycle.
///
/// - `Reject`: fail at configuration time, naming every node that would never
///   become ready (default).
/// - `Skip`: run everything that can run; nodes on or behind the cycle are
///   left out and a warning lists them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    #[default]
    Reject,
    Skip,
}

impl FromStr for CyclePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(CyclePolicy::Reject),
            "skip" => Ok(CyclePolicy::Skip),
            other => Err(format!(
                "invalid on_cycle: {other} (expected \"reject\" or \"skip\")"
            )),
        }
    }
}

/// What the scheduler does with a step that reports a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure, keep whatever partial output the step produced and
    /// carry on with downstream nodes (default).
    #[default]
    Degrade,
    /// Stop the run at the first failed step.
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "degrade" => Ok(FailurePolicy::Degrade),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(format!(
                "invalid on_step_failure: {other} (expected \"degrade\" or \"abort\")"
            )),
        }
    }
}
