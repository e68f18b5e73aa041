use std::error::Error;
use std::sync::Arc;

use pipedag::config::PipelineConfig;
use pipedag::dag::{ExecutionMode, Graph, Scheduler, SchedulerOptions};
use pipedag::errors::PipedagError;
use pipedag::fs::mock::MockFileSystem;
use pipedag::step::{FailureKind, StepFailure, StepRegistry};
use pipedag::types::FailurePolicy;
use pipedag_test_utils::builders::{NodeConfigBuilder, PipelineBuilder};
use pipedag_test_utils::fake_fetcher::CannedFetcher;
use pipedag_test_utils::recording_step::RecordingStep;
use pipedag_test_utils::{init_tracing, test_context};
use serde_json::json;

type TestResult = Result<(), Box<dyn Error>>;

fn registry_with(step: &RecordingStep) -> StepRegistry {
    let mut registry = StepRegistry::with_builtins();
    registry.register(Arc::new(step.clone()));
    registry
}

#[tokio::test]
async fn chain_runs_in_order_and_propagates_outputs() -> TestResult {
    init_tracing();
    let step = RecordingStep::new("record");
    let pipeline = PipelineBuilder::new()
        .node(
            NodeConfigBuilder::new("A", "record")
                .initial_output(vec![json!("x"), json!("y")])
                .build(),
        )
        .node(NodeConfigBuilder::new("B", "record").initial_output(vec![json!("z")]).build())
        .node(NodeConfigBuilder::new("C", "record").build())
        .link("A", "B")
        .link("B", "C")
        .build();

    let graph = Graph::build(&pipeline, &registry_with(&step))?;
    assert_eq!(graph.roots(), vec!["A"]);

    let ctx = test_context(CannedFetcher::new(), MockFileSystem::new());
    let report = Scheduler::new("chain", graph, SchedulerOptions::default())
        .run(&ctx)
        .await?;

    assert_eq!(report.mode, ExecutionMode::Topological);
    assert_eq!(report.order, vec!["A", "B", "C"]);
    assert_eq!(step.order(), vec!["A", "B", "C"]);

    let b = report.graph.node("B").unwrap();
    assert_eq!(b.input(), &[json!("x"), json!("y")]);
    let c = report.graph.node("C").unwrap();
    assert_eq!(c.input(), &[json!("z")]);
    assert!(report.starved.is_empty());
    Ok(())
}

#[tokio::test]
async fn diamond_join_receives_each_record_once() -> TestResult {
    let step = RecordingStep::new("record");
    let pipeline = PipelineBuilder::new()
        .node(NodeConfigBuilder::new("root", "record").initial_output(vec![json!(1)]).build())
        .node(
            NodeConfigBuilder::new("left", "record")
                .initial_output(vec![json!(2), json!(3)])
                .build(),
        )
        .node(
            NodeConfigBuilder::new("right", "record")
                .initial_output(vec![json!(3), json!(4), json!(3)])
                .build(),
        )
        .node(NodeConfigBuilder::new("join", "record").build())
        .link("root", "left")
        .link("root", "right")
        .link("left", "join")
        .link("right", "join")
        .build();

    let graph = Graph::build(&pipeline, &registry_with(&step))?;
    let ctx = test_context(CannedFetcher::new(), MockFileSystem::new());
    let report = Scheduler::new("diamond", graph, SchedulerOptions::default())
        .run(&ctx)
        .await?;

    // Ties follow config order.
    assert_eq!(report.order, vec!["root", "left", "right", "join"]);
    let join = report.graph.node("join").unwrap();
    assert_eq!(join.input(), &[json!(2), json!(3), json!(4)]);

    let seen = step.invocations();
    assert_eq!(seen[3].node, "join");
    assert_eq!(seen[3].input, vec![json!(2), json!(3), json!(4)]);
    Ok(())
}

#[tokio::test]
async fn single_node_takes_the_fast_path() -> TestResult {
    let step = RecordingStep::new("record");
    let pipeline = PipelineBuilder::new()
        .node(NodeConfigBuilder::new("only", "record").initial_output(vec![json!("a")]).build())
        .build();

    let graph = Graph::build(&pipeline, &registry_with(&step))?;
    let ctx = test_context(CannedFetcher::new(), MockFileSystem::new());
    let scheduler = Scheduler::new("single", graph, SchedulerOptions::default());
    assert!(scheduler.is_single_node());

    let report = scheduler.run(&ctx).await?;
    assert_eq!(report.mode, ExecutionMode::FastPath);
    assert_eq!(report.order, vec!["only"]);
    assert_eq!(step.invocations().len(), 1);
    assert_eq!(report.graph.node("only").unwrap().output(), &[json!("a")]);
    Ok(())
}

#[tokio::test]
async fn cycle_members_are_skipped_without_error() -> TestResult {
    let step = RecordingStep::new("record");
    let pipeline = PipelineBuilder::new()
        .node(NodeConfigBuilder::new("a", "record").build())
        .node(NodeConfigBuilder::new("b", "record").build())
        .node(NodeConfigBuilder::new("free", "record").build())
        .link("a", "b")
        .link("b", "a")
        .build();

    let graph = Graph::build(&pipeline, &registry_with(&step))?;
    let ctx = test_context(CannedFetcher::new(), MockFileSystem::new());
    let report = Scheduler::new("cyclic", graph, SchedulerOptions::default())
        .run(&ctx)
        .await?;

    assert_eq!(report.order, vec!["free"]);
    assert_eq!(report.starved, vec!["a", "b"]);
    assert_eq!(step.order(), vec!["free"]);
    Ok(())
}

#[test]
fn indegrees_add_up_to_the_link_count() -> TestResult {
    let step = RecordingStep::new("record");
    let pipeline = PipelineBuilder::new()
        .node(NodeConfigBuilder::new("a", "record").build())
        .node(NodeConfigBuilder::new("b", "record").build())
        .node(NodeConfigBuilder::new("c", "record").build())
        .link("a", "b")
        .link("a", "c")
        .link("b", "c")
        .build();

    let graph = Graph::build(&pipeline, &registry_with(&step))?;
    assert_eq!(graph.edge_count(), 3);
    assert_eq!(graph.indegree_total(), graph.edge_count());
    assert_eq!(graph.indegree_of("a"), Some(0));
    assert_eq!(graph.indegree_of("c"), Some(2));
    assert_eq!(graph.successors_of("a"), vec!["b", "c"]);
    Ok(())
}

#[test]
fn link_to_unknown_node_fails_the_build() {
    let step = RecordingStep::new("record");
    let pipeline = PipelineBuilder::new()
        .node(NodeConfigBuilder::new("a", "record").build())
        .link("a", "ghost")
        .build();

    match Graph::build(&pipeline, &registry_with(&step)) {
        Err(PipedagError::UnknownNode { from, to, missing }) => {
            assert_eq!((from.as_str(), to.as_str()), ("a", "ghost"));
            assert_eq!(missing, "ghost");
        }
        other => panic!("expected UnknownNode, got {:?}", other.map(|g| g.len())),
    }
}

#[test]
fn unknown_step_fails_the_build() {
    let pipeline = PipelineBuilder::new()
        .node(NodeConfigBuilder::new("a", "no_such_step").build())
        .build();

    let err = Graph::build(&pipeline, &StepRegistry::with_builtins()).unwrap_err();
    assert!(matches!(err, PipedagError::UnknownStep { ref step, .. } if step == "no_such_step"));
}

fn failing_pipeline() -> (RecordingStep, RecordingStep, PipelineConfig) {
    let broken = RecordingStep::failing(
        "broken",
        StepFailure::new(FailureKind::RetrievalTimeout, "slow upstream")
            .with_partial(vec![json!("partial")]),
    );
    let downstream = RecordingStep::new("record");
    let pipeline = PipelineBuilder::new()
        .node(NodeConfigBuilder::new("fetch", "broken").build())
        .node(NodeConfigBuilder::new("use", "record").build())
        .link("fetch", "use")
        .build();
    (broken, downstream, pipeline)
}

#[tokio::test]
async fn degraded_failure_passes_partial_output_downstream() -> TestResult {
    let (broken, downstream, pipeline) = failing_pipeline();
    let mut registry = registry_with(&downstream);
    registry.register(Arc::new(broken));

    let graph = Graph::build(&pipeline, &registry)?;
    let ctx = test_context(CannedFetcher::new(), MockFileSystem::new());
    let report = Scheduler::new("degrade", graph, SchedulerOptions::default())
        .run(&ctx)
        .await?;

    assert_eq!(report.order, vec!["fetch", "use"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].node, "fetch");
    assert_eq!(report.failures[0].failure.kind, FailureKind::RetrievalTimeout);
    assert_eq!(downstream.invocations()[0].input, vec![json!("partial")]);
    Ok(())
}

#[tokio::test]
async fn abort_policy_stops_at_the_failed_step() -> TestResult {
    let (broken, downstream, pipeline) = failing_pipeline();
    let mut registry = registry_with(&downstream);
    registry.register(Arc::new(broken));

    let graph = Graph::build(&pipeline, &registry)?;
    let ctx = test_context(CannedFetcher::new(), MockFileSystem::new());
    let options = SchedulerOptions {
        on_step_failure: FailurePolicy::Abort,
    };
    let result = Scheduler::new("abort", graph, options).run(&ctx).await;

    match result {
        Err(PipedagError::StepAborted { node, failure }) => {
            assert_eq!(node, "fetch");
            assert_eq!(failure.detail, "slow upstream");
        }
        other => panic!("expected StepAborted, got {:?}", other.map(|r| r.order)),
    }
    assert!(downstream.invocations().is_empty());
    Ok(())
}

#[test]
fn duplicate_node_id_fails_the_build() {
    let pipeline = PipelineBuilder::new()
        .node(NodeConfigBuilder::new("a", "seed").build())
        .node(NodeConfigBuilder::new("a", "passthrough").build())
        .build();

    let err = Graph::build(&pipeline, &StepRegistry::with_builtins()).unwrap_err();
    assert!(matches!(err, PipedagError::ConfigError(ref m) if m.contains("'a'")));
}
