// src/lib.rs

pub mod cli;
pub mod config;
pub mod context;
pub mod dag;
pub mod errors;
pub mod fetch;
pub mod fs;
pub mod incremental;
pub mod logging;
pub mod step;
pub mod store;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, default_config_path, load_from_path};
use crate::context::StepContext;
use crate::dag::{Graph, RunReport, Scheduler, SchedulerOptions};
use crate::errors::{PipedagError, Result};
use crate::fetch::HttpFetcher;
use crate::step::StepRegistry;
use crate::store::LocalStore;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (with CLI policy overrides applied before validation)
/// - graph construction for every selected pipeline, before anything runs
/// - the shared fetcher and local store
/// - one scheduler pass per pipeline, in name order
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);

    let mut raw = load_from_path(&config_path)?;
    if let Some(policy) = args.on_cycle {
        raw.config.on_cycle = policy;
    }
    if let Some(policy) = args.on_step_failure {
        raw.config.on_step_failure = policy;
    }
    let cfg = ConfigFile::try_from(raw)?;

    let registry = StepRegistry::with_builtins();
    let graphs = build_graphs(&cfg, &registry, args.pipeline.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg, &graphs);
        return Ok(());
    }

    let fetcher = HttpFetcher::new(&cfg.fetch)?;
    let store = LocalStore::on_disk(config_root_dir(&config_path));
    let ctx = StepContext::new(Arc::new(fetcher), store);

    run_pipelines(&cfg, graphs, &ctx).await?;
    Ok(())
}

/// Build the graph of every pipeline (or only `only`), in name order.
///
/// All graphs are built up front so that a bad link or step name aborts the
/// run before any step has executed.
pub fn build_graphs(
    cfg: &ConfigFile,
    registry: &StepRegistry,
    only: Option<&str>,
) -> Result<Vec<(String, Graph)>> {
    if let Some(name) = only {
        if !cfg.pipeline.contains_key(name) {
            return Err(PipedagError::ConfigError(format!(
                "no pipeline named '{}' in config",
                name
            )));
        }
    }

    cfg.pipeline
        .iter()
        .filter(|(name, _)| only.is_none_or(|o| o == name.as_str()))
        .map(|(name, pipeline)| Graph::build(pipeline, registry).map(|g| (name.clone(), g)))
        .collect()
}

/// Run each graph to completion, one after another.
///
/// Every executed node id is logged in execution order.
pub async fn run_pipelines(
    cfg: &ConfigFile,
    graphs: Vec<(String, Graph)>,
    ctx: &StepContext,
) -> Result<Vec<RunReport>> {
    let options = SchedulerOptions {
        on_step_failure: cfg.config.on_step_failure,
    };

    let mut reports = Vec::with_capacity(graphs.len());
    for (name, graph) in graphs {
        info!(pipeline = %name, nodes = graph.len(), "running pipeline");
        let report = Scheduler::new(name.as_str(), graph, options).run(ctx).await?;

        for id in report.order.iter() {
            info!(pipeline = %name, "Node Id: {}", id);
        }
        info!(
            pipeline = %name,
            executed = report.order.len(),
            failures = report.failures.len(),
            starved = report.starved.len(),
            mode = ?report.mode,
            "pipeline finished"
        );
        reports.push(report);
    }
    Ok(reports)
}

/// Directory persistence paths are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "pipelines/Pipedag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Pipedag.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print nodes, links and roots per pipeline.
fn print_dry_run(cfg: &ConfigFile, graphs: &[(String, Graph)]) {
    println!("pipedag dry-run");
    println!("  config.on_cycle = {:?}", cfg.config.on_cycle);
    println!("  config.on_step_failure = {:?}", cfg.config.on_step_failure);
    println!(
        "  fetch.timeout_secs = {}, fetch.delay_ms = {}",
        cfg.fetch.timeout_secs, cfg.fetch.delay_ms
    );

    for (name, graph) in graphs {
        println!();
        println!(
            "pipeline {name} ({} nodes, {} links):",
            graph.len(),
            graph.edge_count()
        );
        for node in graph.nodes() {
            println!("  - {}", node.id());
            println!("      step: {}", node.step_name());
            if !node.resource_locator().is_empty() {
                println!("      locator: {}", node.resource_locator());
            }
            let next = graph.successors_of(node.id());
            if !next.is_empty() {
                println!("      feeds: {:?}", next);
            }
            if let Some(p) = node.persistence() {
                println!("      persistence: {} {:?}", p.path, p.column_names);
            }
        }
        println!("  roots: {:?}", graph.roots());
    }

    debug!("dry-run complete (no execution)");
}
