//! Sequential application of one provider's handler sequence.
//!
//! Every handler runs against a checkpoint of the graph:
//!
//! 1. `MissingResource` errors restore the checkpoint and skip the handler
//! 2. a handler that leaves new metadata defects is rolled back and the
//!    provider's run stops with `MetadataInconsistency`
//! 3. any other error rolls back and stops the provider's run
//!
//! The graph handed back is always the last state that passed these checks.

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use tfgraph_error::{Error, Result};

use crate::handler::{Handler, HandlerCtxt, HandlerSequence, KeyFate};
use crate::key::NodeKey;
use crate::resource::ResourceGraph;

/// A handler skipped because its precondition did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedHandler {
    pub provider: String,
    pub handler: String,
    pub reason: String,
}

/// The error that stopped one provider's pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    /// Handler that failed, `None` when the provider failed before any handler ran.
    pub handler: Option<String>,
    pub kind: String,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(provider: &str, handler: Option<&str>, err: &Error) -> Self {
        Self {
            provider: provider.to_string(),
            handler: handler.map(str::to_string),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct PipelineOutcome {
    pub applied: Vec<String>,
    pub skipped: Vec<SkippedHandler>,
    pub warnings: Vec<String>,
    /// Keys removed by the applied handlers and what became of them.
    pub fates: Vec<(NodeKey, KeyFate)>,
    pub failure: Option<ProviderFailure>,
}

/// Run `handlers` over `rg` in declared order.
pub fn run_pipeline(
    rg: &mut ResourceGraph,
    handlers: &HandlerSequence,
    cx: &HandlerCtxt<'_>,
) -> PipelineOutcome {
    let provider = cx.provider_name();
    let mut outcome = PipelineOutcome::default();
    let start = Instant::now();
    info!(provider, handlers = handlers.len(), nodes = rg.len(), "running handler pipeline");

    for handler in handlers.iter() {
        match run_handler(rg, handler, cx) {
            Ok(()) => outcome.applied.push(handler.name().to_string()),
            Err(err) if err.is_recoverable() => {
                info!(provider, handler = handler.name(), "skipping handler: {}", err.message());
                outcome.skipped.push(SkippedHandler {
                    provider: provider.to_string(),
                    handler: handler.name().to_string(),
                    reason: err.message().to_string(),
                });
            }
            Err(err) => {
                warn!(provider, handler = handler.name(), "aborting provider pipeline: {err}");
                outcome.failure = Some(ProviderFailure::new(provider, Some(handler.name()), &err));
                break;
            }
        }
    }

    outcome.warnings = cx.take_warnings();
    outcome.fates = cx.take_fates();
    info!(
        provider,
        applied = outcome.applied.len(),
        skipped = outcome.skipped.len(),
        warnings = outcome.warnings.len(),
        "handler pipeline finished in {:.3}s",
        start.elapsed().as_secs_f64()
    );
    outcome
}

/// Apply one handler, restoring `rg` unless it succeeded cleanly.
fn run_handler(rg: &mut ResourceGraph, handler: &dyn Handler, cx: &HandlerCtxt<'_>) -> Result<()> {
    let checkpoint = rg.clone();
    let recorded = cx.fate_count();
    let known: HashSet<String> = rg.metadata_defects().into_iter().collect();
    let start = Instant::now();

    if let Err(err) = handler.apply(rg, cx) {
        *rg = checkpoint;
        cx.truncate_fates(recorded);
        return Err(err.with_context("handler", handler.name().to_string()));
    }

    let introduced: Vec<String> = rg
        .metadata_defects()
        .into_iter()
        .filter(|issue| !known.contains(issue))
        .collect();
    if !introduced.is_empty() {
        *rg = checkpoint;
        cx.truncate_fates(recorded);
        return Err(Error::metadata_inconsistency(format!(
            "handler '{}' left {} metadata defect(s): {}",
            handler.name(),
            introduced.len(),
            introduced.join("; ")
        ))
        .with_operation("pipeline::run_handler")
        .with_context("handler", handler.name().to_string()));
    }

    debug!(
        provider = cx.provider_name(),
        handler = handler.name(),
        kind = %handler.kind(),
        nodes = rg.len(),
        edges = rg.graph.edge_count(),
        "handler applied in {:.3}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}
