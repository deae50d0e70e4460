//! tfgraph command-line interface.
//!
//! Reads the parser's `{graph, metadata}` JSON, runs the engine with the
//! built-in providers and writes the transformed graph together with the run
//! report.

use std::fs;
use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use tfgraph_core::{
    AnnotationOverlay, Engine, EngineOptions, Error, ErrorKind, ProviderRegistry, ResourceGraph,
    Result, RunReport,
};

/// Options for one invocation.
#[derive(Debug, Clone, Default)]
pub struct TfgraphOptions {
    pub input: String,
    pub annotations: Option<String>,
    pub output: Option<String>,
    pub provider: Option<String>,
    pub parallel: bool,
    pub strict: bool,
}

impl TfgraphOptions {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    fn engine_options(&self) -> EngineOptions {
        EngineOptions::default()
            .with_parallel(self.parallel)
            .with_strict(self.strict)
            .with_provider(self.provider.clone())
    }
}

/// The serialized output: the graph's `graph`/`metadata` plus `report`.
#[derive(Debug, Serialize)]
struct Document<'a> {
    #[serde(flatten)]
    graph: &'a ResourceGraph,
    report: &'a RunReport,
}

/// A finished run, rendered.
#[derive(Debug)]
pub struct RunOutcome {
    pub json: String,
    pub report: RunReport,
}

/// Registry holding the AWS, Azure and GCP providers.
pub fn default_registry() -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    registry.register(tfgraph_aws::provider())?;
    registry.register(tfgraph_azure::provider())?;
    registry.register(tfgraph_gcp::provider())?;
    Ok(registry)
}

fn read_json<T: DeserializeOwned>(path: &str, what: &str) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|err| Error::from(err).with_context("path", path))?;
    serde_json::from_str(&text).map_err(|err| {
        Error::new(
            ErrorKind::DeserializationFailed,
            format!("invalid {what} in '{path}': {err}"),
        )
        .with_operation("cli::read_json")
        .with_context("path", path)
        .set_source(err)
    })
}

/// Run the engine over `opts.input` and render the result as JSON.
pub fn run_main(opts: &TfgraphOptions) -> Result<RunOutcome> {
    let input: ResourceGraph = read_json(&opts.input, "resource graph")?;
    let overlay: AnnotationOverlay = match &opts.annotations {
        Some(path) => read_json(path, "annotation overlay")?,
        None => AnnotationOverlay::default(),
    };
    info!(
        input = %opts.input,
        nodes = input.len(),
        overlay = !overlay.is_empty(),
        "loaded input"
    );

    let engine = Engine::new(Arc::new(default_registry()?)).with_options(opts.engine_options());
    let output = engine.run(input, &overlay)?;

    let document = Document {
        graph: &output.graph,
        report: &output.report,
    };
    let json = serde_json::to_string_pretty(&document).map_err(|err| {
        Error::new(ErrorKind::SerializationFailed, err.to_string())
            .with_operation("cli::run_main")
            .set_source(err)
    })?;
    Ok(RunOutcome {
        json,
        report: output.report,
    })
}

/// Write the rendered output and report warnings and failures on `diag`.
///
/// Fails after writing when any provider failed.
pub fn emit(opts: &TfgraphOptions, outcome: &RunOutcome, diag: &mut dyn Write) -> Result<()> {
    match &opts.output {
        Some(path) => {
            fs::write(path, &outcome.json).map_err(|err| Error::from(err).with_context("path", path.as_str()))?;
            info!(path = %path, "output written");
        }
        None => println!("{}", outcome.json),
    }

    let report = &outcome.report;
    for warning in &report.warnings {
        writeln!(diag, "warning: {warning}")?;
    }
    for skipped in &report.skipped {
        writeln!(
            diag,
            "skipped: [{}/{}] {}",
            skipped.provider, skipped.handler, skipped.reason
        )?;
    }
    for issue in &report.issues_after {
        writeln!(diag, "issue: {issue}")?;
    }
    for failure in &report.failures {
        writeln!(
            diag,
            "error: provider '{}' failed ({}): {}",
            failure.provider, failure.kind, failure.message
        )?;
    }

    if report.has_failures() {
        return Err(Error::new(
            ErrorKind::Unexpected,
            format!("{} provider(s) failed", report.failures.len()),
        )
        .with_operation("cli::emit"));
    }
    Ok(())
}
