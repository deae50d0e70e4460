use std::time::Instant;

use clap::Parser;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[cfg(target_env = "msvc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use tfgraph::{TfgraphOptions, emit, run_main};
use tfgraph_core::Result;

#[derive(Parser, Debug)]
#[command(
    name = "tfgraph",
    about = "tfgraph: turn a Terraform resource graph into a diagram-ready one",
    version
)]
pub struct Cli {
    /// Parser output: JSON with `graph` and `metadata`
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    input: String,

    /// Annotation overlay JSON applied after the provider transforms
    #[arg(short = 'a', long = "annotations", value_name = "FILE")]
    annotations: Option<String>,

    /// Output file path (writes to file instead of stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<String>,

    /// Skip detection and treat every resource as this provider's: 'aws', 'azure', 'gcp' or an alias
    #[arg(long, value_name = "NAME")]
    provider: Option<String>,

    /// Transform provider partitions in parallel
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Fail when the transformed graph has validation issues
    #[arg(long, default_value_t = false)]
    strict: bool,
}

pub fn run(args: Cli) -> Result<()> {
    let total_start = Instant::now();

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let opts = TfgraphOptions {
        input: args.input,
        annotations: args.annotations,
        output: args.output,
        provider: args.provider,
        parallel: args.parallel,
        strict: args.strict,
    };

    let result = run_main(&opts).and_then(|outcome| emit(&opts, &outcome, &mut std::io::stderr()));
    if let Err(ref e) = result {
        tracing::error!(error = %e, "execution failed");
    }

    let total_secs = total_start.elapsed().as_secs_f64();
    tracing::info!(total_secs, "complete");
    result
}

pub fn main() -> Result<()> {
    let args = Cli::parse();
    run(args)
}
