//! Trace a reentrant activation wave back to its initiation clusters.
//!
//! Usage:
//!   trace-sources -e mesh.elem -a activations.dat -o out/run
//!
//! Writes `out/run_<threshold>` snapshots, `out/run_reduced` and `out/run_meta`.
//! Set `RUST_LOG` or pass `-v`/`-vv` for more detail.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use reentry_trace::{
    trace_sources, ActivatedGraph, ActivationIndex, FileStore, MeshGraph, StopReason, TraceConfig,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "trace-sources")]
#[command(about = "Trace an activation wave back to its source clusters")]
struct Args {
    /// Mesh element file (first line ignored, 4 node ids per element line)
    #[arg(short = 'e', long = "elem-infile")]
    elem_infile: PathBuf,

    /// Activation file: `<node id> <time>` rows sorted by time
    #[arg(short = 'a', long = "act-infile")]
    act_infile: PathBuf,

    /// Output path prefix
    #[arg(short = 'o', long = "outfile")]
    outfile: PathBuf,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mesh = MeshGraph::from_path(&args.elem_infile)
        .with_context(|| format!("reading mesh {}", args.elem_infile.display()))?;
    let index = ActivationIndex::from_path(&args.act_infile)
        .with_context(|| format!("reading activations {}", args.act_infile.display()))?;

    info!(
        nodes = mesh.num_nodes(),
        edges = mesh.num_edges(),
        min_time = index.min_time(),
        max_time = index.max_time(),
        "inputs loaded"
    );
    match index.reference_time() {
        Some(t) => info!(reference_time = t, "wave underway"),
        None => info!(rows = index.rows(), "table shorter than reference row"),
    }

    let graph = ActivatedGraph::new(mesh, &index);
    let mut store = FileStore::create(&args.outfile)
        .with_context(|| format!("preparing outputs at {}", args.outfile.display()))?;

    let outcome = trace_sources(&graph, &index, TraceConfig::default(), &mut store)?;

    match outcome.stop {
        StopReason::EmptySchedule => warn!("activation range too short to trace"),
        StopReason::NoSeeds => warn!("no component exceeds the size threshold"),
        StopReason::AllFinalized { threshold } => info!(threshold, "all lineages finalized"),
        StopReason::ScheduleExhausted { threshold } => warn!(
            threshold,
            active = outcome.active.len(),
            "reached first threshold with lineages still active"
        ),
        StopReason::Cancelled { resume_from } => warn!(resume_from, "cancelled"),
    }
    info!(
        sources = outcome.reduced.len(),
        splits = outcome.stats.splits,
        thresholds = outcome.stats.thresholds_processed,
        reduced = %store.reduced_path().display(),
        "trace complete"
    );
    for cluster in &outcome.reduced {
        info!(
            lineage = %cluster.name,
            size = cluster.size(),
            last_threshold = cluster.last_threshold,
            "source"
        );
    }
    Ok(())
}
