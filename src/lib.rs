//! Trace reentrant activation waves on cardiac meshes back to their sources.
//!
//! Given a mesh of 4-node elements and a table of per-node activation times,
//! this crate walks time thresholds backward and follows connected clusters
//! of early-activated tissue until each one shrinks below a size threshold.
//! The clusters at that point are the wave's initiation sites.
//!
//! # Example
//!
//! ```
//! use reentry_trace::{trace_sources, ActivatedGraph, ActivationIndex, MemoryStore, MeshGraph, TraceConfig};
//!
//! // A strip of 4-cycles activated from node 1 outward.
//! let mesh = MeshGraph::from_elements((1..=7).map(|k| [k, k + 1, k + 2, k + 3]));
//! let index = ActivationIndex::from_rows((1..=10).map(|k| (k, k as f64)))?;
//! let graph = ActivatedGraph::new(mesh, &index);
//!
//! let config = TraceConfig { size_threshold: 3, step: 1 };
//! let outcome = trace_sources(&graph, &index, config, &mut MemoryStore::new())?;
//!
//! assert_eq!(outcome.reduced.len(), 1);
//! assert_eq!(outcome.reduced[0].nodes, vec![1, 2, 3, 4]);
//! assert_eq!(outcome.reduced[0].last_threshold, 5);
//! # Ok::<(), reentry_trace::TraceError>(())
//! ```

pub mod activation;
mod error;
pub mod mesh;
pub mod schedule;
pub mod store;
mod tracer;
mod types;
pub mod validation;

pub use activation::{ActivatedGraph, ActivationIndex, AttachReport};
pub use error::{Result, TraceError};
pub use mesh::MeshGraph;
pub use schedule::ThresholdSchedule;
pub use store::{ClusterStore, FileStore, MemoryStore};
pub use tracer::{
    CancelFlag, FinalizeReason, StopReason, TraceEvent, TraceOutcome, TraceStats, TraceTimings,
    Tracer,
};
pub use types::{Lineage, LineageName, NodeId, ReducedCluster, Threshold};

/// Minimum size a component must exceed to count as a source candidate.
pub const DEFAULT_SIZE_THRESHOLD: usize = 1000;

/// Spacing between time thresholds, in activation-time units.
pub const DEFAULT_STEP: Threshold = 10;

/// Configuration for a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceConfig {
    /// Components with this many nodes or fewer are not source candidates,
    /// and a lineage with fewer surviving nodes than this is finalized.
    pub size_threshold: usize,
    /// Threshold spacing. Must match the schedule the tracer is driven by.
    pub step: Threshold,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            step: DEFAULT_STEP,
        }
    }
}

impl TraceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.size_threshold == 0 {
            return Err(TraceError::InvalidConfig(
                "size_threshold must be at least 1".into(),
            ));
        }
        if self.step <= 0 {
            return Err(TraceError::InvalidConfig(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        Ok(())
    }

    /// Threshold schedule spanning `index` at this configuration's step.
    pub fn schedule(&self, index: &ActivationIndex) -> Result<ThresholdSchedule> {
        ThresholdSchedule::from_index(index, self.step)
    }
}

/// Trace `graph` over the full time range of `index` with the given store.
pub fn trace_sources<S: ClusterStore>(
    graph: &ActivatedGraph,
    index: &ActivationIndex,
    config: TraceConfig,
    store: &mut S,
) -> Result<TraceOutcome> {
    let schedule = config.schedule(index)?;
    Tracer::new(graph, config)?.trace(&schedule, store)
}
