//! Hand-off of per-threshold snapshots between tracer iterations, plus the
//! append-only result and metadata outputs.
//!
//! The tracer writes the snapshot for a threshold before it reads it back in
//! the next (lower) iteration; implementations only have to preserve that
//! write-then-read ordering.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::{Lineage, LineageName, NodeId, Threshold};

/// Storage for tracer snapshots and outputs.
pub trait ClusterStore {
    /// Persist the lineages valid at `threshold`, in order.
    fn write_snapshot(&mut self, threshold: Threshold, lineages: &[Lineage]) -> Result<()>;

    /// Reload the lineages written for `threshold`, same names in the same
    /// order. Node order within a lineage need not be preserved.
    fn read_snapshot(&self, threshold: Threshold) -> Result<Vec<Lineage>>;

    /// Record a finalized lineage.
    fn append_reduced(
        &mut self,
        lineage: &LineageName,
        nodes: &[NodeId],
        size: usize,
        last_threshold: Threshold,
    ) -> Result<()>;

    /// Record one line of the human-readable event log.
    fn append_meta(&mut self, description: &str, threshold: Threshold) -> Result<()>;
}

impl<S: ClusterStore + ?Sized> ClusterStore for &mut S {
    fn write_snapshot(&mut self, threshold: Threshold, lineages: &[Lineage]) -> Result<()> {
        (**self).write_snapshot(threshold, lineages)
    }

    fn read_snapshot(&self, threshold: Threshold) -> Result<Vec<Lineage>> {
        (**self).read_snapshot(threshold)
    }

    fn append_reduced(
        &mut self,
        lineage: &LineageName,
        nodes: &[NodeId],
        size: usize,
        last_threshold: Threshold,
    ) -> Result<()> {
        (**self).append_reduced(lineage, nodes, size, last_threshold)
    }

    fn append_meta(&mut self, description: &str, threshold: Threshold) -> Result<()> {
        (**self).append_meta(description, threshold)
    }
}
