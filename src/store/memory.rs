use std::collections::BTreeMap;

use super::ClusterStore;
use crate::error::{Result, TraceError};
use crate::types::{Lineage, LineageName, NodeId, ReducedCluster, Threshold};

/// In-memory store. Keeps every snapshot so a finished trace can be audited.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshots: BTreeMap<Threshold, Vec<Lineage>>,
    reduced: Vec<ReducedCluster>,
    meta: Vec<(String, Threshold)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot written for `threshold`, if any.
    pub fn snapshot(&self, threshold: Threshold) -> Option<&[Lineage]> {
        self.snapshots.get(&threshold).map(Vec::as_slice)
    }

    /// Thresholds with a snapshot, descending (tracing order).
    pub fn thresholds(&self) -> Vec<Threshold> {
        self.snapshots.keys().rev().copied().collect()
    }

    pub fn reduced(&self) -> &[ReducedCluster] {
        &self.reduced
    }

    pub fn meta(&self) -> &[(String, Threshold)] {
        &self.meta
    }
}

impl ClusterStore for MemoryStore {
    fn write_snapshot(&mut self, threshold: Threshold, lineages: &[Lineage]) -> Result<()> {
        self.snapshots.insert(threshold, lineages.to_vec());
        Ok(())
    }

    fn read_snapshot(&self, threshold: Threshold) -> Result<Vec<Lineage>> {
        self.snapshots
            .get(&threshold)
            .cloned()
            .ok_or_else(|| TraceError::snapshot(threshold, "no snapshot written"))
    }

    fn append_reduced(
        &mut self,
        lineage: &LineageName,
        nodes: &[NodeId],
        size: usize,
        last_threshold: Threshold,
    ) -> Result<()> {
        debug_assert_eq!(size, nodes.len());
        self.reduced.push(ReducedCluster {
            name: lineage.clone(),
            nodes: nodes.to_vec(),
            last_threshold,
        });
        Ok(())
    }

    fn append_meta(&mut self, description: &str, threshold: Threshold) -> Result<()> {
        self.meta.push((description.to_owned(), threshold));
        Ok(())
    }
}
