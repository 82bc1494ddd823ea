//! Consistency checks for a finished trace.
//!
//! Verifies the properties every traced source cluster must have against the
//! activated graph it was traced on. Useful for testing and for auditing
//! output produced by an interrupted-and-resumed run.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::activation::ActivatedGraph;
use crate::tracer::components::{components_larger_than, ComponentScratch};
use crate::tracer::{TraceEvent, TraceOutcome};

/// Validation report for a [`TraceOutcome`].
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Number of reduced clusters checked.
    pub reduced_clusters: usize,
    /// Total nodes across reduced clusters.
    pub reduced_nodes: usize,
    /// Reduced clusters sharing a lineage name with an earlier one.
    pub duplicate_names: usize,
    /// Lineages with more than one finalization event.
    pub refinalized_lineages: usize,
    /// Reduced clusters with no more nodes than the size threshold.
    pub undersized: usize,
    /// Reduced clusters that are not connected in the mesh graph.
    pub disconnected: usize,
    /// Nodes not activated before their cluster's last threshold (or unknown).
    pub late_nodes: usize,
    /// Nodes claimed by more than one reduced cluster.
    pub overlapping_nodes: usize,
    /// Split events whose children are not numbered `parent.0, parent.1, ...`.
    pub misnumbered_splits: usize,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.duplicate_names == 0
            && self.refinalized_lineages == 0
            && self.undersized == 0
            && self.disconnected == 0
            && self.late_nodes == 0
            && self.overlapping_nodes == 0
            && self.misnumbered_splits == 0
    }

    /// Format a summary of any issues found.
    pub fn summary(&self) -> String {
        if self.is_valid() {
            return "Valid".to_string();
        }

        let mut issues = Vec::new();
        if self.duplicate_names > 0 {
            issues.push(format!("{} duplicate lineage names", self.duplicate_names));
        }
        if self.refinalized_lineages > 0 {
            issues.push(format!(
                "{} lineages finalized more than once",
                self.refinalized_lineages
            ));
        }
        if self.undersized > 0 {
            issues.push(format!("{} undersized clusters", self.undersized));
        }
        if self.disconnected > 0 {
            issues.push(format!("{} disconnected clusters", self.disconnected));
        }
        if self.late_nodes > 0 {
            issues.push(format!("{} late nodes", self.late_nodes));
        }
        if self.overlapping_nodes > 0 {
            issues.push(format!("{} nodes in several clusters", self.overlapping_nodes));
        }
        if self.misnumbered_splits > 0 {
            issues.push(format!("{} misnumbered splits", self.misnumbered_splits));
        }
        issues.join(", ")
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ValidationReport {{ clusters={}, nodes={}, {} }}",
            self.reduced_clusters,
            self.reduced_nodes,
            self.summary()
        )
    }
}

/// Validate a trace outcome against the graph it was traced on.
///
/// Checks:
/// - lineage names unique, each lineage finalized once
/// - every cluster larger than `size_threshold` and connected
/// - every node activated before the cluster's last threshold
/// - clusters pairwise disjoint
/// - split children numbered in order under their parent
pub fn validate(
    graph: &ActivatedGraph,
    outcome: &TraceOutcome,
    size_threshold: usize,
) -> ValidationReport {
    let mut report = ValidationReport {
        reduced_clusters: outcome.reduced.len(),
        ..Default::default()
    };

    let mut names = FxHashSet::default();
    let mut owner: FxHashMap<u32, usize> = FxHashMap::default();
    let mut scratch = ComponentScratch::new(graph.num_nodes());

    for (ci, cluster) in outcome.reduced.iter().enumerate() {
        report.reduced_nodes += cluster.size();
        if !names.insert(&cluster.name) {
            report.duplicate_names += 1;
        }
        if cluster.size() <= size_threshold {
            report.undersized += 1;
        }

        let mut members = Vec::with_capacity(cluster.size());
        for &id in &cluster.nodes {
            match graph.graph().index_of(id) {
                Some(index) if graph.active_before(index, cluster.last_threshold) => {
                    members.push(index);
                    if owner.insert(index, ci).is_some_and(|other| other != ci) {
                        report.overlapping_nodes += 1;
                    }
                }
                _ => report.late_nodes += 1,
            }
        }
        members.sort_unstable();
        members.dedup();
        if components_larger_than(graph, &members, 0, &mut scratch).len() > 1 {
            report.disconnected += 1;
        }
    }

    let mut finalized: FxHashMap<&str, usize> = FxHashMap::default();
    for event in &outcome.events {
        match event {
            TraceEvent::Finalized { lineage, .. } => {
                *finalized.entry(lineage.as_str()).or_default() += 1;
            }
            TraceEvent::Split {
                parent, children, ..
            } => {
                let ordered = children
                    .iter()
                    .enumerate()
                    .all(|(i, (child, _))| *child == parent.child(i));
                if !ordered || children.len() < 2 {
                    report.misnumbered_splits += 1;
                }
            }
            TraceEvent::Seeded { .. } | TraceEvent::Exhausted { .. } => {}
        }
    }
    report.refinalized_lineages = finalized.values().filter(|&&n| n > 1).count();

    report
}
