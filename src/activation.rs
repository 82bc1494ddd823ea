//! Per-node activation times and their attachment to the mesh graph.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::{Result, TraceError};
use crate::mesh::MeshGraph;
use crate::types::{NodeId, Threshold};

/// Row of the activation table whose time is reported as the reference
/// "wave is underway" time.
pub const REFERENCE_ROW: usize = 100_000;

/// Activation table: `(node id, time)` rows, trusted to be sorted by time.
#[derive(Debug, Clone)]
pub struct ActivationIndex {
    times: FxHashMap<NodeId, f64>,
    row_times: Vec<f64>,
    min_time: f64,
    max_time: f64,
}

impl ActivationIndex {
    /// Build from rows in table order. Later rows overwrite earlier rows for
    /// the same node.
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NodeId, f64)>,
    {
        let rows = rows.into_iter();
        let mut times = FxHashMap::default();
        let mut row_times = Vec::with_capacity(rows.size_hint().0);
        let mut min_time = f64::INFINITY;
        let mut max_time = f64::NEG_INFINITY;
        for (line, (node, time)) in rows.enumerate() {
            if !time.is_finite() {
                return Err(TraceError::MalformedActivationRow {
                    line: line + 1,
                    content: format!("{node} {time}"),
                });
            }
            times.insert(node, time);
            row_times.push(time);
            min_time = min_time.min(time);
            max_time = max_time.max(time);
        }
        if row_times.is_empty() {
            return Err(TraceError::EmptyActivationTable);
        }
        Ok(Self {
            times,
            row_times,
            min_time,
            max_time,
        })
    }

    /// Parse a space-delimited two-column table without header. Blank lines
    /// are ignored; any other row that is not `<id> <time>` is fatal.
    pub fn from_reader<R: BufRead>(reader: R, source: &Path) -> Result<Self> {
        let mut rows = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| TraceError::io(source, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let row = parse_row(&line).ok_or_else(|| TraceError::MalformedActivationRow {
                line: lineno + 1,
                content: line.clone(),
            })?;
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| TraceError::io(path, e))?;
        let index = Self::from_reader(BufReader::new(file), path)?;
        debug!(
            rows = index.rows(),
            nodes = index.distinct_nodes(),
            min_time = index.min_time(),
            max_time = index.max_time(),
            "loaded activation table"
        );
        Ok(index)
    }

    /// Activation time of a node (the last row recorded for it).
    #[inline]
    pub fn time_of(&self, node: NodeId) -> Option<f64> {
        self.times.get(&node).copied()
    }

    /// Time recorded at a table row, counting from 0.
    #[inline]
    pub fn time_at_row(&self, row: usize) -> Option<f64> {
        self.row_times.get(row).copied()
    }

    /// Time at [`REFERENCE_ROW`], if the table is that long. Diagnostic only.
    #[inline]
    pub fn reference_time(&self) -> Option<f64> {
        self.time_at_row(REFERENCE_ROW)
    }

    #[inline]
    pub fn min_time(&self) -> f64 {
        self.min_time
    }

    #[inline]
    pub fn max_time(&self) -> f64 {
        self.max_time
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.row_times.len()
    }

    #[inline]
    pub fn distinct_nodes(&self) -> usize {
        self.times.len()
    }
}

fn parse_row(line: &str) -> Option<(NodeId, f64)> {
    let mut tokens = line.split_whitespace();
    let node = tokens.next()?.parse().ok()?;
    let time = tokens.next()?.parse().ok()?;
    tokens.next().is_none().then_some((node, time))
}

/// Outcome of attaching activation times to the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachReport {
    /// Graph nodes that received a time.
    pub attached: usize,
    /// Graph nodes with no recorded time; excluded from tracing.
    pub missing: usize,
    /// Table ids that are not mesh nodes; ignored.
    pub unmatched: usize,
}

/// The mesh graph with activation times attached. Immutable once built.
#[derive(Debug, Clone)]
pub struct ActivatedGraph {
    graph: MeshGraph,
    times: Vec<Option<f64>>,
    report: AttachReport,
}

impl ActivatedGraph {
    pub fn new(graph: MeshGraph, index: &ActivationIndex) -> Self {
        let times: Vec<Option<f64>> = graph
            .node_ids()
            .iter()
            .map(|&id| index.time_of(id))
            .collect();
        let attached = times.iter().filter(|t| t.is_some()).count();
        let report = AttachReport {
            attached,
            missing: times.len() - attached,
            unmatched: index.distinct_nodes() - attached,
        };
        if report.missing > 0 {
            warn!(
                missing = report.missing,
                "mesh nodes without activation time are excluded"
            );
        }
        if report.unmatched > 0 {
            debug!(
                unmatched = report.unmatched,
                "activation rows reference nodes outside the mesh"
            );
        }
        Self {
            graph,
            times,
            report,
        }
    }

    #[inline]
    pub fn graph(&self) -> &MeshGraph {
        &self.graph
    }

    #[inline]
    pub fn report(&self) -> AttachReport {
        self.report
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    /// Activation time at a dense index.
    #[inline]
    pub fn time_at(&self, index: u32) -> Option<f64> {
        self.times[index as usize]
    }

    /// Activation time of a node id.
    pub fn time_of(&self, node: NodeId) -> Option<f64> {
        self.graph.index_of(node).and_then(|i| self.time_at(i))
    }

    /// True if the node at `index` activated strictly before `threshold`.
    #[inline]
    pub fn active_before(&self, index: u32, threshold: Threshold) -> bool {
        matches!(self.times[index as usize], Some(t) if t < threshold as f64)
    }

    /// Dense indices of every node activated before `threshold`, ascending.
    pub fn activated_before(&self, threshold: Threshold) -> Vec<u32> {
        (0..self.num_nodes() as u32)
            .filter(|&i| self.active_before(i, threshold))
            .collect()
    }
}
