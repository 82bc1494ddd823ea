//! Mesh connectivity graph built from 4-node elements.
//!
//! Each element contributes only the edges between cyclically adjacent ids,
//! `(id[i], id[i-1 mod 4])`: a 4-cycle, not the 6-edge tetrahedral clique.
//! Downstream cluster sizes depend on this rule.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Result, TraceError};
use crate::types::NodeId;

/// Number of node ids per mesh element.
pub const ELEMENT_ARITY: usize = 4;

/// Parsed element file.
#[derive(Debug, Clone, Default)]
pub struct ElementTable {
    pub elements: Vec<[NodeId; ELEMENT_ARITY]>,
    /// Lines after the header that did not hold exactly four ids.
    pub skipped: usize,
}

/// Parse one element line. Returns `None` unless the line holds exactly four
/// whitespace-separated node ids.
pub fn parse_element_line(line: &str) -> Option<[NodeId; ELEMENT_ARITY]> {
    let mut ids = [0; ELEMENT_ARITY];
    let mut tokens = line.split_whitespace();
    for slot in &mut ids {
        *slot = tokens.next()?.parse().ok()?;
    }
    match tokens.next() {
        Some(_) => None,
        None => Some(ids),
    }
}

/// Read an element table. The first line is a header and is ignored; lines
/// that are not 4-id elements (including lines that are not UTF-8) are
/// skipped and counted, never fatal.
pub fn read_elements<R: BufRead>(reader: R, source: &Path) -> Result<ElementTable> {
    let mut table = ElementTable::default();
    for (lineno, bytes) in reader.split(b'\n').enumerate() {
        let bytes = bytes.map_err(|e| TraceError::io(source, e))?;
        if lineno == 0 {
            continue;
        }
        match std::str::from_utf8(&bytes).ok().and_then(parse_element_line) {
            Some(element) => table.elements.push(element),
            None => {
                if !bytes.trim_ascii().is_empty() {
                    debug!(line = lineno + 1, "skipping malformed element line");
                }
                table.skipped += 1;
            }
        }
    }
    Ok(table)
}

/// Undirected simple graph over mesh nodes in compressed sparse row layout.
///
/// Nodes are indexed densely (`u32`) in ascending id order, so iterating
/// indices in order visits node ids in ascending order.
#[derive(Debug, Clone)]
pub struct MeshGraph {
    ids: Vec<NodeId>,
    offsets: Vec<usize>,
    neighbors: Vec<u32>,
}

impl MeshGraph {
    /// Build the graph from elements.
    pub fn from_elements<I>(elements: I) -> Self
    where
        I: IntoIterator<Item = [NodeId; ELEMENT_ARITY]>,
    {
        let mut ids = Vec::new();
        let mut edges: Vec<(NodeId, NodeId)> = Vec::new();
        for element in elements {
            ids.extend_from_slice(&element);
            for i in 0..ELEMENT_ARITY {
                let a = element[i];
                let b = element[(i + ELEMENT_ARITY - 1) % ELEMENT_ARITY];
                // Repeated ids within one element carry no connectivity.
                if a != b {
                    edges.push((a.min(b), a.max(b)));
                }
            }
        }
        ids.sort_unstable();
        ids.dedup();
        edges.sort_unstable();
        edges.dedup();

        let index = |id: NodeId| -> u32 {
            // Every edge endpoint was pushed into `ids` above.
            ids.binary_search(&id).unwrap_or_else(|_| unreachable!()) as u32
        };

        let mut degree = vec![0usize; ids.len()];
        let dense: Vec<(u32, u32)> = edges
            .iter()
            .map(|&(a, b)| {
                let (ia, ib) = (index(a), index(b));
                degree[ia as usize] += 1;
                degree[ib as usize] += 1;
                (ia, ib)
            })
            .collect();

        let mut offsets = Vec::with_capacity(ids.len() + 1);
        offsets.push(0);
        for d in &degree {
            offsets.push(offsets[offsets.len() - 1] + d);
        }

        let mut cursor = offsets[..ids.len()].to_vec();
        let mut neighbors = vec![0u32; offsets[ids.len()]];
        for (a, b) in dense {
            neighbors[cursor[a as usize]] = b;
            cursor[a as usize] += 1;
            neighbors[cursor[b as usize]] = a;
            cursor[b as usize] += 1;
        }
        // Edges were sorted, but the reverse halves are interleaved.
        for i in 0..ids.len() {
            neighbors[offsets[i]..offsets[i + 1]].sort_unstable();
        }

        Self {
            ids,
            offsets,
            neighbors,
        }
    }

    /// Read an element file and build its graph.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| TraceError::io(path, e))?;
        let table = read_elements(BufReader::new(file), path)?;
        if table.skipped > 0 {
            warn!(
                skipped = table.skipped,
                path = %path.display(),
                "skipped element lines without exactly 4 node ids"
            );
        }
        let graph = Self::from_elements(table.elements);
        debug!(
            nodes = graph.num_nodes(),
            edges = graph.num_edges(),
            "built mesh graph"
        );
        Ok(graph)
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.neighbors.len() / 2
    }

    /// Node id at a dense index.
    #[inline]
    pub fn node_id(&self, index: u32) -> NodeId {
        self.ids[index as usize]
    }

    /// Dense index of a node id, if the node is part of the mesh.
    #[inline]
    pub fn index_of(&self, id: NodeId) -> Option<u32> {
        self.ids.binary_search(&id).ok().map(|i| i as u32)
    }

    /// All node ids, ascending.
    #[inline]
    pub fn node_ids(&self) -> &[NodeId] {
        &self.ids
    }

    /// Dense neighbor indices of a node, ascending.
    #[inline]
    pub fn neighbors(&self, index: u32) -> &[u32] {
        let i = index as usize;
        &self.neighbors[self.offsets[i]..self.offsets[i + 1]]
    }

    #[inline]
    pub fn degree(&self, index: u32) -> usize {
        self.neighbors(index).len()
    }

    pub fn contains_edge(&self, a: NodeId, b: NodeId) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(ia), Some(ib)) => self.neighbors(ia).binary_search(&ib).is_ok(),
            _ => false,
        }
    }

    /// Every edge once, as `(smaller id, larger id)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        (0..self.ids.len() as u32).flat_map(move |a| {
            self.neighbors(a)
                .iter()
                .filter(move |&&b| b > a)
                .map(move |&b| (self.node_id(a), self.node_id(b)))
        })
    }
}
