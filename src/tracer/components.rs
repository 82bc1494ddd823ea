//! Connected components of node subsets of the activated mesh graph.
//!
//! Components are recomputed from membership on every call; nothing about a
//! component's identity survives between calls.

use super::union_find::UnionFind;
use crate::activation::ActivatedGraph;

const ABSENT: u32 = u32::MAX;

/// Reusable per-worker buffer mapping dense graph indices to positions in the
/// current member list. Entries are reset after every call, so a scratch can
/// be reused across lineages and thresholds without reallocation.
#[derive(Debug)]
pub(crate) struct ComponentScratch {
    local: Vec<u32>,
}

impl ComponentScratch {
    pub fn new(num_nodes: usize) -> Self {
        Self {
            local: vec![ABSENT; num_nodes],
        }
    }
}

/// Components of the subgraph induced on `members` with more than `min_exclusive` nodes.
///
/// `members` must be ascending dense indices without duplicates. Components
/// are returned in ascending order of their smallest node id, each as an
/// ascending list of dense indices.
pub(crate) fn components_larger_than(
    graph: &ActivatedGraph,
    members: &[u32],
    min_exclusive: usize,
    scratch: &mut ComponentScratch,
) -> Vec<Vec<u32>> {
    debug_assert!(members.windows(2).all(|w| w[0] < w[1]));
    if members.len() <= min_exclusive {
        return Vec::new();
    }

    for (pos, &node) in members.iter().enumerate() {
        scratch.local[node as usize] = pos as u32;
    }

    let mesh = graph.graph();
    let mut uf = UnionFind::new(members.len());
    for (pos, &node) in members.iter().enumerate() {
        for &nb in mesh.neighbors(node) {
            // Each edge is seen from both ends; union once.
            if nb > node {
                let other = scratch.local[nb as usize];
                if other != ABSENT {
                    uf.union(pos as u32, other);
                }
            }
        }
    }

    for &node in members {
        scratch.local[node as usize] = ABSENT;
    }

    // Walking members in ascending order numbers groups by first (= smallest) member.
    let mut group_of_root = vec![ABSENT; members.len()];
    let mut groups: Vec<Vec<u32>> = Vec::new();
    for (pos, &node) in members.iter().enumerate() {
        let root = uf.find(pos as u32) as usize;
        if group_of_root[root] == ABSENT {
            group_of_root[root] = groups.len() as u32;
            groups.push(Vec::new());
        }
        groups[group_of_root[root] as usize].push(node);
    }

    groups.retain(|g| g.len() > min_exclusive);
    groups
}
