//! Disjoint-set (union-find) with path compression.

#[derive(Debug)]
pub(crate) struct UnionFind {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            rank: vec![0; n],
        }
    }

    /// Iterative, with full path compression.
    pub fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut cur = x;
        while self.parent[cur as usize] != root {
            let next = self.parent[cur as usize];
            self.parent[cur as usize] = root;
            cur = next;
        }
        root
    }

    /// Union by rank. Returns `true` if `a` and `b` were in different sets.
    pub fn union(&mut self, a: u32, b: u32) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        let ra_idx = ra as usize;
        let rb_idx = rb as usize;
        if self.rank[ra_idx] < self.rank[rb_idx] {
            self.parent[ra_idx] = rb;
        } else if self.rank[ra_idx] > self.rank[rb_idx] {
            self.parent[rb_idx] = ra;
        } else {
            self.parent[rb_idx] = ra;
            self.rank[ra_idx] = self.rank[ra_idx].saturating_add(1);
        }
        true
    }
}
