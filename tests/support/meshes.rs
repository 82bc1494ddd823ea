#![allow(dead_code)]

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use reentry_trace::{ActivatedGraph, ActivationIndex, MeshGraph, NodeId};

/// Cubic lattice of `side^3` nodes, ids `x + side * (y + side * z)`.
///
/// Every lattice edge is covered by a 4-node element whose cyclic pairs are
/// exactly the sides of one xy or xz face.
pub struct Lattice {
    pub side: usize,
    pub elements: Vec<[NodeId; 4]>,
}

impl Lattice {
    pub fn new(side: usize) -> Self {
        assert!(side >= 2);
        let id = |x: usize, y: usize, z: usize| (x + side * (y + side * z)) as NodeId;
        let mut elements = Vec::new();
        for z in 0..side {
            for y in 0..side {
                for x in 0..side - 1 {
                    if y + 1 < side {
                        elements.push([
                            id(x, y, z),
                            id(x + 1, y, z),
                            id(x + 1, y + 1, z),
                            id(x, y + 1, z),
                        ]);
                    }
                    if z + 1 < side {
                        elements.push([
                            id(x, y, z),
                            id(x, y, z + 1),
                            id(x + 1, y, z + 1),
                            id(x + 1, y, z),
                        ]);
                    }
                }
            }
        }
        Self { side, elements }
    }

    pub fn id(&self, x: usize, y: usize, z: usize) -> NodeId {
        (x + self.side * (y + self.side * z)) as NodeId
    }

    pub fn num_nodes(&self) -> usize {
        self.side * self.side * self.side
    }

    pub fn coords(&self, id: NodeId) -> [f64; 3] {
        let i = id as usize;
        [
            (i % self.side) as f64,
            ((i / self.side) % self.side) as f64,
            (i / (self.side * self.side)) as f64,
        ]
    }

    pub fn graph(&self) -> MeshGraph {
        MeshGraph::from_elements(self.elements.iter().copied())
    }
}

/// A wave source: lattice position and start time.
#[derive(Debug, Clone, Copy)]
pub struct Source {
    pub at: [f64; 3],
    pub start: f64,
}

/// Activation rows for fronts expanding at unit speed from `sources`, with
/// uniform jitter in `[0, jitter)`. Rows are sorted by time.
pub fn wave_activations(
    lattice: &Lattice,
    sources: &[Source],
    jitter: f64,
    seed: u64,
) -> Vec<(NodeId, f64)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows: Vec<(NodeId, f64)> = (0..lattice.num_nodes() as NodeId)
        .map(|id| {
            let p = lattice.coords(id);
            let t = sources
                .iter()
                .map(|s| {
                    let d = ((p[0] - s.at[0]).powi(2)
                        + (p[1] - s.at[1]).powi(2)
                        + (p[2] - s.at[2]).powi(2))
                    .sqrt();
                    s.start + d
                })
                .fold(f64::INFINITY, f64::min);
            let noise = if jitter > 0.0 {
                rng.gen_range(0.0..jitter)
            } else {
                0.0
            };
            (id, t + noise)
        })
        .collect();
    rows.sort_by(|a, b| a.1.total_cmp(&b.1));
    rows
}

/// Two waves from opposite corners of a `side`-lattice, the far one starting later.
pub fn colliding_waves(side: usize, seed: u64) -> (Lattice, ActivationIndex, ActivatedGraph) {
    let lattice = Lattice::new(side);
    let far = (side - 1) as f64;
    let sources = [
        Source {
            at: [0.0, 0.0, 0.0],
            start: 0.0,
        },
        Source {
            at: [far, far, far],
            start: 3.0,
        },
    ];
    let rows = wave_activations(&lattice, &sources, 0.5, seed);
    let index = ActivationIndex::from_rows(rows).unwrap();
    let graph = ActivatedGraph::new(lattice.graph(), &index);
    (lattice, index, graph)
}

/// Two 4-cycles {1,2,3,4} and {10,11,12,13} bridged through node 20 (active
/// at 2.5), with a tail node 30 active at 4.0.
pub fn bridged_cycles() -> (ActivationIndex, ActivatedGraph) {
    let mesh = MeshGraph::from_elements([
        [1, 2, 3, 4],
        [10, 11, 12, 13],
        [4, 20, 10, 20],
        [20, 30, 20, 30],
    ]);
    let index = ActivationIndex::from_rows([
        (1, 0.0),
        (10, 0.2),
        (2, 0.5),
        (11, 0.7),
        (3, 1.0),
        (12, 1.2),
        (4, 1.5),
        (13, 1.7),
        (20, 2.5),
        (30, 4.0),
    ])
    .unwrap();
    let graph = ActivatedGraph::new(mesh, &index);
    (index, graph)
}
