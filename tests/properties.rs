//! Structural properties of traces over colliding waves on a lattice.

mod support;

use std::collections::HashSet;

use reentry_trace::{
    trace_sources, Lineage, LineageName, MemoryStore, StopReason, TraceConfig, TraceEvent,
    TraceOutcome,
};
use support::meshes::{colliding_waves, Lattice};

const SIDE: usize = 16;
const SEEDS: [u64; 3] = [1, 2, 3];

fn config() -> TraceConfig {
    TraceConfig {
        size_threshold: 50,
        step: 1,
    }
}

fn run(seed: u64) -> (Lattice, reentry_trace::ActivatedGraph, TraceOutcome, MemoryStore) {
    let (lattice, index, graph) = colliding_waves(SIDE, seed);
    let mut store = MemoryStore::new();
    let outcome = trace_sources(&graph, &index, config(), &mut store).unwrap();
    (lattice, graph, outcome, store)
}

fn find<'a>(lineages: &'a [Lineage], name: &LineageName) -> Option<&'a Lineage> {
    lineages.iter().find(|l| &l.name == name)
}

#[test]
fn test_two_sources_one_per_corner() {
    for seed in SEEDS {
        let (lattice, _, outcome, _) = run(seed);
        assert!(
            matches!(outcome.stop, StopReason::AllFinalized { .. }),
            "seed {seed}: {:?}",
            outcome.stop
        );
        assert_eq!(outcome.reduced.len(), 2, "seed {seed}");

        let near = lattice.id(0, 0, 0);
        let far = lattice.id(SIDE - 1, SIDE - 1, SIDE - 1);
        let holds = |id| outcome.reduced.iter().filter(|r| r.nodes.contains(&id)).count();
        assert_eq!(holds(near), 1, "seed {seed}");
        assert_eq!(holds(far), 1, "seed {seed}");
        assert!(outcome
            .reduced
            .iter()
            .all(|r| r.size() > config().size_threshold));

        // The later wave is younger when traced back, so it finalizes at a later cut.
        let at = |id| {
            outcome
                .reduced
                .iter()
                .find(|r| r.nodes.contains(&id))
                .map(|r| r.last_threshold)
                .unwrap()
        };
        assert!(at(far) > at(near), "seed {seed}");
    }
}

#[test]
fn test_lineages_shrink_monotonically() {
    for seed in SEEDS {
        let (_, graph, _, store) = run(seed);
        let thresholds = store.thresholds();
        assert!(thresholds.len() > 2);

        for pair in thresholds.windows(2) {
            let (upper, lower) = (pair[0], pair[1]);
            assert_eq!(upper - lower, 1);
            let above = store.snapshot(upper).unwrap();
            for lineage in store.snapshot(lower).unwrap() {
                let origin = find(above, &lineage.name)
                    .or_else(|| lineage.name.parent().and_then(|p| find(above, &p)))
                    .unwrap_or_else(|| panic!("{} has no origin at {upper}", lineage.name));
                let origin: HashSet<_> = origin.nodes.iter().collect();
                for id in &lineage.nodes {
                    assert!(origin.contains(id));
                    assert!(graph.time_of(*id).unwrap() < lower as f64);
                }
            }
        }
    }
}

#[test]
fn test_each_lineage_finalizes_once() {
    for seed in SEEDS {
        let (_, _, outcome, store) = run(seed);
        let names: HashSet<_> = outcome.reduced.iter().map(|r| &r.name).collect();
        assert_eq!(names.len(), outcome.reduced.len());

        for cluster in &outcome.reduced {
            // The finalized set is the snapshot at its last threshold.
            let snapshot = store.snapshot(cluster.last_threshold).unwrap();
            assert_eq!(find(snapshot, &cluster.name).unwrap().nodes, cluster.nodes);

            // Neither it nor a descendant is traced below that threshold.
            for t in store.thresholds() {
                if t >= cluster.last_threshold {
                    continue;
                }
                assert!(store
                    .snapshot(t)
                    .unwrap()
                    .iter()
                    .all(|l| !l.name.descends_from(&cluster.name)));
            }
        }
    }
}

#[test]
fn test_split_children_are_whole_disjoint_components() {
    for seed in SEEDS {
        let (_, graph, outcome, store) = run(seed);
        let mesh = graph.graph();
        let mut splits = 0;

        for event in &outcome.events {
            let TraceEvent::Split {
                parent,
                children,
                threshold,
            } = event
            else {
                continue;
            };
            splits += 1;
            let before = store.snapshot(threshold + 1).unwrap();
            let after = store.snapshot(*threshold).unwrap();
            let parent_nodes = &find(before, parent).unwrap().nodes;

            let mut claimed: HashSet<u32> = HashSet::new();
            for (name, size) in children {
                assert_eq!(name.parent().as_ref(), Some(parent));
                let child = find(after, name).unwrap();
                assert_eq!(child.len(), *size);
                for &id in &child.nodes {
                    assert!(parent_nodes.contains(&id));
                    assert!(claimed.insert(id), "node {id} in two children");
                }
            }

            let leftover: Vec<u32> = parent_nodes
                .iter()
                .copied()
                .filter(|&id| !claimed.contains(&id))
                .filter(|&id| graph.time_of(id).unwrap() < *threshold as f64)
                .collect();
            for &a in &leftover {
                for &b in &claimed {
                    assert!(!mesh.contains_edge(a, b), "{a} touches a child at {b}");
                }
            }
        }
        assert!(splits >= 1, "seed {seed}: waves never separated");
    }
}

#[test]
fn test_trace_is_deterministic() {
    let (_, _, first, first_store) = run(9);
    let (_, _, second, second_store) = run(9);
    assert_eq!(first.reduced, second.reduced);
    assert_eq!(first.events, second.events);
    assert_eq!(first.stop, second.stop);
    assert_eq!(first_store.meta(), second_store.meta());
    for t in first_store.thresholds() {
        assert_eq!(first_store.snapshot(t), second_store.snapshot(t));
    }
}
