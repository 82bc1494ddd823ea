//! File-backed store: on-disk layout, cancellation and resumption.

mod support;

use std::fs;

use reentry_trace::{
    trace_sources, CancelFlag, ClusterStore, FileStore, Lineage, LineageName, MemoryStore,
    StopReason, TraceConfig, TraceError, Tracer,
};
use support::meshes::{bridged_cycles, colliding_waves};

fn bridged_config() -> TraceConfig {
    TraceConfig {
        size_threshold: 3,
        step: 1,
    }
}

#[test]
fn test_snapshot_roundtrip_keeps_names_and_members() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileStore::create(dir.path().join("run")).unwrap();
    let root = LineageName::root(2);
    let lineages = vec![
        Lineage::new(root.child(0), vec![3, 8, 21, 22]),
        Lineage::new(root.child(1), vec![40]),
        Lineage::new(LineageName::root(3), vec![5, 6]),
    ];
    store.write_snapshot(-20, &lineages).unwrap();

    assert!(store.snapshot_path(-20).ends_with("run_-20"));
    assert_eq!(store.read_snapshot(-20).unwrap(), lineages);
    assert_eq!(
        fs::read_to_string(store.snapshot_path(-20)).unwrap(),
        "2.0 2.1 3\n3 40 5\n8 - 6\n21 - -\n22 - -\n"
    );

    let err = store.read_snapshot(-10).unwrap_err();
    assert!(matches!(err, TraceError::SnapshotRead { threshold: -10, .. }));
}

#[test]
fn test_trace_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let (index, graph) = bridged_cycles();
    let mut store = FileStore::create(dir.path().join("out")).unwrap();
    let outcome = trace_sources(&graph, &index, bridged_config(), &mut store).unwrap();
    assert_eq!(outcome.stop, StopReason::AllFinalized { threshold: 1 });

    assert!(store.snapshot_path(3).exists());
    assert!(store.snapshot_path(2).exists());
    assert!(!store.snapshot_path(1).exists());

    assert_eq!(
        fs::read_to_string(store.reduced_path()).unwrap(),
        "Comp\n1\n2\n3\n4\nComp\n10\n11\n12\n13\n"
    );
    assert_eq!(
        store.read_reduced().unwrap(),
        vec![vec![1, 2, 3, 4], vec![10, 11, 12, 13]]
    );

    let meta = fs::read_to_string(store.meta_path()).unwrap();
    let lines: Vec<&str> = meta.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Activation 0 of size 9 present at 3",
            "Last appearance at 2 before merge of activation wave 0.0 of size 4",
            "Last appearance at 2 before merge of activation wave 0.1 of size 4",
            "Activation 0.0 of size 4 appears in 2",
            "Activation 0.1 of size 4 appears in 2",
        ]
    );
}

#[test]
fn test_create_truncates_previous_run() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("out");
    let (index, graph) = bridged_cycles();
    for _ in 0..2 {
        let mut store = FileStore::create(&prefix).unwrap();
        trace_sources(&graph, &index, bridged_config(), &mut store).unwrap();
    }
    let store = FileStore::open(&prefix);
    assert_eq!(store.read_reduced().unwrap().len(), 2);
    assert_eq!(fs::read_to_string(store.meta_path()).unwrap().lines().count(), 5);
}

#[test]
fn test_cancel_then_resume_matches_uninterrupted_run() {
    let (_, index, graph) = colliding_waves(10, 5);
    let config = TraceConfig {
        size_threshold: 20,
        step: 1,
    };
    let schedule = config.schedule(&index).unwrap();
    let full = trace_sources(&graph, &index, config, &mut MemoryStore::new()).unwrap();
    assert!(!full.reduced.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("run");
    let flag = CancelFlag::new();
    flag.cancel();
    let interrupted = Tracer::new(&graph, config)
        .unwrap()
        .with_cancel(flag)
        .trace(&schedule, &mut FileStore::create(&prefix).unwrap())
        .unwrap();
    let resume_from = match interrupted.stop {
        StopReason::Cancelled { resume_from } => resume_from,
        other => panic!("expected cancellation, got {other:?}"),
    };
    assert_eq!(Some(resume_from), schedule.last());
    assert!(interrupted.reduced.is_empty());
    assert!(!interrupted.active.is_empty());

    let mut store = FileStore::open(&prefix);
    let resumed = Tracer::new(&graph, config)
        .unwrap()
        .resume(&schedule, &mut store, resume_from)
        .unwrap();
    assert_eq!(resumed.reduced, full.reduced);
    assert_eq!(resumed.stop, full.stop);
    assert_eq!(
        store.read_reduced().unwrap(),
        full.reduced.iter().map(|r| r.nodes.clone()).collect::<Vec<_>>()
    );
}

#[test]
fn test_resume_from_intermediate_snapshot() {
    let (_, index, graph) = colliding_waves(12, 11);
    let config = TraceConfig {
        size_threshold: 30,
        step: 1,
    };
    let schedule = config.schedule(&index).unwrap();
    let mut full_store = MemoryStore::new();
    let full = trace_sources(&graph, &index, config, &mut full_store).unwrap();

    let thresholds = full_store.thresholds();
    let mid = thresholds[thresholds.len() / 2];

    let mut store = MemoryStore::new();
    store
        .write_snapshot(mid, full_store.snapshot(mid).unwrap())
        .unwrap();
    let resumed = Tracer::new(&graph, config)
        .unwrap()
        .resume(&schedule, &mut store, mid)
        .unwrap();

    let expected: Vec<_> = full
        .reduced
        .iter()
        .filter(|r| r.last_threshold <= mid)
        .cloned()
        .collect();
    assert_eq!(resumed.reduced, expected);
    assert_eq!(resumed.stop, full.stop);
}

#[test]
fn test_resume_rejects_corrupt_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let (index, graph) = bridged_cycles();
    let schedule = bridged_config().schedule(&index).unwrap();
    let mut store = FileStore::create(dir.path().join("bad")).unwrap();
    fs::write(store.snapshot_path(3), "0 0\n1 2\n").unwrap();

    let err = Tracer::new(&graph, bridged_config())
        .unwrap()
        .resume(&schedule, &mut store, 3)
        .unwrap_err();
    assert!(matches!(err, TraceError::SnapshotRead { threshold: 3, .. }));

    let err = Tracer::new(&graph, bridged_config())
        .unwrap()
        .resume(&schedule, &mut store, 7)
        .unwrap_err();
    assert!(matches!(err, TraceError::InvalidConfig(_)));
}

#[test]
fn test_resume_rejects_nodes_claimed_twice() {
    let dir = tempfile::tempdir().unwrap();
    let (index, graph) = bridged_cycles();
    let schedule = bridged_config().schedule(&index).unwrap();
    let tracer = Tracer::new(&graph, bridged_config()).unwrap();

    // Node 1 twice in column 0, and nodes 1..=3 in both columns.
    let mut store = FileStore::create(dir.path().join("shared")).unwrap();
    fs::write(store.snapshot_path(2), "0 1\n1 1\n1 2\n2 3\n3 4\n").unwrap();
    let err = tracer.resume(&schedule, &mut store, 2).unwrap_err();
    assert!(matches!(err, TraceError::SnapshotRead { threshold: 2, .. }));
    assert!(err.to_string().contains("appears twice"), "{err}");
    assert!(store.read_reduced().unwrap().is_empty());
    assert_eq!(fs::read_to_string(store.meta_path()).unwrap(), "");
}
