//! Backward, threshold-stepped tracing of activation clusters.
//!
//! The tracer starts at the latest threshold with every large connected
//! component of early-activated tissue, then walks the schedule downward.
//! At each cut it restricts every active lineage to the nodes activated
//! before the cut and recomputes connectivity: a lineage with one large
//! component carries on, one with several splits into child lineages, and
//! one with none is finalized as a source cluster at the previous threshold.

pub(crate) mod components;
mod events;
mod timing;
mod union_find;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::activation::ActivatedGraph;
use crate::error::{Result, TraceError};
use crate::schedule::ThresholdSchedule;
use crate::store::ClusterStore;
use crate::types::{Lineage, LineageName, NodeId, ReducedCluster, Threshold};
use crate::TraceConfig;

use components::{components_larger_than, ComponentScratch};
use timing::Timer;

pub use events::{FinalizeReason, TraceEvent};
pub use timing::TraceTimings;

/// Cooperative cancellation, checked before each threshold.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Why tracing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The activation range is shorter than one step; nothing to trace.
    EmptySchedule,
    /// No component at the latest threshold exceeds the size threshold.
    NoSeeds,
    /// Every lineage finalized; `threshold` is the cut that finalized the last.
    AllFinalized { threshold: Threshold },
    /// The first threshold was processed with lineages still active.
    ScheduleExhausted { threshold: Threshold },
    /// Cancelled; `resume_from` is the last snapshot written.
    Cancelled { resume_from: Threshold },
}

/// Counters for one trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceStats {
    /// Thresholds below the seed threshold that were processed.
    pub thresholds_processed: usize,
    /// Lineage restrictions performed.
    pub lineages_resolved: usize,
    pub splits: usize,
    pub finalized: usize,
    pub timings: TraceTimings,
}

/// Result of a trace.
#[derive(Debug, Clone)]
pub struct TraceOutcome {
    /// Finalized source clusters, in finalization order.
    pub reduced: Vec<ReducedCluster>,
    /// Every seed, split, finalization and exhaustion, in order.
    pub events: Vec<TraceEvent>,
    /// Lineages still active where tracing stopped. Not finalized.
    pub active: Vec<Lineage>,
    pub stop: StopReason,
    pub stats: TraceStats,
}

impl TraceOutcome {
    fn new(stop: StopReason) -> Self {
        Self {
            reduced: Vec::new(),
            events: Vec::new(),
            active: Vec::new(),
            stop,
            stats: TraceStats::default(),
        }
    }

    /// True if no source cluster was found.
    pub fn is_empty(&self) -> bool {
        self.reduced.is_empty()
    }
}

/// Decision for one lineage at one threshold.
#[derive(Debug, PartialEq)]
enum LineageStep {
    Continue(Vec<NodeId>),
    Split(Vec<Vec<NodeId>>),
    Finalize(FinalizeReason),
}

/// The reentry tracer over an immutable activated graph.
pub struct Tracer<'g> {
    graph: &'g ActivatedGraph,
    config: TraceConfig,
    cancel: CancelFlag,
}

impl<'g> Tracer<'g> {
    pub fn new(graph: &'g ActivatedGraph, config: TraceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            graph,
            config,
            cancel: CancelFlag::new(),
        })
    }

    /// Stop between thresholds once `flag` is raised.
    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Trace from the latest threshold of `schedule` down to its first.
    pub fn trace<S: ClusterStore>(
        &self,
        schedule: &ThresholdSchedule,
        store: &mut S,
    ) -> Result<TraceOutcome> {
        self.check_schedule(schedule)?;
        let Some(last) = schedule.last() else {
            info!("activation range shorter than one step, nothing to trace");
            return Ok(TraceOutcome::new(StopReason::EmptySchedule));
        };

        let mut outcome = TraceOutcome::new(StopReason::NoSeeds);
        let t = Timer::start();
        let seeds = self.seed(last);
        outcome.stats.timings.seed += t.elapsed();

        info!(threshold = last, seeds = seeds.len(), "seeded trace");
        for lineage in &seeds {
            let event = TraceEvent::Seeded {
                lineage: lineage.name.clone(),
                size: lineage.len(),
                threshold: last,
            };
            self.record(store, &mut outcome, event)?;
        }

        let t = Timer::start();
        store.write_snapshot(last, &seeds)?;
        outcome.stats.timings.store += t.elapsed();

        if seeds.is_empty() {
            return Ok(outcome);
        }
        self.descend(schedule.descending_pairs(), last, store, outcome)
    }

    /// Continue an interrupted trace from the snapshot written at `from`.
    pub fn resume<S: ClusterStore>(
        &self,
        schedule: &ThresholdSchedule,
        store: &mut S,
        from: Threshold,
    ) -> Result<TraceOutcome> {
        self.check_schedule(schedule)?;
        let pairs = schedule.descending_pairs_below(from).ok_or_else(|| {
            TraceError::InvalidConfig(format!("threshold {from} is not in the schedule"))
        })?;
        info!(threshold = from, "resuming trace");
        let outcome = TraceOutcome::new(StopReason::AllFinalized { threshold: from });
        self.descend(pairs, from, store, outcome)
    }

    fn check_schedule(&self, schedule: &ThresholdSchedule) -> Result<()> {
        if schedule.step() != self.config.step {
            return Err(TraceError::InvalidConfig(format!(
                "schedule step {} does not match configured step {}",
                schedule.step(),
                self.config.step
            )));
        }
        Ok(())
    }

    /// Large components among all nodes activated before `threshold`.
    fn seed(&self, threshold: Threshold) -> Vec<Lineage> {
        let members = self.graph.activated_before(threshold);
        let mut scratch = ComponentScratch::new(self.graph.num_nodes());
        components_larger_than(self.graph, &members, self.config.size_threshold, &mut scratch)
            .into_iter()
            .enumerate()
            .map(|(i, comp)| Lineage::new(LineageName::root(i), self.to_ids(&comp)))
            .collect()
    }

    fn descend<S, I>(
        &self,
        pairs: I,
        start: Threshold,
        store: &mut S,
        mut outcome: TraceOutcome,
    ) -> Result<TraceOutcome>
    where
        S: ClusterStore,
        I: Iterator<Item = (Threshold, Threshold)>,
    {
        let mut last_written = start;
        for (threshold, previous) in pairs {
            if self.cancel.is_cancelled() {
                info!(resume_from = last_written, "trace cancelled");
                outcome.stop = StopReason::Cancelled {
                    resume_from: last_written,
                };
                outcome.active = store.read_snapshot(last_written)?;
                return Ok(outcome);
            }

            let t = Timer::start();
            let lineages = store.read_snapshot(previous)?;
            outcome.stats.timings.store += t.elapsed();
            check_disjoint(&lineages, previous)?;

            let t = Timer::start();
            let steps = self.resolve_all(&lineages, threshold, previous)?;
            outcome.stats.timings.resolve += t.elapsed();
            outcome.stats.thresholds_processed += 1;
            outcome.stats.lineages_resolved += lineages.len();

            let mut survivors = Vec::with_capacity(lineages.len());
            for (lineage, step) in lineages.into_iter().zip(steps) {
                match step {
                    LineageStep::Continue(nodes) => {
                        debug!(lineage = %lineage.name, threshold, size = nodes.len(), "continues");
                        survivors.push(Lineage::new(lineage.name, nodes));
                    }
                    LineageStep::Split(parts) => {
                        let children: Vec<Lineage> = parts
                            .into_iter()
                            .enumerate()
                            .map(|(i, nodes)| Lineage::new(lineage.name.child(i), nodes))
                            .collect();
                        let event = TraceEvent::Split {
                            parent: lineage.name,
                            children: children.iter().map(|c| (c.name.clone(), c.len())).collect(),
                            threshold,
                        };
                        info!(%event, "split");
                        outcome.stats.splits += 1;
                        self.record(store, &mut outcome, event)?;
                        survivors.extend(children);
                    }
                    LineageStep::Finalize(reason) => {
                        self.finalize(store, &mut outcome, lineage, previous, reason)?;
                    }
                }
            }

            if survivors.is_empty() {
                info!(threshold, "all lineages finalized");
                outcome.stop = StopReason::AllFinalized { threshold };
                return Ok(outcome);
            }

            let t = Timer::start();
            store.write_snapshot(threshold, &survivors)?;
            outcome.stats.timings.store += t.elapsed();
            last_written = threshold;
            info!(threshold, active = survivors.len(), "threshold done");
            outcome.active = survivors;
        }

        if outcome.active.is_empty() {
            // Nothing below `start` to process: the seeds (or the resumed
            // snapshot) are still active.
            outcome.active = store.read_snapshot(start)?;
        }
        let event = TraceEvent::Exhausted {
            active: outcome.active.len(),
            threshold: last_written,
        };
        info!(%event, "schedule exhausted");
        self.record(store, &mut outcome, event)?;
        outcome.stop = StopReason::ScheduleExhausted {
            threshold: last_written,
        };
        Ok(outcome)
    }

    fn finalize<S: ClusterStore>(
        &self,
        store: &mut S,
        outcome: &mut TraceOutcome,
        lineage: Lineage,
        last_threshold: Threshold,
        reason: FinalizeReason,
    ) -> Result<()> {
        let event = TraceEvent::Finalized {
            lineage: lineage.name.clone(),
            size: lineage.len(),
            threshold: last_threshold,
            reason,
        };
        info!(%event, surviving = reason.surviving(), "finalized");

        let t = Timer::start();
        store.append_reduced(&lineage.name, &lineage.nodes, lineage.len(), last_threshold)?;
        outcome.stats.timings.store += t.elapsed();

        self.record(store, outcome, event)?;
        outcome.stats.finalized += 1;
        outcome.reduced.push(ReducedCluster {
            name: lineage.name,
            nodes: lineage.nodes,
            last_threshold,
        });
        Ok(())
    }

    fn record<S: ClusterStore>(
        &self,
        store: &mut S,
        outcome: &mut TraceOutcome,
        event: TraceEvent,
    ) -> Result<()> {
        let t = Timer::start();
        for line in event.meta_lines() {
            store.append_meta(&line, event.threshold())?;
        }
        outcome.stats.timings.store += t.elapsed();
        outcome.events.push(event);
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn resolve_all(
        &self,
        lineages: &[Lineage],
        threshold: Threshold,
        previous: Threshold,
    ) -> Result<Vec<LineageStep>> {
        use rayon::prelude::*;

        // One contiguous chunk per worker, so each allocates a single scratch.
        let n = self.graph.num_nodes();
        let chunk = lineages.len().div_ceil(rayon::current_num_threads()).max(1);
        let per_chunk: Vec<Vec<LineageStep>> = lineages
            .par_chunks(chunk)
            .map(|part| {
                let mut scratch = ComponentScratch::new(n);
                part.iter()
                    .map(|lineage| self.resolve(lineage, threshold, previous, &mut scratch))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<_>>()?;
        Ok(per_chunk.into_iter().flatten().collect())
    }

    #[cfg(not(feature = "parallel"))]
    fn resolve_all(
        &self,
        lineages: &[Lineage],
        threshold: Threshold,
        previous: Threshold,
    ) -> Result<Vec<LineageStep>> {
        let mut scratch = ComponentScratch::new(self.graph.num_nodes());
        lineages
            .iter()
            .map(|lineage| self.resolve(lineage, threshold, previous, &mut scratch))
            .collect()
    }

    /// Restrict one lineage to nodes activated before `threshold` and decide its fate.
    fn resolve(
        &self,
        lineage: &Lineage,
        threshold: Threshold,
        previous: Threshold,
        scratch: &mut ComponentScratch,
    ) -> Result<LineageStep> {
        let mut members = Vec::with_capacity(lineage.len());
        for &id in &lineage.nodes {
            let index = self.graph.graph().index_of(id).ok_or_else(|| {
                TraceError::snapshot(
                    previous,
                    format!("lineage {} names node {id}, which is not in the mesh", lineage.name),
                )
            })?;
            if self.graph.time_at(index).is_none() {
                return Err(TraceError::snapshot(
                    previous,
                    format!("lineage {} names node {id}, which never activated", lineage.name),
                ));
            }
            if self.graph.active_before(index, threshold) {
                members.push(index);
            }
        }
        members.sort_unstable();
        members.dedup();

        let surviving = members.len();
        if surviving < self.config.size_threshold {
            return Ok(LineageStep::Finalize(FinalizeReason::TooFewActivated {
                surviving,
            }));
        }

        let mut comps =
            components_larger_than(self.graph, &members, self.config.size_threshold, scratch);
        Ok(match comps.len() {
            0 => LineageStep::Finalize(FinalizeReason::Fragmented { surviving }),
            1 => LineageStep::Continue(self.to_ids(&comps.swap_remove(0))),
            _ => LineageStep::Split(comps.iter().map(|c| self.to_ids(c)).collect()),
        })
    }

    fn to_ids(&self, indices: &[u32]) -> Vec<NodeId> {
        let mesh = self.graph.graph();
        indices.iter().map(|&i| mesh.node_id(i)).collect()
    }
}

/// Every node of a snapshot must belong to exactly one lineage, once.
fn check_disjoint(lineages: &[Lineage], threshold: Threshold) -> Result<()> {
    let mut seen = FxHashSet::default();
    for lineage in lineages {
        for &id in &lineage.nodes {
            if !seen.insert(id) {
                return Err(TraceError::snapshot(
                    threshold,
                    format!("node {id} appears twice (in lineage {})", lineage.name),
                ));
            }
        }
    }
    Ok(())
}
