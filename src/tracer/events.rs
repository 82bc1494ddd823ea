//! Structured events emitted while tracing.

use std::fmt;

use crate::types::{LineageName, Threshold};

/// Why a lineage stopped being traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeReason {
    /// Fewer than the size threshold of its nodes activated before the cut.
    TooFewActivated { surviving: usize },
    /// Enough nodes survived, but no connected piece of them is large enough.
    Fragmented { surviving: usize },
}

impl FinalizeReason {
    /// Nodes of the lineage activated before the cut that finalized it.
    pub fn surviving(&self) -> usize {
        match *self {
            FinalizeReason::TooFewActivated { surviving }
            | FinalizeReason::Fragmented { surviving } => surviving,
        }
    }
}

/// One step in the life of a lineage.
///
/// Read backward in time: a [`Split`](TraceEvent::Split) at `t` means the
/// child waves merge into the parent after `t`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A top-level lineage found at the latest threshold.
    Seeded {
        lineage: LineageName,
        size: usize,
        threshold: Threshold,
    },
    /// A lineage broke into several large components at `threshold`.
    Split {
        parent: LineageName,
        children: Vec<(LineageName, usize)>,
        threshold: Threshold,
    },
    /// A lineage was emitted as a source cluster; `threshold` is the last one
    /// at which it was valid.
    Finalized {
        lineage: LineageName,
        size: usize,
        threshold: Threshold,
        reason: FinalizeReason,
    },
    /// The schedule ran out while lineages were still active.
    Exhausted { active: usize, threshold: Threshold },
}

impl TraceEvent {
    pub fn threshold(&self) -> Threshold {
        match *self {
            TraceEvent::Seeded { threshold, .. }
            | TraceEvent::Split { threshold, .. }
            | TraceEvent::Finalized { threshold, .. }
            | TraceEvent::Exhausted { threshold, .. } => threshold,
        }
    }

    /// Lines for the human-readable metadata log. Splits log one line per child.
    pub fn meta_lines(&self) -> Vec<String> {
        match self {
            TraceEvent::Split {
                children,
                threshold,
                ..
            } => children
                .iter()
                .map(|(child, size)| {
                    format!(
                        "Last appearance at {threshold} before merge of activation wave {child} of size {size}"
                    )
                })
                .collect(),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Seeded {
                lineage,
                size,
                threshold,
            } => write!(f, "Activation {lineage} of size {size} present at {threshold}"),
            TraceEvent::Split {
                parent,
                children,
                threshold,
            } => {
                write!(f, "Activation {parent} splits at {threshold} into")?;
                for (child, size) in children {
                    write!(f, " {child} ({size})")?;
                }
                Ok(())
            }
            TraceEvent::Finalized {
                lineage,
                size,
                threshold,
                ..
            } => write!(f, "Activation {lineage} of size {size} appears in {threshold}"),
            TraceEvent::Exhausted { active, threshold } => write!(
                f,
                "Trace reached first threshold {threshold} with {active} active activation waves"
            ),
        }
    }
}
