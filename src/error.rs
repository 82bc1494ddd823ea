//! Error types for reentry tracing.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Threshold;

/// Errors that abort a trace.
///
/// Conditions the tracer treats as normal are not represented here: skipped
/// element lines are counted in [`crate::mesh::ElementTable`], nodes without an
/// activation time in [`crate::activation::AttachReport`], and an empty seed set
/// is reported as [`crate::StopReason::NoSeeds`].
#[derive(Debug, Error)]
pub enum TraceError {
    /// Reading or writing an input/output file failed.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A row of the activation table is not a `(node id, time)` pair.
    #[error("malformed activation row at line {line}: {content:?}")]
    MalformedActivationRow { line: usize, content: String },

    /// The activation table contains no rows at all.
    #[error("activation table is empty")]
    EmptyActivationTable,

    /// The snapshot handed over from a previous threshold is missing or corrupt.
    #[error("cannot read snapshot for threshold {threshold}: {reason}")]
    SnapshotRead { threshold: Threshold, reason: String },

    /// Rejected trace parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TraceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TraceError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn snapshot(threshold: Threshold, reason: impl Into<String>) -> Self {
        TraceError::SnapshotRead {
            threshold,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TraceError>;
