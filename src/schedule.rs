//! Descending time cut-points for the tracer.

use crate::activation::ActivationIndex;
use crate::error::{Result, TraceError};
use crate::types::Threshold;

/// Thresholds `floor(min_time) + k * step` strictly below `floor(max_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdSchedule {
    start: Threshold,
    len: usize,
    step: Threshold,
}

impl ThresholdSchedule {
    pub fn new(min_time: f64, max_time: f64, step: Threshold) -> Result<Self> {
        if step <= 0 {
            return Err(TraceError::InvalidConfig(format!(
                "threshold step must be positive, got {step}"
            )));
        }
        if !min_time.is_finite() || !max_time.is_finite() {
            return Err(TraceError::InvalidConfig(format!(
                "activation bounds must be finite, got [{min_time}, {max_time}]"
            )));
        }
        let start = min_time.floor() as Threshold;
        let end = max_time.floor() as Threshold;
        let span = end.checked_sub(start).ok_or_else(|| {
            TraceError::InvalidConfig(format!(
                "activation range [{min_time}, {max_time}] is too wide to schedule"
            ))
        })?;
        let len = if span > 0 {
            (span as u64).div_ceil(step as u64) as usize
        } else {
            0
        };
        Ok(Self { start, len, step })
    }

    /// Schedule spanning the activation table's time range.
    pub fn from_index(index: &ActivationIndex, step: Threshold) -> Result<Self> {
        Self::new(index.min_time(), index.max_time(), step)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn step(&self) -> Threshold {
        self.step
    }

    #[inline]
    pub fn get(&self, k: usize) -> Option<Threshold> {
        (k < self.len).then(|| self.start + k as Threshold * self.step)
    }

    #[inline]
    pub fn first(&self) -> Option<Threshold> {
        self.get(0)
    }

    #[inline]
    pub fn last(&self) -> Option<Threshold> {
        self.len.checked_sub(1).and_then(|k| self.get(k))
    }

    /// Position of `threshold` in the ascending series.
    pub fn position(&self, threshold: Threshold) -> Option<usize> {
        let offset = threshold.checked_sub(self.start)?;
        if offset < 0 || offset % self.step != 0 {
            return None;
        }
        let k = (offset / self.step) as usize;
        (k < self.len).then_some(k)
    }

    /// Ascending thresholds.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Threshold> + '_ {
        (0..self.len).map(move |k| self.start + k as Threshold * self.step)
    }

    /// `(current, previous)` pairs from the second-to-last threshold down to
    /// the first, with `previous = current + step`.
    pub fn descending_pairs(&self) -> impl Iterator<Item = (Threshold, Threshold)> + '_ {
        self.pairs_below(self.len.saturating_sub(1))
    }

    /// Like [`descending_pairs`](Self::descending_pairs), starting just below
    /// `threshold`. `None` if `threshold` is not in the schedule.
    pub fn descending_pairs_below(
        &self,
        threshold: Threshold,
    ) -> Option<impl Iterator<Item = (Threshold, Threshold)> + '_> {
        self.position(threshold).map(|k| self.pairs_below(k))
    }

    fn pairs_below(&self, k: usize) -> impl Iterator<Item = (Threshold, Threshold)> + '_ {
        (0..k).rev().map(move |i| {
            let current = self.start + i as Threshold * self.step;
            (current, current + self.step)
        })
    }
}
