//! Non-overlapping interval store with touch-merge semantics.
//!
//! `[a,b)` and `[b,c)` are considered touching and merge into `[a,c)`,
//! not just strict overlaps. The store always keeps its intervals sorted
//! by `lo`, so `add` is the only operation that does real work.

use crate::error::{Error, Result};

#[derive(Debug, Default, Clone)]
pub struct IntervalStore {
    intervals: Vec<(usize, usize)>,
}

impl IntervalStore {
    pub fn new() -> Self {
        IntervalStore {
            intervals: Vec::new(),
        }
    }

    /// Inserts `[lo, hi)`, then merges all touching/overlapping intervals.
    ///
    /// Rejects an empty or inverted range as `Error::InvariantViolation`:
    /// per spec, an invariant violation surfaces to the caller through the
    /// normal `Result` channel rather than panicking the process.
    pub fn add(&mut self, lo: usize, hi: usize) -> Result<()> {
        if hi <= lo {
            return Err(Error::InvariantViolation(format!(
                "interval store rejects empty/inverted range [{lo}, {hi})"
            )));
        }
        let pos = self.intervals.partition_point(|&(l, _)| l < lo);
        self.intervals.insert(pos, (lo, hi));
        self.merge();
        Ok(())
    }

    fn merge(&mut self) {
        if self.intervals.is_empty() {
            return;
        }
        self.intervals.sort_by_key(|&(l, _)| l);
        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(self.intervals.len());
        for &(lo, hi) in &self.intervals {
            match merged.last_mut() {
                Some((_, last_hi)) if lo <= *last_hi => {
                    *last_hi = (*last_hi).max(hi);
                }
                _ => merged.push((lo, hi)),
            }
        }
        self.intervals = merged;
    }

    pub fn count(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Drains the store, yielding `[lo,hi)` pairs sorted ascending by `lo`.
    pub fn drain_sorted(&mut self) -> Vec<(usize, usize)> {
        std::mem::take(&mut self.intervals)
    }
}
