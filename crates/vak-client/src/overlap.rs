// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Overlap consensus over authority intervals.
//!
//! Each verified response contributes one interval that should contain the
//! true time (or, in the session, the true clock correction). Intervals are
//! stored as a sorted list of start and end edges. A sweep from the left
//! finds the first point covered by `k` intervals, a sweep from the right
//! the last such point; if they do not cross, `[first, last]` is the overlap
//! of `k` sources.
//!
//! [`OverlapAlgorithm::find_best_overlap`] tries `k = sources` first and
//! relaxes one source at a time, so a minority of wrong authorities costs
//! support but never moves the answer outside the majority's agreement.
//!
//! ```
//! use vak_client::overlap::OverlapAlgorithm;
//!
//! let mut algo = OverlapAlgorithm::new();
//! algo.add_interval(0, 10).unwrap();
//! algo.add_interval(5, 15).unwrap();
//! algo.add_interval(8, 20).unwrap();
//! let best = algo.find_best_overlap().unwrap();
//! assert_eq!((best.lo, best.hi, best.support), (8, 10, 3));
//! ```

use std::fmt;

/// Which end of an interval an edge marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chime {
    /// Lower bound; entering the interval.
    Start,
    /// Upper bound; leaving the interval.
    End,
}

impl Chime {
    /// `-1` for a start, `+1` for an end.
    pub const fn value(self) -> i32 {
        match self {
            Chime::Start => -1,
            Chime::End => 1,
        }
    }
}

/// One interval endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Position of the endpoint.
    pub value: i64,
    /// Whether the interval starts or ends here.
    pub chime: Chime,
}

/// An interval agreed on by `support` sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overlap {
    /// Lower bound.
    pub lo: i64,
    /// Upper bound.
    pub hi: i64,
    /// Number of sources whose intervals contain `[lo, hi]`.
    pub support: usize,
}

impl Overlap {
    /// `hi - lo`.
    pub fn width(&self) -> u64 {
        self.hi.abs_diff(self.lo)
    }

    /// Midpoint, rounded toward zero. Exact for any pair of `i64` bounds.
    pub fn midpoint(&self) -> i64 {
        i64::midpoint(self.lo, self.hi)
    }
}

/// An interval whose upper bound is below its lower bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidInterval {
    /// Rejected lower bound.
    pub lo: i64,
    /// Rejected upper bound.
    pub hi: i64,
}

impl fmt::Display for InvalidInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interval upper bound {} below lower bound {}", self.hi, self.lo)
    }
}

impl std::error::Error for InvalidInterval {}

/// Accumulates intervals and finds the tightest overlap of the most sources.
///
/// Append-only: intervals cannot be removed, only the whole engine dropped.
#[derive(Clone, Debug, Default)]
pub struct OverlapAlgorithm {
    edges: Vec<Edge>,
    sources: usize,
}

impl OverlapAlgorithm {
    /// An engine with no intervals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the interval `[lo, hi]`.
    ///
    /// Edges equal to existing ones are placed after them, so among touching
    /// intervals the earlier-added one wins the tie.
    pub fn add_interval(&mut self, lo: i64, hi: i64) -> Result<(), InvalidInterval> {
        if hi < lo {
            return Err(InvalidInterval { lo, hi });
        }
        self.push_interval(lo, hi);
        Ok(())
    }

    /// Caller guarantees `lo <= hi`.
    pub(crate) fn push_interval(&mut self, lo: i64, hi: i64) {
        debug_assert!(lo <= hi);
        self.insert(Edge {
            value: lo,
            chime: Chime::Start,
        });
        self.insert(Edge {
            value: hi,
            chime: Chime::End,
        });
        self.sources += 1;
    }

    fn insert(&mut self, edge: Edge) {
        let at = self.edges.partition_point(|e| e.value <= edge.value);
        self.edges.insert(at, edge);
    }

    /// Number of intervals added.
    pub fn len(&self) -> usize {
        self.sources
    }

    /// `true` before the first interval.
    pub fn is_empty(&self) -> bool {
        self.sources == 0
    }

    /// All edges in sweep order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// The overlap of exactly `support` sources, if one exists.
    pub fn overlap_at(&self, support: usize) -> Option<Overlap> {
        if support == 0 || support > self.sources {
            return None;
        }
        let target = support as i64;

        let mut depth = 0i64;
        let lo = self.edges.iter().find_map(|e| {
            depth -= i64::from(e.chime.value());
            (depth >= target).then_some(e.value)
        })?;

        let mut depth = 0i64;
        let hi = self.edges.iter().rev().find_map(|e| {
            depth += i64::from(e.chime.value());
            (depth >= target).then_some(e.value)
        })?;

        (lo <= hi).then_some(Overlap { lo, hi, support })
    }

    /// The overlap with the largest support, relaxing from all sources down
    /// to one. `None` when no interval has been added.
    pub fn find_best_overlap(&self) -> Option<Overlap> {
        (1..=self.sources)
            .rev()
            .find_map(|support| self.overlap_at(support))
    }
}
