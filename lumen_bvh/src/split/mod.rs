// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Split evaluation.
//!
//! - `object`: binned SAH sweep over reference centroids.
//! - `spatial`: binned SAH sweep over the node bounds with exact primitive clipping.
//!
//! Both sweeps bin along one axis, then run a right-to-left pass accumulating suffix
//! bounds and counts followed by a left-to-right pass that evaluates
//!
//! `cost(s) = leaf_cost(left_count, area(LB_s)) + leaf_cost(right_count, area(RB_s))`
//!
//! at every interior bin boundary `s`, keeping the cheapest non-empty one.

pub(crate) mod object;
pub(crate) mod spatial;

use crate::types::{Axis, BBox};

/// Which partitioner realizes a candidate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SplitKind {
    /// References go left iff their centroid is below `position`.
    Object,
    /// Plane at `position`; straddling references are clipped or unsplit.
    Spatial,
}

/// One proposed split of a node.
///
/// `cost` is `leaf_cost(left_count, left_bbox) + leaf_cost(right_count, right_bbox)` as
/// evaluated by the sweep. Counts are never zero.
#[derive(Copy, Clone, Debug)]
pub(crate) struct SplitCandidate {
    pub(crate) kind: SplitKind,
    pub(crate) axis: Axis,
    pub(crate) position: f32,
    pub(crate) cost: f64,
    pub(crate) left_bbox: BBox,
    pub(crate) right_bbox: BBox,
    pub(crate) left_count: usize,
    pub(crate) right_count: usize,
}

impl SplitCandidate {
    /// Keep whichever of `self` and `other` is cheaper; `self` wins ties.
    pub(crate) fn cheaper(self, other: Option<Self>) -> Self {
        match other {
            Some(o) if o.cost < self.cost => o,
            _ => self,
        }
    }
}

/// Uniform bins over `[lo, hi]` with exact boundary positions.
///
/// `index(c) < s` holds exactly when `c < boundary(s)`, so a partition that compares
/// against `boundary(s)` reproduces the counts a sweep recorded for boundary `s`.
#[derive(Copy, Clone, Debug)]
pub(crate) struct BinGrid {
    lo: f32,
    hi: f32,
    step: f32,
    scale: f32,
    bins: usize,
}

impl BinGrid {
    /// `None` when the range is degenerate.
    pub(crate) fn new(lo: f32, hi: f32, bins: usize) -> Option<Self> {
        if hi <= lo || bins < 2 {
            return None;
        }
        let step = (hi - lo) / bins as f32;
        if step <= 0.0 || !step.is_finite() {
            return None;
        }
        Some(Self {
            lo,
            hi,
            step,
            scale: bins as f32 / (hi - lo),
            bins,
        })
    }

    #[inline]
    pub(crate) fn bins(&self) -> usize {
        self.bins
    }

    /// Coordinate of the boundary below bin `i`.
    #[inline]
    pub(crate) fn boundary(&self, i: usize) -> f32 {
        self.lo + i as f32 * self.step
    }

    /// Whether boundary `s` lies strictly inside the range, i.e. can separate anything.
    #[inline]
    pub(crate) fn is_interior(&self, s: usize) -> bool {
        let p = self.boundary(s);
        p > self.lo && p < self.hi
    }

    /// Bin holding coordinate `c`, clamped to the grid.
    #[inline]
    pub(crate) fn index(&self, c: f32) -> usize {
        let last = self.bins - 1;
        let f = ((c - self.lo) * self.scale).floor();
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Only reached for 0 < f < bins - 1."
        )]
        let mut i = if f <= 0.0 {
            0
        } else if f >= last as f32 {
            last
        } else {
            f as usize
        };
        // The floor estimate can be off by one next to a boundary; settle it against the
        // boundary positions themselves.
        while i > 0 && c < self.boundary(i) {
            i -= 1;
        }
        while i < last && c >= self.boundary(i + 1) {
            i += 1;
        }
        i
    }
}

/// Running bounds and count, used by both sweeps.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Accum {
    pub(crate) bbox: BBox,
    pub(crate) count: usize,
}
