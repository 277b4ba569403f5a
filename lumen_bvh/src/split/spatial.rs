// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binned SAH spatial split.
//!
//! Bins cover the node bounds. Each reference is clipped into every bin it spans, so
//! the bin bounds hold only the parts of primitives actually inside them. A reference
//! is counted once as an entry in its first bin and once as an exit in its last bin;
//! at boundary `s` the left count is the entries below `s` and the right count the
//! exits at or above `s`, which counts straddlers on both sides.

use super::{BinGrid, SplitCandidate, SplitKind};
use crate::arena::RefArena;
use crate::cost::CostModel;
use crate::primitive::PrimitiveSource;
use crate::stack::WorkItem;
use crate::types::{Axis, BBox};

#[derive(Copy, Clone, Debug, Default)]
struct SpatialBin {
    bbox: BBox,
    entries: usize,
    exits: usize,
}

/// Scratch space for spatial binning, reused across nodes and builds.
#[derive(Debug, Default)]
pub(crate) struct SpatialBinner {
    bins: Vec<SpatialBin>,
    // (bounds, exits) of bins s..n.
    suffix: Vec<(BBox, usize)>,
}

impl SpatialBinner {
    /// Cheapest spatial split of `item` over all three axes.
    ///
    /// Ties keep the lowest axis, then the lowest plane.
    pub(crate) fn best<P, C>(
        &mut self,
        prims: &P,
        arena: &RefArena,
        item: &WorkItem,
        bins: usize,
        cost: &C,
    ) -> Option<SplitCandidate>
    where
        P: PrimitiveSource + ?Sized,
        C: CostModel + ?Sized,
    {
        let mut best: Option<SplitCandidate> = None;
        for axis in Axis::ALL {
            if let Some(c) = self.best_on_axis(prims, arena, item, axis, bins, cost) {
                best = Some(match best {
                    Some(b) => b.cheaper(Some(c)),
                    None => c,
                });
            }
        }
        best
    }

    fn best_on_axis<P, C>(
        &mut self,
        prims: &P,
        arena: &RefArena,
        item: &WorkItem,
        axis: Axis,
        bins: usize,
        cost: &C,
    ) -> Option<SplitCandidate>
    where
        P: PrimitiveSource + ?Sized,
        C: CostModel + ?Sized,
    {
        let a = axis.index();
        let grid = BinGrid::new(item.bbox.min[a], item.bbox.max[a], bins)?;

        self.bins.clear();
        self.bins.resize(grid.bins(), SpatialBin::default());
        for r in arena.get(item.range) {
            let first = grid.index(r.bbox.min[a]);
            let last = grid.index(r.bbox.max[a]);
            if first == last {
                self.bins[first].bbox.extend(&r.bbox);
            } else {
                for b in first..=last {
                    let lo = if b == first { r.bbox.min[a] } else { grid.boundary(b) };
                    let hi = if b == last {
                        r.bbox.max[a]
                    } else {
                        grid.boundary(b + 1)
                    };
                    let piece = prims
                        .clipped_bbox(r.index(), axis, lo, hi)
                        .overlap(&r.bbox);
                    if !piece.is_empty() {
                        self.bins[b].bbox.extend(&piece);
                    }
                }
            }
            self.bins[first].entries += 1;
            self.bins[last].exits += 1;
        }

        self.suffix.clear();
        self.suffix.resize(grid.bins(), (BBox::EMPTY, 0));
        let mut acc = (BBox::EMPTY, 0);
        for s in (0..grid.bins()).rev() {
            acc.0.extend(&self.bins[s].bbox);
            acc.1 += self.bins[s].exits;
            self.suffix[s] = acc;
        }

        let mut best: Option<SplitCandidate> = None;
        let mut left_bbox = BBox::EMPTY;
        let mut left_count = 0;
        for s in 1..grid.bins() {
            left_bbox.extend(&self.bins[s - 1].bbox);
            left_count += self.bins[s - 1].entries;
            let (right_bbox, right_count) = self.suffix[s];
            if left_count == 0 || right_count == 0 || !grid.is_interior(s) {
                continue;
            }
            let c = cost.leaf_cost(left_count, left_bbox.half_area())
                + cost.leaf_cost(right_count, right_bbox.half_area());
            if best.is_none_or(|b| c < b.cost) {
                best = Some(SplitCandidate {
                    kind: SplitKind::Spatial,
                    axis,
                    position: grid.boundary(s),
                    cost: c,
                    left_bbox,
                    right_bbox,
                    left_count,
                    right_count,
                });
            }
        }
        best
    }
}
