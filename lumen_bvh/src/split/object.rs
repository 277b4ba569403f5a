// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binned SAH object split over reference centroids.

use super::{Accum, BinGrid, SplitCandidate, SplitKind};
use crate::arena::{RefArena, RefRange};
use crate::cost::CostModel;
use crate::types::{Axis, BBox};

/// Bounds of the centroids of the references in `range`.
pub(crate) fn centroid_bounds(arena: &RefArena, range: RefRange) -> BBox {
    arena
        .get(range)
        .iter()
        .fold(BBox::EMPTY, |mut acc, r| {
            acc.extend_point(arena.centroid(r.id));
            acc
        })
}

/// Scratch space for object binning, reused across nodes and builds.
#[derive(Debug, Default)]
pub(crate) struct ObjectBinner {
    bins: Vec<Accum>,
    suffix: Vec<Accum>,
}

impl ObjectBinner {
    /// Cheapest object split over all three axes.
    ///
    /// Ties keep the lowest axis, then the lowest boundary.
    pub(crate) fn best<C: CostModel + ?Sized>(
        &mut self,
        arena: &RefArena,
        range: RefRange,
        centroids: &BBox,
        bins: usize,
        cost: &C,
    ) -> Option<SplitCandidate> {
        let mut best: Option<SplitCandidate> = None;
        for axis in Axis::ALL {
            if let Some(c) = self.best_on_axis(arena, range, centroids, axis, bins, cost) {
                best = Some(match best {
                    Some(b) => b.cheaper(Some(c)),
                    None => c,
                });
            }
        }
        best
    }

    /// Cheapest object split along `axis`, or `None` when the centroids do not spread
    /// along it.
    pub(crate) fn best_on_axis<C: CostModel + ?Sized>(
        &mut self,
        arena: &RefArena,
        range: RefRange,
        centroids: &BBox,
        axis: Axis,
        bins: usize,
        cost: &C,
    ) -> Option<SplitCandidate> {
        let a = axis.index();
        let grid = BinGrid::new(centroids.min[a], centroids.max[a], bins)?;

        self.bins.clear();
        self.bins.resize(grid.bins(), Accum::default());
        for r in arena.get(range) {
            let bin = &mut self.bins[grid.index(arena.centroid(r.id)[a])];
            bin.bbox.extend(&r.bbox);
            bin.count += 1;
        }

        // suffix[s] accumulates bins s..n.
        self.suffix.clear();
        self.suffix.resize(grid.bins(), Accum::default());
        let mut acc = Accum::default();
        for s in (0..grid.bins()).rev() {
            acc.bbox.extend(&self.bins[s].bbox);
            acc.count += self.bins[s].count;
            self.suffix[s] = acc;
        }

        let mut best: Option<SplitCandidate> = None;
        let mut left = Accum::default();
        for s in 1..grid.bins() {
            left.bbox.extend(&self.bins[s - 1].bbox);
            left.count += self.bins[s - 1].count;
            let right = self.suffix[s];
            if left.count == 0 || right.count == 0 {
                continue;
            }
            let c = cost.leaf_cost(left.count, left.bbox.half_area())
                + cost.leaf_cost(right.count, right.bbox.half_area());
            if best.is_none_or(|b| c < b.cost) {
                best = Some(SplitCandidate {
                    kind: SplitKind::Object,
                    axis,
                    position: grid.boundary(s),
                    cost: c,
                    left_bbox: left.bbox,
                    right_bbox: right.bbox,
                    left_count: left.count,
                    right_count: right.count,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::cost::SahCost;
    use crate::primitive::InstanceBounds;

    fn row(n: usize, gap: f32) -> (RefArena, RefRange) {
        let boxes = InstanceBounds::from_boxes((0..n).map(|i| {
            let x = i as f32 * gap;
            BBox::new(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 1.0, 1.0))
        }));
        let mut arena = RefArena::default();
        let seed = arena.seed(&boxes).unwrap();
        (arena, seed.range)
    }

    #[test]
    fn splits_a_row_in_the_middle() {
        let (arena, range) = row(8, 2.0);
        let cb = centroid_bounds(&arena, range);
        let mut binner = ObjectBinner::default();
        let c = binner
            .best(&arena, range, &cb, 32, &SahCost::default())
            .unwrap();
        assert_eq!(c.axis, Axis::X);
        assert_eq!(c.kind, SplitKind::Object);
        assert_eq!((c.left_count, c.right_count), (4, 4));
        assert_eq!(c.left_bbox.max.x, 7.0);
        assert_eq!(c.right_bbox.min.x, 8.0);
        assert!(c.position > 6.5 && c.position <= 8.5);
    }

    #[test]
    fn coincident_centroids_have_no_split() {
        let boxes = InstanceBounds::from_boxes(
            (0..5).map(|_| BBox::new(Vec3::ZERO, Vec3::ONE)),
        );
        let mut arena = RefArena::default();
        let seed = arena.seed(&boxes).unwrap();
        let cb = centroid_bounds(&arena, seed.range);
        let mut binner = ObjectBinner::default();
        assert!(
            binner
                .best(&arena, seed.range, &cb, 16, &SahCost::default())
                .is_none()
        );
    }

    #[test]
    fn counts_match_centroid_threshold() {
        let (arena, range) = row(37, 1.3);
        let cb = centroid_bounds(&arena, range);
        let mut binner = ObjectBinner::default();
        let c = binner
            .best_on_axis(&arena, range, &cb, Axis::X, 7, &SahCost::default())
            .unwrap();
        let below = arena
            .get(range)
            .iter()
            .filter(|r| arena.centroid(r.id).x < c.position)
            .count();
        assert_eq!(below, c.left_count);
        assert_eq!(c.left_count + c.right_count, 37);
    }
}
