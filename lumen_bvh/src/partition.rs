// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Realizing a chosen split on the reference arena.
//!
//! Both partitioners re-derive the child counts from the references and compare them
//! with what the sweep recorded. A mismatch is reported as [`BuildError::Invariant`].

use crate::arena::{RefArena, RefRange};
use crate::cost::CostModel;
use crate::error::BuildError;
use crate::primitive::PrimitiveSource;
use crate::split::SplitCandidate;
use crate::stack::WorkItem;
use crate::types::{Axis, BBox, Reference};

/// Children produced by a partition.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Children {
    pub(crate) left: WorkItem,
    pub(crate) right: WorkItem,
    pub(crate) duplicated: usize,
}

/// Reorder `item`'s references in place: centroids below the plane first.
pub(crate) fn object(
    arena: &mut RefArena,
    item: &WorkItem,
    cand: &SplitCandidate,
) -> Result<Children, BuildError> {
    let a = cand.axis.index();
    let (refs, centroids) = arena.get_mut_with_centroids(item.range);
    let mut i = 0;
    let mut j = refs.len();
    while i < j {
        if centroids[refs[i].index()][a] < cand.position {
            i += 1;
        } else {
            j -= 1;
            refs.swap(i, j);
        }
    }
    if i != cand.left_count || refs.len() - i != cand.right_count {
        return Err(BuildError::Invariant(
            "object partition disagrees with binned counts",
        ));
    }
    let depth = item.depth + 1;
    let mid = item.range.begin + i;
    Ok(Children {
        left: WorkItem::new(RefRange::new(item.range.begin, mid), cand.left_bbox, depth),
        right: WorkItem::new(RefRange::new(mid, item.range.end), cand.right_bbox, depth),
        duplicated: 0,
    })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Straddle {
    UnsplitLeft,
    UnsplitRight,
    Duplicate,
}

/// Part of `r` between `lo` and `hi` on `axis`, never empty and never outside `r.bbox`
/// or the slab.
///
/// When clipping finds nothing (the primitive only touches the plane within rounding),
/// the reference's bounds flattened onto `plane` stand in.
fn half<P: PrimitiveSource + ?Sized>(
    prims: &P,
    r: &Reference,
    axis: Axis,
    lo: f32,
    hi: f32,
    plane: f32,
) -> BBox {
    let a = axis.index();
    let mut piece = prims.clipped_bbox(r.index(), axis, lo, hi).overlap(&r.bbox);
    piece.min[a] = piece.min[a].max(lo);
    piece.max[a] = piece.max[a].min(hi);
    if !piece.is_empty() {
        return piece;
    }
    let mut flat = r.bbox;
    flat.min[a] = plane;
    flat.max[a] = plane;
    flat
}

/// Split `item` at the candidate's plane.
///
/// References entirely below the plane go left, references at or above it go right.
/// Each straddling reference is decided on its own, in order, by the cheapest of:
///
/// - unsplit left: the whole reference goes left,
/// - unsplit right: the whole reference goes right,
/// - duplicate: the reference is clipped to both halves and goes to both children.
///
/// Ties prefer the order above. An unsplit is only considered while the other side
/// still holds another reference, and only if afterwards at least one child still
/// stops short of the node bounds on the split axis, so the split always makes
/// progress. Duplicated halves for the right child are appended to the arena as a
/// new range.
pub(crate) fn spatial<P, C>(
    prims: &P,
    arena: &mut RefArena,
    item: &WorkItem,
    cand: &SplitCandidate,
    cost: &C,
    duplicates: &mut Vec<Reference>,
) -> Result<Children, BuildError>
where
    P: PrimitiveSource + ?Sized,
    C: CostModel + ?Sized,
{
    let axis = cand.axis;
    let a = axis.index();
    let plane = cand.position;
    let node_lo = item.bbox.min[a];
    let node_hi = item.bbox.max[a];
    let refs = arena.get_mut(item.range);
    let n = refs.len();

    // [0, l) left only, [l, i) straddling, [r, n) right only.
    let mut l = 0;
    let mut i = 0;
    let mut r = n;
    while i < r {
        let b = refs[i].bbox;
        if b.max[a] < plane {
            refs.swap(i, l);
            l += 1;
            i += 1;
        } else if b.min[a] >= plane {
            r -= 1;
            refs.swap(i, r);
        } else {
            i += 1;
        }
    }
    let straddling = r - l;
    if l + straddling != cand.left_count || (n - r) + straddling != cand.right_count {
        return Err(BuildError::Invariant(
            "spatial classification disagrees with binned counts",
        ));
    }

    // Decisions are costed against the swept bounds. Children are bounded by the exact
    // union of the references they end up holding, which the sweep's clipped pieces
    // only approximate.
    let leaf = |count: usize, b: &BBox| cost.leaf_cost(count, b.half_area());
    let mut lb = cand.left_bbox;
    let mut rb = cand.right_bbox;
    let mut nl = cand.left_count;
    let mut nr = cand.right_count;
    let mut left_bounds = refs[..l].iter().fold(BBox::EMPTY, |b, x| b.union(&x.bbox));
    let mut right_bounds = refs[r..].iter().fold(BBox::EMPTY, |b, x| b.union(&x.bbox));
    duplicates.clear();

    let mut j = l;
    while j < r {
        let reference = refs[j];
        let full = reference.bbox;
        let lpart = half(prims, &reference, axis, full.min[a], plane, plane);
        let rpart = half(prims, &reference, axis, plane, full.max[a], plane);

        let mut choice = None;
        let mut best = f64::INFINITY;
        let lb_full = lb.union(&full);
        let left_full = left_bounds.union(&full);
        if nr > 1 && (left_full.max[a] < node_hi || right_bounds.min[a] > node_lo) {
            let c = leaf(nl, &lb_full) + leaf(nr - 1, &rb);
            if c < best {
                best = c;
                choice = Some(Straddle::UnsplitLeft);
            }
        }
        let rb_full = rb.union(&full);
        let right_full = right_bounds.union(&full);
        if nl > 1 && (right_full.min[a] > node_lo || left_bounds.max[a] < node_hi) {
            let c = leaf(nl - 1, &lb) + leaf(nr, &rb_full);
            if c < best {
                best = c;
                choice = Some(Straddle::UnsplitRight);
            }
        }
        let lb_dup = lb.union(&lpart);
        let rb_dup = rb.union(&rpart);
        let c = leaf(nl, &lb_dup) + leaf(nr, &rb_dup);
        if c < best || choice.is_none() {
            choice = Some(Straddle::Duplicate);
        }

        match choice {
            Some(Straddle::UnsplitLeft) => {
                lb = lb_full;
                left_bounds = left_full;
                nr -= 1;
                j += 1;
            }
            Some(Straddle::UnsplitRight) => {
                rb = rb_full;
                right_bounds = right_full;
                nl -= 1;
                r -= 1;
                refs.swap(j, r);
            }
            _ => {
                lb = lb_dup;
                rb = rb_dup;
                left_bounds.extend(&lpart);
                right_bounds.extend(&rpart);
                refs[j].bbox = lpart;
                duplicates.push(Reference::new(reference.id, rpart));
                j += 1;
            }
        }
    }

    if r != nl || n - r + duplicates.len() != nr {
        return Err(BuildError::Invariant(
            "spatial partition disagrees with straddler decisions",
        ));
    }

    let depth = item.depth + 1;
    let mid = item.range.begin + r;
    let left_range = RefRange::new(item.range.begin, mid);
    let right_range = if duplicates.is_empty() {
        RefRange::new(mid, item.range.end)
    } else {
        arena.append(RefRange::new(mid, item.range.end), duplicates, depth)?
    };
    Ok(Children {
        left: WorkItem::new(left_range, left_bounds, depth),
        right: WorkItem::new(right_range, right_bounds, depth),
        duplicated: duplicates.len(),
    })
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::cost::SahCost;
    use crate::primitive::Triangle;
    use crate::split::SplitKind;
    use crate::split::object::{ObjectBinner, centroid_bounds};
    use crate::split::spatial::SpatialBinner;

    fn seeded<P: PrimitiveSource + ?Sized>(prims: &P) -> (RefArena, WorkItem) {
        let mut arena = RefArena::default();
        let seed = arena.seed(prims).unwrap();
        (arena, WorkItem::new(seed.range, seed.bbox, 0))
    }

    fn tri_at(x: f32) -> Triangle {
        Triangle::new(
            Vec3::new(x, 0.0, 0.0),
            Vec3::new(x + 1.0, 0.0, 0.0),
            Vec3::new(x, 1.0, 0.0),
        )
    }

    #[test]
    fn object_partition_matches_candidate() {
        let tris: Vec<Triangle> = (0..10).map(|i| tri_at(i as f32 * 3.0)).collect();
        let (mut arena, item) = seeded(&tris);
        let cb = centroid_bounds(&arena, item.range);
        let cand = ObjectBinner::default()
            .best(&arena, item.range, &cb, 16, &SahCost::default())
            .unwrap();
        let kids = object(&mut arena, &item, &cand).unwrap();
        assert_eq!(kids.left.len(), cand.left_count);
        assert_eq!(kids.right.len(), cand.right_count);
        assert_eq!(kids.left.depth, 1);
        for r in arena.get(kids.left.range) {
            assert!(kids.left.bbox.contains_box(&r.bbox, 0.0));
        }
        for r in arena.get(kids.right.range) {
            assert!(kids.right.bbox.contains_box(&r.bbox, 0.0));
        }
    }

    #[test]
    fn object_partition_rejects_stale_candidate() {
        let tris: Vec<Triangle> = (0..4).map(|i| tri_at(i as f32 * 3.0)).collect();
        let (mut arena, item) = seeded(&tris);
        let cb = centroid_bounds(&arena, item.range);
        let mut cand = ObjectBinner::default()
            .best(&arena, item.range, &cb, 8, &SahCost::default())
            .unwrap();
        cand.left_count += 1;
        assert!(matches!(
            object(&mut arena, &item, &cand),
            Err(BuildError::Invariant(_))
        ));
    }

    #[test]
    fn spatial_partition_conserves_and_contains() {
        let mut tris = vec![Triangle::new(
            Vec3::ZERO,
            Vec3::new(100.0, 100.0, 100.0),
            Vec3::new(100.0, 100.0, 99.0),
        )];
        tris.extend((0..6).map(|i| tri_at(i as f32 * 0.7)));
        let (mut arena, item) = seeded(&tris);
        let cost = SahCost::default();
        let cand = SpatialBinner::default()
            .best(&tris, &arena, &item, 32, &cost)
            .unwrap();
        assert_eq!(cand.kind, SplitKind::Spatial);
        let mut dups = Vec::new();
        let kids = spatial(&tris, &mut arena, &item, &cand, &cost, &mut dups).unwrap();

        assert_eq!(kids.left.len() + kids.right.len(), tris.len() + kids.duplicated);
        assert!(
            kids.left.bbox.shrinks_within(&item.bbox) || kids.right.bbox.shrinks_within(&item.bbox)
        );
        let mut seen = vec![0_usize; tris.len()];
        for kid in [kids.left, kids.right] {
            assert!(item.bbox.contains_box(&kid.bbox, 0.0));
            for r in arena.get(kid.range) {
                assert!(kid.bbox.contains_box(&r.bbox, 0.0));
                assert!(tris[r.index()].bbox().contains_box(&r.bbox, 0.0));
                seen[r.index()] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c >= 1));
        assert_eq!(seen.iter().sum::<usize>(), tris.len() + kids.duplicated);
    }

    #[test]
    fn unsplit_needs_a_reference_left_on_the_other_side() {
        // One straddler and nothing else on the right: it cannot be unsplit left.
        let tris = [
            tri_at(0.0),
            tri_at(0.5),
            Triangle::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(9.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0)),
        ];
        let (mut arena, item) = seeded(tris.as_slice());
        let cand = SplitCandidate {
            kind: SplitKind::Spatial,
            axis: Axis::X,
            position: 4.0,
            cost: 0.0,
            left_bbox: BBox::new(Vec3::ZERO, Vec3::new(4.0, 1.0, 0.0)),
            right_bbox: BBox::new(Vec3::new(4.0, 0.0, 0.0), Vec3::new(9.0, 0.625, 0.0)),
            left_count: 3,
            right_count: 1,
        };
        let mut dups = Vec::new();
        let kids = spatial(
            tris.as_slice(),
            &mut arena,
            &item,
            &cand,
            &SahCost::default(),
            &mut dups,
        )
        .unwrap();
        assert_eq!(kids.right.len(), 1);
        assert_eq!(kids.duplicated, 1);
        assert_eq!(kids.left.len(), 3);
        let right = arena.get(kids.right.range)[0];
        assert_eq!(right.id, 2);
        assert_eq!(right.bbox.min.x, 4.0);
    }

    #[test]
    fn children_are_bounded_by_the_references_they_hold() {
        let tris = [
            tri_at(0.0),
            tri_at(0.5),
            Triangle::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(9.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0)),
            tri_at(6.0),
        ];
        let (mut arena, item) = seeded(tris.as_slice());
        // Swept bounds a little short of the references, as rounding in the sweep leaves them.
        let cand = SplitCandidate {
            kind: SplitKind::Spatial,
            axis: Axis::X,
            position: 4.0,
            cost: 0.0,
            left_bbox: BBox::new(Vec3::new(0.001, 0.001, 0.0), Vec3::new(3.999, 0.999, 0.0)),
            right_bbox: BBox::new(Vec3::new(4.001, 0.001, 0.0), Vec3::new(8.999, 0.999, 0.0)),
            left_count: 3,
            right_count: 2,
        };
        let mut dups = Vec::new();
        let kids = spatial(
            tris.as_slice(),
            &mut arena,
            &item,
            &cand,
            &SahCost::default(),
            &mut dups,
        )
        .unwrap();
        for kid in [kids.left, kids.right] {
            let held = arena
                .get(kid.range)
                .iter()
                .fold(BBox::EMPTY, |b, r| b.union(&r.bbox));
            assert_eq!(kid.bbox, held);
            assert!(item.bbox.contains_box(&kid.bbox, 0.0));
        }
        assert_eq!(kids.left.bbox.min, Vec3::ZERO);
        assert_eq!(kids.right.bbox.max, Vec3::new(9.0, 1.0, 0.0));
    }
}
