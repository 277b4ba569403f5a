// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

use glam::Vec3;

/// One of the three coordinate axes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The x axis.
    X,
    /// The y axis.
    Y,
    /// The z axis.
    Z,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    /// Index of the axis, usable to index a [`Vec3`].
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// Axis-aligned bounding box in 3D.
///
/// The canonical empty box is `min = +inf`, `max = -inf`, so that extending it with any
/// box or point yields that box or point. A box is empty iff `min > max` on any axis; a box
/// with `min == max` on some axis is flat but not empty.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BBox {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Default for BBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BBox {
    /// The empty box, identity element of [`BBox::union`].
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a box from min/max corners.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// A degenerate box containing exactly one point.
    #[inline]
    pub const fn from_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Smallest box containing every point of the iterator. Empty for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut acc, p| {
            acc.extend_point(p);
            acc
        })
    }

    /// Return true if the box is empty (inverted on some axis). Assumes no NaN.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Grow this box to contain `other`.
    #[inline]
    pub fn extend(&mut self, other: &Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Grow this box to contain the point.
    #[inline]
    pub fn extend_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// The union of two boxes.
    #[inline]
    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        self.extend(other);
        self
    }

    /// The intersection of two boxes. Empty when they do not overlap.
    #[inline]
    #[must_use]
    pub fn overlap(&self, other: &Self) -> Self {
        Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    /// Half of the surface area; `0` for an empty box.
    ///
    /// Evaluated in `f64`: the area of a box with finite `f32` corners always fits.
    #[inline]
    pub fn half_area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.max.as_dvec3() - self.min.as_dvec3();
        d.x * d.y + d.y * d.z + d.z * d.x
    }

    /// Box extent along each axis.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    /// Axes sorted by decreasing extent; ties keep `x < y < z` order.
    pub fn axes_by_extent(&self) -> [Axis; 3] {
        let e = self.extent();
        let mut axes = Axis::ALL;
        axes.sort_by(|a, b| e[b.index()].total_cmp(&e[a.index()]));
        axes
    }

    /// The axis with the largest extent.
    #[inline]
    pub fn longest_axis(&self) -> Axis {
        self.axes_by_extent()[0]
    }

    /// Whether `other` lies inside this box, allowing `eps` slack on every face.
    pub fn contains_box(&self, other: &Self, eps: f32) -> bool {
        if other.is_empty() {
            return true;
        }
        other.min.cmpge(self.min - Vec3::splat(eps)).all()
            && other.max.cmple(self.max + Vec3::splat(eps)).all()
    }

    /// Whether every coordinate of the box is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Whether this box is strictly smaller than `outer` on at least one face.
    ///
    /// Used as the progress test for spatial splits: a child that shrinks on some face
    /// cannot be identical to its parent.
    pub(crate) fn shrinks_within(&self, outer: &Self) -> bool {
        self.min.cmpgt(outer.min).any() || self.max.cmplt(outer.max).any()
    }
}

/// One entry of the reference buffer: a primitive id with its current bounds.
///
/// Object splits only permute references. Spatial splits may shrink a reference's
/// `bbox` to the part on one side of the plane and duplicate the reference into the
/// other child with the same `id`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Reference {
    /// Index of the primitive in its source.
    pub id: u32,
    /// Current (possibly clipped) bounds.
    pub bbox: BBox,
}

impl Reference {
    /// Create a reference.
    #[inline]
    pub const fn new(id: u32, bbox: BBox) -> Self {
        Self { id, bbox }
    }

    /// Primitive id as an index.
    #[inline]
    pub const fn index(&self) -> usize {
        self.id as usize
    }
}
