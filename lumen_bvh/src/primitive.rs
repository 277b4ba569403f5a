// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive sources the builders read from.
//!
//! - [`TriangleMesh`] and `[Triangle]`: triangles with exact clipping, for bottom-level trees.
//! - [`InstanceBounds`]: precomputed `(bbox, centroid)` pairs, for top-level trees over
//!   instances or any other primitive that only exposes bounds.

use glam::Vec3;

use crate::error::BuildError;
use crate::types::{Axis, BBox};

/// A set of primitives addressed by index `0..primitive_count()`.
pub trait PrimitiveSource {
    /// Number of primitives.
    fn primitive_count(&self) -> usize;

    /// Bounds of primitive `index`.
    fn bbox(&self, index: usize) -> BBox;

    /// Representative point used for object splits. Defaults to the bbox center.
    fn centroid(&self, index: usize) -> Vec3 {
        self.bbox(index).center()
    }

    /// Bounds of the part of primitive `index` lying in the slab
    /// `plane_min <= p[axis] <= plane_max`. Empty if the primitive misses the slab.
    ///
    /// The default intersects the primitive's bbox with the slab, which is conservative.
    /// Sources with real geometry should clip it exactly; tighter clips give better
    /// spatial splits.
    fn clipped_bbox(&self, index: usize, axis: Axis, plane_min: f32, plane_max: f32) -> BBox {
        slab_overlap(self.bbox(index), axis, plane_min, plane_max)
    }
}

fn slab_overlap(mut b: BBox, axis: Axis, plane_min: f32, plane_max: f32) -> BBox {
    let a = axis.index();
    b.min[a] = b.min[a].max(plane_min);
    b.max[a] = b.max[a].min(plane_max);
    b
}

/// A triangle given by its three vertices.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    /// First vertex.
    pub v0: Vec3,
    /// Second vertex.
    pub v1: Vec3,
    /// Third vertex.
    pub v2: Vec3,
}

// Clipping a triangle by two planes adds at most one vertex per plane.
const MAX_CLIP_VERTICES: usize = 9;

#[derive(Clone, Copy)]
struct Polygon {
    points: [Vec3; MAX_CLIP_VERTICES],
    len: usize,
}

impl Polygon {
    fn new() -> Self {
        Self {
            points: [Vec3::ZERO; MAX_CLIP_VERTICES],
            len: 0,
        }
    }

    fn push(&mut self, p: Vec3) {
        debug_assert!(self.len < MAX_CLIP_VERTICES, "clip polygon overflow");
        if self.len < MAX_CLIP_VERTICES {
            self.points[self.len] = p;
            self.len += 1;
        }
    }

    fn points(&self) -> &[Vec3] {
        &self.points[..self.len]
    }

    /// Keep the part where `inside(p[a])` holds; `bound` is the plane coordinate.
    fn clip(&self, a: usize, bound: f32, inside: impl Fn(f32) -> bool) -> Self {
        let mut out = Self::new();
        let pts = self.points();
        for (i, &cur) in pts.iter().enumerate() {
            let next = pts[(i + 1) % pts.len()];
            let cur_in = inside(cur[a]);
            let next_in = inside(next[a]);
            if cur_in {
                out.push(cur);
            }
            if cur_in != next_in {
                let t = (bound - cur[a]) / (next[a] - cur[a]);
                let mut p = cur + (next - cur) * t;
                p[a] = bound;
                out.push(p);
            }
        }
        out
    }
}

impl Triangle {
    /// Create a triangle.
    #[inline]
    pub const fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Bounds of the three vertices.
    #[inline]
    pub fn bbox(&self) -> BBox {
        BBox::new(
            self.v0.min(self.v1).min(self.v2),
            self.v0.max(self.v1).max(self.v2),
        )
    }

    /// Centroid of the three vertices.
    #[inline]
    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Exact bounds of the part of the triangle inside the slab
    /// `plane_min <= p[axis] <= plane_max`.
    ///
    /// Clips the triangle polygon against both planes (Sutherland-Hodgman), so the
    /// result is generally much tighter than the slab cut of the triangle's bbox.
    pub fn clip(&self, axis: Axis, plane_min: f32, plane_max: f32) -> BBox {
        if plane_min > plane_max {
            return BBox::EMPTY;
        }
        let a = axis.index();
        let mut poly = Polygon::new();
        poly.push(self.v0);
        poly.push(self.v1);
        poly.push(self.v2);
        let poly = poly.clip(a, plane_min, |x| x >= plane_min);
        if poly.len == 0 {
            return BBox::EMPTY;
        }
        let poly = poly.clip(a, plane_max, |x| x <= plane_max);
        let clipped = BBox::from_points(poly.points().iter().copied());
        if clipped.is_empty() {
            return clipped;
        }
        // Intersection points can land a rounding step outside the slab.
        slab_overlap(clipped, axis, plane_min, plane_max)
    }
}

impl PrimitiveSource for [Triangle] {
    fn primitive_count(&self) -> usize {
        self.len()
    }

    fn bbox(&self, index: usize) -> BBox {
        self[index].bbox()
    }

    fn centroid(&self, index: usize) -> Vec3 {
        self[index].centroid()
    }

    fn clipped_bbox(&self, index: usize, axis: Axis, plane_min: f32, plane_max: f32) -> BBox {
        self[index].clip(axis, plane_min, plane_max)
    }
}

impl PrimitiveSource for Vec<Triangle> {
    fn primitive_count(&self) -> usize {
        self.as_slice().primitive_count()
    }

    fn bbox(&self, index: usize) -> BBox {
        self.as_slice().bbox(index)
    }

    fn centroid(&self, index: usize) -> Vec3 {
        self.as_slice().centroid(index)
    }

    fn clipped_bbox(&self, index: usize, axis: Axis, plane_min: f32, plane_max: f32) -> BBox {
        self.as_slice()
            .clipped_bbox(index, axis, plane_min, plane_max)
    }
}

/// An indexed triangle mesh.
#[derive(Clone, Debug, Default)]
pub struct TriangleMesh {
    vertices: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create a mesh, checking that every index refers to an existing vertex.
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Result<Self, BuildError> {
        let vertex_count = vertices.len();
        for (triangle, tri) in indices.iter().enumerate() {
            if let Some(&vertex) = tri.iter().find(|&&v| v as usize >= vertex_count) {
                return Err(BuildError::InvalidMesh {
                    triangle,
                    vertex,
                    vertex_count,
                });
            }
        }
        Ok(Self { vertices, indices })
    }

    /// Build a non-indexed mesh, three fresh vertices per triangle.
    pub fn from_triangles(triangles: &[Triangle]) -> Self {
        let mut vertices = Vec::with_capacity(triangles.len() * 3);
        let mut indices = Vec::with_capacity(triangles.len());
        for t in triangles {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Meshes are limited to u32 vertex indices."
            )]
            let base = vertices.len() as u32;
            vertices.extend([t.v0, t.v1, t.v2]);
            indices.push([base, base + 1, base + 2]);
        }
        Self { vertices, indices }
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// The vertex buffer.
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Triangle `index`.
    #[inline]
    pub fn triangle(&self, index: usize) -> Triangle {
        let [a, b, c] = self.indices[index];
        Triangle::new(
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        )
    }

    /// Bounds of the whole mesh.
    pub fn bounds(&self) -> BBox {
        (0..self.triangle_count()).fold(BBox::EMPTY, |acc, i| acc.union(&self.triangle(i).bbox()))
    }
}

impl PrimitiveSource for TriangleMesh {
    fn primitive_count(&self) -> usize {
        self.triangle_count()
    }

    fn bbox(&self, index: usize) -> BBox {
        self.triangle(index).bbox()
    }

    fn centroid(&self, index: usize) -> Vec3 {
        self.triangle(index).centroid()
    }

    fn clipped_bbox(&self, index: usize, axis: Axis, plane_min: f32, plane_max: f32) -> BBox {
        self.triangle(index).clip(axis, plane_min, plane_max)
    }
}

/// Precomputed bounds and centroids, e.g. the world-space bounds of mesh instances.
///
/// Clipping falls back to the conservative slab cut of the bbox.
#[derive(Clone, Debug, Default)]
pub struct InstanceBounds {
    entries: Vec<(BBox, Vec3)>,
}

impl InstanceBounds {
    /// Create from `(bbox, centroid)` pairs.
    pub fn new(entries: Vec<(BBox, Vec3)>) -> Self {
        Self { entries }
    }

    /// Create from boxes, using each box center as its centroid.
    pub fn from_boxes(boxes: impl IntoIterator<Item = BBox>) -> Self {
        Self {
            entries: boxes.into_iter().map(|b| (b, b.center())).collect(),
        }
    }

    /// Append an entry.
    pub fn push(&mut self, bbox: BBox, centroid: Vec3) {
        self.entries.push((bbox, centroid));
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PrimitiveSource for InstanceBounds {
    fn primitive_count(&self) -> usize {
        self.entries.len()
    }

    fn bbox(&self, index: usize) -> BBox {
        self.entries[index].0
    }

    fn centroid(&self, index: usize) -> Vec3 {
        self.entries[index].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32, z: f32) -> Vec3 {
        Vec3::new(x, y, z)
    }

    #[test]
    fn clip_is_tighter_than_bbox_slab() {
        // Right triangle in the xy-plane; the hypotenuse runs from (4,0) to (0,4).
        let t = Triangle::new(v(0.0, 0.0, 0.0), v(4.0, 0.0, 0.0), v(0.0, 4.0, 0.0));
        let clipped = t.clip(Axis::X, 3.0, 4.0);
        assert_eq!(clipped.min, v(3.0, 0.0, 0.0));
        assert_eq!(clipped.max, v(4.0, 1.0, 0.0));

        let conservative = slab_overlap(t.bbox(), Axis::X, 3.0, 4.0);
        assert_eq!(conservative.max.y, 4.0);
    }

    #[test]
    fn clip_outside_slab_is_empty() {
        let t = Triangle::new(v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0));
        assert!(t.clip(Axis::X, 2.0, 3.0).is_empty());
        assert!(t.clip(Axis::Y, -3.0, -1.0).is_empty());
        assert!(t.clip(Axis::X, 1.0, 0.0).is_empty());
    }

    #[test]
    fn clip_covering_slab_returns_triangle_bbox() {
        let t = Triangle::new(v(0.0, 1.0, 2.0), v(3.0, -1.0, 0.5), v(1.0, 2.0, -2.0));
        assert_eq!(t.clip(Axis::Z, -10.0, 10.0), t.bbox());
    }

    #[test]
    fn clip_stays_within_slab_and_bbox() {
        let t = Triangle::new(v(0.1, 0.3, 0.7), v(9.3, 1.7, -2.2), v(4.4, 8.8, 3.3));
        for axis in Axis::ALL {
            let a = axis.index();
            let lo = t.bbox().min[a] + 0.37;
            let hi = lo + 1.13;
            let c = t.clip(axis, lo, hi);
            assert!(!c.is_empty());
            assert!(c.min[a] >= lo && c.max[a] <= hi);
            assert!(t.bbox().contains_box(&c, 1e-5));
        }
    }

    #[test]
    fn mesh_rejects_out_of_range_index() {
        let err = TriangleMesh::new(vec![Vec3::ZERO; 3], vec![[0, 1, 2], [0, 3, 1]]).unwrap_err();
        assert_eq!(
            err,
            BuildError::InvalidMesh {
                triangle: 1,
                vertex: 3,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn mesh_matches_triangle_soup() {
        let tris = [
            Triangle::new(v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0)),
            Triangle::new(v(2.0, 2.0, 2.0), v(3.0, 2.0, 2.0), v(2.0, 3.0, 5.0)),
        ];
        let mesh = TriangleMesh::from_triangles(&tris);
        assert_eq!(mesh.primitive_count(), 2);
        assert_eq!(mesh.vertices().len(), 6);
        for i in 0..2 {
            assert_eq!(mesh.bbox(i), tris.as_slice().bbox(i));
            assert_eq!(mesh.centroid(i), tris[i].centroid());
        }
        assert_eq!(mesh.bounds(), BBox::new(v(0.0, 0.0, 0.0), v(3.0, 3.0, 5.0)));
    }

    #[test]
    fn instance_bounds_use_slab_clip() {
        let b = BBox::new(v(0.0, 0.0, 0.0), v(4.0, 4.0, 4.0));
        let inst = InstanceBounds::new(vec![(b, v(1.0, 1.0, 1.0))]);
        assert_eq!(inst.centroid(0), v(1.0, 1.0, 1.0));
        let c = inst.clipped_bbox(0, Axis::Y, 1.0, 2.0);
        assert_eq!(c, BBox::new(v(0.0, 1.0, 0.0), v(4.0, 2.0, 4.0)));
        assert!(inst.clipped_bbox(0, Axis::Y, 5.0, 6.0).is_empty());
    }
}
