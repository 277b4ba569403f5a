// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lumen BVH: bounding volume hierarchy construction for ray tracing.
//!
//! Builds a BVH over triangles (or any [`PrimitiveSource`]) and streams it to a
//! [`BvhSink`] in depth-first pre-order, so the caller decides the final memory layout.
//!
//! - [`SbvhBuilder`]: split BVH. Binned SAH object splits, plus spatial splits that clip
//!   triangles against a plane and either duplicate straddling references or keep them
//!   whole on one side, whichever is cheaper. Produces high quality trees for static
//!   geometry.
//! - [`BinnedBuilder`]: binned SAH object splits only, longest axis first. Fast enough to
//!   rebuild every frame, e.g. for a top-level tree over instances.
//!
//! Both builders can emit wide nodes (up to [`MAX_ARITY`] children) by collapsing
//! binary splits, run from an explicit, bounded work stack, and keep their references
//! in an arena that is reused across builds.
//!
//! # Example
//!
//! ```rust
//! use glam::Vec3;
//! use lumen_bvh::{BuildConfig, BvhWriter, SbvhBuilder, Triangle};
//!
//! // A long diagonal triangle over a small cluster: a case spatial splits handle well.
//! let mut tris = vec![Triangle::new(
//!     Vec3::ZERO,
//!     Vec3::new(100.0, 100.0, 100.0),
//!     Vec3::new(100.0, 100.0, 99.0),
//! )];
//! for i in 0..50 {
//!     let p = Vec3::new((i % 5) as f32, (i / 5 % 5) as f32, (i / 25) as f32);
//!     tris.push(Triangle::new(p, p + Vec3::X * 0.5, p + Vec3::Y * 0.5));
//! }
//!
//! let mut builder = SbvhBuilder::new(BuildConfig::default().with_arity(4))?;
//! let mut writer = BvhWriter::new();
//! let stats = builder.build(&tris, &mut writer)?;
//! let bvh = writer.finish()?;
//!
//! bvh.validate()?;
//! assert!(stats.spatial_splits > 0);
//! assert!(bvh.nodes().iter().all(|n| n.children.len() <= 4));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Cost model
//!
//! Split decisions use a [`CostModel`]; [`SahCost`] is the classic surface area
//! heuristic. A split is taken only when
//! `cost(left) + cost(right) + traversal_cost(node) < leaf_cost(node)`.
//!
//! ## Errors
//!
//! Builds fail with a [`BuildError`] on empty input, invalid parameters, or non-finite
//! primitive bounds before doing any work, and with [`BuildError::ResourceExhausted`]
//! when the work stack or the reference arena hits its configured limit.
//!
//! ## Logging
//!
//! Builds emit [`tracing`] events: one `debug` event at the start and end of each build,
//! one `trace` event per split, and a `warn` event when the root cannot be split.

pub mod builders;
pub mod config;
pub mod cost;
pub mod error;
pub mod primitive;
pub mod sink;
pub mod stats;
pub mod tree;
pub mod types;

mod arena;
mod multi_node;
mod partition;
mod split;
mod stack;

pub use builders::{BinnedBuilder, SbvhBuilder};
pub use config::{BuildConfig, MAX_ARITY, SplitKinds};
pub use cost::{CostModel, SahCost};
pub use error::{BuildError, Resource};
pub use primitive::{InstanceBounds, PrimitiveSource, Triangle, TriangleMesh};
pub use sink::BvhSink;
pub use stats::BuildStats;
pub use tree::{Bvh, BvhWriter, Child, ChildRef, Leaf, Node, TreeError};
pub use types::{Axis, BBox, Reference};

pub use glam::Vec3;

#[cfg(test)]
mod tests {
    use super::*;

    fn soup(n: usize) -> Vec<Triangle> {
        let mut state = 0x2545_f491_u32;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state % 10_000) as f32 / 100.0
        };
        (0..n)
            .map(|_| {
                let p = Vec3::new(next(), next(), next());
                let q = p + Vec3::new(next(), next(), next()) * 0.05;
                let r = p + Vec3::new(next(), next(), next()) * 0.05;
                Triangle::new(p, q, r)
            })
            .collect()
    }

    #[test]
    fn both_builders_cover_every_primitive() {
        let tris = soup(300);
        let config = BuildConfig::default().with_arity(4).with_leaf_threshold(4);

        let mut sbvh = SbvhBuilder::new(config.clone()).unwrap();
        let mut w = BvhWriter::new();
        let s1 = sbvh.build(&tris, &mut w).unwrap();
        let a = w.finish().unwrap();

        let mut binned = BinnedBuilder::new(config).unwrap();
        let mut w = BvhWriter::new();
        let s2 = binned.build(&tris, &mut w).unwrap();
        let b = w.finish().unwrap();

        for (bvh, stats) in [(&a, &s1), (&b, &s2)] {
            bvh.validate().unwrap();
            assert_eq!(bvh.leaves().len(), stats.leaves);
            assert_eq!(bvh.nodes().len(), stats.nodes);
            assert_eq!(bvh.depth(), stats.max_depth);
            let mut seen = vec![false; tris.len()];
            for r in bvh.references() {
                seen[r.index()] = true;
            }
            assert!(seen.iter().all(|&s| s));
        }
        assert_eq!(s2.leaf_references, tris.len());
        assert_eq!(s1.leaf_references, tris.len() + s1.duplicated_references);
    }

    #[test]
    fn mesh_and_soup_build_the_same_tree() {
        let tris = soup(64);
        let mesh = TriangleMesh::from_triangles(&tris);
        let mut builder = SbvhBuilder::new(BuildConfig::default()).unwrap();
        let mut from_soup = BvhWriter::new();
        builder.build(tris.as_slice(), &mut from_soup).unwrap();
        let mut from_mesh = BvhWriter::new();
        builder.build(&mesh, &mut from_mesh).unwrap();
        assert_eq!(from_soup.finish().unwrap(), from_mesh.finish().unwrap());
    }
}
