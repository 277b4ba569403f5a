// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synthetic scenes and helpers shared by the `lumen_bvh` demos.

use glam::Vec3;
use lumen_bvh::{BuildStats, Triangle, TriangleMesh};
use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Small deterministic generator so every run builds the same scene.
#[derive(Clone, Debug)]
pub struct Rng(u32);

impl Rng {
    /// Create a generator; a zero seed is replaced by a fixed non-zero one.
    pub fn new(seed: u32) -> Self {
        Self(if seed == 0 { 0x9e37_79b9 } else { seed })
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        (self.0 >> 8) as f32 / (1 << 24) as f32
    }

    /// Point in `[0, scale)^3`.
    pub fn point(&mut self, scale: f32) -> Vec3 {
        Vec3::new(self.next_f32(), self.next_f32(), self.next_f32()) * scale
    }
}

/// Clusters of small triangles joined by a few long diagonal slivers.
///
/// The slivers overlap everything, which is where spatial splits pay off.
pub fn sliver_scene(clusters: usize, per_cluster: usize, slivers: usize, seed: u32) -> Vec<Triangle> {
    let mut rng = Rng::new(seed);
    let mut tris = Vec::with_capacity(clusters * per_cluster + slivers);
    for _ in 0..clusters {
        let center = rng.point(200.0);
        for _ in 0..per_cluster {
            let p = center + rng.point(8.0);
            tris.push(Triangle::new(p, p + rng.point(1.0), p + rng.point(1.0)));
        }
    }
    for _ in 0..slivers {
        let a = rng.point(200.0);
        let b = rng.point(200.0);
        tris.push(Triangle::new(a, b, b + Vec3::splat(0.5)));
    }
    tris
}

/// A `cells x cells` height field mesh with `2 * cells^2` triangles.
pub fn terrain(cells: u32, seed: u32) -> TriangleMesh {
    let mut rng = Rng::new(seed);
    let side = cells + 1;
    let vertices: Vec<Vec3> = (0..side * side)
        .map(|i| Vec3::new((i % side) as f32, rng.next_f32() * 4.0, (i / side) as f32))
        .collect();
    let mut indices = Vec::with_capacity((2 * cells * cells) as usize);
    for z in 0..cells {
        for x in 0..cells {
            let v = z * side + x;
            indices.push([v, v + 1, v + side]);
            indices.push([v + 1, v + side + 1, v + side]);
        }
    }
    // Indices are in range by construction.
    TriangleMesh::new(vertices, indices).unwrap_or_default()
}

/// One line summary of a build.
pub fn describe(stats: &BuildStats) -> String {
    format!(
        "{} nodes, {} leaves, depth {}, {} object / {} spatial splits, {} duplicates, {:.2?}",
        stats.nodes,
        stats.leaves,
        stats.max_depth,
        stats.object_splits,
        stats.spatial_splits,
        stats.duplicated_references,
        stats.elapsed,
    )
}
