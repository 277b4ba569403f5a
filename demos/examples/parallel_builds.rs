// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parallel builds.
//!
//! Build one split BVH per mesh on its own thread, then a binned top-level tree over
//! the mesh bounds, and reduce the per-build stats.
//!
//! Run:
//! - `cargo run -p lumen_demos --example parallel_builds`

use std::thread;

use glam::Vec3;
use lumen_bvh::{
    BBox, BinnedBuilder, BuildConfig, BuildStats, Bvh, BvhWriter, InstanceBounds, SbvhBuilder,
    TriangleMesh,
};
use lumen_demos::{describe, init_logging, terrain};
use tracing::info;

fn build_mesh(mesh: &TriangleMesh, config: &BuildConfig) -> (Bvh, BuildStats) {
    // Builders are not shared between threads; each one owns its scratch buffers.
    let mut builder = SbvhBuilder::new(config.clone()).unwrap();
    let mut writer = BvhWriter::new();
    let stats = builder.build(mesh, &mut writer).unwrap();
    (writer.finish().unwrap(), stats)
}

fn main() {
    init_logging();

    let meshes: Vec<TriangleMesh> = (0..8).map(|i| terrain(32 + 8 * i, i + 1)).collect();
    let config = &BuildConfig::default().with_arity(4).with_leaf_threshold(4);

    let built: Vec<(Bvh, BuildStats)> = thread::scope(|scope| {
        let handles: Vec<_> = meshes
            .iter()
            .map(|mesh| scope.spawn(move || build_mesh(mesh, config)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // Lay the meshes out on a line and index their world-space bounds.
    let mut instances = InstanceBounds::default();
    let mut offset = 0.0;
    for (bvh, _) in &built {
        let local = bvh.bounds();
        let shift = Vec3::new(offset - local.min.x, 0.0, 0.0);
        let world = BBox::new(local.min + shift, local.max + shift);
        instances.push(world, world.center());
        offset += local.extent().x + 4.0;
    }

    let mut top = BinnedBuilder::new(BuildConfig::default().with_arity(4)).unwrap();
    let mut writer = BvhWriter::new();
    let top_stats = top.build(&instances, &mut writer).unwrap();
    let top_tree = writer.finish().unwrap();
    top_tree.validate().unwrap();

    for (i, (_, stats)) in built.iter().enumerate() {
        info!(mesh = i, triangles = meshes[i].triangle_count(), "built");
        println!("mesh {i}: {}", describe(stats));
    }
    let total: BuildStats = built.iter().map(|(_, s)| s).sum();
    println!("all meshes: {}", describe(&total));
    println!("top level: {}", describe(&top_stats));

    let probe = BBox::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 5.0, 1.0));
    println!("instances under probe: {:?}", top_tree.query_box(&probe));
}
