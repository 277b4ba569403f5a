// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene stats.
//!
//! Build the same scenes with both builders and compare tree quality.
//!
//! Run:
//! - `cargo run -p lumen_demos --example scene_stats`
//! - `RUST_LOG=lumen_bvh=debug cargo run -p lumen_demos --example scene_stats`

use lumen_bvh::{
    BinnedBuilder, BuildConfig, BuildStats, Bvh, BvhWriter, PrimitiveSource, SahCost, SbvhBuilder,
    SplitKinds,
};
use lumen_demos::{describe, init_logging, sliver_scene, terrain};

fn sbvh<P: PrimitiveSource + ?Sized>(prims: &P, config: &BuildConfig) -> (Bvh, BuildStats) {
    let mut builder = SbvhBuilder::new(config.clone()).unwrap();
    let mut writer = BvhWriter::new();
    let stats = builder.build(prims, &mut writer).unwrap();
    (writer.finish().unwrap(), stats)
}

fn binned<P: PrimitiveSource + ?Sized>(prims: &P, config: &BuildConfig) -> (Bvh, BuildStats) {
    let mut builder = BinnedBuilder::new(config.clone()).unwrap();
    let mut writer = BvhWriter::new();
    let stats = builder.build(prims, &mut writer).unwrap();
    (writer.finish().unwrap(), stats)
}

fn report(name: &str, prims: &(impl PrimitiveSource + ?Sized), config: &BuildConfig) {
    let cost = SahCost::default();
    println!("{name} ({} primitives)", prims.primitive_count());
    for (label, (bvh, stats)) in [("sbvh  ", sbvh(prims, config)), ("binned", binned(prims, config))] {
        bvh.validate().unwrap();
        println!("  {label} sah {:>10.2}  {}", bvh.sah_cost(&cost), describe(&stats));
    }
}

fn main() {
    init_logging();

    let slivers = sliver_scene(64, 200, 40, 7);
    let ground = terrain(96, 11);

    let binary = BuildConfig::default();
    report("slivers, binary", slivers.as_slice(), &binary);
    report("terrain, binary", &ground, &binary);

    let wide = BuildConfig::default().with_arity(4).with_leaf_threshold(4);
    report("slivers, 4-wide", slivers.as_slice(), &wide);

    let no_spatial = BuildConfig::default().with_splits(SplitKinds::OBJECT);
    report("slivers, spatial splits off", slivers.as_slice(), &no_spatial);
}
