// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::Vec3;
use lumen_bvh::{
    BBox, BinnedBuilder, BuildConfig, BvhSink, InstanceBounds, Reference, SbvhBuilder, SplitKinds,
    Triangle,
};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn next_f32(&mut self) -> f32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        (x >> 40) as f32 / (1u64 << 24) as f32
    }

    fn point(&mut self, scale: f32) -> Vec3 {
        Vec3::new(self.next_f32(), self.next_f32(), self.next_f32()) * scale
    }
}

fn gen_soup(count: usize, long_every: usize, seed: u64) -> Vec<Triangle> {
    let mut rng = Rng(seed);
    (0..count)
        .map(|i| {
            let a = rng.point(100.0);
            let spread = if long_every != 0 && i % long_every == 0 { 60.0 } else { 1.0 };
            Triangle::new(a, a + rng.point(spread), a + rng.point(spread))
        })
        .collect()
}

fn gen_instances(n: usize) -> InstanceBounds {
    InstanceBounds::from_boxes((0..n * n).map(|i| {
        let p = Vec3::new((i % n) as f32 * 3.0, 0.0, (i / n) as f32 * 3.0);
        BBox::new(p, p + Vec3::new(2.0, 1.0, 2.0))
    }))
}

/// Counts what it is given so the optimizer cannot drop the build.
#[derive(Default)]
struct CountSink {
    nodes: usize,
    refs: usize,
}

impl BvhSink for CountSink {
    fn write_node(&mut self, _bbox: &BBox, children: &[BBox]) {
        self.nodes += children.len();
    }

    fn write_leaf(&mut self, _bbox: &BBox, refs: &[Reference]) {
        self.refs += refs.len();
    }
}

fn bench_triangles(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_triangles");
    for &count in &[1_000_usize, 10_000, 50_000] {
        let tris = gen_soup(count, 20, 0x1234_5678);
        group.throughput(Throughput::Elements(count as u64));

        let mut sbvh = SbvhBuilder::new(BuildConfig::default()).unwrap();
        group.bench_function(format!("sbvh/{count}"), |b| {
            b.iter(|| {
                let mut sink = CountSink::default();
                sbvh.build(tris.as_slice(), &mut sink).unwrap();
                black_box((sink.nodes, sink.refs));
            });
        });

        let mut object_only =
            SbvhBuilder::new(BuildConfig::default().with_splits(SplitKinds::OBJECT)).unwrap();
        group.bench_function(format!("sbvh_object_only/{count}"), |b| {
            b.iter(|| {
                let mut sink = CountSink::default();
                object_only.build(tris.as_slice(), &mut sink).unwrap();
                black_box((sink.nodes, sink.refs));
            });
        });

        let mut binned = BinnedBuilder::new(BuildConfig::default()).unwrap();
        group.bench_function(format!("binned/{count}"), |b| {
            b.iter(|| {
                let mut sink = CountSink::default();
                binned.build(tris.as_slice(), &mut sink).unwrap();
                black_box((sink.nodes, sink.refs));
            });
        });
    }
    group.finish();
}

fn bench_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_wide");
    let tris = gen_soup(10_000, 20, 0xdead_beef);
    for &arity in &[2_usize, 4, 8] {
        let config = BuildConfig::default().with_arity(arity).with_leaf_threshold(4);
        let mut sbvh = SbvhBuilder::new(config).unwrap();
        group.bench_function(format!("sbvh_arity/{arity}"), |b| {
            b.iter(|| {
                let mut sink = CountSink::default();
                sbvh.build(tris.as_slice(), &mut sink).unwrap();
                black_box(sink.nodes);
            });
        });
    }
    group.finish();
}

fn bench_top_level(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_top_level");
    for &n in &[16_usize, 64] {
        let instances = gen_instances(n);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(format!("binned_fresh/{n}x{n}"), |b| {
            b.iter_batched(
                || BinnedBuilder::new(BuildConfig::default().with_arity(4)).unwrap(),
                |mut builder| {
                    let mut sink = CountSink::default();
                    builder.build(&instances, &mut sink).unwrap();
                    black_box(sink.refs);
                },
                BatchSize::SmallInput,
            );
        });
        let mut reused = BinnedBuilder::new(BuildConfig::default().with_arity(4)).unwrap();
        group.bench_function(format!("binned_reused/{n}x{n}"), |b| {
            b.iter(|| {
                let mut sink = CountSink::default();
                reused.build(&instances, &mut sink).unwrap();
                black_box(sink.refs);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_triangles, bench_wide, bench_top_level);
criterion_main!(benches);
