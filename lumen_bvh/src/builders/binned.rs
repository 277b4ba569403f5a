// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Instant;

use tracing::{debug, trace};

use super::{NodeSplitter, check_progress, drive, finish};
use crate::arena::RefArena;
use crate::config::BuildConfig;
use crate::cost::{CostModel, SahCost};
use crate::error::BuildError;
use crate::partition;
use crate::primitive::PrimitiveSource;
use crate::sink::BvhSink;
use crate::split::SplitKind;
use crate::split::object::{ObjectBinner, centroid_bounds};
use crate::stack::{WorkItem, WorkStack};
use crate::stats::BuildStats;
use crate::types::Reference;

/// Fast builder using binned object splits only.
///
/// Axes are tried from the node's longest to its shortest, and the first split that
/// beats a leaf is taken without looking at the remaining axes. Spatial split settings
/// in the config are ignored.
///
/// Suited to trees rebuilt often, such as a top-level tree over instance bounds.
#[derive(Debug)]
pub struct BinnedBuilder<C: CostModel = SahCost> {
    config: BuildConfig,
    cost: C,
    arena: RefArena,
    stack: WorkStack,
    object: ObjectBinner,
}

impl BinnedBuilder<SahCost> {
    /// Create a builder with the default SAH cost model.
    pub fn new(config: BuildConfig) -> Result<Self, BuildError> {
        Self::with_cost(config, SahCost::default())
    }
}

impl<C: CostModel> BinnedBuilder<C> {
    /// Create a builder with a custom cost model.
    pub fn with_cost(config: BuildConfig, cost: C) -> Result<Self, BuildError> {
        config.validate()?;
        Ok(Self {
            config,
            cost,
            arena: RefArena::default(),
            stack: WorkStack::default(),
            object: ObjectBinner::default(),
        })
    }

    /// The configuration this builder was created with.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build a hierarchy over `prims`, writing it to `sink`.
    ///
    /// On error the sink may have received part of the tree and should be discarded.
    pub fn build<P, S>(&mut self, prims: &P, sink: &mut S) -> Result<BuildStats, BuildError>
    where
        P: PrimitiveSource + ?Sized,
        S: BvhSink + ?Sized,
    {
        let started = Instant::now();
        debug!(
            builder = "binned",
            primitives = prims.primitive_count(),
            arity = self.config.arity,
            leaf_threshold = self.config.leaf_threshold,
            "build started"
        );
        self.arena.reset(self.config.reference_budget);
        self.stack.reset(self.config.stack_capacity);
        let seed = self.arena.seed(prims)?;

        let mut stats = BuildStats::default();
        let mut splitter = BinnedSplitter {
            config: &self.config,
            cost: &self.cost,
            arena: &mut self.arena,
            object: &mut self.object,
        };
        let root = WorkItem::new(seed.range, seed.bbox, 0);
        drive(
            &mut splitter,
            &mut self.stack,
            root,
            &self.config,
            sink,
            &mut stats,
        )?;
        finish(&mut stats, started, "binned");
        Ok(stats)
    }
}

struct BinnedSplitter<'a, C> {
    config: &'a BuildConfig,
    cost: &'a C,
    arena: &'a mut RefArena,
    object: &'a mut ObjectBinner,
}

impl<C: CostModel> NodeSplitter for BinnedSplitter<'_, C> {
    fn leaf_cost(&self, item: &WorkItem) -> f64 {
        self.cost.leaf_cost(item.len(), item.bbox.half_area())
    }

    fn split(
        &mut self,
        item: &WorkItem,
        stats: &mut BuildStats,
    ) -> Result<Option<(WorkItem, WorkItem)>, BuildError> {
        let count = item.len();
        if count <= self.config.leaf_threshold {
            return Ok(None);
        }
        let area = item.bbox.half_area();
        let leaf_cost = self.cost.leaf_cost(count, area);
        let traversal = self.cost.traversal_cost(area);
        let centroids = centroid_bounds(self.arena, item.range);

        for axis in item.bbox.axes_by_extent() {
            let Some(cand) = self.object.best_on_axis(
                self.arena,
                item.range,
                &centroids,
                axis,
                self.config.object_bins,
                self.cost,
            ) else {
                continue;
            };
            if cand.cost + traversal >= leaf_cost {
                continue;
            }
            let children = partition::object(self.arena, item, &cand)?;
            check_progress(item, SplitKind::Object, &children.left, &children.right)?;
            stats.object_splits += 1;
            trace!(
                depth = item.depth,
                axis = ?axis,
                position = cand.position,
                left = children.left.len(),
                right = children.right.len(),
                cost = cand.cost,
                "split"
            );
            return Ok(Some((children.left, children.right)));
        }
        Ok(None)
    }

    fn references(&self, item: &WorkItem) -> &[Reference] {
        self.arena.get(item.range)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::primitive::InstanceBounds;
    use crate::tree::BvhWriter;
    use crate::types::BBox;

    fn grid_instances(n: usize) -> InstanceBounds {
        InstanceBounds::from_boxes((0..n).map(|i| {
            let p = Vec3::new((i % 10) as f32 * 3.0, (i / 10) as f32 * 3.0, 0.0);
            BBox::new(p, p + Vec3::ONE)
        }))
    }

    #[test]
    fn builds_without_spatial_splits() {
        let mut builder = BinnedBuilder::new(BuildConfig::default()).unwrap();
        let mut writer = BvhWriter::new();
        let stats = builder.build(&grid_instances(100), &mut writer).unwrap();
        assert_eq!(stats.spatial_splits, 0);
        assert_eq!(stats.leaf_references, 100);
        assert!(stats.object_splits > 0);
        let bvh = writer.finish().unwrap();
        bvh.validate().unwrap();
        for leaf in bvh.leaves() {
            assert!(leaf.count <= 2);
        }
    }

    #[test]
    fn coincident_instances_become_one_leaf() {
        let boxes = InstanceBounds::from_boxes((0..5).map(|_| BBox::new(Vec3::ZERO, Vec3::ONE)));
        let mut builder = BinnedBuilder::new(BuildConfig::default()).unwrap();
        let mut writer = BvhWriter::new();
        let stats = builder.build(&boxes, &mut writer).unwrap();
        assert_eq!((stats.nodes, stats.leaves), (1, 1));
        assert_eq!(stats.leaf_references, 5);
    }
}
