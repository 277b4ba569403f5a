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
use crate::split::object::{ObjectBinner, centroid_bounds};
use crate::split::spatial::SpatialBinner;
use crate::split::{SplitCandidate, SplitKind};
use crate::stack::{WorkItem, WorkStack};
use crate::stats::BuildStats;
use crate::types::Reference;

/// Split-BVH builder: binned SAH object splits plus spatial splits with clipping.
///
/// At every node the best object split is evaluated on all three axes. When its two
/// children overlap by more than `alpha` times the node's half-area (or there is no
/// object split at all), the best spatial split is evaluated too and wins if it is
/// strictly cheaper. The split is taken only if it beats turning the node into a leaf.
///
/// Spatial splits stop being considered once the node's references could no longer be
/// duplicated within [`BuildConfig::duplication_budget`].
///
/// The builder owns its scratch memory and reuses it across builds.
///
/// ```
/// use glam::Vec3;
/// use lumen_bvh::{BuildConfig, BvhWriter, SbvhBuilder, Triangle};
///
/// let tris: Vec<Triangle> = (0..16)
///     .map(|i| {
///         let x = i as f32 * 2.0;
///         Triangle::new(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 0.0, 0.0), Vec3::new(x, 1.0, 0.0))
///     })
///     .collect();
///
/// let mut builder = SbvhBuilder::new(BuildConfig::default()).unwrap();
/// let mut writer = BvhWriter::new();
/// let stats = builder.build(&tris, &mut writer).unwrap();
/// let bvh = writer.finish().unwrap();
/// assert_eq!(stats.leaves, bvh.leaves().len());
/// assert_eq!(stats.spatial_splits, 0);
/// ```
#[derive(Debug)]
pub struct SbvhBuilder<C: CostModel = SahCost> {
    config: BuildConfig,
    cost: C,
    arena: RefArena,
    stack: WorkStack,
    object: ObjectBinner,
    spatial: SpatialBinner,
    duplicates: Vec<Reference>,
}

impl SbvhBuilder<SahCost> {
    /// Create a builder with the default SAH cost model.
    pub fn new(config: BuildConfig) -> Result<Self, BuildError> {
        Self::with_cost(config, SahCost::default())
    }
}

impl<C: CostModel> SbvhBuilder<C> {
    /// Create a builder with a custom cost model.
    ///
    /// Fails with [`BuildError::InvalidConfig`] if `config` does not validate.
    pub fn with_cost(config: BuildConfig, cost: C) -> Result<Self, BuildError> {
        config.validate()?;
        Ok(Self {
            config,
            cost,
            arena: RefArena::default(),
            stack: WorkStack::default(),
            object: ObjectBinner::default(),
            spatial: SpatialBinner::default(),
            duplicates: Vec::new(),
        })
    }

    /// The configuration this builder was created with.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// The cost model.
    pub fn cost(&self) -> &C {
        &self.cost
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
            builder = "sbvh",
            primitives = prims.primitive_count(),
            arity = self.config.arity,
            leaf_threshold = self.config.leaf_threshold,
            alpha = self.config.alpha,
            spatial = self.config.spatial_enabled(),
            "build started"
        );
        self.arena.reset(self.config.reference_budget);
        self.stack.reset(self.config.stack_capacity);
        let seed = self.arena.seed(prims)?;

        let mut stats = BuildStats::default();
        let mut splitter = SbvhSplitter {
            prims,
            config: &self.config,
            cost: &self.cost,
            arena: &mut self.arena,
            object: &mut self.object,
            spatial: &mut self.spatial,
            duplicates: &mut self.duplicates,
            duplicate_limit: self.config.duplicate_limit(seed.range.len()),
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
        finish(&mut stats, started, "sbvh");
        Ok(stats)
    }
}

struct SbvhSplitter<'a, P: ?Sized, C> {
    prims: &'a P,
    config: &'a BuildConfig,
    cost: &'a C,
    arena: &'a mut RefArena,
    object: &'a mut ObjectBinner,
    spatial: &'a mut SpatialBinner,
    duplicates: &'a mut Vec<Reference>,
    duplicate_limit: usize,
}

impl<P, C> SbvhSplitter<'_, P, C>
where
    P: PrimitiveSource + ?Sized,
    C: CostModel,
{
    /// Whether the object split leaves enough overlap to make a spatial split worth trying.
    fn wants_spatial(
        &self,
        item: &WorkItem,
        object: Option<&SplitCandidate>,
        duplicated: usize,
    ) -> bool {
        // Every reference of the node could end up duplicated.
        if !self.config.spatial_enabled() || duplicated + item.len() > self.duplicate_limit {
            return false;
        }
        let half_area = item.bbox.half_area();
        object.is_none_or(|o| {
            let overlap = o.left_bbox.overlap(&o.right_bbox);
            !overlap.is_empty() && overlap.half_area() > f64::from(self.config.alpha) * half_area
        })
    }
}

impl<P, C> NodeSplitter for SbvhSplitter<'_, P, C>
where
    P: PrimitiveSource + ?Sized,
    C: CostModel,
{
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

        let centroids = centroid_bounds(self.arena, item.range);
        let object = self.object.best(
            self.arena,
            item.range,
            &centroids,
            self.config.object_bins,
            self.cost,
        );
        let spatial = if self.wants_spatial(item, object.as_ref(), stats.duplicated_references) {
            self.spatial.best(
                self.prims,
                self.arena,
                item,
                self.config.spatial_bins,
                self.cost,
            )
        } else {
            None
        };
        let best = match (object, spatial) {
            (Some(o), s) => o.cheaper(s),
            (None, Some(s)) => s,
            (None, None) => return Ok(None),
        };

        if best.cost + self.cost.traversal_cost(area) >= self.cost.leaf_cost(count, area) {
            return Ok(None);
        }
        if best.left_bbox.is_empty() || best.right_bbox.is_empty() {
            return Ok(None);
        }

        let children = match best.kind {
            SplitKind::Object => partition::object(self.arena, item, &best)?,
            SplitKind::Spatial => partition::spatial(
                self.prims,
                self.arena,
                item,
                &best,
                self.cost,
                self.duplicates,
            )?,
        };
        check_progress(item, best.kind, &children.left, &children.right)?;

        match best.kind {
            SplitKind::Object => stats.object_splits += 1,
            SplitKind::Spatial => {
                stats.spatial_splits += 1;
                stats.duplicated_references += children.duplicated;
            }
        }
        trace!(
            depth = item.depth,
            kind = ?best.kind,
            axis = ?best.axis,
            position = best.position,
            left = children.left.len(),
            right = children.right.len(),
            duplicated = children.duplicated,
            cost = best.cost,
            "split"
        );
        Ok(Some((children.left, children.right)))
    }

    fn references(&self, item: &WorkItem) -> &[Reference] {
        self.arena.get(item.range)
    }
}
