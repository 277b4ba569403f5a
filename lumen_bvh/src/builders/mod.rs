// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Builders.
//!
//! Both builders share one construction loop and differ only in how they split a node:
//!
//! - [`SbvhBuilder`]: object and spatial splits evaluated on every axis. Slower, fewer
//!   overlapping nodes; meant for static geometry.
//! - [`BinnedBuilder`]: object splits only, taking the first improving split along the
//!   node's longest axis. Fast; meant for geometry rebuilt every frame.
//!
//! ## Construction loop
//!
//! Work items are popped from an explicit stack. An item at or below the leaf threshold,
//! or one that was already found not worth splitting, becomes a leaf. Any other item is
//! grown into a node of up to `arity` children by repeatedly splitting its cheapest
//! untested child. The node is written to the sink and its children are pushed in
//! reverse, so the sink sees the tree in depth-first pre-order.

mod binned;
mod sbvh;

pub use binned::BinnedBuilder;
pub use sbvh::SbvhBuilder;

use std::time::Instant;

use tracing::{debug, warn};

use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::multi_node::MultiNode;
use crate::sink::BvhSink;
use crate::split::SplitKind;
use crate::stack::{WorkItem, WorkStack};
use crate::stats::BuildStats;
use crate::types::{BBox, Reference};

/// Node splitting policy plugged into [`drive`].
pub(crate) trait NodeSplitter {
    /// Cost of turning `item` into a leaf.
    fn leaf_cost(&self, item: &WorkItem) -> f64;

    /// Split `item` in two, or return `None` when it should stay whole.
    ///
    /// Implementations record accepted splits in `stats`.
    fn split(
        &mut self,
        item: &WorkItem,
        stats: &mut BuildStats,
    ) -> Result<Option<(WorkItem, WorkItem)>, BuildError>;

    /// The references `item` currently holds.
    fn references(&self, item: &WorkItem) -> &[Reference];
}

/// Run the construction loop from `root`, writing the tree to `sink`.
pub(crate) fn drive<N, S>(
    splitter: &mut N,
    stack: &mut WorkStack,
    root: WorkItem,
    config: &BuildConfig,
    sink: &mut S,
    stats: &mut BuildStats,
) -> Result<(), BuildError>
where
    N: NodeSplitter + ?Sized,
    S: BvhSink + ?Sized,
{
    if root.len() <= config.leaf_threshold {
        write_root_leaf(splitter, sink, &root, stats);
        return Ok(());
    }

    let mut bounds: Vec<BBox> = Vec::with_capacity(config.arity);
    stack.push(root)?;
    while let Some(item) = stack.pop() {
        if item.settled || item.len() <= config.leaf_threshold {
            write_leaf(splitter, sink, &item, stats);
            continue;
        }

        let mut node = MultiNode::new(config.arity, item, splitter.leaf_cost(&item));
        while !node.is_full() {
            let Some(slot) = node.next_untested() else {
                break;
            };
            let Some(&child) = node.item(slot) else {
                break;
            };
            match splitter.split(&child, stats)? {
                Some((left, right)) => {
                    let left_cost = splitter.leaf_cost(&left);
                    let right_cost = splitter.leaf_cost(&right);
                    node.split_child(slot, (left, left_cost), (right, right_cost));
                }
                None => node.mark_tested(slot),
            }
        }

        if node.len() == 1 {
            if item.depth == 0 {
                warn!(
                    references = item.len(),
                    leaf_threshold = config.leaf_threshold,
                    "root cannot be split, emitting a single leaf"
                );
                write_root_leaf(splitter, sink, &item, stats);
            } else {
                write_leaf(splitter, sink, &item, stats);
            }
            continue;
        }

        node.child_bounds(&mut bounds);
        sink.write_node(&item.bbox, &bounds);
        stats.nodes += 1;
        for child in node.children().rev() {
            stack.push(WorkItem {
                depth: item.depth + 1,
                settled: child.tested,
                ..child.item
            })?;
        }
    }
    Ok(())
}

/// Fail with [`BuildError::Invariant`] when a split did not make progress.
///
/// Object splits must shrink both reference counts. Spatial splits may duplicate, so at
/// least one child's bounds must shrink instead.
pub(crate) fn check_progress(
    parent: &WorkItem,
    kind: SplitKind,
    left: &WorkItem,
    right: &WorkItem,
) -> Result<(), BuildError> {
    if left.len() == 0 || right.len() == 0 {
        return Err(BuildError::Invariant("split produced an empty child"));
    }
    let progressed = match kind {
        SplitKind::Object => left.len() < parent.len() && right.len() < parent.len(),
        SplitKind::Spatial => {
            left.bbox.shrinks_within(&parent.bbox) || right.bbox.shrinks_within(&parent.bbox)
        }
    };
    if progressed {
        Ok(())
    } else {
        Err(BuildError::Invariant("split made no progress"))
    }
}

/// The root is always a node, even when it holds a single leaf.
fn write_root_leaf<N, S>(splitter: &N, sink: &mut S, root: &WorkItem, stats: &mut BuildStats)
where
    N: NodeSplitter + ?Sized,
    S: BvhSink + ?Sized,
{
    sink.write_node(&root.bbox, &[root.bbox]);
    stats.nodes += 1;
    let leaf = WorkItem {
        depth: root.depth + 1,
        ..*root
    };
    write_leaf(splitter, sink, &leaf, stats);
}

fn write_leaf<N, S>(splitter: &N, sink: &mut S, item: &WorkItem, stats: &mut BuildStats)
where
    N: NodeSplitter + ?Sized,
    S: BvhSink + ?Sized,
{
    let refs = splitter.references(item);
    sink.write_leaf(&item.bbox, refs);
    stats.leaves += 1;
    stats.leaf_references += refs.len();
    stats.max_depth = stats.max_depth.max(item.depth);
}

/// Stamp the elapsed time and log the summary line.
pub(crate) fn finish(stats: &mut BuildStats, started: Instant, builder: &'static str) {
    stats.elapsed = started.elapsed();
    debug!(
        builder,
        nodes = stats.nodes,
        leaves = stats.leaves,
        object_splits = stats.object_splits,
        spatial_splits = stats.spatial_splits,
        duplicated_references = stats.duplicated_references,
        leaf_references = stats.leaf_references,
        max_depth = stats.max_depth,
        elapsed_us = u64::try_from(stats.elapsed.as_micros()).unwrap_or(u64::MAX),
        "build finished"
    );
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::arena::RefRange;

    /// Splits ranges in half until they reach one reference.
    struct Halver {
        refs: Vec<Reference>,
    }

    impl NodeSplitter for Halver {
        fn leaf_cost(&self, item: &WorkItem) -> f64 {
            item.len() as f64
        }

        fn split(
            &mut self,
            item: &WorkItem,
            _stats: &mut BuildStats,
        ) -> Result<Option<(WorkItem, WorkItem)>, BuildError> {
            if item.len() < 2 {
                return Ok(None);
            }
            let mid = item.range.begin + item.len() / 2;
            Ok(Some((
                WorkItem::new(RefRange::new(item.range.begin, mid), item.bbox, item.depth + 1),
                WorkItem::new(RefRange::new(mid, item.range.end), item.bbox, item.depth + 1),
            )))
        }

        fn references(&self, item: &WorkItem) -> &[Reference] {
            &self.refs[item.range.as_range()]
        }
    }

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
    }

    impl BvhSink for Log {
        fn write_node(&mut self, _bbox: &BBox, children: &[BBox]) {
            self.events.push(format!("node {}", children.len()));
        }

        fn write_leaf(&mut self, _bbox: &BBox, refs: &[Reference]) {
            let ids: Vec<String> = refs.iter().map(|r| r.id.to_string()).collect();
            self.events.push(format!("leaf {}", ids.join(",")));
        }
    }

    fn halver(n: u32) -> Halver {
        Halver {
            refs: (0..n)
                .map(|i| Reference::new(i, BBox::from_point(Vec3::splat(i as f32))))
                .collect(),
        }
    }

    fn run(n: u32, config: &BuildConfig) -> (Log, BuildStats, Result<(), BuildError>) {
        let mut splitter = halver(n);
        let mut stack = WorkStack::default();
        stack.reset(config.stack_capacity);
        let root = WorkItem::new(RefRange::new(0, n as usize), BBox::EMPTY, 0);
        let mut log = Log::default();
        let mut stats = BuildStats::default();
        let res = drive(&mut splitter, &mut stack, root, config, &mut log, &mut stats);
        (log, stats, res)
    }

    #[test]
    fn small_root_is_wrapped() {
        let (log, stats, res) = run(2, &BuildConfig::default());
        res.unwrap();
        assert_eq!(log.events, vec!["node 1", "leaf 0,1"]);
        assert_eq!((stats.nodes, stats.leaves, stats.max_depth), (1, 1, 1));
    }

    #[test]
    fn binary_pre_order() {
        let config = BuildConfig::default().with_leaf_threshold(1);
        let (log, stats, res) = run(4, &config);
        res.unwrap();
        assert_eq!(
            log.events,
            vec!["node 2", "node 2", "leaf 0", "leaf 1", "node 2", "leaf 2", "leaf 3"]
        );
        assert_eq!(stats.leaf_references, 4);
        assert_eq!(stats.max_depth, 2);
    }

    #[test]
    fn wide_nodes_collapse_levels() {
        let config = BuildConfig::default().with_leaf_threshold(1).with_arity(4);
        let (log, stats, res) = run(4, &config);
        res.unwrap();
        assert_eq!(log.events, vec!["node 4", "leaf 0", "leaf 1", "leaf 2", "leaf 3"]);
        assert_eq!(stats.nodes, 1);
    }

    #[test]
    fn stack_capacity_is_enforced() {
        let config = BuildConfig::default()
            .with_leaf_threshold(1)
            .with_stack_capacity(1);
        let (_, _, res) = run(8, &config);
        assert!(matches!(
            res,
            Err(BuildError::ResourceExhausted {
                resource: crate::error::Resource::WorkStack,
                limit: 1,
                ..
            })
        ));
    }
}
