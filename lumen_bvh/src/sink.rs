// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Output interface for builders.

use crate::types::{BBox, Reference};

/// Receives the tree in depth-first pre-order.
///
/// Each node is written before its subtrees; the subtrees follow in the same order as
/// the `children` bounds given to [`write_node`](Self::write_node). The first call of a
/// build is always a `write_node` for the root.
///
/// A sink decides how to lay the tree out in memory; [`BvhWriter`](crate::BvhWriter)
/// assembles a [`Bvh`](crate::Bvh).
pub trait BvhSink {
    /// An internal node with bounds `bbox` and one entry in `children` per child.
    fn write_node(&mut self, bbox: &BBox, children: &[BBox]);

    /// A leaf with bounds `bbox` holding `refs`.
    ///
    /// Reference bounds may be clipped versions of the primitives' bounds, and the same
    /// primitive id may appear in several leaves.
    fn write_leaf(&mut self, bbox: &BBox, refs: &[Reference]);
}

impl<S: BvhSink + ?Sized> BvhSink for &mut S {
    fn write_node(&mut self, bbox: &BBox, children: &[BBox]) {
        (**self).write_node(bbox, children);
    }

    fn write_leaf(&mut self, bbox: &BBox, refs: &[Reference]) {
        (**self).write_leaf(bbox, refs);
    }
}
