// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collapsing binary splits into one node of up to `arity` children.

use crate::config::MAX_ARITY;
use crate::stack::WorkItem;
use crate::types::BBox;

#[derive(Copy, Clone, Debug)]
pub(crate) struct Child {
    pub(crate) item: WorkItem,
    leaf_cost: f64,
    /// Evaluated and not worth splitting.
    pub(crate) tested: bool,
}

/// Children of one node under construction.
///
/// Starts with the node itself as the only child. Repeatedly the untested child with
/// the lowest leaf cost is split and replaced in place by its two halves, until the
/// node is full or every child has been tested.
#[derive(Debug)]
pub(crate) struct MultiNode {
    children: [Option<Child>; MAX_ARITY],
    len: usize,
    arity: usize,
}

impl MultiNode {
    pub(crate) fn new(arity: usize, item: WorkItem, leaf_cost: f64) -> Self {
        let mut children = [None; MAX_ARITY];
        children[0] = Some(Child {
            item,
            leaf_cost,
            tested: false,
        });
        Self {
            children,
            len: 1,
            arity: arity.clamp(2, MAX_ARITY),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.len >= self.arity
    }

    pub(crate) fn children(&self) -> impl DoubleEndedIterator<Item = &Child> {
        self.children[..self.len].iter().flatten()
    }

    /// Slot of the untested child with the lowest leaf cost; the lowest slot wins ties.
    pub(crate) fn next_untested(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (slot, child) in self.children().enumerate() {
            if child.tested {
                continue;
            }
            if best.is_none_or(|(_, cost)| child.leaf_cost < cost) {
                best = Some((slot, child.leaf_cost));
            }
        }
        best.map(|(slot, _)| slot)
    }

    pub(crate) fn item(&self, slot: usize) -> Option<&WorkItem> {
        self.children[slot].as_ref().map(|c| &c.item)
    }

    pub(crate) fn mark_tested(&mut self, slot: usize) {
        if let Some(child) = self.children[slot].as_mut() {
            child.tested = true;
        }
    }

    /// Replace the child at `slot` by `left` and insert `right` right after it.
    ///
    /// Does nothing when the node is already full.
    pub(crate) fn split_child(
        &mut self,
        slot: usize,
        (left, left_cost): (WorkItem, f64),
        (right, right_cost): (WorkItem, f64),
    ) {
        if self.is_full() || slot >= self.len {
            return;
        }
        self.children[slot..=self.len].rotate_right(1);
        self.children[slot] = Some(Child {
            item: left,
            leaf_cost: left_cost,
            tested: false,
        });
        self.children[slot + 1] = Some(Child {
            item: right,
            leaf_cost: right_cost,
            tested: false,
        });
        self.len += 1;
    }

    /// Bounds of every child, in slot order.
    pub(crate) fn child_bounds(&self, out: &mut Vec<BBox>) {
        out.clear();
        out.extend(self.children().map(|c| c.item.bbox));
    }
}
