// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Work items and the explicit, bounded work stack driving construction.

use crate::arena::RefRange;
use crate::error::{BuildError, Resource};
use crate::types::BBox;

/// A pending subtree: a range of references and their bounds.
#[derive(Copy, Clone, Debug)]
pub(crate) struct WorkItem {
    pub(crate) range: RefRange,
    pub(crate) bbox: BBox,
    pub(crate) depth: u32,
    /// Already evaluated and found not worth splitting; becomes a leaf when popped.
    pub(crate) settled: bool,
}

impl WorkItem {
    pub(crate) const fn new(range: RefRange, bbox: BBox, depth: u32) -> Self {
        Self {
            range,
            bbox,
            depth,
            settled: false,
        }
    }

    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.range.len()
    }
}

/// LIFO of work items with a hard capacity.
///
/// Exceeding the capacity is reported as [`BuildError::ResourceExhausted`] rather than
/// growing without bound.
#[derive(Debug)]
pub(crate) struct WorkStack {
    items: Vec<WorkItem>,
    capacity: usize,
}

impl Default for WorkStack {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            capacity: usize::MAX,
        }
    }
}

impl WorkStack {
    pub(crate) fn reset(&mut self, capacity: usize) {
        self.items.clear();
        self.capacity = capacity;
    }

    pub(crate) fn push(&mut self, item: WorkItem) -> Result<(), BuildError> {
        if self.items.len() >= self.capacity {
            return Err(BuildError::ResourceExhausted {
                resource: Resource::WorkStack,
                limit: self.capacity,
                depth: item.depth,
                references: item.len(),
            });
        }
        self.items.push(item);
        Ok(())
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<WorkItem> {
        self.items.pop()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}
