// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-build statistics.

use core::time::Duration;

/// Counters accumulated by one build and returned from it.
///
/// Each build owns its own counters. When several builds run concurrently, collect
/// their stats and reduce them afterwards with [`BuildStats::merge`] or [`Iterator::sum`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Internal nodes written to the sink.
    pub nodes: usize,
    /// Leaves written to the sink.
    pub leaves: usize,
    /// Accepted object splits.
    pub object_splits: usize,
    /// Accepted spatial splits.
    pub spatial_splits: usize,
    /// References created by duplicating a straddling reference at a spatial split.
    pub duplicated_references: usize,
    /// Total references over all leaves.
    pub leaf_references: usize,
    /// Deepest level a leaf was written at (the root is at depth 0).
    pub max_depth: u32,
    /// Wall-clock build time.
    pub elapsed: Duration,
}

impl BuildStats {
    /// Fold another build's counters into these.
    ///
    /// Counts and time add up; `max_depth` takes the maximum.
    pub fn merge(&mut self, other: &Self) {
        self.nodes += other.nodes;
        self.leaves += other.leaves;
        self.object_splits += other.object_splits;
        self.spatial_splits += other.spatial_splits;
        self.duplicated_references += other.duplicated_references;
        self.leaf_references += other.leaf_references;
        self.max_depth = self.max_depth.max(other.max_depth);
        self.elapsed += other.elapsed;
    }

    /// Total accepted splits of either kind.
    pub fn splits(&self) -> usize {
        self.object_splits + self.spatial_splits
    }
}

impl core::iter::Sum for BuildStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, s| {
            acc.merge(&s);
            acc
        })
    }
}

impl<'a> core::iter::Sum<&'a Self> for BuildStats {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, s| {
            acc.merge(s);
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_counts_and_keeps_deepest() {
        let a = BuildStats {
            nodes: 3,
            leaves: 4,
            object_splits: 2,
            spatial_splits: 1,
            duplicated_references: 1,
            leaf_references: 9,
            max_depth: 2,
            elapsed: Duration::from_millis(5),
        };
        let b = BuildStats {
            nodes: 1,
            leaves: 2,
            object_splits: 1,
            max_depth: 7,
            elapsed: Duration::from_millis(1),
            ..BuildStats::default()
        };
        let total: BuildStats = [a.clone(), b.clone()].into_iter().sum();
        assert_eq!(total.nodes, 4);
        assert_eq!(total.leaves, 6);
        assert_eq!(total.splits(), 4);
        assert_eq!(total.max_depth, 7);
        assert_eq!(total.elapsed, Duration::from_millis(6));
        let by_ref: BuildStats = [a, b].iter().sum();
        assert_eq!(by_ref, total);
    }
}
