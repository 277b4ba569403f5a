// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pluggable cost model for split decisions.
//!
//! Costs are expressed in terms of half-areas (see [`BBox::half_area`](crate::BBox::half_area)).
//! The constant factor between half and full surface area cancels out in every comparison.
//! Areas and costs are `f64` so that widely spread scenes do not overflow to infinity.

/// Cost policy used to rank split candidates and decide when to stop splitting.
///
/// A split of a node with half-area `A` holding `n` references is accepted when
///
/// `cost(left) + cost(right) + traversal_cost(A) < leaf_cost(n, A)`
///
/// where each side's cost is `leaf_cost(count, half_area)` of that side.
pub trait CostModel {
    /// Cost of intersecting `count` primitives in a box of the given half-area.
    fn leaf_cost(&self, count: usize, half_area: f64) -> f64;

    /// Cost of traversing an internal node of the given half-area.
    fn traversal_cost(&self, half_area: f64) -> f64;
}

/// Classic surface area heuristic: `leaf_cost = intersection * count * area`,
/// `traversal_cost = traversal * area`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SahCost {
    /// Relative cost of one primitive intersection.
    pub intersection: f32,
    /// Relative cost of one node traversal step.
    pub traversal: f32,
}

impl Default for SahCost {
    fn default() -> Self {
        Self {
            intersection: 1.0,
            traversal: 1.0,
        }
    }
}

impl CostModel for SahCost {
    #[inline]
    fn leaf_cost(&self, count: usize, half_area: f64) -> f64 {
        f64::from(self.intersection) * count as f64 * half_area
    }

    #[inline]
    fn traversal_cost(&self, half_area: f64) -> f64 {
        f64::from(self.traversal) * half_area
    }
}

impl<C: CostModel + ?Sized> CostModel for &C {
    #[inline]
    fn leaf_cost(&self, count: usize, half_area: f64) -> f64 {
        (**self).leaf_cost(count, half_area)
    }

    #[inline]
    fn traversal_cost(&self, half_area: f64) -> f64 {
        (**self).traversal_cost(half_area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sah_cost_scales_with_count_and_area() {
        let c = SahCost::default();
        assert_eq!(c.leaf_cost(4, 2.0), 8.0);
        assert_eq!(c.traversal_cost(2.0), 2.0);
        let cheap = SahCost {
            intersection: 0.5,
            traversal: 0.25,
        };
        assert_eq!(cheap.leaf_cost(4, 2.0), 4.0);
        assert_eq!((&cheap).traversal_cost(8.0), 2.0);
    }
}
