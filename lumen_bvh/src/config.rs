// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build parameters.

use crate::error::BuildError;

/// Widest node a builder will emit.
pub const MAX_ARITY: usize = 8;

const MAX_OBJECT_BINS: usize = 1024;
const MAX_SPATIAL_BINS: usize = 4096;

bitflags::bitflags! {
    /// Split kinds a builder may consider.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SplitKinds: u8 {
        /// Centroid-based object splits. Always required.
        const OBJECT  = 0b0000_0001;
        /// Plane-based spatial splits with reference clipping and duplication.
        const SPATIAL = 0b0000_0010;
    }
}

impl Default for SplitKinds {
    fn default() -> Self {
        Self::OBJECT | Self::SPATIAL
    }
}

/// Parameters shared by [`SbvhBuilder`](crate::SbvhBuilder) and
/// [`BinnedBuilder`](crate::BinnedBuilder).
///
/// ```
/// use lumen_bvh::{BuildConfig, SplitKinds};
///
/// let config = BuildConfig::default()
///     .with_arity(4)
///     .with_leaf_threshold(4)
///     .with_splits(SplitKinds::OBJECT);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BuildConfig {
    /// Nodes holding at most this many references always become leaves.
    pub leaf_threshold: usize,
    /// Spatial splits are only attempted when the best object split's children overlap by
    /// more than `alpha` times the node's half-area.
    pub alpha: f32,
    /// Maximum number of children per internal node.
    pub arity: usize,
    /// Number of centroid bins for object splits.
    pub object_bins: usize,
    /// Number of bins across the node bounds for spatial splits.
    pub spatial_bins: usize,
    /// Enabled split kinds.
    pub splits: SplitKinds,
    /// Spatial splits are only attempted while the references they could duplicate still
    /// fit in `duplication_budget * primitive_count` extra references for the whole build.
    pub duplication_budget: f32,
    /// Maximum number of pending work items.
    pub stack_capacity: usize,
    /// Maximum total number of references the arena may hold, including duplicates.
    /// `None` means unbounded.
    pub reference_budget: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            leaf_threshold: 2,
            alpha: 1e-5,
            arity: 2,
            object_bins: 32,
            spatial_bins: 256,
            splits: SplitKinds::default(),
            duplication_budget: 1.0,
            stack_capacity: 1024,
            reference_budget: None,
        }
    }
}

impl BuildConfig {
    /// Set [`leaf_threshold`](Self::leaf_threshold).
    #[must_use]
    pub fn with_leaf_threshold(mut self, leaf_threshold: usize) -> Self {
        self.leaf_threshold = leaf_threshold;
        self
    }

    /// Set [`alpha`](Self::alpha).
    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set [`arity`](Self::arity).
    #[must_use]
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }

    /// Set both bin counts.
    #[must_use]
    pub fn with_bins(mut self, object_bins: usize, spatial_bins: usize) -> Self {
        self.object_bins = object_bins;
        self.spatial_bins = spatial_bins;
        self
    }

    /// Set [`splits`](Self::splits).
    #[must_use]
    pub fn with_splits(mut self, splits: SplitKinds) -> Self {
        self.splits = splits;
        self
    }

    /// Set [`duplication_budget`](Self::duplication_budget).
    #[must_use]
    pub fn with_duplication_budget(mut self, duplication_budget: f32) -> Self {
        self.duplication_budget = duplication_budget;
        self
    }

    /// Set [`stack_capacity`](Self::stack_capacity).
    #[must_use]
    pub fn with_stack_capacity(mut self, stack_capacity: usize) -> Self {
        self.stack_capacity = stack_capacity;
        self
    }

    /// Set [`reference_budget`](Self::reference_budget).
    #[must_use]
    pub fn with_reference_budget(mut self, budget: Option<usize>) -> Self {
        self.reference_budget = budget;
        self
    }

    /// Check every parameter, reporting the first one out of range.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.leaf_threshold == 0 {
            return Err(invalid("leaf_threshold", "must be at least 1"));
        }
        if !self.alpha.is_finite() || !(0.0..=1.0).contains(&self.alpha) {
            return Err(invalid(
                "alpha",
                format!("must be a finite value in [0, 1], got {}", self.alpha),
            ));
        }
        if !(2..=MAX_ARITY).contains(&self.arity) {
            return Err(invalid(
                "arity",
                format!("must be in 2..={MAX_ARITY}, got {}", self.arity),
            ));
        }
        if !(2..=MAX_OBJECT_BINS).contains(&self.object_bins) {
            return Err(invalid(
                "object_bins",
                format!("must be in 2..={MAX_OBJECT_BINS}, got {}", self.object_bins),
            ));
        }
        if !(2..=MAX_SPATIAL_BINS).contains(&self.spatial_bins) {
            return Err(invalid(
                "spatial_bins",
                format!("must be in 2..={MAX_SPATIAL_BINS}, got {}", self.spatial_bins),
            ));
        }
        if !self.splits.contains(SplitKinds::OBJECT) {
            return Err(invalid("splits", "object splits cannot be disabled"));
        }
        if !self.duplication_budget.is_finite() || self.duplication_budget < 0.0 {
            return Err(invalid(
                "duplication_budget",
                format!(
                    "must be finite and non-negative, got {}",
                    self.duplication_budget
                ),
            ));
        }
        if self.stack_capacity == 0 {
            return Err(invalid("stack_capacity", "must be at least 1"));
        }
        if self.reference_budget == Some(0) {
            return Err(invalid("reference_budget", "must be at least 1 when set"));
        }
        Ok(())
    }

    pub(crate) fn spatial_enabled(&self) -> bool {
        self.splits.contains(SplitKinds::SPATIAL)
    }

    /// Extra references spatial splits may create over `primitives` primitives.
    pub(crate) fn duplicate_limit(&self, primitives: usize) -> usize {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Saturating float to integer conversion is intended."
        )]
        let limit = (primitives as f64 * f64::from(self.duplication_budget)) as usize;
        limit
    }
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> BuildError {
    BuildError::InvalidConfig {
        parameter,
        reason: reason.into(),
    }
}
