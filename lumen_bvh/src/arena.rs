// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference arena: one growable buffer of references addressed by index ranges.
//!
//! Work items never own their references; they hold a [`RefRange`] into the arena.
//! Object splits reorder a range in place. Spatial splits that duplicate references
//! append a fresh range at the end of the buffer for the right child. The buffer only
//! grows during a build and is reset at the start of the next one.

use core::ops::Range;

use glam::Vec3;

use crate::error::{BuildError, Resource};
use crate::primitive::PrimitiveSource;
use crate::types::{BBox, Reference};

/// Half-open index range into the arena's reference buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct RefRange {
    pub(crate) begin: usize,
    pub(crate) end: usize,
}

impl RefRange {
    pub(crate) const fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    pub(crate) const fn len(self) -> usize {
        self.end - self.begin
    }

    pub(crate) const fn as_range(self) -> Range<usize> {
        self.begin..self.end
    }
}

/// Result of seeding the arena from a primitive source.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Seed {
    pub(crate) range: RefRange,
    pub(crate) bbox: BBox,
}

#[derive(Debug, Default)]
pub(crate) struct RefArena {
    refs: Vec<Reference>,
    // Indexed by primitive id; computed once from the unclipped primitive.
    centroids: Vec<Vec3>,
    budget: Option<usize>,
}

impl RefArena {
    /// Drop the previous build's contents, keeping the allocations.
    pub(crate) fn reset(&mut self, budget: Option<usize>) {
        self.refs.clear();
        self.centroids.clear();
        self.budget = budget;
    }

    /// Create one reference per primitive and cache the centroids.
    ///
    /// Fails before any reference is created if the source is empty, and stops at the
    /// first primitive with non-finite bounds.
    pub(crate) fn seed<P: PrimitiveSource + ?Sized>(&mut self, prims: &P) -> Result<Seed, BuildError> {
        let count = prims.primitive_count();
        if count == 0 {
            return Err(BuildError::EmptyInput);
        }
        if u32::try_from(count).is_err() {
            return Err(BuildError::InvalidConfig {
                parameter: "primitive_count",
                reason: format!("{count} primitives exceed the u32 id space"),
            });
        }
        self.ensure_budget(count, 0, count)?;
        self.refs.reserve(count);
        self.centroids.reserve(count);
        let mut bbox = BBox::EMPTY;
        for index in 0..count {
            let b = prims.bbox(index);
            let c = prims.centroid(index);
            if !b.is_finite() || b.is_empty() || !c.is_finite() {
                return Err(BuildError::NonFinitePrimitive { index });
            }
            bbox.extend(&b);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Checked against the u32 id space above."
            )]
            self.refs.push(Reference::new(index as u32, b));
            self.centroids.push(c);
        }
        Ok(Seed {
            range: RefRange::new(0, count),
            bbox,
        })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.refs.len()
    }

    #[inline]
    pub(crate) fn centroid(&self, id: u32) -> Vec3 {
        self.centroids[id as usize]
    }

    #[inline]
    pub(crate) fn get(&self, range: RefRange) -> &[Reference] {
        &self.refs[range.as_range()]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, range: RefRange) -> &mut [Reference] {
        &mut self.refs[range.as_range()]
    }

    /// Mutable references of `range` alongside the centroid table.
    #[inline]
    pub(crate) fn get_mut_with_centroids(&mut self, range: RefRange) -> (&mut [Reference], &[Vec3]) {
        (&mut self.refs[range.as_range()], &self.centroids)
    }

    /// Append a copy of `src` followed by `extra` as a new range at the end of the buffer.
    ///
    /// `depth` only feeds the error context when the budget is exceeded.
    pub(crate) fn append(
        &mut self,
        src: RefRange,
        extra: &[Reference],
        depth: u32,
    ) -> Result<RefRange, BuildError> {
        let added = src.len() + extra.len();
        self.ensure_budget(added, depth, added)?;
        let begin = self.refs.len();
        self.refs.extend_from_within(src.as_range());
        self.refs.extend_from_slice(extra);
        Ok(RefRange::new(begin, self.refs.len()))
    }

    fn ensure_budget(&self, additional: usize, depth: u32, references: usize) -> Result<(), BuildError> {
        match self.budget {
            Some(limit) if self.refs.len() + additional > limit => Err(BuildError::ResourceExhausted {
                resource: Resource::ReferenceArena,
                limit,
                depth,
                references,
            }),
            _ => Ok(()),
        }
    }
}
