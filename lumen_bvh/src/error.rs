// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for BVH construction.

use thiserror::Error;

/// A bounded resource used during construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    /// The explicit stack of pending work items.
    WorkStack,
    /// The reference buffer, which grows when spatial splits duplicate references.
    ReferenceArena,
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WorkStack => f.write_str("work stack"),
            Self::ReferenceArena => f.write_str("reference arena"),
        }
    }
}

/// Errors returned by the builders.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// The primitive source has no primitives.
    #[error("cannot build a hierarchy over zero primitives")]
    EmptyInput,

    /// A build parameter is out of range.
    #[error("invalid build parameter `{parameter}`: {reason}")]
    InvalidConfig {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A primitive has NaN or infinite bounds.
    #[error("primitive {index} has non-finite bounds")]
    NonFinitePrimitive {
        /// Index of the primitive in its source.
        index: usize,
    },

    /// A triangle refers to a vertex that does not exist.
    #[error("triangle {triangle} refers to vertex {vertex}, but the mesh has {vertex_count} vertices")]
    InvalidMesh {
        /// Index of the triangle.
        triangle: usize,
        /// The out-of-range vertex index.
        vertex: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// A bounded resource ran out. Retry with a larger limit in the [`BuildConfig`](crate::BuildConfig).
    #[error(
        "{resource} exhausted (limit {limit}) at depth {depth} while handling {references} references"
    )]
    ResourceExhausted {
        /// Which resource ran out.
        resource: Resource,
        /// The configured limit that was hit.
        limit: usize,
        /// Depth of the node being processed.
        depth: u32,
        /// Reference count of the node being processed.
        references: usize,
    },

    /// An internal consistency check failed. This is a bug in the split evaluator or
    /// partitioner; the partially emitted tree must be discarded.
    #[error("internal invariant violated: {0}")]
    Invariant(&'static str),
}
