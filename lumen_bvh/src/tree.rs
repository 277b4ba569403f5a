// Copyright 2025 the Lumen Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A flat, inspectable hierarchy and the sink that assembles it.
//!
//! [`BvhWriter`] turns the pre-order stream of a build into a [`Bvh`]: nodes and leaves in
//! two arrays, with child slots linked by index. While writing, it keeps a stack of the
//! `(node, slot)` pairs still waiting for their subtree; each new node or leaf fills the
//! slot on top.

use thiserror::Error;

use crate::cost::CostModel;
use crate::sink::BvhSink;
use crate::types::{BBox, Reference};

/// Link from a child slot to the subtree stored there.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChildRef {
    /// Index into [`Bvh::nodes`].
    Node(u32),
    /// Index into [`Bvh::leaves`].
    Leaf(u32),
}

/// One child slot of a node.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Child {
    /// Bounds of the child as reported by the builder.
    pub bbox: BBox,
    /// The subtree; `None` only while the tree is being written.
    pub link: Option<ChildRef>,
}

/// An internal node.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Bounds of the whole subtree.
    pub bbox: BBox,
    /// Child slots, in the order the builder wrote them.
    pub children: Vec<Child>,
}

/// A leaf: a run of references in [`Bvh::references`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Leaf {
    /// Bounds of the leaf.
    pub bbox: BBox,
    /// Index of the first reference.
    pub first: u32,
    /// Number of references.
    pub count: u32,
}

/// Structural problems found by [`BvhWriter::finish`] and [`Bvh::validate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Nothing was written.
    #[error("the tree has no root")]
    MissingRoot,
    /// A child slot never received a subtree.
    #[error("child slot {slot} of node {node} is not linked")]
    UnlinkedChild {
        /// Node index.
        node: u32,
        /// Slot within the node.
        slot: usize,
    },
    /// A child's bounds are not contained in its parent's.
    #[error("child slot {slot} of node {node} extends outside its parent")]
    ChildOutsideParent {
        /// Node index.
        node: u32,
        /// Slot within the node.
        slot: usize,
    },
    /// A leaf reference lies outside the leaf bounds.
    #[error("reference {reference} of leaf {leaf} extends outside the leaf")]
    ReferenceOutsideLeaf {
        /// Leaf index.
        leaf: u32,
        /// Position within the leaf.
        reference: usize,
    },
    /// A node or leaf arrived after the tree was already complete.
    #[error("a subtree was written after the tree was complete")]
    DetachedSubtree,
}

/// A bounding volume hierarchy in flat arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bvh {
    root: Option<ChildRef>,
    nodes: Vec<Node>,
    leaves: Vec<Leaf>,
    references: Vec<Reference>,
}

impl Bvh {
    /// The tree used for an empty scene: one node with a single empty leaf.
    ///
    /// Builders reject empty input, so callers substitute this to keep a valid root.
    pub fn sentinel() -> Self {
        Self {
            root: Some(ChildRef::Node(0)),
            nodes: vec![Node {
                bbox: BBox::EMPTY,
                children: vec![Child {
                    bbox: BBox::EMPTY,
                    link: Some(ChildRef::Leaf(0)),
                }],
            }],
            leaves: vec![Leaf {
                bbox: BBox::EMPTY,
                first: 0,
                count: 0,
            }],
            references: Vec::new(),
        }
    }

    /// The root, which is always a node for trees produced by the builders.
    pub fn root(&self) -> Option<ChildRef> {
        self.root
    }

    /// Bounds of the whole tree.
    pub fn bounds(&self) -> BBox {
        match self.root {
            Some(r) => self.bbox_of(r),
            None => BBox::EMPTY,
        }
    }

    /// All nodes; the root node comes first.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All leaves, in pre-order.
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// All leaf references, leaf after leaf.
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// References stored in `leaf`.
    pub fn leaf_references(&self, leaf: &Leaf) -> &[Reference] {
        let first = leaf.first as usize;
        &self.references[first..first + leaf.count as usize]
    }

    /// Primitive ids stored in `leaf`.
    pub fn leaf_primitives<'a>(&'a self, leaf: &Leaf) -> impl Iterator<Item = u32> + use<'a> {
        self.leaf_references(leaf).iter().map(|r| r.id)
    }

    fn bbox_of(&self, r: ChildRef) -> BBox {
        match r {
            ChildRef::Node(i) => self.nodes[i as usize].bbox,
            ChildRef::Leaf(i) => self.leaves[i as usize].bbox,
        }
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> u32 {
        let Some(root) = self.root else {
            return 0;
        };
        let mut deepest = 0;
        let mut stack = vec![(root, 0_u32)];
        while let Some((r, d)) = stack.pop() {
            match r {
                ChildRef::Leaf(_) => deepest = deepest.max(d),
                ChildRef::Node(i) => {
                    for child in &self.nodes[i as usize].children {
                        if let Some(link) = child.link {
                            stack.push((link, d + 1));
                        }
                    }
                }
            }
        }
        deepest
    }

    /// Check linkage and containment.
    ///
    /// Every child slot must be linked, every child must lie inside its slot's bounds
    /// and its parent's, and every leaf reference inside its leaf. Containment is exact:
    /// builders only ever take unions and intersections of input bounds.
    pub fn validate(&self) -> Result<(), TreeError> {
        let root = self.root.ok_or(TreeError::MissingRoot)?;
        let mut stack = vec![root];
        while let Some(r) = stack.pop() {
            match r {
                ChildRef::Node(i) => {
                    let node = &self.nodes[i as usize];
                    for (slot, child) in node.children.iter().enumerate() {
                        let link = child.link.ok_or(TreeError::UnlinkedChild { node: i, slot })?;
                        if !node.bbox.contains_box(&child.bbox, 0.0)
                            || !child.bbox.contains_box(&self.bbox_of(link), 0.0)
                        {
                            return Err(TreeError::ChildOutsideParent { node: i, slot });
                        }
                        stack.push(link);
                    }
                }
                ChildRef::Leaf(i) => {
                    let leaf = &self.leaves[i as usize];
                    for (reference, r) in self.leaf_references(leaf).iter().enumerate() {
                        if !leaf.bbox.contains_box(&r.bbox, 0.0) {
                            return Err(TreeError::ReferenceOutsideLeaf { leaf: i, reference });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Ids of the primitives with a reference overlapping `query`, sorted, without repeats.
    pub fn query_box(&self, query: &BBox) -> Vec<u32> {
        let mut out = Vec::new();
        let Some(root) = self.root else {
            return out;
        };
        let mut stack = vec![root];
        while let Some(r) = stack.pop() {
            if self.bbox_of(r).overlap(query).is_empty() {
                continue;
            }
            match r {
                ChildRef::Leaf(i) => {
                    let leaf = &self.leaves[i as usize];
                    for reference in self.leaf_references(leaf) {
                        if !reference.bbox.overlap(query).is_empty() {
                            out.push(reference.id);
                        }
                    }
                }
                ChildRef::Node(i) => {
                    stack.extend(self.nodes[i as usize].children.iter().filter_map(|c| c.link));
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Expected cost of a random ray traversal relative to the root's area.
    ///
    /// Sums `traversal_cost` over nodes and `leaf_cost` over leaves, divided by the root's
    /// half-area. Lower is better; compare trees over the same input only.
    pub fn sah_cost<C: CostModel + ?Sized>(&self, cost: &C) -> f64 {
        let root_area = self.bounds().half_area();
        if root_area <= 0.0 {
            return 0.0;
        }
        let nodes: f64 = self
            .nodes
            .iter()
            .map(|n| cost.traversal_cost(n.bbox.half_area()))
            .sum();
        let leaves: f64 = self
            .leaves
            .iter()
            .map(|l| cost.leaf_cost(l.count as usize, l.bbox.half_area()))
            .sum();
        (nodes + leaves) / root_area
    }
}

/// A [`BvhSink`] that assembles a [`Bvh`].
///
/// ```
/// use glam::Vec3;
/// use lumen_bvh::{BBox, BvhSink, BvhWriter, ChildRef, Reference};
///
/// let a = BBox::new(Vec3::ZERO, Vec3::ONE);
/// let b = BBox::new(Vec3::splat(2.0), Vec3::splat(3.0));
/// let mut writer = BvhWriter::new();
/// writer.write_node(&a.union(&b), &[a, b]);
/// writer.write_leaf(&a, &[Reference::new(0, a)]);
/// writer.write_leaf(&b, &[Reference::new(1, b)]);
/// let bvh = writer.finish().unwrap();
/// assert_eq!(bvh.root(), Some(ChildRef::Node(0)));
/// assert_eq!(bvh.query_box(&b), vec![1]);
/// ```
#[derive(Debug, Default)]
pub struct BvhWriter {
    bvh: Bvh,
    pending: Vec<(u32, usize)>,
    detached: bool,
}

impl BvhWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish writing and return the tree.
    ///
    /// Fails if nothing was written, a slot was left unlinked, or a subtree arrived after
    /// the tree was complete.
    pub fn finish(self) -> Result<Bvh, TreeError> {
        if self.detached {
            return Err(TreeError::DetachedSubtree);
        }
        if let Some(&(node, slot)) = self.pending.last() {
            return Err(TreeError::UnlinkedChild { node, slot });
        }
        if self.bvh.root.is_none() {
            return Err(TreeError::MissingRoot);
        }
        Ok(self.bvh)
    }

    fn link(&mut self, r: ChildRef) {
        match self.pending.pop() {
            Some((node, slot)) => {
                self.bvh.nodes[node as usize].children[slot].link = Some(r);
            }
            None if self.bvh.root.is_none() => self.bvh.root = Some(r),
            None => self.detached = true,
        }
    }
}

impl BvhSink for BvhWriter {
    fn write_node(&mut self, bbox: &BBox, children: &[BBox]) {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Node count is bounded by the u32 primitive id space."
        )]
        let index = self.bvh.nodes.len() as u32;
        self.link(ChildRef::Node(index));
        self.bvh.nodes.push(Node {
            bbox: *bbox,
            children: children
                .iter()
                .map(|&bbox| Child { bbox, link: None })
                .collect(),
        });
        self.pending
            .extend((0..children.len()).rev().map(|slot| (index, slot)));
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "Leaf and reference counts stay within u32 for u32 primitive ids."
    )]
    fn write_leaf(&mut self, bbox: &BBox, refs: &[Reference]) {
        let index = self.bvh.leaves.len() as u32;
        self.link(ChildRef::Leaf(index));
        self.bvh.leaves.push(Leaf {
            bbox: *bbox,
            first: self.bvh.references.len() as u32,
            count: refs.len() as u32,
        });
        self.bvh.references.extend_from_slice(refs);
    }
}
