//! River graph stored as an index-based forest
//!
//! All nodes live in one owning `Vec`; parents refer to children (and children
//! back to parents) by `NodeId`. A node is owned by its parent in the sense
//! that removing a node always removes its whole subtree.

use std::collections::VecDeque;

use thiserror::Error;

use crate::geometry::Vec2;

/// Index of a node in its `RiverGraph`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One channel segment from `start` to `end`
#[derive(Clone, Debug, PartialEq)]
pub struct RiverNode {
    pub start: Vec2,
    pub end: Vec2,
    /// Full channel width
    pub width: f32,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    /// Distance from the root in edges
    pub depth: usize,
    /// Position of this channel in the bend noise field, fixed at creation
    pub bend_offset: Vec2,
    /// End was snapped onto another branch's mouth
    pub merged: bool,
}

impl RiverNode {
    /// Straight chord length
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// Unit chord direction (zero for a degenerate node)
    pub fn direction(&self) -> Vec2 {
        (self.end - self.start).normalized()
    }

    pub fn heading(&self) -> f32 {
        (self.end - self.start).heading_deg()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GraphDefect {
    #[error("node {0:?} has non-positive or non-finite width {1}")]
    BadWidth(NodeId, f32),
    #[error("node {0:?} is narrower than the minimum channel width ({1} < {2})")]
    BelowMinimum(NodeId, f32, f32),
    #[error("children of node {0:?} are wider than their parent ({1} > {2})")]
    WidthInvented(NodeId, f32, f32),
    #[error("node {0:?} is reachable more than once")]
    Revisited(NodeId),
    #[error("node {0:?} is not reachable from any root")]
    Unreachable(NodeId),
    #[error("node {child:?} does not start where its parent {parent:?} ends")]
    Disjoint { parent: NodeId, child: NodeId },
}

/// A forest of river trees
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RiverGraph {
    nodes: Vec<RiverNode>,
    roots: Vec<NodeId>,
}

impl RiverGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn nodes(&self) -> &[RiverNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &RiverNode {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut RiverNode {
        &mut self.nodes[id.index()]
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Add a new tree root
    pub fn add_root(&mut self, start: Vec2, end: Vec2, width: f32, bend_offset: Vec2) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(RiverNode {
            start,
            end,
            width,
            children: Vec::new(),
            parent: None,
            depth: 0,
            bend_offset,
            merged: false,
        });
        self.roots.push(id);
        id
    }

    /// Add a child continuing from the end of `parent`
    pub fn add_child(&mut self, parent: NodeId, end: Vec2, width: f32, bend_offset: Vec2) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let (start, depth) = {
            let p = self.node(parent);
            (p.end, p.depth + 1)
        };
        self.nodes.push(RiverNode {
            start,
            end,
            width,
            children: Vec::new(),
            parent: Some(parent),
            depth,
            bend_offset,
            merged: false,
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Parent chain of a node, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            result.push(p);
            current = self.parent(p);
        }
        result
    }

    pub fn is_ancestor(&self, candidate: NodeId, of: NodeId) -> bool {
        let mut current = self.parent(of);
        while let Some(p) = current {
            if p == candidate {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Every node below `id`, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        while let Some(n) = stack.pop() {
            result.push(n);
            stack.extend_from_slice(self.children(n));
        }
        result
    }

    pub fn leaves(&self) -> Vec<NodeId> {
        self.ids().filter(|id| self.node(*id).is_leaf()).collect()
    }

    /// Breadth-first order from the roots, children in stored order
    pub fn bfs_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue: VecDeque<NodeId> = self.roots.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.children(id).iter().copied());
        }
        order
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn max_width(&self) -> f32 {
        self.nodes.iter().map(|n| n.width).fold(0.0, f32::max)
    }

    /// Sum of chord lengths
    pub fn total_length(&self) -> f32 {
        self.nodes.iter().map(|n| n.length()).sum()
    }

    /// Keep only nodes whose `keep` flag is set, compacting ids.
    ///
    /// The removed set must be closed under descendants. Returns the number of
    /// nodes removed.
    pub fn retain(&mut self, keep: &[bool]) -> usize {
        debug_assert_eq!(keep.len(), self.nodes.len());

        let mut remap: Vec<Option<NodeId>> = Vec::with_capacity(self.nodes.len());
        let mut next = 0u32;
        for &k in keep {
            if k {
                remap.push(Some(NodeId(next)));
                next += 1;
            } else {
                remap.push(None);
            }
        }

        let removed = self.nodes.len() - next as usize;
        if removed == 0 {
            return 0;
        }

        let old = std::mem::take(&mut self.nodes);
        self.nodes = old
            .into_iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|(mut node, _)| {
                node.children = node.children.iter().filter_map(|c| remap[c.index()]).collect();
                node.parent = node.parent.and_then(|p| remap[p.index()]);
                node
            })
            .collect();
        self.roots = self.roots.iter().filter_map(|r| remap[r.index()]).collect();

        removed
    }

    /// Check the structural invariants of the forest.
    pub fn validate(&self, min_width: f32) -> Result<(), GraphDefect> {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue: VecDeque<NodeId> = self.roots.iter().copied().collect();

        while let Some(id) = queue.pop_front() {
            if std::mem::replace(&mut seen[id.index()], true) {
                return Err(GraphDefect::Revisited(id));
            }
            let node = self.node(id);
            if !(node.width > 0.0 && node.width.is_finite()) {
                return Err(GraphDefect::BadWidth(id, node.width));
            }
            if node.width < min_width - 1e-4 {
                return Err(GraphDefect::BelowMinimum(id, node.width, min_width));
            }

            let child_sum: f32 = node.children.iter().map(|c| self.node(*c).width).sum();
            if child_sum > node.width * (1.0 + 1e-5) + 1e-4 {
                return Err(GraphDefect::WidthInvented(id, child_sum, node.width));
            }
            for &child in &node.children {
                if self.node(child).start.distance(node.end) > 1e-3 {
                    return Err(GraphDefect::Disjoint { parent: id, child });
                }
                queue.push_back(child);
            }
        }

        match seen.iter().position(|s| !s) {
            Some(i) => Err(GraphDefect::Unreachable(NodeId(i as u32))),
            None => Ok(()),
        }
    }
}
