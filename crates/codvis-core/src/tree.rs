//! Node arena using petgraph::StableDiGraph, with containment edges from
//! parent to child

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};

use crate::error::TreeError;
use crate::model::{GraphNode, NodeId, NodeKind};

/// Edge weight for the parent → child relation. Not an ownership pointer:
/// the arena owns every node, the edge only records where it hangs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Containment;

/// A descendant together with its depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Successor {
    pub id: NodeId,
    pub level: usize,
}

/// The node hierarchy. Each node has at most one parent and an ordered list
/// of children; the subtree-size index of every node is kept current as
/// subtrees are attached.
pub struct NodeTree {
    inner: StableDiGraph<GraphNode, Containment>,
}

impl std::fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTree")
            .field("node_count", &self.inner.node_count())
            .field("root_count", &self.roots().len())
            .finish()
    }
}

impl NodeTree {
    pub fn new() -> Self {
        NodeTree {
            inner: StableDiGraph::new(),
        }
    }

    /// Add a detached node. It stays a root until attached with [`Self::add_child`].
    ///
    /// Children and subtree index are arena state: a node copied out of a
    /// tree comes back in as a leaf.
    pub fn insert(&mut self, mut node: GraphNode) -> NodeId {
        if !node.children.is_empty() {
            tracing::debug!(
                "Dropping {} stale child handles of {} on insert",
                node.children.len(),
                node.name()
            );
            node.children.clear();
        }
        node.index = 1;
        self.inner.add_node(node).into()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.inner.contains_node(id.into())
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.inner.node_weight(id.into())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.inner.node_weight_mut(id.into())
    }

    pub fn len(&self) -> usize {
        self.inner.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// Iterate over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GraphNode)> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx).map(|n| (NodeId::from(idx), n)))
    }

    /// Nodes without a parent, in insertion order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.inner
            .node_indices()
            .filter(|&idx| {
                self.inner
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(NodeId::from)
            .collect()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let idx: NodeIndex = id.into();
        if !self.inner.contains_node(idx) {
            return None;
        }
        self.inner
            .neighbors_directed(idx, Direction::Incoming)
            .next()
            .map(NodeId::from)
    }

    /// Ordered children; empty for leaves and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children()).unwrap_or(&[])
    }

    /// Parent chain of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.parent(parent);
        }
        ancestors
    }

    /// Attach the detached subtree rooted at `child` as the last child of
    /// `parent`.
    ///
    /// Rejections are logged and leave the tree untouched.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let result = self.attach(parent, child);
        if let Err(e) = &result {
            tracing::warn!("Could not add child to tree: {}", e);
        }
        result
    }

    /// Insert `node` and attach it under `parent` in one step.
    pub fn add_child_node(&mut self, parent: NodeId, node: GraphNode) -> Result<NodeId, TreeError> {
        if !self.contains(parent) {
            tracing::warn!("Could not add child to tree: unknown parent {}", parent);
            return Err(TreeError::UnknownNode(parent));
        }
        let child = self.insert(node);
        self.add_child(parent, child)?;
        Ok(child)
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        for id in [parent, child] {
            if !self.contains(id) {
                return Err(TreeError::UnknownNode(id));
            }
        }
        if let Some(existing) = self.parent(child) {
            return Err(TreeError::AlreadyAttached {
                child,
                parent: existing,
            });
        }
        if parent == child || self.ancestors(parent).contains(&child) {
            return Err(TreeError::WouldCycle { parent, child });
        }

        let added = self.node(child).map_or(1, GraphNode::index);
        self.inner.add_edge(parent.into(), child.into(), Containment);
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }

        let mut current = Some(parent);
        while let Some(id) = current {
            if let Some(node) = self.node_mut(id) {
                node.index += added;
            }
            current = self.parent(id);
        }

        tracing::debug!("Attached {} under {} ({} nodes)", child, parent, added);
        Ok(())
    }

    /// Cached subtree-size index of a node: 1 plus its descendant count.
    pub fn index(&self, id: NodeId) -> Option<usize> {
        self.node(id).map(GraphNode::index)
    }

    /// Sum of the children's indices, i.e. the number of descendants.
    pub fn subtree_size(&self, id: NodeId) -> Option<usize> {
        let node = self.node(id)?;
        Some(node.children.iter().filter_map(|&c| self.index(c)).sum())
    }

    /// Recompute the index of every node in the subtree from the children up
    /// and return the new index of `id`.
    pub fn refresh_index(&mut self, id: NodeId) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        // Reverse pre-order visits every child before its parent.
        for current in self.preorder(id).into_iter().rev() {
            let index = 1 + self
                .children(current)
                .iter()
                .filter_map(|&c| self.index(c))
                .sum::<usize>();
            if let Some(node) = self.node_mut(current) {
                node.index = index;
            }
        }
        self.index(id)
    }

    /// Resolve a flattened offset within `root`'s subtree.
    ///
    /// The flattening is post-order: each child's subtree occupies a
    /// contiguous range, in child order, and a node sits at `index - 1`
    /// after all of its descendants.
    pub fn get_node(&self, root: NodeId, requested: usize) -> Option<NodeId> {
        let mut current = root;
        let mut requested = requested;
        loop {
            let node = self.node(current)?;
            if requested >= node.index {
                return None;
            }
            if requested == node.index - 1 {
                return Some(current);
            }

            let mut offset = 0;
            let mut next = None;
            for &child in &node.children {
                let size = self.index(child)?;
                if requested < offset + size {
                    next = Some(child);
                    break;
                }
                offset += size;
            }
            current = next?;
            requested -= offset;
        }
    }

    /// Inverse of [`Self::get_node`]: the flattened offset of `id` within
    /// `root`'s subtree, or `None` if `id` is not below `root`.
    pub fn flat_offset(&self, root: NodeId, id: NodeId) -> Option<usize> {
        let mut offset = self.index(id)? - 1;
        let mut current = id;
        while current != root {
            let parent = self.parent(current)?;
            offset += self
                .children(parent)
                .iter()
                .take_while(|&&c| c != current)
                .filter_map(|&c| self.index(c))
                .sum::<usize>();
            current = parent;
        }
        Some(offset)
    }

    /// First node named `name` in a pre-order walk of `root`'s subtree.
    pub fn find_by_name(&self, root: NodeId, name: &str) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            if node.name() == name {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Subtree-size index of the first node named `name` below `root`.
    pub fn node_index(&self, root: NodeId, name: &str) -> Option<usize> {
        self.find_by_name(root, name).and_then(|id| self.index(id))
    }

    /// Find an immediate child of `parent` by name and kind.
    ///
    /// A query for a class also matches a variable of that name. When the
    /// match carries a resolved type, the sibling class with that type's name
    /// is returned instead (one level of indirection only). A variable found
    /// by a variable query is returned as itself.
    pub fn child_by_name_and_kind(
        &self,
        parent: NodeId,
        name: &str,
        kind: &NodeKind,
    ) -> Option<NodeId> {
        let children = self.children(parent);
        let matched = children.iter().copied().find(|&c| {
            self.node(c)
                .is_some_and(|n| n.name() == name && n.matches_kind(kind))
        })?;

        let node = self.node(matched)?;
        let redirects = *kind == NodeKind::Class || *node.kind() != NodeKind::Variable;
        match node.model_metadata().and_then(|m| m.type_name.as_deref()) {
            Some(type_name) if redirects => children.iter().copied().find(|&c| {
                self.node(c)
                    .is_some_and(|n| n.name() == type_name && *n.kind() == NodeKind::Class)
            }),
            _ => Some(matched),
        }
    }

    /// Every descendant of `id`, each child's descendants before the child
    /// itself. Children of `id` are reported at `level + 1`.
    pub fn successors(&self, id: NodeId, level: usize) -> Vec<Successor> {
        let mut out = Vec::new();
        // (node, level, children already expanded)
        let mut stack: Vec<(NodeId, usize, bool)> = self
            .children(id)
            .iter()
            .rev()
            .map(|&c| (c, level + 1, false))
            .collect();
        while let Some((current, depth, expanded)) = stack.pop() {
            if expanded {
                out.push(Successor {
                    id: current,
                    level: depth,
                });
                continue;
            }
            stack.push((current, depth, true));
            stack.extend(
                self.children(current)
                    .iter()
                    .rev()
                    .map(|&c| (c, depth + 1, false)),
            );
        }
        out
    }

    /// `root` followed by its descendants, parents before children.
    pub fn preorder(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// The other children of `id`'s parent. A root has no siblings.
    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.parent(id) {
            Some(parent) => self
                .children(parent)
                .iter()
                .copied()
                .filter(|&c| c != id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// The nearest node typed `class`, starting with `id` itself and walking
    /// up the parent chain.
    pub fn encapsulating_class(&self, id: NodeId) -> Result<NodeId, TreeError> {
        if !self.contains(id) {
            return Err(TreeError::UnknownNode(id));
        }
        let mut current = Some(id);
        while let Some(candidate) = current {
            if self
                .node(candidate)
                .is_some_and(|n| *n.kind() == NodeKind::Class)
            {
                return Ok(candidate);
            }
            current = self.parent(candidate);
        }
        Err(TreeError::NoEncapsulatingClass(id))
    }

    /// The scope a node's links refer to: its parent's children, or the
    /// list of roots for a root node.
    pub fn scope_of(&self, id: NodeId) -> Vec<NodeId> {
        match self.parent(id) {
            Some(parent) => self.children(parent).to_vec(),
            None => self.roots(),
        }
    }

    /// Link `from` to `to`, keyed by `to`'s position in their shared scope.
    /// Returns that position.
    pub fn link_nodes(&mut self, from: NodeId, to: NodeId, strength: f32) -> Result<usize, TreeError> {
        for id in [from, to] {
            if !self.contains(id) {
                return Err(TreeError::UnknownNode(id));
            }
        }
        if self.parent(from) != self.parent(to) {
            return Err(TreeError::NotInScope { node: from, target: to });
        }
        let position = self
            .scope_of(from)
            .iter()
            .position(|&c| c == to)
            .ok_or(TreeError::NotInScope { node: from, target: to })?;
        if let Some(node) = self.node_mut(from) {
            node.set_link(position, strength);
        }
        Ok(position)
    }

    pub fn set_finalized_index(&mut self, id: NodeId, index: usize) -> Result<(), TreeError> {
        self.node_mut(id)
            .ok_or(TreeError::UnknownNode(id))?
            .set_finalized_index(index);
        Ok(())
    }

    pub fn set_drawable_index(&mut self, id: NodeId, index: usize) -> Result<(), TreeError> {
        self.node_mut(id)
            .ok_or(TreeError::UnknownNode(id))?
            .set_drawable_index(index);
        Ok(())
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}
