//! Ordered labelled trees.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Each node keeps
//! parent, first/last child and previous/next sibling links so children can
//! be appended, detached and spliced in constant time. Labels are interned;
//! a node stores its label id.

use crate::alphabet::Alphabet;
use crate::error::{Error, Result};
use crate::navigation::{Navigate, Preorder, Visit};
use std::hash::Hash;

/// Index of a node in its tree's arena.
pub type NodeId = usize;

/// One element of the open/close tag form of a tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag<L> {
    Open(L),
    Close,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Node {
    label: u32,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    num_children: usize,
    removed: bool,
}

/// An ordered tree with labels of type `L`.
#[derive(Debug, Clone)]
pub struct Tree<L> {
    nodes: Vec<Node>,
    labels: Alphabet<L>,
    root: Option<NodeId>,
    edges: usize,
    live: usize,
}

impl<L: Hash + Eq + Clone> Tree<L> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            labels: Alphabet::new(),
            root: None,
            edges: 0,
            live: 0,
        }
    }

    /// Adds a detached node. The first node added becomes the root.
    pub fn add_node(&mut self, label: L) -> Result<NodeId> {
        let label = self.labels.intern(label)?;
        let id = self.nodes.len();
        self.nodes.push(Node {
            label,
            ..Node::default()
        });
        self.live += 1;
        if self.root.is_none() {
            self.root = Some(id);
        }
        Ok(id)
    }

    /// Adds a node as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, label: L) -> Result<NodeId> {
        self.check_live(parent)?;
        let child = self.add_node(label)?;
        self.append_child(parent, child);
        Ok(child)
    }

    /// Makes the detached node `child` the last child of `parent`.
    ///
    /// If `child` was the root, the root moves to the top of `parent`'s
    /// ancestry.
    pub fn add_edge(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_live(parent)?;
        self.check_live(child)?;
        if self.nodes[child].parent.is_some() {
            return Err(Error::invalid_tree(child, "node already has a parent"));
        }
        let mut top = parent;
        loop {
            if top == child {
                return Err(Error::invalid_tree(child, "edge would close a cycle"));
            }
            match self.nodes[top].parent {
                Some(up) => top = up,
                None => break,
            }
        }
        self.append_child(parent, child);
        if self.root == Some(child) {
            self.root = Some(top);
        }
        Ok(())
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let last = self.nodes[parent].last_child;
        {
            let node = &mut self.nodes[child];
            node.parent = Some(parent);
            node.prev_sibling = last;
            node.next_sibling = None;
        }
        match last {
            Some(last) => self.nodes[last].next_sibling = Some(child),
            None => self.nodes[parent].first_child = Some(child),
        }
        let node = &mut self.nodes[parent];
        node.last_child = Some(child);
        node.num_children += 1;
        self.edges += 1;
    }

    /// Detaches `child` from `parent`. The child keeps its own subtree.
    pub fn remove_edge(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_live(parent)?;
        self.check_live(child)?;
        if self.nodes[child].parent != Some(parent) {
            return Err(Error::invalid_tree(child, "no edge from the given parent"));
        }
        self.detach(child);
        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes[child].parent else {
            return;
        };
        let (prev, next) = {
            let node = &self.nodes[child];
            (node.prev_sibling, node.next_sibling)
        };
        match prev {
            Some(prev) => self.nodes[prev].next_sibling = next,
            None => self.nodes[parent].first_child = next,
        }
        match next {
            Some(next) => self.nodes[next].prev_sibling = prev,
            None => self.nodes[parent].last_child = prev,
        }
        self.nodes[parent].num_children -= 1;

        let node = &mut self.nodes[child];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        self.edges -= 1;
    }

    /// Detaches `node` and marks it and its descendants removed. Their ids
    /// stay reserved until [`compact`](Self::compact).
    pub fn remove_subtree(&mut self, node: NodeId) -> Result<()> {
        self.check_live(node)?;
        self.detach(node);
        if self.root == Some(node) {
            self.root = None;
        }

        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let mut child = self.nodes[id].first_child;
            while let Some(c) = child {
                stack.push(c);
                child = self.nodes[c].next_sibling;
            }
            self.edges -= self.nodes[id].num_children;
            self.nodes[id] = Node {
                removed: true,
                ..Node::default()
            };
            self.live -= 1;
        }
        Ok(())
    }

    /// Renumbers live nodes contiguously, keeping their relative order.
    ///
    /// Returns the old-to-new id map; removed nodes map to `None`.
    pub fn compact(&mut self) -> Vec<Option<NodeId>> {
        let mut map = vec![None; self.nodes.len()];
        let mut next = 0;
        for (old, node) in self.nodes.iter().enumerate() {
            if !node.removed {
                map[old] = Some(next);
                next += 1;
            }
        }

        let remap = |id: Option<NodeId>| id.and_then(|id| map[id]);
        let nodes = std::mem::take(&mut self.nodes);
        self.nodes = nodes
            .into_iter()
            .filter(|node| !node.removed)
            .map(|node| Node {
                parent: remap(node.parent),
                first_child: remap(node.first_child),
                last_child: remap(node.last_child),
                prev_sibling: remap(node.prev_sibling),
                next_sibling: remap(node.next_sibling),
                ..node
            })
            .collect();
        self.root = remap(self.root);
        map
    }

    /// Validates that parent, child and sibling links agree, that every live
    /// node hangs off the root and that the counters match.
    pub fn check_consistency(&self) -> Result<()> {
        let n = self.nodes.len();
        let mut parented = 0;
        let mut listed = 0;

        for (id, node) in self.nodes.iter().enumerate() {
            if node.removed {
                continue;
            }
            if let Some(parent) = node.parent {
                self.expect_live(parent, id, "parent link to a missing node")?;
                parented += 1;
            }

            // Walk the child list forwards, checking the backward links.
            let mut prev: Option<NodeId> = None;
            let mut child = node.first_child;
            let mut count = 0;
            while let Some(c) = child {
                self.expect_live(c, id, "child link to a missing node")?;
                let cn = &self.nodes[c];
                if cn.parent != Some(id) {
                    return Err(Error::invalid_tree(c, "child does not point back to its parent"));
                }
                if cn.prev_sibling != prev {
                    return Err(Error::invalid_tree(c, "sibling links disagree"));
                }
                count += 1;
                if count > n {
                    return Err(Error::invalid_tree(id, "cycle in child list"));
                }
                prev = Some(c);
                child = cn.next_sibling;
            }
            if node.last_child != prev {
                return Err(Error::invalid_tree(id, "last child link is wrong"));
            }
            if count != node.num_children {
                return Err(Error::invalid_tree(id, "child count is wrong"));
            }
            listed += count;
        }

        if parented != listed {
            return Err(Error::invalid_tree(
                self.nodes
                    .iter()
                    .position(|node| !node.removed && node.parent.is_some())
                    .unwrap_or(0),
                "node missing from its parent's child list",
            ));
        }
        if parented != self.edges {
            return Err(Error::invalid_tree(0, "edge count is wrong"));
        }

        match self.root {
            Some(root) => {
                self.expect_live(root, root, "root is missing")?;
                if self.nodes[root].parent.is_some() {
                    return Err(Error::invalid_tree(root, "root has a parent"));
                }
                let reached = Preorder::new(self)
                    .filter(|visit| matches!(visit, Visit::Open(_)))
                    .count();
                if reached != self.live {
                    return Err(Error::invalid_tree(root, "nodes unreachable from the root"));
                }
            }
            None if self.live > 0 => {
                return Err(Error::invalid_tree(0, "live nodes but no root"));
            }
            None => {}
        }
        Ok(())
    }

    fn check_live(&self, id: NodeId) -> Result<()> {
        match self.nodes.get(id) {
            Some(node) if !node.removed => Ok(()),
            _ => Err(Error::invalid_tree(id, "no such node")),
        }
    }

    fn expect_live(&self, id: NodeId, at: NodeId, reason: &'static str) -> Result<()> {
        match self.nodes.get(id) {
            Some(node) if !node.removed => Ok(()),
            _ => Err(Error::invalid_tree(at, reason)),
        }
    }

    /// Builds a tree from per-node labels and parent links. Children are
    /// ordered by id; exactly one node may have no parent.
    pub fn from_parents<I>(labels: I, parents: &[Option<NodeId>]) -> Result<Self>
    where
        I: IntoIterator<Item = L>,
    {
        let mut tree = Tree::new();
        for label in labels {
            tree.add_node(label)?;
        }
        if tree.nodes.len() != parents.len() {
            return Err(Error::invalid_tree(
                tree.nodes.len().min(parents.len()),
                "label and parent counts differ",
            ));
        }
        let mut root = None;
        for (child, parent) in parents.iter().enumerate() {
            match *parent {
                Some(parent) => tree.add_edge(parent, child)?,
                None if root.is_some() => {
                    return Err(Error::invalid_tree(child, "more than one root"));
                }
                None => root = Some(child),
            }
        }
        tree.root = root;
        tree.check_consistency()?;
        Ok(tree)
    }

    /// Builds a tree from its open/close tag form.
    pub fn from_tags<I>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = Tag<L>>,
    {
        let mut tree = Tree::new();
        let mut open: Vec<NodeId> = Vec::new();
        for tag in tags {
            match tag {
                Tag::Open(label) => {
                    let id = match open.last() {
                        Some(&parent) => tree.add_child(parent, label)?,
                        None if tree.root.is_some() => {
                            return Err(Error::invalid_tree(tree.nodes.len(), "more than one root"));
                        }
                        None => tree.add_node(label)?,
                    };
                    open.push(id);
                }
                Tag::Close => {
                    if open.pop().is_none() {
                        return Err(Error::invalid_tree(tree.nodes.len(), "unbalanced close tag"));
                    }
                }
            }
        }
        if let Some(&unclosed) = open.last() {
            return Err(Error::invalid_tree(unclosed, "unclosed tag"));
        }
        Ok(tree)
    }

    /// The open/close tag form in preorder.
    pub fn tags(&self) -> Vec<Tag<L>> {
        Preorder::new(self)
            .map(|visit| match visit {
                Visit::Open(node) => Tag::Open(self.label(node).clone()),
                Visit::Close(_) => Tag::Close,
            })
            .collect()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of allocated ids, removed nodes included.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.check_live(id).is_ok()
    }

    pub fn label(&self, id: NodeId) -> &L {
        &self.labels.values()[self.nodes[id].label as usize]
    }

    /// Interned id of the node's label.
    pub fn label_id(&self, id: NodeId) -> u32 {
        self.nodes[id].label
    }

    pub fn labels(&self) -> &Alphabet<L> {
        &self.labels
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].next_sibling
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].prev_sibling
    }

    pub fn num_children(&self, id: NodeId) -> usize {
        self.nodes[id].num_children
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id].first_child.is_none()
    }

    /// Children of `id`, in order.
    pub fn children(&self, id: NodeId) -> Children<'_, L> {
        Children {
            tree: self,
            next: self.nodes[id].first_child,
        }
    }

    /// Moves all children of `from` to the end of `to`'s child list.
    pub(crate) fn adopt_children(&mut self, from: NodeId, to: NodeId) {
        let Some(first) = self.nodes[from].first_child else {
            return;
        };
        let mut child = Some(first);
        while let Some(c) = child {
            self.nodes[c].parent = Some(to);
            child = self.nodes[c].next_sibling;
        }
        let moved = self.nodes[from].num_children;
        let last = self.nodes[from].last_child;
        match self.nodes[to].last_child {
            Some(old_last) => {
                self.nodes[old_last].next_sibling = Some(first);
                self.nodes[first].prev_sibling = Some(old_last);
            }
            None => self.nodes[to].first_child = Some(first),
        }
        self.nodes[to].last_child = last;
        self.nodes[to].num_children += moved;

        let node = &mut self.nodes[from];
        node.first_child = None;
        node.last_child = None;
        node.num_children = 0;
    }

    /// Detaches a childless node and marks it removed.
    pub(crate) fn remove_leaf(&mut self, id: NodeId) {
        debug_assert!(self.nodes[id].first_child.is_none());
        self.detach(id);
        if self.root == Some(id) {
            self.root = None;
        }
        self.nodes[id] = Node {
            removed: true,
            ..Node::default()
        };
        self.live -= 1;
    }

    #[cfg(test)]
    pub(crate) fn corrupt_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.nodes[id].parent = parent;
    }
}

impl<L: Hash + Eq + Clone> Default for Tree<L> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the children of a node.
pub struct Children<'a, L> {
    tree: &'a Tree<L>,
    next: Option<NodeId>,
}

impl<L> Iterator for Children<'_, L> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.nodes[id].next_sibling;
        Some(id)
    }
}

impl<L: Hash + Eq + Clone> Navigate for Tree<L> {
    type Label = L;

    fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].parent
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].first_child
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].next_sibling
    }

    fn label(&self, node: NodeId) -> &L {
        Tree::label(self, node)
    }
}
