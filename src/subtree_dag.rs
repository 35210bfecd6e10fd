//! Minimal DAG of identical subtrees.
//!
//! Each node is a label plus the ordered list of its children's canonical
//! ids, so two nodes share an id exactly when their whole subtrees are
//! equal. This only shares complete subtrees; the Top DAG also shares
//! fragments, which is why it serves as the baseline in tree reports.

use crate::alphabet::Alphabet;
use crate::error::{Error, Result};
use crate::navigation::{Preorder, Visit};
use crate::node_map::NodeMap;
use crate::tree::{NodeId, Tree};
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubtreeNode {
    pub label: u32,
    pub children: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct SubtreeDag<L> {
    map: NodeMap<SubtreeNode>,
    labels: Alphabet<L>,
    root: Option<u32>,
}

impl<L: Hash + Eq + Clone> SubtreeDag<L> {
    /// Shares all identical subtrees of `tree` in one post-order pass.
    pub fn build(tree: &Tree<L>) -> Result<Self> {
        tree.check_consistency()?;
        let mut map = NodeMap::new();
        let mut root = None;
        // Canonical ids of the finished children of every open node
        let mut open: Vec<Vec<u32>> = Vec::new();
        for visit in Preorder::new(tree) {
            match visit {
                Visit::Open(_) => open.push(Vec::new()),
                Visit::Close(node) => {
                    let children = open.pop().unwrap_or_default();
                    let id = map.intern(SubtreeNode {
                        label: tree.label_id(node),
                        children,
                    })?;
                    match open.last_mut() {
                        Some(parent) => parent.push(id),
                        None => root = Some(id),
                    }
                }
            }
        }
        Ok(Self {
            map,
            labels: tree.labels().clone(),
            root,
        })
    }

    pub fn root(&self) -> Option<u32> {
        self.root
    }

    pub fn nodes(&self) -> &[SubtreeNode] {
        self.map.nodes()
    }

    pub fn node_map(&self) -> &NodeMap<SubtreeNode> {
        &self.map
    }

    pub fn labels(&self) -> &Alphabet<L> {
        &self.labels
    }

    /// Number of distinct subtrees.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes().iter().map(|node| node.children.len()).sum()
    }

    /// Expands the DAG back into a tree.
    pub fn unpack(&self) -> Result<Tree<L>> {
        let mut tree = Tree::new();
        let Some(root) = self.root else {
            return Ok(tree);
        };
        let mut stack: Vec<(u32, Option<NodeId>)> = vec![(root, None)];
        while let Some((id, parent)) = stack.pop() {
            let node = self
                .map
                .get(id)
                .ok_or_else(|| Error::corrupt(format!("subtree node {id} out of range")))?;
            let label = self
                .labels
                .get(node.label)
                .cloned()
                .ok_or_else(|| Error::corrupt(format!("unknown label {}", node.label)))?;
            let created = match parent {
                Some(parent) => tree.add_child(parent, label)?,
                None => tree.add_node(label)?,
            };
            stack.extend(node.children.iter().rev().map(|&child| (child, Some(created))));
        }
        Ok(tree)
    }
}
