//! Clusters, merge types and the binary merge history ("top tree").
//!
//! A cluster is a connected fragment of the input tree. Every tree node
//! starts as a leaf cluster; merging two clusters either stacks a child
//! fragment under its parent (vertical) or joins two sibling fragments
//! (horizontal). The bottom boundary node of a cluster is the node under
//! which the rest of the tree still hangs; the merge type records which side
//! provides it, which is all that is needed to rebuild the tree.

use crate::error::{Error, Result};
use crate::navigation::same_tree;
use crate::tree::{NodeId, Tree};
use std::hash::Hash;

/// How two clusters were combined.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MergeType {
    /// Child fragment under its parent; the child still has children below.
    VerticalWithBoundary,
    /// Child fragment under its parent; nothing hangs below.
    VerticalNoBoundary,
    /// Siblings; the left one has children below.
    HorizontalLeftBoundary,
    /// Siblings; the right one has children below.
    HorizontalRightBoundary,
    /// Siblings; neither has children below.
    HorizontalNoBoundary,
}

impl MergeType {
    pub const ALL: [MergeType; 5] = [
        MergeType::VerticalWithBoundary,
        MergeType::VerticalNoBoundary,
        MergeType::HorizontalLeftBoundary,
        MergeType::HorizontalRightBoundary,
        MergeType::HorizontalNoBoundary,
    ];

    /// Merge type for absorbing a child that may still have children.
    pub fn vertical(child_has_children: bool) -> Self {
        if child_has_children {
            MergeType::VerticalWithBoundary
        } else {
            MergeType::VerticalNoBoundary
        }
    }

    /// Merge type for joining two siblings. At most one may have children.
    pub fn horizontal(left_has_children: bool, right_has_children: bool) -> Option<Self> {
        match (left_has_children, right_has_children) {
            (false, false) => Some(MergeType::HorizontalNoBoundary),
            (true, false) => Some(MergeType::HorizontalLeftBoundary),
            (false, true) => Some(MergeType::HorizontalRightBoundary),
            (true, true) => None,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(
            self,
            MergeType::VerticalWithBoundary | MergeType::VerticalNoBoundary
        )
    }

    pub(crate) fn code(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        MergeType::ALL.get(code as usize).copied()
    }
}

/// Index of a cluster in a [`TopTree`].
pub type ClusterId = usize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Cluster {
    /// A single node of the input tree.
    Leaf { node: NodeId },
    Merge {
        kind: MergeType,
        left: ClusterId,
        right: ClusterId,
    },
}

/// The complete merge history of one tree.
///
/// Clusters `0..n` are the leaves, one per node id of the source tree.
/// Merged clusters are appended, so every cluster comes after its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopTree {
    clusters: Vec<Cluster>,
    leaves: usize,
    root: Option<ClusterId>,
}

impl TopTree {
    pub(crate) fn new(leaves: usize) -> Self {
        Self {
            clusters: (0..leaves).map(|node| Cluster::Leaf { node }).collect(),
            leaves,
            root: None,
        }
    }

    pub(crate) fn merge(
        &mut self,
        left: ClusterId,
        right: ClusterId,
        kind: MergeType,
    ) -> ClusterId {
        debug_assert!(left < self.clusters.len() && right < self.clusters.len());
        self.clusters.push(Cluster::Merge { kind, left, right });
        self.clusters.len() - 1
    }

    pub(crate) fn set_root(&mut self, root: ClusterId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<ClusterId> {
        self.root
    }

    pub fn cluster(&self, id: ClusterId) -> Cluster {
        self.clusters[id]
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Number of clusters, leaves included.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn num_leaves(&self) -> usize {
        self.leaves
    }

    /// Rebuilds the tree, taking leaf labels from `source`.
    pub fn unpack<L: Hash + Eq + Clone>(&self, source: &Tree<L>) -> Result<Tree<L>> {
        let Some(root) = self.root else {
            return Ok(Tree::new());
        };
        unpack(root, |id| match self.clusters.get(id) {
            Some(&Cluster::Leaf { node }) if source.contains(node) => {
                Ok(ClusterView::Leaf(source.label(node).clone()))
            }
            Some(&Cluster::Merge { kind, left, right }) => {
                Ok(ClusterView::Merge { kind, left, right })
            }
            _ => Err(Error::corrupt(format!("cluster {id} does not resolve"))),
        })
    }

    /// Checks that unpacking this history reproduces `tree`.
    pub fn validate<L: Hash + Eq + Clone>(&self, tree: &Tree<L>) -> Result<()> {
        let unpacked = self.unpack(tree)?;
        if same_tree(&unpacked, tree) {
            Ok(())
        } else {
            Err(Error::invalid_tree(
                tree.root().unwrap_or(0),
                "merge history does not reproduce the tree",
            ))
        }
    }
}

/// What unpacking needs to know about a cluster or DAG node.
pub(crate) enum ClusterView<L> {
    Leaf(L),
    Merge {
        kind: MergeType,
        left: usize,
        right: usize,
    },
}

enum Stage {
    Enter,
    Left { kind: MergeType, right: usize },
    Right { kind: MergeType },
}

struct UnpackFrame {
    cluster: usize,
    /// Node the fragment hangs under
    top: Option<NodeId>,
    stage: Stage,
    left_bottom: Option<NodeId>,
}

/// Rebuilds a tree from a binary cluster structure rooted at `root`.
///
/// Each fragment reports its bottom boundary node to its parent frame: a
/// vertical merge hangs its right part under the left part's bottom
/// boundary, a horizontal merge puts both parts under the same node.
pub(crate) fn unpack<L, F>(root: usize, view: F) -> Result<Tree<L>>
where
    L: Hash + Eq + Clone,
    F: Fn(usize) -> Result<ClusterView<L>>,
{
    let mut tree = Tree::new();
    let mut stack = vec![UnpackFrame {
        cluster: root,
        top: None,
        stage: Stage::Enter,
        left_bottom: None,
    }];
    // Bottom boundary reported by the frame popped last
    let mut bottom: Option<NodeId> = None;

    while let Some(frame) = stack.last_mut() {
        match frame.stage {
            Stage::Enter => match view(frame.cluster)? {
                ClusterView::Leaf(label) => {
                    let node = match frame.top {
                        Some(top) => tree.add_child(top, label)?,
                        None if tree.root().is_some() => {
                            return Err(Error::corrupt("fragment has two roots"));
                        }
                        None => tree.add_node(label)?,
                    };
                    bottom = Some(node);
                    stack.pop();
                }
                ClusterView::Merge { kind, left, right } => {
                    frame.stage = Stage::Left { kind, right };
                    let top = frame.top;
                    stack.push(UnpackFrame {
                        cluster: left,
                        top,
                        stage: Stage::Enter,
                        left_bottom: None,
                    });
                }
            },
            Stage::Left { kind, right } => {
                frame.left_bottom = bottom;
                let top = if kind.is_vertical() {
                    Some(bottom.ok_or_else(|| {
                        Error::corrupt("vertical merge below a fragment without bottom boundary")
                    })?)
                } else {
                    frame.top
                };
                frame.stage = Stage::Right { kind };
                stack.push(UnpackFrame {
                    cluster: right,
                    top,
                    stage: Stage::Enter,
                    left_bottom: None,
                });
            }
            Stage::Right { kind } => {
                bottom = match kind {
                    MergeType::VerticalWithBoundary | MergeType::HorizontalRightBoundary => bottom,
                    MergeType::HorizontalLeftBoundary => frame.left_bottom,
                    MergeType::VerticalNoBoundary | MergeType::HorizontalNoBoundary => None,
                };
                stack.pop();
            }
        }
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::preorder_labels;

    #[test]
    fn test_merge_type_selection() {
        assert_eq!(MergeType::vertical(true), MergeType::VerticalWithBoundary);
        assert_eq!(MergeType::vertical(false), MergeType::VerticalNoBoundary);
        assert_eq!(
            MergeType::horizontal(false, false),
            Some(MergeType::HorizontalNoBoundary)
        );
        assert_eq!(
            MergeType::horizontal(true, false),
            Some(MergeType::HorizontalLeftBoundary)
        );
        assert_eq!(
            MergeType::horizontal(false, true),
            Some(MergeType::HorizontalRightBoundary)
        );
        assert_eq!(MergeType::horizontal(true, true), None);
    }

    #[test]
    fn test_codes() {
        for kind in MergeType::ALL {
            assert_eq!(MergeType::from_code(kind.code()), Some(kind));
        }
        assert_eq!(MergeType::from_code(5), None);
    }

    #[test]
    fn test_unpack_by_hand() {
        // r(a(c), b): merge a<-c, then (a c) with b, then r over both.
        let tree = Tree::from_parents(['r', 'a', 'b', 'c'], &[None, Some(0), Some(0), Some(1)])
            .unwrap();
        let mut top = TopTree::new(4);
        let ac = top.merge(1, 3, MergeType::VerticalNoBoundary);
        let acb = top.merge(ac, 2, MergeType::HorizontalNoBoundary);
        let all = top.merge(0, acb, MergeType::VerticalNoBoundary);
        top.set_root(all);

        let unpacked = top.unpack(&tree).unwrap();
        assert_eq!(preorder_labels(&unpacked), vec![&'r', &'a', &'c', &'b']);
        top.validate(&tree).unwrap();
        assert_eq!(top.len(), 7);
        assert_eq!(top.num_leaves(), 4);
    }

    #[test]
    fn test_unpack_with_boundary() {
        // r(a(x, y)): a keeps children while merged with r.
        let tree = Tree::from_parents(['r', 'a', 'x', 'y'], &[None, Some(0), Some(1), Some(1)])
            .unwrap();
        let mut top = TopTree::new(4);
        let ra = top.merge(0, 1, MergeType::VerticalWithBoundary);
        let xy = top.merge(2, 3, MergeType::HorizontalNoBoundary);
        let all = top.merge(ra, xy, MergeType::VerticalNoBoundary);
        top.set_root(all);
        top.validate(&tree).unwrap();
    }

    #[test]
    fn test_validate_rejects_wrong_history() {
        let tree = Tree::from_parents(['r', 'a', 'b'], &[None, Some(0), Some(0)]).unwrap();
        let mut top = TopTree::new(3);
        // b before a
        let ba = top.merge(2, 1, MergeType::HorizontalNoBoundary);
        let all = top.merge(0, ba, MergeType::VerticalNoBoundary);
        top.set_root(all);
        assert!(top.validate(&tree).is_err());
    }

    #[test]
    fn test_unpack_rejects_two_roots() {
        let tree = Tree::from_parents(['a', 'b'], &[None, Some(0)]).unwrap();
        let mut top = TopTree::new(2);
        let both = top.merge(0, 1, MergeType::HorizontalNoBoundary);
        top.set_root(both);
        assert!(matches!(top.unpack(&tree), Err(Error::Corrupt(_))));
    }
}
