//! The Top DAG: a top tree with structurally identical clusters shared.
//!
//! Leaves carry a label id, inner nodes a merge type and two child ids.
//! Nodes are hash-consed through a [`NodeMap`], so no two nodes of a DAG
//! are structurally equal, and every node's children have smaller ids.

use crate::alphabet::Alphabet;
use crate::error::{Error, Result};
use crate::node_map::NodeMap;
use crate::top_tree::{unpack, Cluster, ClusterView, MergeType, TopTree};
use crate::tree::Tree;
use std::hash::Hash;

/// Index of a node in a [`TopDag`].
pub type DagId = u32;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DagNode {
    Leaf {
        label: u32,
    },
    Merge {
        kind: MergeType,
        left: DagId,
        right: DagId,
    },
}

/// A compressed tree.
#[derive(Debug, Clone)]
pub struct TopDag<L> {
    map: NodeMap<DagNode>,
    labels: Alphabet<L>,
    root: Option<DagId>,
}

impl<L: Hash + Eq + Clone> TopDag<L> {
    pub(crate) fn new(labels: Alphabet<L>) -> Self {
        Self {
            map: NodeMap::new(),
            labels,
            root: None,
        }
    }

    /// Canonical id of a single node labelled `label`.
    pub(crate) fn leaf(&mut self, label: u32) -> Result<DagId> {
        debug_assert!((label as usize) < self.labels.len());
        self.map.intern(DagNode::Leaf { label })
    }

    /// Canonical id of the merge of two existing nodes.
    pub(crate) fn merge(&mut self, kind: MergeType, left: DagId, right: DagId) -> Result<DagId> {
        debug_assert!((left as usize) < self.map.len() && (right as usize) < self.map.len());
        self.map.intern(DagNode::Merge { kind, left, right })
    }

    pub(crate) fn set_root(&mut self, root: DagId) {
        self.root = Some(root);
    }

    /// Shares the clusters of a complete merge history of `tree`.
    ///
    /// Clusters are stored parts-first, so one forward pass is a post-order.
    pub fn from_top_tree(top: &TopTree, tree: &Tree<L>) -> Result<Self> {
        let mut dag = TopDag::new(tree.labels().clone());
        let mut cluster_to_dag: Vec<DagId> = Vec::with_capacity(top.len());
        for cluster in top.clusters() {
            let id = match *cluster {
                Cluster::Leaf { node } if tree.contains(node) => dag.leaf(tree.label_id(node))?,
                // Removed ids of the source tree are never referenced.
                Cluster::Leaf { .. } => DagId::MAX,
                Cluster::Merge { kind, left, right } => {
                    dag.merge(kind, cluster_to_dag[left], cluster_to_dag[right])?
                }
            };
            cluster_to_dag.push(id);
        }
        if let Some(root) = top.root() {
            dag.set_root(cluster_to_dag[root]);
        }
        Ok(dag)
    }

    /// Rebuilds a DAG from a decoded node list.
    ///
    /// Each merge may only reference earlier nodes and each leaf a known
    /// label. Duplicate nodes are folded together.
    pub fn from_nodes(labels: Alphabet<L>, nodes: &[DagNode], root: Option<DagId>) -> Result<Self> {
        let mut dag = TopDag::new(labels);
        let mut remap: Vec<DagId> = Vec::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            let id = match *node {
                DagNode::Leaf { label } => {
                    if label as usize >= dag.labels.len() {
                        return Err(Error::corrupt(format!(
                            "node {index} has unknown label {label}"
                        )));
                    }
                    dag.leaf(label)?
                }
                DagNode::Merge { kind, left, right } => {
                    let (Some(&left), Some(&right)) =
                        (remap.get(left as usize), remap.get(right as usize))
                    else {
                        return Err(Error::corrupt(format!("node {index} references a later node")));
                    };
                    dag.merge(kind, left, right)?
                }
            };
            remap.push(id);
        }
        if let Some(root) = root {
            let root = remap
                .get(root as usize)
                .copied()
                .ok_or_else(|| Error::corrupt(format!("root {root} out of range")))?;
            dag.set_root(root);
        }
        Ok(dag)
    }

    pub fn root(&self) -> Option<DagId> {
        self.root
    }

    pub fn node(&self, id: DagId) -> Option<&DagNode> {
        self.map.get(id)
    }

    /// Nodes in id order, children before parents.
    pub fn nodes(&self) -> &[DagNode] {
        self.map.nodes()
    }

    /// The signature-to-id index behind the node list.
    pub fn node_map(&self) -> &NodeMap<DagNode> {
        &self.map
    }

    pub fn labels(&self) -> &Alphabet<L> {
        &self.labels
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Two edges per merge node.
    pub fn edge_count(&self) -> usize {
        2 * self
            .nodes()
            .iter()
            .filter(|node| matches!(node, DagNode::Merge { .. }))
            .count()
    }

    /// Distinct signatures in the node map; equals `len` unless hashes
    /// collided.
    pub fn node_map_len(&self) -> usize {
        self.map.signatures()
    }

    pub fn in_degree(&self, id: DagId) -> u32 {
        self.nodes()
            .iter()
            .map(|node| match *node {
                DagNode::Merge { left, right, .. } => (left == id) as u32 + (right == id) as u32,
                DagNode::Leaf { .. } => 0,
            })
            .sum()
    }

    /// Number of edges entering each node.
    pub fn in_degrees(&self) -> Vec<u32> {
        let mut degrees = vec![0u32; self.len()];
        for node in self.nodes() {
            if let DagNode::Merge { left, right, .. } = *node {
                degrees[left as usize] += 1;
                degrees[right as usize] += 1;
            }
        }
        degrees
    }

    /// Number of tree nodes each DAG node expands to.
    pub fn expanded_sizes(&self) -> Vec<u64> {
        let mut sizes: Vec<u64> = Vec::with_capacity(self.len());
        for node in self.nodes() {
            let size = match *node {
                DagNode::Leaf { .. } => 1,
                DagNode::Merge { left, right, .. } => sizes[left as usize] + sizes[right as usize],
            };
            sizes.push(size);
        }
        sizes
    }

    /// Expands the DAG from its root back into a tree.
    pub fn unpack(&self) -> Result<Tree<L>> {
        let Some(root) = self.root else {
            return Ok(Tree::new());
        };
        unpack(root as usize, |id| match self.map.get(id as DagId) {
            Some(&DagNode::Leaf { label }) => self
                .labels
                .get(label)
                .cloned()
                .map(ClusterView::Leaf)
                .ok_or_else(|| Error::corrupt(format!("unknown label {label}"))),
            Some(&DagNode::Merge { kind, left, right }) => Ok(ClusterView::Merge {
                kind,
                left: left as usize,
                right: right as usize,
            }),
            None => Err(Error::corrupt(format!("DAG node {id} out of range"))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::same_tree;

    fn labels(values: &[char]) -> Alphabet<char> {
        let mut alphabet = Alphabet::new();
        for &value in values {
            alphabet.intern(value).unwrap();
        }
        alphabet
    }

    #[test]
    fn test_hash_consing() {
        let mut dag = TopDag::new(labels(&['a', 'b']));
        let a = dag.leaf(0).unwrap();
        let b = dag.leaf(1).unwrap();
        let ab = dag.merge(MergeType::HorizontalNoBoundary, a, b).unwrap();
        let ab2 = dag.merge(MergeType::HorizontalNoBoundary, a, b).unwrap();
        let ba = dag.merge(MergeType::HorizontalNoBoundary, b, a).unwrap();
        let ab_vertical = dag.merge(MergeType::VerticalNoBoundary, a, b).unwrap();

        assert_eq!(ab, ab2);
        assert_ne!(ab, ba);
        assert_ne!(ab, ab_vertical);
        assert_eq!(dag.len(), 5);
        assert_eq!(dag.edge_count(), 6);
        assert_eq!(dag.in_degrees(), vec![3, 3, 0, 0, 0]);
    }

    #[test]
    fn test_unpack_shared() {
        // r(a, a): the leaf a is shared by both sides of the horizontal merge.
        let mut dag = TopDag::new(labels(&['r', 'a']));
        let r = dag.leaf(0).unwrap();
        let a = dag.leaf(1).unwrap();
        let aa = dag.merge(MergeType::HorizontalNoBoundary, a, a).unwrap();
        let root = dag.merge(MergeType::VerticalNoBoundary, r, aa).unwrap();
        dag.set_root(root);

        let tree = dag.unpack().unwrap();
        let expected = Tree::from_parents(['r', 'a', 'a'], &[None, Some(0), Some(0)]).unwrap();
        assert!(same_tree(&tree, &expected));
        assert_eq!(dag.expanded_sizes()[root as usize], 3);
    }

    #[test]
    fn test_from_top_tree() {
        let tree = Tree::from_parents(['r', 'a', 'a'], &[None, Some(0), Some(0)]).unwrap();
        let mut top = TopTree::new(3);
        let aa = top.merge(1, 2, MergeType::HorizontalNoBoundary);
        let all = top.merge(0, aa, MergeType::VerticalNoBoundary);
        top.set_root(all);

        let dag = TopDag::from_top_tree(&top, &tree).unwrap();
        // r, a, (a a), r(a a)
        assert_eq!(dag.len(), 4);
        assert!(same_tree(&dag.unpack().unwrap(), &tree));
    }

    #[test]
    fn test_from_nodes_validates() {
        let nodes = [
            DagNode::Leaf { label: 0 },
            DagNode::Merge {
                kind: MergeType::VerticalNoBoundary,
                left: 0,
                right: 0,
            },
        ];
        let dag = TopDag::from_nodes(labels(&['x']), &nodes, Some(1)).unwrap();
        assert_eq!(dag.len(), 2);
        assert_eq!(dag.unpack().unwrap().len(), 2);

        let forward = [DagNode::Merge {
            kind: MergeType::HorizontalNoBoundary,
            left: 0,
            right: 1,
        }];
        assert!(TopDag::from_nodes(labels(&['x']), &forward, Some(0)).is_err());

        let bad_label = [DagNode::Leaf { label: 3 }];
        assert!(TopDag::from_nodes(labels(&['x']), &bad_label, Some(0)).is_err());
        assert!(TopDag::from_nodes(labels(&['x']), &nodes, Some(9)).is_err());
    }

    #[test]
    fn test_empty_unpack() {
        let dag = TopDag::new(labels(&[]));
        assert!(dag.unpack().unwrap().is_empty());
    }
}
