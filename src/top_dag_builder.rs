//! Top DAG construction by round-based cluster merging.
//!
//! A working copy of the tree is contracted until no edge is left. Every
//! node of the copy stands for the cluster it has absorbed so far. A round
//! first joins sibling pairs (horizontal merges), then collapses
//! parent/child pairs (vertical merges); a node takes part in at most one
//! merge per round. Every merge is canonicalized into the DAG on the fly
//! and recorded in the top tree.

use crate::bucket_queue::BucketQueue;
use crate::config::{HorizontalOrder, TopDagConfig, VerticalMerges};
use crate::error::{Error, Result};
use crate::top_dag::{DagId, TopDag};
use crate::top_tree::{ClusterId, MergeType, TopTree};
use crate::tree::{NodeId, Tree};
use ahash::AHashMap as HashMap;
use log::{debug, trace, warn};
use std::hash::Hash;

/// Result of a construction: the DAG and the merge history it shares.
#[derive(Debug, Clone)]
pub struct TopDagOutput<L> {
    pub dag: TopDag<L>,
    pub top_tree: TopTree,
    /// Number of contraction rounds
    pub rounds: usize,
}

/// Canonical description of a horizontal merge site.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct SiteKey {
    left: DagId,
    right: DagId,
    kind: MergeType,
}

#[derive(Debug, Default)]
struct Sites {
    /// Sites still valid, i.e. the count the key is queued under
    count: usize,
    /// Left nodes of the sites, in discovery order
    lefts: Vec<NodeId>,
}

pub struct TopDagBuilder<'a, L> {
    source: &'a Tree<L>,
    config: TopDagConfig,
}

impl<'a, L: Hash + Eq + Clone> TopDagBuilder<'a, L> {
    pub fn new(source: &'a Tree<L>, config: TopDagConfig) -> Self {
        Self { source, config }
    }

    /// Runs the construction.
    ///
    /// Fails with [`Error::InvalidTree`] before doing any work if the tree is
    /// empty or inconsistent.
    pub fn build(&self) -> Result<TopDagOutput<L>> {
        self.source.check_consistency()?;
        let root = self
            .source
            .root()
            .ok_or_else(|| Error::invalid_tree(0, "tree has no root"))?;
        let mut contraction = Contraction::new(self.source, self.config)?;
        let rounds = contraction.run()?;

        let root_cluster = contraction.cluster[root];
        let Contraction {
            mut dag,
            mut top,
            dag_of,
            ..
        } = contraction;
        top.set_root(root_cluster);
        dag.set_root(dag_of[root_cluster]);
        debug!(
            target: "topdag",
            "{} tree nodes -> {} DAG nodes, {} DAG edges in {} rounds",
            self.source.len(),
            dag.len(),
            dag.edge_count(),
            rounds
        );
        Ok(TopDagOutput {
            dag,
            top_tree: top,
            rounds,
        })
    }
}

/// Mutable state of one construction run.
struct Contraction<L> {
    work: Tree<L>,
    config: TopDagConfig,
    /// Current cluster of every node of the working tree
    cluster: Vec<ClusterId>,
    /// Canonical DAG node of every cluster
    dag_of: Vec<DagId>,
    /// Round in which a node last merged; 0 for never
    merged_in: Vec<usize>,
    dag: TopDag<L>,
    top: TopTree,
}

impl<L: Hash + Eq + Clone> Contraction<L> {
    fn new(source: &Tree<L>, config: TopDagConfig) -> Result<Self> {
        let work = source.clone();
        let capacity = work.capacity();
        let mut dag = TopDag::new(source.labels().clone());
        let mut dag_of = Vec::with_capacity(2 * capacity);
        for node in 0..capacity {
            let id = if work.contains(node) {
                dag.leaf(work.label_id(node))?
            } else {
                DagId::MAX
            };
            dag_of.push(id);
        }
        Ok(Self {
            work,
            config,
            cluster: (0..capacity).collect(),
            dag_of,
            merged_in: vec![0; capacity],
            dag,
            top: TopTree::new(capacity),
        })
    }

    fn run(&mut self) -> Result<usize> {
        let mut round = 0;
        while self.work.edge_count() > 0 {
            round += 1;
            let edges = self.work.edge_count();
            let horizontal = self.horizontal_phase(round)?;
            let vertical = match self.config.vertical {
                VerticalMerges::EveryRound => self.merge_chains(round)?,
                VerticalMerges::LeafOnly => self.merge_leaf_children(round)?,
                VerticalMerges::Fallback if horizontal == 0 => self.merge_chains(round)?,
                VerticalMerges::Fallback => 0,
            };
            debug!(
                target: "topdag",
                "round {}: {} horizontal, {} vertical merges, {} edges left, {} DAG nodes",
                round,
                horizontal,
                vertical,
                self.work.edge_count(),
                self.dag.len()
            );
            if self.work.edge_count() == edges {
                warn!(target: "topdag", "round {} made no merge with {} edges left", round, edges);
                return Err(Error::Stalled { edges });
            }
        }
        Ok(round)
    }

    fn fresh(&self, node: NodeId, round: usize) -> bool {
        self.merged_in[node] != round
    }

    fn has_children(&self, node: NodeId) -> bool {
        !self.work.is_leaf(node)
    }

    fn site_kind(&self, left: NodeId, right: NodeId) -> Option<MergeType> {
        MergeType::horizontal(self.has_children(left), self.has_children(right))
    }

    /// Records the merge of two clusters; `keep` stands for the result.
    fn merge_clusters(
        &mut self,
        keep: NodeId,
        other: NodeId,
        kind: MergeType,
        round: usize,
    ) -> Result<()> {
        let (left, right) = (self.cluster[keep], self.cluster[other]);
        let dag_id = self.dag.merge(kind, self.dag_of[left], self.dag_of[right])?;
        let id = self.top.merge(left, right, kind);
        debug_assert_eq!(id, self.dag_of.len());
        self.dag_of.push(dag_id);
        self.cluster[keep] = id;
        self.merged_in[keep] = round;
        self.merged_in[other] = round;
        trace!(
            target: "topdag",
            "{:?} {} + {} -> cluster {} (DAG {})",
            kind,
            left,
            right,
            id,
            dag_id
        );
        Ok(())
    }

    /// Joins `right` into its left sibling.
    fn merge_siblings(
        &mut self,
        left: NodeId,
        right: NodeId,
        kind: MergeType,
        round: usize,
    ) -> Result<()> {
        self.merge_clusters(left, right, kind, round)?;
        self.work.adopt_children(right, left);
        self.work.remove_leaf(right);
        Ok(())
    }

    /// Collapses the only child of `parent` into it.
    fn merge_into_parent(&mut self, parent: NodeId, child: NodeId, round: usize) -> Result<()> {
        let kind = MergeType::vertical(self.has_children(child));
        self.merge_clusters(parent, child, kind, round)?;
        self.work.adopt_children(child, parent);
        self.work.remove_leaf(child);
        Ok(())
    }

    fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.work.capacity()).filter(|&node| self.work.contains(node))
    }

    fn horizontal_phase(&mut self, round: usize) -> Result<usize> {
        let mut merges = 0;
        if self.config.horizontal == HorizontalOrder::ByFrequency {
            merges += self.merge_frequent_sites(round)?;
        }
        merges += self.merge_remaining_sites(round)?;
        Ok(merges)
    }

    /// Merges sites in order of how often their key occurs in this round.
    fn merge_frequent_sites(&mut self, round: usize) -> Result<usize> {
        // Valid sites by left node
        let mut pending: HashMap<NodeId, SiteKey> = HashMap::default();
        let mut sites: HashMap<SiteKey, Sites> = HashMap::default();
        for parent in self.live_nodes() {
            let mut child = self.work.first_child(parent);
            while let Some(left) = child {
                let Some(right) = self.work.next_sibling(left) else {
                    break;
                };
                if let Some(kind) = self.site_kind(left, right) {
                    let key = SiteKey {
                        left: self.dag_of[self.cluster[left]],
                        right: self.dag_of[self.cluster[right]],
                        kind,
                    };
                    pending.insert(left, key);
                    let entry = sites.entry(key).or_default();
                    entry.count += 1;
                    entry.lefts.push(left);
                }
                child = Some(right);
            }
        }

        let mut queue = BucketQueue::new(BucketQueue::<SiteKey>::cap_for(pending.len()));
        for (&key, entry) in &sites {
            queue.insert(key, entry.count);
        }

        let mut merges = 0;
        while let Some((key, count)) = queue.pop_max() {
            let Some(entry) = sites.remove(&key) else {
                continue;
            };
            trace!(target: "topdag", "merging {:?} at {} sites", key, count);
            for left in entry.lefts {
                if pending.get(&left) != Some(&key) {
                    continue;
                }
                pending.remove(&left);
                let Some(right) = self.work.next_sibling(left) else {
                    continue;
                };
                // The sites sharing a node with this one disappear.
                if let Some(prev) = self.work.prev_sibling(left) {
                    invalidate(prev, &mut pending, &mut sites, &mut queue);
                }
                invalidate(right, &mut pending, &mut sites, &mut queue);
                self.merge_siblings(left, right, key.kind, round)?;
                merges += 1;
            }
        }
        Ok(merges)
    }

    /// Pairs up the siblings not merged yet this round, left to right.
    fn merge_remaining_sites(&mut self, round: usize) -> Result<usize> {
        let parents: Vec<NodeId> = self
            .live_nodes()
            .filter(|&node| self.work.num_children(node) >= 2)
            .collect();
        let mut merges = 0;
        for parent in parents {
            let mut child = self.work.first_child(parent);
            while let Some(left) = child {
                let Some(right) = self.work.next_sibling(left) else {
                    break;
                };
                if self.fresh(left, round) && self.fresh(right, round) {
                    if let Some(kind) = self.site_kind(left, right) {
                        self.merge_siblings(left, right, kind, round)?;
                        merges += 1;
                        child = self.work.next_sibling(left);
                        continue;
                    }
                }
                child = Some(right);
            }
        }
        Ok(merges)
    }

    /// Merges chains of single-child nodes pairwise, starting at the bottom.
    fn merge_chains(&mut self, round: usize) -> Result<usize> {
        let bottoms: Vec<NodeId> = self
            .live_nodes()
            .filter(|&node| {
                self.work.num_children(node) != 1
                    && self
                        .work
                        .parent(node)
                        .is_some_and(|parent| self.work.num_children(parent) == 1)
            })
            .collect();
        let mut merges = 0;
        for bottom in bottoms {
            let mut node = bottom;
            while let Some(parent) = self.work.parent(node) {
                if self.work.num_children(parent) != 1 {
                    break;
                }
                if self.fresh(node, round) && self.fresh(parent, round) {
                    self.merge_into_parent(parent, node, round)?;
                    merges += 1;
                    match self.work.parent(parent) {
                        Some(up) => node = up,
                        None => break,
                    }
                } else {
                    node = parent;
                }
            }
        }
        Ok(merges)
    }

    /// Merges a single-child parent with its child when that child is a leaf.
    fn merge_leaf_children(&mut self, round: usize) -> Result<usize> {
        let leaves: Vec<NodeId> = self
            .live_nodes()
            .filter(|&node| self.work.is_leaf(node))
            .collect();
        let mut merges = 0;
        for leaf in leaves {
            let Some(parent) = self.work.parent(leaf) else {
                continue;
            };
            if self.work.num_children(parent) == 1
                && self.fresh(leaf, round)
                && self.fresh(parent, round)
            {
                self.merge_into_parent(parent, leaf, round)?;
                merges += 1;
            }
        }
        Ok(merges)
    }
}

/// Drops the site whose left node is `left`, if it is still pending.
fn invalidate(
    left: NodeId,
    pending: &mut HashMap<NodeId, SiteKey>,
    sites: &mut HashMap<SiteKey, Sites>,
    queue: &mut BucketQueue<SiteKey>,
) {
    let Some(key) = pending.remove(&left) else {
        return;
    };
    if let Some(entry) = sites.get_mut(&key) {
        let old = entry.count;
        entry.count -= 1;
        queue.reposition(key, old, entry.count);
    }
}
