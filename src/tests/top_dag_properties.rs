use crate::coder::{compress_tree, compress_tree_tags, decompress_tree, decompress_tree_tags};
use crate::config::{HorizontalOrder, RepairConfig, TopDagConfig, VerticalMerges};
use crate::navigation::{bp_string, same_tree};
use crate::subtree_dag::SubtreeDag;
use crate::top_dag::{DagNode, TopDag};
use crate::top_dag_builder::TopDagBuilder;
use crate::tree::{NodeId, Tree};
use ahash::AHashSet as HashSet;
use proptest::prelude::*;

/// Builds a tree where node `i > 0` hangs under node `raw % i`.
fn tree_from(nodes: &[(u8, u16)]) -> Tree<u8> {
    let labels = nodes.iter().map(|&(label, _)| label);
    let parents: Vec<Option<NodeId>> = nodes
        .iter()
        .enumerate()
        .map(|(i, &(_, raw))| (i > 0).then(|| raw as usize % i))
        .collect();
    Tree::from_parents(labels, &parents).unwrap()
}

fn arb_tree(max_nodes: usize) -> impl Strategy<Value = Tree<u8>> {
    prop::collection::vec((0u8..3, any::<u16>()), 1..max_nodes).prop_map(|nodes| tree_from(&nodes))
}

fn arb_config() -> impl Strategy<Value = TopDagConfig> {
    (
        prop_oneof![
            Just(VerticalMerges::EveryRound),
            Just(VerticalMerges::LeafOnly),
            Just(VerticalMerges::Fallback),
        ],
        prop_oneof![Just(HorizontalOrder::ByFrequency), Just(HorizontalOrder::LeftToRight)],
    )
        .prop_map(|(vertical, horizontal)| {
            TopDagConfig::new().vertical(vertical).horizontal(horizontal)
        })
}

proptest! {
    /// Property 1: Unpacking the DAG reproduces the tree exactly
    #[test]
    fn prop_dag_roundtrip(tree in arb_tree(120), config in arb_config()) {
        let output = TopDagBuilder::new(&tree, config).build().unwrap();

        let unpacked = output.dag.unpack().unwrap();
        prop_assert!(same_tree(&unpacked, &tree));
        prop_assert_eq!(bp_string(&unpacked), bp_string(&tree));
        prop_assert!(output.top_tree.validate(&tree).is_ok());
    }

    /// Property 2: No two DAG nodes are structurally identical, and children
    /// always come first
    #[test]
    fn prop_dag_nodes_unique(tree in arb_tree(120), config in arb_config()) {
        let dag = TopDagBuilder::new(&tree, config).build().unwrap().dag;

        let distinct: HashSet<DagNode> = dag.nodes().iter().copied().collect();
        prop_assert_eq!(distinct.len(), dag.len());
        for (id, node) in dag.nodes().iter().enumerate() {
            if let DagNode::Merge { left, right, .. } = *node {
                prop_assert!((left as usize) < id && (right as usize) < id);
            }
        }
    }

    /// Property 3: The DAG covers the tree and is never larger than its
    /// top tree
    #[test]
    fn prop_dag_size(tree in arb_tree(120), config in arb_config()) {
        let output = TopDagBuilder::new(&tree, config).build().unwrap();
        let dag = &output.dag;
        let root = dag.root().unwrap();

        prop_assert_eq!(dag.expanded_sizes()[root as usize], tree.len() as u64);
        prop_assert!(dag.len() < 2 * tree.len());
        prop_assert_eq!(output.top_tree.len(), 2 * tree.len() - 1);
    }

    /// Property 4: Sharing a finished top tree gives the DAG built on the fly
    #[test]
    fn prop_from_top_tree_matches(tree in arb_tree(120)) {
        let output = TopDagBuilder::new(&tree, TopDagConfig::default()).build().unwrap();
        let rebuilt = TopDag::from_top_tree(&output.top_tree, &tree).unwrap();

        prop_assert_eq!(rebuilt.nodes(), output.dag.nodes());
        prop_assert_eq!(rebuilt.root(), output.dag.root());
    }

    /// Property 5: The subtree DAG round trips and shares at least as well as
    /// the tree itself
    #[test]
    fn prop_subtree_dag_roundtrip(tree in arb_tree(120)) {
        let dag = SubtreeDag::build(&tree).unwrap();

        prop_assert!(same_tree(&dag.unpack().unwrap(), &tree));
        prop_assert!(dag.len() <= tree.len());
        prop_assert!(dag.edge_count() <= tree.edge_count());
    }

    /// Property 6: The consistency check accepts built trees and rejects a
    /// redirected parent link
    #[test]
    fn prop_consistency_check(tree in arb_tree(60), pick in any::<prop::sample::Index>()) {
        prop_assert!(tree.check_consistency().is_ok());
        if tree.len() > 1 {
            let node = 1 + pick.index(tree.len() - 1);
            let parent = tree.parent(node).unwrap();
            let mut broken = tree.clone();
            broken.corrupt_parent(node, Some((parent + 1) % tree.len()));
            prop_assert!(broken.check_consistency().is_err());
            prop_assert!(TopDagBuilder::new(&broken, TopDagConfig::default()).build().is_err());
        }
    }

    /// Property 7: Tag form round trip
    #[test]
    fn prop_tags_roundtrip(tree in arb_tree(120)) {
        let tags = tree.tags();
        prop_assert_eq!(tags.len(), 2 * tree.len());
        let rebuilt = Tree::from_tags(tags).unwrap();
        prop_assert!(same_tree(&rebuilt, &tree));
    }

    /// Property 8: Both tree bitstreams decode to the input tree
    #[test]
    fn prop_tree_codec_roundtrip(tree in arb_tree(80)) {
        let (bytes, report) = compress_tree(&tree, &TopDagConfig::default(), Vec::new()).unwrap();
        prop_assert_eq!(report.tree_nodes, tree.len());
        let decoded: Tree<u8> = decompress_tree(bytes.as_slice()).unwrap();
        prop_assert!(same_tree(&decoded, &tree));

        let (bytes, _) = compress_tree_tags(&tree, &RepairConfig::default(), Vec::new()).unwrap();
        let decoded: Tree<u8> = decompress_tree_tags(bytes.as_slice()).unwrap();
        prop_assert!(same_tree(&decoded, &tree));
    }
}

/// Bolero fuzz test: construction and unpacking never panic
#[test]
fn fuzz_top_dag_roundtrip() {
    bolero::check!()
        .with_type::<Vec<(u8, u16)>>()
        .for_each(|nodes| {
            if nodes.is_empty() {
                return;
            }
            let nodes: Vec<(u8, u16)> =
                nodes.iter().map(|&(label, raw)| (label % 4, raw)).collect();
            let tree = tree_from(&nodes);
            let output = TopDagBuilder::new(&tree, TopDagConfig::default())
                .build()
                .unwrap();
            assert!(same_tree(&output.dag.unpack().unwrap(), &tree));
        });
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// `copies` children of shape s(x, y) under one root.
    fn repeated(copies: usize) -> Tree<char> {
        let mut tree = Tree::new();
        let root = tree.add_node('R').unwrap();
        for _ in 0..copies {
            let s = tree.add_child(root, 's').unwrap();
            tree.add_child(s, 'x').unwrap();
            tree.add_child(s, 'y').unwrap();
        }
        tree
    }

    #[test]
    fn test_repeated_subtree_is_one_shared_node() {
        let tree = repeated(2);
        let dag = TopDagBuilder::new(&tree, TopDagConfig::default())
            .build()
            .unwrap()
            .dag;
        let sizes = dag.expanded_sizes();
        let shared: Vec<usize> = (0..dag.len())
            .filter(|&id| dag.in_degree(id as u32) >= 2)
            .collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(sizes[shared[0]], 3);
    }

    #[test]
    fn test_subtree_dag_size_is_stable() {
        for copies in [2, 3, 10, 100] {
            let dag = SubtreeDag::build(&repeated(copies)).unwrap();
            assert_eq!(dag.node_map().len(), 4);
        }
    }

    #[test]
    fn test_top_dag_grows_logarithmically() {
        let small = TopDagBuilder::new(&repeated(16), TopDagConfig::default())
            .build()
            .unwrap()
            .dag;
        let large = TopDagBuilder::new(&repeated(256), TopDagConfig::default())
            .build()
            .unwrap()
            .dag;
        // Sixteen times the copies costs a few merge levels, not more nodes
        // per copy.
        assert!(large.len() <= small.len() + 8, "{} vs {}", large.len(), small.len());
    }

    #[test]
    fn test_deep_chain() {
        let _ = env_logger::builder().is_test(true).try_init();
        let n = 50_000;
        let parents: Vec<Option<NodeId>> = (0..n).map(|i: usize| i.checked_sub(1)).collect();
        let tree = Tree::from_parents((0..n).map(|i| (i % 2) as u8), &parents).unwrap();
        let output = TopDagBuilder::new(&tree, TopDagConfig::default())
            .build()
            .unwrap();
        assert!(same_tree(&output.dag.unpack().unwrap(), &tree));
        assert!(output.dag.len() < 100);
    }
}
