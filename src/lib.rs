//! # treerepair - Grammar Compression for Sequences and Ordered Trees
//!
//! Lossless compression of labelled ordered trees by finding repeated
//! structure and coding it compactly:
//!
//! 1. **RePair** replaces the most frequent pair of adjacent symbols with a
//!    new rule until no pair repeats.
//! 2. **Top DAG** construction contracts a tree by merging sibling and
//!    parent/child clusters, sharing every structurally identical cluster.
//! 3. **Huffman coding** assigns each resulting alphabet its own optimal
//!    prefix code and writes the bitstream.
//!
//! ## Example
//!
//! ```
//! use treerepair::{compress_tree, decompress_tree, same_tree, TopDagConfig, Tree};
//!
//! // r(a(b), a(b), a(b))
//! let tree = Tree::from_parents(
//!     ['r', 'a', 'b', 'a', 'b', 'a', 'b'],
//!     &[None, Some(0), Some(1), Some(0), Some(3), Some(0), Some(5)],
//! )
//! .unwrap();
//!
//! let (bytes, report) = compress_tree(&tree, &TopDagConfig::default(), Vec::new()).unwrap();
//! println!("{report}");
//!
//! let decoded: Tree<char> = decompress_tree(bytes.as_slice()).unwrap();
//! assert!(same_tree(&decoded, &tree));
//! ```
//!
//! ## Performance
//!
//! - RePair runs in expected linear time using a frequency-bucketed queue
//! - Top DAG construction takes O(log n) rounds of linear work
//! - Traversals and unpacking use explicit stacks, so deep trees are safe

mod alphabet;
mod bit_sink;
mod bucket_queue;
mod coder;
mod config;
mod dictionary;
mod entropy;
mod error;
mod huffman;
mod id_gen;
mod label;
mod navigation;
mod node_map;
mod records;
mod repair;
mod repair_iter;
mod subtree_dag;
mod symbol;
mod top_dag;
mod top_dag_builder;
mod top_tree;
mod tree;

#[cfg(test)]
mod tests;

pub use alphabet::Alphabet;
pub use bit_sink::{BitSink, BitSource};
pub use coder::{
    compress_sequence, compress_tree, compress_tree_tags, decompress_dag, decompress_sequence,
    decompress_tree, decompress_tree_tags, CodeStats, SequenceReport, TreeReport,
};
pub use config::{HorizontalOrder, RepairConfig, TopDagConfig, VerticalMerges};
pub use dictionary::{Dictionary, Grammar};
pub use entropy::FrequencyTable;
pub use error::{Error, Result};
pub use huffman::{Codeword, HuffmanCode, MAX_CODE_LEN};
pub use label::Label;
pub use navigation::{bp_string, preorder_labels, same_tree, NavFrame, Navigate, Preorder, Visit};
pub use node_map::NodeMap;
pub use repair::{compress_symbols, Repair, RepairStats};
pub use repair_iter::{GrammarIter, RepairIter};
pub use subtree_dag::{SubtreeDag, SubtreeNode};
pub use symbol::{Pair, Symbol};
pub use top_dag::{DagId, DagNode, TopDag};
pub use top_dag_builder::{TopDagBuilder, TopDagOutput};
pub use top_tree::{Cluster, ClusterId, MergeType, TopTree};
pub use tree::{Children, NodeId, Tag, Tree};
