//! Error type shared by every engine in the crate.

use std::io;

/// Errors raised while building, compressing or decoding.
///
/// Reaching a fixpoint (no pair or merge left with frequency above one) is
/// the normal way a run ends and is never reported through this type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Parent, child and sibling links disagree, or a builder was handed a
    /// shape that is not a single ordered tree.
    #[error("invalid tree at node {node}: {reason}")]
    InvalidTree { node: usize, reason: &'static str },

    /// An identifier space ran out. Raised instead of truncating ids.
    #[error("capacity exceeded: more than {limit} {what}")]
    CapacityExceeded { what: &'static str, limit: u64 },

    /// The bit sink or source failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A bitstream did not follow the format the encoders write.
    #[error("corrupt input: {0}")]
    Corrupt(String),

    /// The merge loop stopped reducing the tree.
    #[error("merge loop stalled with {edges} edges left")]
    Stalled { edges: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn invalid_tree(node: usize, reason: &'static str) -> Self {
        Error::InvalidTree { node, reason }
    }

    pub(crate) fn capacity(what: &'static str, limit: u64) -> Self {
        Error::CapacityExceeded { what, limit }
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Error::Corrupt(msg.into())
    }
}
