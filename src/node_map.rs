//! Hash-consing arena: structurally equal nodes share one id.
//!
//! Nodes are looked up by a 64-bit [`Signature`]. A matching signature is
//! only a candidate; the stored node is compared in full before its id is
//! reused, so a hash collision can never merge two different nodes.

use crate::error::Result;
use crate::id_gen::IdGenerator;
use crate::symbol::Signature;
use ahash::AHashMap as HashMap;
use std::hash::Hash;

/// Arena of unique nodes plus the signature index over them.
#[derive(Debug, Clone)]
pub struct NodeMap<N> {
    nodes: Vec<N>,
    /// Ids per signature; more than one only on a hash collision
    index: HashMap<Signature, Vec<u32>>,
    collisions: usize,
    id_gen: IdGenerator,
}

impl<N: Hash + Eq> NodeMap<N> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::default(),
            collisions: 0,
            id_gen: IdGenerator::new(0, "DAG nodes"),
        }
    }

    /// Returns the id of the node equal to `node`, adding it if new.
    pub fn intern(&mut self, node: N) -> Result<u32> {
        let signature = Signature::of(&node);
        self.intern_with(signature, node).map(|(id, _)| id)
    }

    /// Interns under an explicit signature. Also reports whether the node
    /// was new.
    pub(crate) fn intern_with(&mut self, signature: Signature, node: N) -> Result<(u32, bool)> {
        let candidates = self.index.entry(signature).or_default();
        // Verify full equality (hash collision check)
        if let Some(&id) = candidates
            .iter()
            .find(|&&id| self.nodes[id as usize] == node)
        {
            return Ok((id, false));
        }
        if !candidates.is_empty() {
            self.collisions += 1;
        }
        let id = self.id_gen.get()?;
        candidates.push(id);
        self.nodes.push(node);
        Ok((id, true))
    }

    /// Looks a node up without inserting it.
    pub fn find(&self, node: &N) -> Option<u32> {
        self.index
            .get(&Signature::of(node))?
            .iter()
            .copied()
            .find(|&id| self.nodes[id as usize] == *node)
    }

    pub fn get(&self, id: u32) -> Option<&N> {
        self.nodes.get(id as usize)
    }

    /// Nodes in id order. Ids are assigned on first insertion, so a node's
    /// parts always come before it.
    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct signatures in the index.
    pub fn signatures(&self) -> usize {
        self.index.len()
    }

    /// Nodes that landed on an already used signature.
    pub fn collisions(&self) -> usize {
        self.collisions
    }
}

impl<N: Hash + Eq> Default for NodeMap<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedups() {
        let mut map = NodeMap::new();
        let a = map.intern(("a", 1)).unwrap();
        let b = map.intern(("b", 2)).unwrap();
        let a2 = map.intern(("a", 1)).unwrap();

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(a2, a);
        assert_eq!(map.len(), 2);
        assert_eq!(map.find(&("b", 2)), Some(1));
        assert_eq!(map.find(&("c", 3)), None);
        assert_eq!(map.get(1), Some(&("b", 2)));
    }

    #[test]
    fn test_collision_keeps_nodes_apart() {
        let mut map = NodeMap::new();
        let forced = Signature::from_raw(7);
        let (x, new_x) = map.intern_with(forced, "x").unwrap();
        let (y, new_y) = map.intern_with(forced, "y").unwrap();
        let (x2, new_x2) = map.intern_with(forced, "x").unwrap();

        assert!(new_x && new_y && !new_x2);
        assert_ne!(x, y);
        assert_eq!(x2, x);
        assert_eq!(map.len(), 2);
        assert_eq!(map.signatures(), 1);
        assert_eq!(map.collisions(), 1);
    }
}
