//! Dense interning of input values.
//!
//! Both engines work on small integer ids: RePair on terminal symbols, the
//! tree model on label ids. `Alphabet` hands out those ids in first-seen
//! order and maps them back to values.

use crate::error::Result;
use crate::id_gen::IdGenerator;
use ahash::AHashMap as HashMap;
use std::hash::Hash;

/// Bidirectional map between values and dense `u32` ids.
#[derive(Debug, Clone)]
pub struct Alphabet<T> {
    /// Deduplicated values, indexed by id
    values: Vec<T>,
    /// Maps values to their id
    index: HashMap<T, u32>,
    id_gen: IdGenerator,
}

impl<T: Hash + Eq + Clone> Alphabet<T> {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            index: HashMap::default(),
            id_gen: IdGenerator::new(0, "alphabet entries"),
        }
    }

    /// Returns the id of `value`, assigning the next free one on first sight.
    pub fn intern(&mut self, value: T) -> Result<u32> {
        if let Some(&id) = self.index.get(&value) {
            return Ok(id);
        }
        let id = self.id_gen.get()?;
        self.values.push(value.clone());
        self.index.insert(value, id);
        Ok(id)
    }

    /// Looks up the id of an already interned value.
    pub fn id_of(&self, value: &T) -> Option<u32> {
        self.index.get(value).copied()
    }

    /// Returns the value behind `id`.
    pub fn get(&self, id: u32) -> Option<&T> {
        self.values.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in id order.
    pub fn values(&self) -> &[T] {
        &self.values
    }
}

impl<T: Hash + Eq + Clone> Default for Alphabet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order() {
        let mut alphabet = Alphabet::new();
        assert_eq!(alphabet.intern('b').unwrap(), 0);
        assert_eq!(alphabet.intern('a').unwrap(), 1);
        assert_eq!(alphabet.intern('b').unwrap(), 0);
        assert_eq!(alphabet.len(), 2);
        assert_eq!(alphabet.values(), &['b', 'a']);
    }

    #[test]
    fn test_lookup() {
        let mut alphabet = Alphabet::new();
        for value in ["x", "y", "x"] {
            alphabet.intern(value).unwrap();
        }
        assert_eq!(alphabet.id_of(&"y"), Some(1));
        assert_eq!(alphabet.id_of(&"z"), None);
        assert_eq!(alphabet.get(0), Some(&"x"));
        assert_eq!(alphabet.get(2), None);
    }

    #[test]
    fn test_empty() {
        let alphabet = Alphabet::<u8>::default();
        assert!(alphabet.is_empty());
        assert_eq!(alphabet.len(), 0);
    }
}
