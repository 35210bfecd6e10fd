//! Iterator for reconstructing sequences from RePair grammars.

use crate::alphabet::Alphabet;
use crate::dictionary::{Dictionary, Grammar};
use crate::repair::Repair;
use crate::symbol::Symbol;
use std::hash::Hash;

/// Iterator that reconstructs the original sequence from a RePair grammar.
///
/// Uses a stack of pending symbols to expand rules without recursion.
pub struct RepairIter<'a, T> {
    alphabet: &'a Alphabet<T>,
    dictionary: Option<&'a Dictionary>,
    sequence: &'a [Symbol],
    pos: usize,
    stack: Vec<Symbol>,
}

impl<'a, T: Hash + Eq + Clone> RepairIter<'a, T> {
    pub(crate) fn new(repair: &'a Repair<T>) -> Self {
        Self {
            alphabet: repair.alphabet(),
            dictionary: repair.dictionary(),
            sequence: repair.sequence(),
            pos: 0,
            stack: Vec::new(),
        }
    }
}

impl<'a, T: Hash + Eq + Clone> Iterator for RepairIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let symbol = match self.stack.pop() {
                Some(symbol) => symbol,
                None => {
                    let symbol = *self.sequence.get(self.pos)?;
                    self.pos += 1;
                    symbol
                }
            };

            // Descend into rules until a terminal is reached
            match self.dictionary.and_then(|dict| dict.rule(symbol)) {
                Some(pair) => {
                    self.stack.push(pair.second);
                    self.stack.push(pair.first);
                }
                None => return self.alphabet.get(symbol.id()),
            }
        }
    }
}

impl<T: Hash + Eq + Clone> Repair<T> {
    /// Returns an iterator over the reconstructed sequence.
    ///
    /// The iterator expands all rules to reconstruct the original input.
    pub fn iter(&self) -> RepairIter<'_, T> {
        RepairIter::new(self)
    }
}

impl<'a, T: Hash + Eq + Clone> IntoIterator for &'a Repair<T> {
    type Item = &'a T;
    type IntoIter = RepairIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the terminal symbols a [`Grammar`] expands to.
pub struct GrammarIter<'a> {
    dictionary: &'a Dictionary,
    sequence: std::slice::Iter<'a, Symbol>,
    stack: Vec<Symbol>,
}

impl<'a> Iterator for GrammarIter<'a> {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        loop {
            let symbol = match self.stack.pop() {
                Some(symbol) => symbol,
                None => *self.sequence.next()?,
            };
            match self.dictionary.rule(symbol) {
                Some(pair) => {
                    self.stack.push(pair.second);
                    self.stack.push(pair.first);
                }
                None => return Some(symbol),
            }
        }
    }
}

impl Grammar {
    /// Lazily expands the grammar, one terminal at a time.
    pub fn iter(&self) -> GrammarIter<'_> {
        GrammarIter {
            dictionary: &self.dictionary,
            sequence: self.sequence.iter(),
            stack: Vec::new(),
        }
    }
}
