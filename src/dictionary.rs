//! Rule dictionary and the grammar a RePair run produces.

use crate::error::Result;
use crate::id_gen::IdGenerator;
use crate::symbol::{Pair, Symbol};

/// Ordered list of pair rules.
///
/// Rule `i` defines symbol `terminals + i` and only references symbols below
/// it, so the grammar is acyclic and can be expanded without checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    terminals: u32,
    rules: Vec<Pair>,
    /// Occurrences replaced when each rule was created
    uses: Vec<usize>,
    id_gen: IdGenerator,
}

impl Dictionary {
    /// Creates an empty dictionary over `terminals` terminal symbols.
    pub fn new(terminals: u32) -> Self {
        Self {
            terminals,
            rules: Vec::new(),
            uses: Vec::new(),
            id_gen: IdGenerator::new(terminals, "grammar symbols"),
        }
    }

    /// Appends the rule `pair -> new symbol` and returns the new symbol.
    ///
    /// Fails with `CapacityExceeded` once symbol ids would overflow `u32`.
    pub fn add_rule(&mut self, pair: Pair, uses: usize) -> Result<Symbol> {
        debug_assert!(pair.first.id() < self.id_gen.peek());
        debug_assert!(pair.second.id() < self.id_gen.peek());
        let symbol = Symbol::new(self.id_gen.get()?);
        self.rules.push(pair);
        self.uses.push(uses);
        Ok(symbol)
    }

    /// Returns the pair a nonterminal stands for, or `None` for terminals
    /// and unknown ids.
    pub fn rule(&self, symbol: Symbol) -> Option<Pair> {
        let index = symbol.id().checked_sub(self.terminals)?;
        self.rules.get(index as usize).copied()
    }

    pub fn is_terminal(&self, symbol: Symbol) -> bool {
        symbol.id() < self.terminals
    }

    /// Whether `symbol` is a terminal or a rule of this dictionary.
    pub fn contains(&self, symbol: Symbol) -> bool {
        symbol.index() < self.num_symbols()
    }

    pub fn terminals(&self) -> u32 {
        self.terminals
    }

    /// Terminals plus rules.
    pub fn num_symbols(&self) -> usize {
        self.terminals as usize + self.rules.len()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in creation order.
    pub fn rules(&self) -> &[Pair] {
        &self.rules
    }

    /// For each rule, how many occurrences it replaced when it was created.
    pub fn uses(&self) -> &[usize] {
        &self.uses
    }

    /// Appends the terminal expansion of `symbol` to `out`.
    ///
    /// Uses an explicit stack, so deep rule chains cannot overflow the call
    /// stack.
    pub fn expand_into(&self, symbol: Symbol, out: &mut Vec<Symbol>) {
        let mut stack = vec![symbol];
        while let Some(symbol) = stack.pop() {
            match self.rule(symbol) {
                Some(pair) => {
                    stack.push(pair.second);
                    stack.push(pair.first);
                }
                None => out.push(symbol),
            }
        }
    }

    /// Length of the terminal expansion of every symbol, indexed by id.
    pub fn expansion_lengths(&self) -> Vec<u64> {
        let mut lengths = vec![1u64; self.terminals as usize];
        for pair in &self.rules {
            let len = lengths[pair.first.index()] + lengths[pair.second.index()];
            lengths.push(len);
        }
        lengths
    }
}

/// A dictionary plus the compacted sequence it expands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    pub dictionary: Dictionary,
    pub sequence: Vec<Symbol>,
}

impl Grammar {
    /// Expands the whole grammar back to terminal symbols.
    pub fn expand(&self) -> Vec<Symbol> {
        let mut out = Vec::new();
        for &symbol in &self.sequence {
            self.dictionary.expand_into(symbol, &mut out);
        }
        out
    }

    /// Symbols needed to write the grammar down: two per rule plus the
    /// sequence.
    pub fn size(&self) -> usize {
        2 * self.dictionary.len() + self.sequence.len()
    }
}
