//! RePair grammar compression algorithm.
//!
//! RePair is a greedy grammar-based compression algorithm that repeatedly
//! replaces the most frequent pair of adjacent symbols with a new rule.
//!
//! Pair counts are maintained incrementally: each replacement only touches
//! the pairs around it, and the pairs whose counts changed are repositioned
//! in a frequency-bucketed queue once per pass. Ties between equally
//! frequent pairs go to the lexicographically smallest pair.
//!
//! # Example
//!
//! ```
//! use treerepair::Repair;
//!
//! let mut repair = Repair::new();
//! repair.extend("abcabcabcabc".chars()).unwrap();
//! repair.compress().unwrap();
//!
//! // Reconstructs the original sequence
//! let reconstructed: String = repair.iter().collect();
//! assert_eq!(reconstructed, "abcabcabcabc");
//! ```

use crate::alphabet::Alphabet;
use crate::bucket_queue::BucketQueue;
use crate::config::RepairConfig;
use crate::dictionary::{Dictionary, Grammar};
use crate::error::{Error, Result};
use crate::records::Records;
use crate::symbol::{Pair, Symbol};
use log::{debug, trace};
use std::hash::Hash;

/// Runs RePair over `symbols`, whose ids must all be below `terminals`.
///
/// Expanding the returned grammar reproduces `symbols` exactly. An empty or
/// single-symbol input comes back unchanged with an empty dictionary.
pub fn compress_symbols(
    symbols: &[Symbol],
    terminals: u32,
    config: &RepairConfig,
) -> Result<Grammar> {
    if let Some(symbol) = symbols.iter().find(|s| s.id() >= terminals) {
        return Err(Error::corrupt(format!(
            "symbol {symbol} outside a terminal alphabet of {terminals}"
        )));
    }
    Compressor::new(symbols, terminals, config)?.run()
}

/// One RePair run. Owns every mutable structure of the run.
struct Compressor {
    records: Records,
    queue: BucketQueue<Pair>,
    dictionary: Dictionary,
    max_rules: Option<usize>,
}

impl Compressor {
    fn new(symbols: &[Symbol], terminals: u32, config: &RepairConfig) -> Result<Self> {
        Ok(Self {
            records: Records::new(symbols)?,
            queue: BucketQueue::new(BucketQueue::<Pair>::cap_for(symbols.len())),
            dictionary: Dictionary::new(terminals),
            max_rules: config.max_rules,
        })
    }

    fn run(mut self) -> Result<Grammar> {
        let input_length = self.records.len();
        self.flush_dirty();
        debug!(
            target: "repair",
            "{} symbols, {} distinct pairs, {} queued",
            input_length,
            self.records.pairs.len(),
            self.queue.len()
        );

        while let Some((pair, count)) = self.queue.pop_max() {
            if self.max_rules.is_some_and(|max| self.dictionary.len() >= max) {
                debug!(target: "repair", "rule budget of {} reached", self.dictionary.len());
                break;
            }

            let verified = match self.records.pairs.get_mut(&pair) {
                Some(entry) => {
                    entry.queued = None;
                    std::mem::replace(&mut entry.verified, true)
                }
                None => continue,
            };

            if !verified {
                let exact = self.records.count_non_overlapping(pair);
                if exact < count {
                    trace!(target: "repair", "{pair:?} recounted from {count} to {exact}");
                    if self.queue.insert(pair, exact) {
                        if let Some(entry) = self.records.pairs.get_mut(&pair) {
                            entry.queued = Some(exact);
                        }
                    }
                    continue;
                }
            }

            self.replace_all(pair, count)?;
            self.flush_dirty();
        }

        let sequence = self.records.symbols();
        debug!(
            target: "repair",
            "created {} rules, sequence {} -> {}",
            self.dictionary.len(),
            input_length,
            sequence.len()
        );
        Ok(Grammar {
            dictionary: self.dictionary,
            sequence,
        })
    }

    /// Creates the rule for `pair` and replaces its `count` non-overlapping
    /// occurrences, left to right.
    fn replace_all(&mut self, pair: Pair, count: usize) -> Result<()> {
        let symbol = self.dictionary.add_rule(pair, count)?;
        let sites = self.records.occurrences(pair);
        self.records.take_entry(pair);

        let mut replaced = 0;
        for key in sites {
            if self.records.replace_at(key, pair, symbol) {
                replaced += 1;
            }
        }
        debug_assert_eq!(replaced, count, "queued count of {pair:?} was stale");
        trace!(
            target: "repair",
            "{symbol} -> ({}, {}) replaced {replaced} occurrences",
            pair.first,
            pair.second
        );
        Ok(())
    }

    /// Repositions every entry whose count changed since the last flush.
    fn flush_dirty(&mut self) {
        for pair in self.records.take_dirty() {
            let Some(entry) = self.records.pairs.get_mut(&pair) else {
                continue;
            };
            if let Some(queued) = entry.queued.take() {
                self.queue.remove(pair, queued);
            }
            if entry.count == 0 {
                self.records.pairs.remove(&pair);
                continue;
            }
            entry.verified = !pair.is_self_pair();
            if self.queue.insert(pair, entry.count) {
                entry.queued = Some(entry.count);
            }
        }
    }
}

/// Main RePair data structure.
///
/// Collects values of any hashable type, maps them to dense terminal
/// symbols and compresses the resulting sequence.
pub struct Repair<T> {
    /// Deduplicated terminal values
    alphabet: Alphabet<T>,

    /// Input symbols, replaced by the compacted sequence on compression
    sequence: Vec<Symbol>,

    /// Rules, present once compression has been performed
    dictionary: Option<Dictionary>,

    config: RepairConfig,

    /// Number of values added
    length: usize,
}

impl<T: Hash + Eq + Clone> Repair<T> {
    /// Creates a new empty Repair instance.
    pub fn new() -> Self {
        Self::with_config(RepairConfig::default())
    }

    pub fn with_config(config: RepairConfig) -> Self {
        Self {
            alphabet: Alphabet::new(),
            sequence: Vec::new(),
            dictionary: None,
            config,
            length: 0,
        }
    }

    /// Adds a value to the sequence.
    ///
    /// # Panics
    ///
    /// Panics if called after `compress()`.
    pub fn push(&mut self, value: T) -> Result<()> {
        assert!(
            self.dictionary.is_none(),
            "Cannot add values after compression has been performed"
        );
        let id = self.alphabet.intern(value)?;
        self.sequence.push(Symbol::new(id));
        self.length += 1;
        Ok(())
    }

    /// Extends the sequence with multiple values.
    ///
    /// Must be called before `compress()`.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) -> Result<()> {
        for value in iter {
            self.push(value)?;
        }
        Ok(())
    }

    /// Performs RePair compression on the sequence.
    ///
    /// Replaces frequent pairs with rules until no pair occurs more than
    /// once or the rule budget is spent. Calling it again has no effect.
    pub fn compress(&mut self) -> Result<()> {
        if self.dictionary.is_some() {
            return Ok(());
        }
        let terminals = u32::try_from(self.alphabet.len())
            .map_err(|_| Error::capacity("terminal values", u32::MAX as u64))?;
        let grammar = compress_symbols(&self.sequence, terminals, &self.config)?;
        self.sequence = grammar.sequence;
        self.dictionary = Some(grammar.dictionary);
        Ok(())
    }

    /// Returns the number of values added to the sequence.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if no values have been added.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns whether compression has been performed.
    pub fn is_compressed(&self) -> bool {
        self.dictionary.is_some()
    }

    /// The input symbols before compression, the compacted sequence after.
    pub fn sequence(&self) -> &[Symbol] {
        &self.sequence
    }

    /// The rules, once compressed.
    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.dictionary.as_ref()
    }

    /// Terminal values in symbol order.
    pub fn alphabet(&self) -> &Alphabet<T> {
        &self.alphabet
    }

    /// Clones out the grammar, once compressed.
    pub fn grammar(&self) -> Option<Grammar> {
        self.dictionary.as_ref().map(|dictionary| Grammar {
            dictionary: dictionary.clone(),
            sequence: self.sequence.clone(),
        })
    }

    /// Returns compression statistics.
    pub fn stats(&self) -> RepairStats {
        let num_rules = self.dictionary.as_ref().map_or(0, Dictionary::len);
        RepairStats {
            input_length: self.length,
            sequence_length: self.sequence.len(),
            num_rules,
            grammar_symbols: self.sequence.len() + 2 * num_rules,
            compressed: self.is_compressed(),
        }
    }
}

impl<T: Hash + Eq + Clone> Default for Repair<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about RePair compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairStats {
    /// Number of input symbols added
    pub input_length: usize,
    /// Length of the compacted sequence
    pub sequence_length: usize,
    /// Number of rules created
    pub num_rules: usize,
    /// Sequence length plus two symbols per rule
    pub grammar_symbols: usize,
    /// Whether compression has been performed
    pub compressed: bool,
}

impl RepairStats {
    /// Returns the compression ratio as a percentage.
    ///
    /// Lower is better. 100% means no compression.
    pub fn compression_ratio(&self) -> f64 {
        if self.input_length == 0 {
            0.0
        } else {
            (self.grammar_symbols as f64 / self.input_length as f64) * 100.0
        }
    }
}
