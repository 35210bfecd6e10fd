//! Symbol frequencies and their empirical entropy.

use ahash::AHashMap as HashMap;
use std::hash::Hash;

/// Occurrence counts, kept in first-seen order.
///
/// The order matters: Huffman construction breaks frequency ties by it, and
/// the coder transmits tables in it.
#[derive(Debug, Clone)]
pub struct FrequencyTable<T> {
    index: HashMap<T, usize>,
    entries: Vec<(T, u64)>,
    total: u64,
}

impl<T: Hash + Eq + Clone> FrequencyTable<T> {
    pub fn new() -> Self {
        Self {
            index: HashMap::default(),
            entries: Vec::new(),
            total: 0,
        }
    }

    pub fn add(&mut self, symbol: T) {
        self.add_count(symbol, 1);
    }

    pub fn add_count(&mut self, symbol: T, count: u64) {
        let slot = match self.index.get(&symbol) {
            Some(&slot) => slot,
            None => {
                self.index.insert(symbol.clone(), self.entries.len());
                self.entries.push((symbol, 0));
                self.entries.len() - 1
            }
        };
        self.entries[slot].1 += count;
        self.total += count;
    }

    pub fn count(&self, symbol: &T) -> u64 {
        self.index
            .get(symbol)
            .map_or(0, |&slot| self.entries[slot].1)
    }

    /// Position of `symbol` in first-seen order.
    pub fn position(&self, symbol: &T) -> Option<usize> {
        self.index.get(symbol).copied()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(symbol, count)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, u64)> + '_ {
        self.entries.iter().map(|(symbol, count)| (symbol, *count))
    }

    /// Empirical entropy in bits per symbol: `-sum(p * log2 p)`.
    pub fn entropy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let total = self.total as f64;
        self.entries
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(_, count)| {
                let p = *count as f64 / total;
                -p * p.log2()
            })
            .sum()
    }

    /// Ideal code length of `symbol` in bits, `-log2 p`. `None` for a symbol
    /// that never occurred.
    pub fn optimal_bits(&self, symbol: &T) -> Option<f64> {
        let count = self.count(symbol);
        if count == 0 {
            return None;
        }
        Some(-(count as f64 / self.total as f64).log2())
    }

    /// Entropy times the number of symbols: the lower bound for coding all
    /// of them.
    pub fn entropy_bits(&self) -> f64 {
        self.entropy() * self.total as f64
    }
}

impl<T: Hash + Eq + Clone> Default for FrequencyTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq + Clone> FromIterator<T> for FrequencyTable<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut table = FrequencyTable::new();
        for symbol in iter {
            table.add(symbol);
        }
        table
    }
}
