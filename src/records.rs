//! Working sequence and pair bookkeeping for one RePair run.
//!
//! The sequence is a doubly linked list of [`SymbolNode`]s in a `SlotMap`.
//! Every node that starts a pair is also threaded into that pair's
//! occurrence list, and each distinct pair has one [`PairEntry`] holding the
//! list head and its count. Replacing one occurrence touches a constant
//! number of nodes and entries; entries whose count changed are collected in
//! a dirty list and repositioned in the priority queue after the pass.

use crate::error::{Error, Result};
use crate::symbol::{Pair, Symbol, SymbolNode};
use ahash::AHashMap as HashMap;
use slotmap::{DefaultKey, SlotMap};

/// Bookkeeping for one distinct pair.
#[derive(Debug, Default)]
pub(crate) struct PairEntry {
    /// Occurrences linked into the list, overlapping ones included
    pub count: usize,
    /// First node of the occurrence list
    pub head: Option<DefaultKey>,
    /// Count the pair is currently queued under
    pub queued: Option<usize>,
    /// Count changed since the entry was last queued
    pub dirty: bool,
    /// Queued count is exact. Self-pairs are queued unverified because
    /// overlapping occurrences inflate their raw count.
    pub verified: bool,
}

#[derive(Debug)]
pub(crate) struct Records {
    pub(crate) nodes: SlotMap<DefaultKey, SymbolNode>,
    head: Option<DefaultKey>,
    pub(crate) pairs: HashMap<Pair, PairEntry>,
    dirty: Vec<Pair>,
}

impl Records {
    /// Builds the linked sequence and the occurrence list of every pair.
    ///
    /// All entries start dirty, so the first flush queues them.
    pub(crate) fn new(symbols: &[Symbol]) -> Result<Self> {
        if u32::try_from(symbols.len()).is_err() {
            return Err(Error::capacity("input symbols", u32::MAX as u64));
        }

        let mut records = Records {
            nodes: SlotMap::with_capacity(symbols.len()),
            head: None,
            pairs: HashMap::default(),
            dirty: Vec::new(),
        };

        let mut prev: Option<DefaultKey> = None;
        for (pos, &symbol) in symbols.iter().enumerate() {
            let key = records.nodes.insert(SymbolNode::new(symbol, pos as u32));
            records.nodes[key].prev = prev;
            match prev {
                Some(prev) => records.nodes[prev].next = Some(key),
                None => records.head = Some(key),
            }
            prev = Some(key);
        }

        let mut current = records.head;
        while let Some(key) = current {
            current = records.nodes[key].next;
            if current.is_some() {
                records.link_occurrence(key);
            }
        }

        Ok(records)
    }

    /// Number of live symbols.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// The pair starting at `key`, if `key` is live and not the last node.
    pub(crate) fn pair_at(&self, key: DefaultKey) -> Option<Pair> {
        let node = self.nodes.get(key)?;
        let next = node.next?;
        Some(Pair::new(node.symbol, self.nodes[next].symbol))
    }

    /// Pushes the occurrence starting at `key` onto its pair's list.
    fn link_occurrence(&mut self, key: DefaultKey) {
        let Some(pair) = self.pair_at(key) else {
            return;
        };
        let entry = self.pairs.entry(pair).or_default();
        let old_head = entry.head.replace(key);
        entry.count += 1;
        if !entry.dirty {
            entry.dirty = true;
            self.dirty.push(pair);
        }

        let node = &mut self.nodes[key];
        node.prev_occ = None;
        node.next_occ = old_head;
        if let Some(old_head) = old_head {
            self.nodes[old_head].prev_occ = Some(key);
        }
    }

    /// Unlinks the occurrence starting at `key`. A pair without an entry is
    /// the one being replaced; its list is no longer maintained.
    fn unlink_occurrence(&mut self, key: DefaultKey) {
        let Some(pair) = self.pair_at(key) else {
            return;
        };
        let Some(entry) = self.pairs.get_mut(&pair) else {
            return;
        };
        let (prev_occ, next_occ) = {
            let node = &self.nodes[key];
            (node.prev_occ, node.next_occ)
        };

        match prev_occ {
            Some(prev) => self.nodes[prev].next_occ = next_occ,
            None => entry.head = next_occ,
        }
        if let Some(next) = next_occ {
            self.nodes[next].prev_occ = prev_occ;
        }
        entry.count -= 1;
        if !entry.dirty {
            entry.dirty = true;
            self.dirty.push(pair);
        }

        let node = &mut self.nodes[key];
        node.prev_occ = None;
        node.next_occ = None;
    }

    /// Occurrence list of `pair`, in sequence order.
    pub(crate) fn occurrences(&self, pair: Pair) -> Vec<DefaultKey> {
        let mut keys = Vec::new();
        let mut current = self.pairs.get(&pair).and_then(|entry| entry.head);
        while let Some(key) = current {
            keys.push(key);
            current = self.nodes[key].next_occ;
        }
        keys.sort_unstable_by_key(|&key| self.nodes[key].pos);
        keys
    }

    /// Counts occurrences of `pair` that can be replaced together, greedily
    /// from the left. Only self-pairs can overlap: `aaa` holds one.
    pub(crate) fn count_non_overlapping(&self, pair: Pair) -> usize {
        let mut count = 0;
        let mut blocked: Option<DefaultKey> = None;
        for key in self.occurrences(pair) {
            if blocked == Some(key) {
                continue;
            }
            count += 1;
            blocked = self.nodes[key].next;
        }
        count
    }

    /// Drops the entry of `pair` ahead of replacing all its occurrences.
    pub(crate) fn take_entry(&mut self, pair: Pair) -> Option<PairEntry> {
        self.pairs.remove(&pair)
    }

    /// Replaces the occurrence of `pair` starting at `key` by `symbol`.
    ///
    /// The pairs `(x, a)` and `(b, y)` around the occurrence disappear and
    /// `(x, A)` and `(A, y)` appear. Returns `false` if an earlier
    /// replacement already consumed this occurrence.
    pub(crate) fn replace_at(&mut self, key: DefaultKey, pair: Pair, symbol: Symbol) -> bool {
        if self.pair_at(key) != Some(pair) {
            return false;
        }
        let (prev, second) = {
            let node = &self.nodes[key];
            (node.prev, node.next)
        };
        let Some(second) = second else {
            return false;
        };
        let after = self.nodes[second].next;

        if let Some(prev) = prev {
            self.unlink_occurrence(prev);
        }
        if after.is_some() {
            self.unlink_occurrence(second);
        }

        self.nodes.remove(second);
        let node = &mut self.nodes[key];
        node.symbol = symbol;
        node.next = after;
        if let Some(after) = after {
            self.nodes[after].prev = Some(key);
        }

        if let Some(prev) = prev {
            self.link_occurrence(prev);
        }
        if after.is_some() {
            self.link_occurrence(key);
        }
        true
    }

    /// Takes the pairs whose counts changed since the last call and clears
    /// their dirty flags.
    pub(crate) fn take_dirty(&mut self) -> Vec<Pair> {
        let dirty = std::mem::take(&mut self.dirty);
        for pair in &dirty {
            if let Some(entry) = self.pairs.get_mut(pair) {
                entry.dirty = false;
            }
        }
        dirty
    }

    /// The live sequence, front to back.
    pub(crate) fn symbols(&self) -> Vec<Symbol> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut current = self.head;
        while let Some(key) = current {
            let node = &self.nodes[key];
            out.push(node.symbol);
            current = node.next;
        }
        out
    }
}
