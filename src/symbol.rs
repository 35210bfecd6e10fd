use slotmap::DefaultKey;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A grammar symbol.
///
/// Ids below the terminal count of a [`Dictionary`](crate::Dictionary) are
/// terminals, every other id names the rule that introduced it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    pub const fn new(id: u32) -> Self {
        Symbol(id)
    }

    pub const fn id(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An ordered pair of adjacent symbols.
///
/// The derived `Ord` (first, then second) is the tie-break order used when
/// several pairs share the highest count.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pair {
    pub first: Symbol,
    pub second: Symbol,
}

impl Pair {
    pub const fn new(first: Symbol, second: Symbol) -> Self {
        Pair { first, second }
    }

    /// True for pairs like `(a, a)` whose occurrences can overlap.
    pub fn is_self_pair(&self) -> bool {
        self.first == self.second
    }
}

/// A slot of the working sequence.
///
/// Besides the sequence links each slot is threaded into the occurrence list
/// of the pair that starts at it, so a pair's occurrences can be visited and
/// unlinked without scanning the sequence.
#[derive(Debug)]
pub(crate) struct SymbolNode {
    pub symbol: Symbol,
    /// Position in the input; never changes, so it orders live slots.
    pub pos: u32,
    pub prev: Option<DefaultKey>,
    pub next: Option<DefaultKey>,
    pub prev_occ: Option<DefaultKey>,
    pub next_occ: Option<DefaultKey>,
}

impl SymbolNode {
    pub(crate) fn new(symbol: Symbol, pos: u32) -> Self {
        Self {
            symbol,
            pos,
            prev: None,
            next: None,
            prev_occ: None,
            next_occ: None,
        }
    }
}

/// A compact structural hash used as a node map key.
///
/// Stores 64 bits instead of the full node so lookups stay cheap. Two equal
/// signatures do not prove equality; callers must compare the nodes.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub(crate) struct Signature(u64);

impl Signature {
    /// Hashes a value with fixed keys, so signatures are stable across runs.
    pub(crate) fn of<T: Hash + ?Sized>(value: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Signature(hasher.finish())
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Signature(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_consistency() {
        let a = Signature::of(&(1u32, 2u32));
        let b = Signature::of(&(1u32, 2u32));
        let c = Signature::of(&(2u32, 1u32));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_pair_order() {
        let ab = Pair::new(Symbol::new(0), Symbol::new(1));
        let ba = Pair::new(Symbol::new(1), Symbol::new(0));
        let aa = Pair::new(Symbol::new(0), Symbol::new(0));

        assert!(aa < ab);
        assert!(ab < ba);
        assert!(aa.is_self_pair());
        assert!(!ab.is_self_pair());
    }

    #[test]
    fn test_symbol_node_creation() {
        let node = SymbolNode::new(Symbol::new(7), 3);
        assert_eq!(node.symbol, Symbol::new(7));
        assert_eq!(node.pos, 3);
        assert_eq!(node.prev, None);
        assert_eq!(node.next, None);
        assert_eq!(node.prev_occ, None);
        assert_eq!(node.next_occ, None);
    }
}
