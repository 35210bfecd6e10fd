//! Optimal prefix codes.
//!
//! Construction is deterministic so a decoder can rebuild the exact code from
//! the transmitted frequency table: the heap orders items by frequency, then
//! by an order number. Leaves take their position in the table, internal
//! nodes take increasing numbers after all leaves. Of the two items popped
//! together, the first becomes the 0-branch.

use crate::bit_sink::BitSource;
use crate::entropy::FrequencyTable;
use crate::error::{Error, Result};
use ahash::AHashMap as HashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::hash::Hash;
use std::io::Read;

/// Longest code the packed representation can hold.
pub const MAX_CODE_LEN: u8 = 64;

/// A code of up to 64 bits, stored right-aligned.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Codeword {
    bits: u64,
    len: u8,
}

impl Codeword {
    pub fn new(bits: u64, len: u8) -> Self {
        debug_assert!(len <= MAX_CODE_LEN);
        Self { bits, len }
    }

    pub fn bits(self) -> u64 {
        self.bits
    }

    pub fn len(self) -> u8 {
        self.len
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }
}

#[derive(Copy, Clone, Debug)]
enum HuffNode {
    Leaf(usize),
    Internal { zero: usize, one: usize },
}

#[derive(Debug, Clone)]
pub struct HuffmanCode<T> {
    symbols: Vec<T>,
    index: HashMap<T, usize>,
    freqs: Vec<u64>,
    codes: Vec<Codeword>,
    /// Leaves first, in table order, then internal nodes
    nodes: Vec<HuffNode>,
}

impl<T: Hash + Eq + Clone> HuffmanCode<T> {
    /// Builds the code for a frequency table.
    ///
    /// A single symbol gets the 1-bit code `0`. Fails with
    /// [`Error::CapacityExceeded`] if some code would exceed 64 bits.
    pub fn build(table: &FrequencyTable<T>) -> Result<Self> {
        let (symbols, freqs): (Vec<T>, Vec<u64>) =
            table.iter().map(|(symbol, count)| (symbol.clone(), count)).unzip();
        let index = symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| (symbol.clone(), i))
            .collect();
        let mut code = Self {
            nodes: (0..symbols.len()).map(HuffNode::Leaf).collect(),
            codes: vec![Codeword::new(0, 0); symbols.len()],
            symbols,
            index,
            freqs,
        };
        match code.symbols.len() {
            0 => {}
            1 => code.codes[0] = Codeword::new(0, 1),
            _ => {
                code.merge_nodes();
                code.assign_codes()?;
            }
        }
        Ok(code)
    }

    fn merge_nodes(&mut self) {
        // Node ids double as order numbers.
        let mut heap: BinaryHeap<Reverse<(u64, usize)>> = self
            .freqs
            .iter()
            .enumerate()
            .map(|(id, &freq)| Reverse((freq, id)))
            .collect();
        while let (Some(Reverse((f0, zero))), Some(Reverse((f1, one)))) = (heap.pop(), heap.pop()) {
            let id = self.nodes.len();
            self.nodes.push(HuffNode::Internal { zero, one });
            heap.push(Reverse((f0.saturating_add(f1), id)));
        }
    }

    fn root(&self) -> Option<usize> {
        self.nodes.len().checked_sub(1)
    }

    fn assign_codes(&mut self) -> Result<()> {
        let Some(root) = self.root() else {
            return Ok(());
        };
        let mut stack = vec![(root, 0u64, 0u8)];
        while let Some((node, bits, len)) = stack.pop() {
            match self.nodes[node] {
                HuffNode::Leaf(symbol) => self.codes[symbol] = Codeword::new(bits, len),
                HuffNode::Internal { zero, one } => {
                    if len == MAX_CODE_LEN {
                        return Err(Error::capacity("Huffman code bits", u64::from(MAX_CODE_LEN)));
                    }
                    stack.push((one, bits << 1 | 1, len + 1));
                    stack.push((zero, bits << 1, len + 1));
                }
            }
        }
        Ok(())
    }

    pub fn code(&self, symbol: &T) -> Option<Codeword> {
        self.index.get(symbol).map(|&i| self.codes[i])
    }

    /// `(symbol, codeword)` pairs in table order.
    pub fn codes(&self) -> impl Iterator<Item = (&T, Codeword)> + '_ {
        self.symbols.iter().zip(self.codes.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn max_length(&self) -> u8 {
        self.codes.iter().map(|code| code.len()).max().unwrap_or(0)
    }

    /// Bits needed to code every counted occurrence.
    pub fn bits_needed(&self) -> u64 {
        self.freqs
            .iter()
            .zip(&self.codes)
            .map(|(&freq, code)| freq * u64::from(code.len()))
            .sum()
    }

    /// Expected code length in bits per occurrence.
    pub fn average_length(&self) -> f64 {
        let total: u64 = self.freqs.iter().sum();
        if total == 0 {
            return 0.0;
        }
        self.bits_needed() as f64 / total as f64
    }

    /// Reads one codeword and returns its symbol.
    pub fn decode<R: Read>(&self, source: &mut BitSource<R>) -> Result<&T> {
        let Some(root) = self.root() else {
            return Err(Error::corrupt("decoding with an empty code"));
        };
        if let HuffNode::Leaf(symbol) = self.nodes[root] {
            return match source.read_bit()? {
                false => Ok(&self.symbols[symbol]),
                true => Err(Error::corrupt("invalid codeword for a one-symbol code")),
            };
        }
        let mut node = root;
        loop {
            match self.nodes[node] {
                HuffNode::Leaf(symbol) => return Ok(&self.symbols[symbol]),
                HuffNode::Internal { zero, one } => {
                    node = if source.read_bit()? { one } else { zero };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_sink::BitSink;

    fn table(entries: &[(char, u64)]) -> FrequencyTable<char> {
        let mut table = FrequencyTable::new();
        for &(symbol, count) in entries {
            table.add_count(symbol, count);
        }
        table
    }

    #[test]
    fn test_known_code() {
        // Pops c(1), d(1) -> n4(2); b(2), n4(2) -> n5(4); a(4), n5(4) -> root
        let code = HuffmanCode::build(&table(&[('a', 4), ('b', 2), ('c', 1), ('d', 1)])).unwrap();
        assert_eq!(code.code(&'a'), Some(Codeword::new(0b0, 1)));
        assert_eq!(code.code(&'b'), Some(Codeword::new(0b10, 2)));
        assert_eq!(code.code(&'c'), Some(Codeword::new(0b110, 3)));
        assert_eq!(code.code(&'d'), Some(Codeword::new(0b111, 3)));
        assert_eq!(code.bits_needed(), 4 + 4 + 3 + 3);
        assert_eq!(code.average_length(), 1.75);
        assert_eq!(code.max_length(), 3);
    }

    #[test]
    fn test_ties_follow_insertion_order() {
        let code = HuffmanCode::build(&table(&[('x', 1), ('y', 1)])).unwrap();
        assert_eq!(code.code(&'x'), Some(Codeword::new(0, 1)));
        assert_eq!(code.code(&'y'), Some(Codeword::new(1, 1)));

        let swapped = HuffmanCode::build(&table(&[('y', 1), ('x', 1)])).unwrap();
        assert_eq!(swapped.code(&'y'), Some(Codeword::new(0, 1)));
    }

    #[test]
    fn test_single_symbol() {
        let code = HuffmanCode::build(&table(&[('z', 10)])).unwrap();
        assert_eq!(code.code(&'z'), Some(Codeword::new(0, 1)));
        assert_eq!(code.average_length(), 1.0);

        let mut sink = BitSink::new(Vec::new());
        sink.write_codeword(code.code(&'z').unwrap()).unwrap();
        let bytes = sink.finish().unwrap();
        let mut source = BitSource::new(bytes.as_slice());
        assert_eq!(code.decode(&mut source).unwrap(), &'z');

        let mut bad = BitSource::new([0x80u8].as_slice());
        assert!(code.decode(&mut bad).is_err());
    }

    #[test]
    fn test_empty() {
        let code = HuffmanCode::<char>::build(&FrequencyTable::new()).unwrap();
        assert!(code.is_empty());
        assert_eq!(code.bits_needed(), 0);
        let mut source = BitSource::new([0u8].as_slice());
        assert!(code.decode(&mut source).is_err());
    }

    #[test]
    fn test_encode_decode_text() {
        let text = "mississippi river";
        let freqs: FrequencyTable<char> = text.chars().collect();
        let code = HuffmanCode::build(&freqs).unwrap();

        let mut sink = BitSink::new(Vec::new());
        for c in text.chars() {
            sink.write_codeword(code.code(&c).unwrap()).unwrap();
        }
        assert_eq!(sink.bits_written(), code.bits_needed());
        let bytes = sink.finish().unwrap();

        let mut source = BitSource::new(bytes.as_slice());
        let decoded: String = (0..text.len())
            .map(|_| *code.decode(&mut source).unwrap())
            .collect();
        assert_eq!(decoded, text);
    }

    #[test]
    fn test_code_length_limit() {
        // Fibonacci counts give the deepest possible tree.
        let mut freqs = FrequencyTable::new();
        let (mut a, mut b) = (1u64, 1u64);
        for symbol in 0..70u32 {
            freqs.add_count(symbol, a);
            (a, b) = (b, a.saturating_add(b));
        }
        assert!(matches!(
            HuffmanCode::build(&freqs),
            Err(Error::CapacityExceeded { .. })
        ));
    }
}
