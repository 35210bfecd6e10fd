//! Final bit emission for both engines, and the matching decoders.
//!
//! All counts and table fields are 32-bit big-endian. Every alphabet is
//! coded with its own Huffman code, and each code is sent as its frequency
//! table in first-seen order; the decoder rebuilds the identical code from
//! it.
//!
//! Sequence stream:
//!
//! ```text
//! terminals rules length
//! value table
//! symbol frequencies
//! rules: first second   (symbol codewords)
//! sequence              (symbol codewords)
//! ```
//!
//! Tree stream:
//!
//! ```text
//! nodes root
//! value table           (leaf labels, in leaf order)
//! kind frequencies, child frequencies
//! nodes in id order: kind, then left right (merge)
//! ```
//!
//! DAG leaves are hash-consed, so every label belongs to exactly one leaf.
//! The k-th leaf carries the k-th value and needs no label codeword.
//!
//! A value table is the byte frequencies, the number of values, then each
//! value as its length and its bytes (byte codewords).

use crate::alphabet::Alphabet;
use crate::bit_sink::{BitSink, BitSource};
use crate::config::{RepairConfig, TopDagConfig};
use crate::dictionary::{Dictionary, Grammar};
use crate::entropy::FrequencyTable;
use crate::error::{Error, Result};
use crate::huffman::{Codeword, HuffmanCode};
use crate::label::Label;
use crate::repair::Repair;
use crate::subtree_dag::SubtreeDag;
use crate::symbol::{Pair, Symbol};
use crate::top_dag::{DagNode, TopDag};
use crate::top_dag_builder::TopDagBuilder;
use crate::top_tree::MergeType;
use crate::tree::{Tag, Tree};
use log::debug;
use std::fmt;
use std::hash::Hash;
use std::io::{Read, Write};

/// Kind code of a DAG leaf; merges use their [`MergeType`] code.
const LEAF_KIND: u8 = MergeType::ALL.len() as u8;

/// How well one alphabet was coded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodeStats {
    /// Distinct symbols
    pub symbols: usize,
    pub occurrences: u64,
    /// Lower bound: entropy times occurrences
    pub entropy_bits: f64,
    /// Bits the Huffman code spent
    pub coded_bits: u64,
}

impl CodeStats {
    fn of<T: Hash + Eq + Clone>(table: &FrequencyTable<T>, code: &HuffmanCode<T>) -> Self {
        Self {
            symbols: table.len(),
            occurrences: table.total(),
            entropy_bits: table.entropy_bits(),
            coded_bits: code.bits_needed(),
        }
    }
}

impl fmt::Display for CodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} symbols, {} occurrences: {:.1} bits entropy, {} bits coded",
            self.symbols, self.occurrences, self.entropy_bits, self.coded_bits
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceReport {
    pub input_length: usize,
    pub terminals: usize,
    pub rules: usize,
    pub sequence_length: usize,
    /// Bytes of the terminal values
    pub values: CodeStats,
    /// Symbols of the rules and the sequence
    pub symbols: CodeStats,
    /// Everything written, padding excluded
    pub total_bits: u64,
}

impl fmt::Display for SequenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} symbols -> {} rules + {} symbols over {} terminals",
            self.input_length, self.rules, self.sequence_length, self.terminals
        )?;
        writeln!(f, "Values:  {}", self.values)?;
        writeln!(f, "Symbols: {}", self.symbols)?;
        write!(f, "Total:   {} bits", self.total_bits)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeReport {
    pub tree_nodes: usize,
    pub tree_edges: usize,
    pub dag_nodes: usize,
    pub dag_edges: usize,
    pub rounds: usize,
    /// Size of the identical-subtree DAG, for comparison
    pub subtree_dag_nodes: usize,
    pub subtree_dag_edges: usize,
    /// Bytes of the label values
    pub values: CodeStats,
    pub kinds: CodeStats,
    pub children: CodeStats,
    pub total_bits: u64,
}

impl fmt::Display for TreeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Tree:        {} nodes, {} edges",
            self.tree_nodes, self.tree_edges
        )?;
        writeln!(
            f,
            "Top DAG:     {} nodes, {} edges after {} rounds",
            self.dag_nodes, self.dag_edges, self.rounds
        )?;
        writeln!(
            f,
            "Subtree DAG: {} nodes, {} edges",
            self.subtree_dag_nodes, self.subtree_dag_edges
        )?;
        writeln!(f, "Values:      {}", self.values)?;
        writeln!(f, "Kinds:       {}", self.kinds)?;
        writeln!(f, "Children:    {}", self.children)?;
        write!(f, "Total:       {} bits", self.total_bits)
    }
}

fn checked_u32(value: usize, what: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::capacity(what, u64::from(u32::MAX)))
}

fn codeword<T: Hash + Eq + Clone>(code: &HuffmanCode<T>, symbol: &T) -> Result<Codeword> {
    code.code(symbol)
        .ok_or_else(|| Error::corrupt("symbol missing from its code table"))
}

fn write_frequencies<W, T>(
    sink: &mut BitSink<W>,
    table: &FrequencyTable<T>,
    symbol_bits: u32,
) -> Result<()>
where
    W: Write,
    T: Hash + Eq + Copy + Into<u32>,
{
    sink.write_u32(checked_u32(table.len(), "table entries")?)?;
    for (&symbol, count) in table.iter() {
        let count = u32::try_from(count)
            .map_err(|_| Error::capacity("occurrences of one symbol", u64::from(u32::MAX)))?;
        sink.write_bits(symbol_bits, u64::from(symbol.into()))?;
        sink.write_u32(count)?;
    }
    Ok(())
}

fn read_frequencies<R, T>(source: &mut BitSource<R>, symbol_bits: u32) -> Result<FrequencyTable<T>>
where
    R: Read,
    T: Hash + Eq + Clone + TryFrom<u32>,
{
    let len = source.read_u32()?;
    let mut table = FrequencyTable::new();
    for _ in 0..len {
        let raw = source.read_bits(symbol_bits)? as u32;
        let symbol = T::try_from(raw)
            .map_err(|_| Error::corrupt(format!("table symbol {raw} out of range")))?;
        let count = source.read_u32()?;
        if table.position(&symbol).is_some() {
            return Err(Error::corrupt(format!("table symbol {raw} listed twice")));
        }
        table.add_count(symbol, u64::from(count));
    }
    Ok(table)
}

fn write_values<W: Write, V: Label>(sink: &mut BitSink<W>, values: &[V]) -> Result<CodeStats> {
    let encoded: Vec<Vec<u8>> = values.iter().map(Label::to_bytes).collect();
    let bytes: FrequencyTable<u8> = encoded.iter().flatten().copied().collect();
    let code = HuffmanCode::build(&bytes)?;
    write_frequencies(sink, &bytes, 8)?;
    sink.write_u32(checked_u32(encoded.len(), "values")?)?;
    for value in &encoded {
        sink.write_u32(checked_u32(value.len(), "bytes per value")?)?;
        for byte in value {
            sink.write_codeword(codeword(&code, byte)?)?;
        }
    }
    Ok(CodeStats::of(&bytes, &code))
}

fn read_values<R: Read, V: Label>(source: &mut BitSource<R>) -> Result<Vec<V>> {
    let bytes: FrequencyTable<u8> = read_frequencies(source, 8)?;
    let code = HuffmanCode::build(&bytes)?;
    let count = source.read_u32()?;
    let mut values = Vec::new();
    let mut buf = Vec::new();
    for _ in 0..count {
        let len = source.read_u32()?;
        buf.clear();
        for _ in 0..len {
            buf.push(*code.decode(source)?);
        }
        values.push(V::from_bytes(&buf)?);
    }
    Ok(values)
}

/// Compresses a sequence with RePair and writes it to `out`.
pub fn compress_sequence<V, W>(
    values: &[V],
    config: &RepairConfig,
    out: W,
) -> Result<(W, SequenceReport)>
where
    V: Label,
    W: Write,
{
    let mut repair = Repair::with_config(*config);
    repair.extend(values.iter().cloned())?;
    repair.compress()?;
    let grammar = repair
        .grammar()
        .ok_or_else(|| Error::corrupt("grammar missing after compression"))?;
    let dictionary = &grammar.dictionary;

    let mut symbols: FrequencyTable<u32> = FrequencyTable::new();
    for pair in dictionary.rules() {
        symbols.add(pair.first.id());
        symbols.add(pair.second.id());
    }
    for symbol in &grammar.sequence {
        symbols.add(symbol.id());
    }
    let code = HuffmanCode::build(&symbols)?;

    let mut sink = BitSink::new(out);
    sink.write_u32(dictionary.terminals())?;
    sink.write_u32(checked_u32(dictionary.len(), "rules")?)?;
    sink.write_u32(checked_u32(grammar.sequence.len(), "sequence symbols")?)?;
    let value_stats = write_values(&mut sink, repair.alphabet().values())?;
    write_frequencies(&mut sink, &symbols, 32)?;
    for pair in dictionary.rules() {
        sink.write_codeword(codeword(&code, &pair.first.id())?)?;
        sink.write_codeword(codeword(&code, &pair.second.id())?)?;
    }
    for symbol in &grammar.sequence {
        sink.write_codeword(codeword(&code, &symbol.id())?)?;
    }

    let report = SequenceReport {
        input_length: values.len(),
        terminals: dictionary.terminals() as usize,
        rules: dictionary.len(),
        sequence_length: grammar.sequence.len(),
        values: value_stats,
        symbols: CodeStats::of(&symbols, &code),
        total_bits: sink.bits_written(),
    };
    debug!(target: "coder", "sequence: {} symbols in {} bits", values.len(), report.total_bits);
    Ok((sink.finish()?, report))
}

/// Decodes what [`compress_sequence`] wrote.
pub fn decompress_sequence<V: Label, R: Read>(input: R) -> Result<Vec<V>> {
    let mut source = BitSource::new(input);
    let terminals = source.read_u32()?;
    let rules = source.read_u32()?;
    let length = source.read_u32()?;
    let values: Vec<V> = read_values(&mut source)?;
    if values.len() != terminals as usize {
        return Err(Error::corrupt(format!(
            "{} values for {} terminals",
            values.len(),
            terminals
        )));
    }
    let symbols: FrequencyTable<u32> = read_frequencies(&mut source, 32)?;
    let code = HuffmanCode::build(&symbols)?;

    let mut dictionary = Dictionary::new(terminals);
    let read_symbol = |source: &mut BitSource<R>, dictionary: &Dictionary| -> Result<Symbol> {
        let symbol = Symbol::new(*code.decode(source)?);
        if dictionary.contains(symbol) {
            Ok(symbol)
        } else {
            Err(Error::corrupt(format!("symbol {symbol} used before its rule")))
        }
    };
    for _ in 0..rules {
        let first = read_symbol(&mut source, &dictionary)?;
        let second = read_symbol(&mut source, &dictionary)?;
        // Use counts are not transmitted.
        dictionary.add_rule(Pair::new(first, second), 0)?;
    }
    let mut sequence = Vec::new();
    for _ in 0..length {
        sequence.push(read_symbol(&mut source, &dictionary)?);
    }

    let grammar = Grammar {
        dictionary,
        sequence,
    };
    grammar
        .expand()
        .into_iter()
        .map(|symbol| {
            values
                .get(symbol.index())
                .cloned()
                .ok_or_else(|| Error::corrupt(format!("terminal {symbol} out of range")))
        })
        .collect()
}

/// Builds the Top DAG of `tree` and writes it to `out`.
///
/// The tree must be non-empty and consistent.
pub fn compress_tree<L, W>(tree: &Tree<L>, config: &TopDagConfig, out: W) -> Result<(W, TreeReport)>
where
    L: Label,
    W: Write,
{
    let output = TopDagBuilder::new(tree, *config).build()?;
    let dag = &output.dag;
    let root = dag
        .root()
        .ok_or_else(|| Error::invalid_tree(0, "tree has no root"))?;
    let baseline = SubtreeDag::build(tree)?;

    let mut kinds: FrequencyTable<u8> = FrequencyTable::new();
    let mut children: FrequencyTable<u32> = FrequencyTable::new();
    let mut leaf_values: Vec<L> = Vec::new();
    for node in dag.nodes() {
        match *node {
            DagNode::Leaf { label } => {
                kinds.add(LEAF_KIND);
                let value = dag
                    .labels()
                    .get(label)
                    .ok_or_else(|| Error::corrupt(format!("leaf has unknown label {label}")))?;
                leaf_values.push(value.clone());
            }
            DagNode::Merge { kind, left, right } => {
                kinds.add(kind.code());
                children.add(left);
                children.add(right);
            }
        }
    }
    let kind_code = HuffmanCode::build(&kinds)?;
    let child_code = HuffmanCode::build(&children)?;

    let mut sink = BitSink::new(out);
    sink.write_u32(checked_u32(dag.len(), "DAG nodes")?)?;
    sink.write_u32(root)?;
    let value_stats = write_values(&mut sink, &leaf_values)?;
    write_frequencies(&mut sink, &kinds, 8)?;
    write_frequencies(&mut sink, &children, 32)?;
    for node in dag.nodes() {
        match *node {
            DagNode::Leaf { .. } => {
                sink.write_codeword(codeword(&kind_code, &LEAF_KIND)?)?;
            }
            DagNode::Merge { kind, left, right } => {
                sink.write_codeword(codeword(&kind_code, &kind.code())?)?;
                sink.write_codeword(codeword(&child_code, &left)?)?;
                sink.write_codeword(codeword(&child_code, &right)?)?;
            }
        }
    }

    let report = TreeReport {
        tree_nodes: tree.len(),
        tree_edges: tree.edge_count(),
        dag_nodes: dag.len(),
        dag_edges: dag.edge_count(),
        rounds: output.rounds,
        subtree_dag_nodes: baseline.len(),
        subtree_dag_edges: baseline.edge_count(),
        values: value_stats,
        kinds: CodeStats::of(&kinds, &kind_code),
        children: CodeStats::of(&children, &child_code),
        total_bits: sink.bits_written(),
    };
    debug!(target: "coder", "tree: {} nodes in {} bits", tree.len(), report.total_bits);
    Ok((sink.finish()?, report))
}

/// Decodes what [`compress_tree`] wrote back into the DAG.
pub fn decompress_dag<L: Label, R: Read>(input: R) -> Result<TopDag<L>> {
    let mut source = BitSource::new(input);
    let len = source.read_u32()?;
    let root = source.read_u32()?;
    let values: Vec<L> = read_values(&mut source)?;
    let mut alphabet = Alphabet::new();
    for (expected, value) in values.into_iter().enumerate() {
        if alphabet.intern(value)? as usize != expected {
            return Err(Error::corrupt("label listed twice"));
        }
    }

    let kind_code = HuffmanCode::build(&read_frequencies::<_, u8>(&mut source, 8)?)?;
    let child_code = HuffmanCode::build(&read_frequencies::<_, u32>(&mut source, 32)?)?;

    let mut nodes = Vec::new();
    let mut leaves = 0u32;
    for _ in 0..len {
        let kind = *kind_code.decode(&mut source)?;
        let node = if kind == LEAF_KIND {
            if leaves as usize >= alphabet.len() {
                return Err(Error::corrupt("more leaves than labels"));
            }
            leaves += 1;
            DagNode::Leaf { label: leaves - 1 }
        } else {
            let kind = MergeType::from_code(kind)
                .ok_or_else(|| Error::corrupt(format!("unknown node kind {kind}")))?;
            let left = *child_code.decode(&mut source)?;
            let right = *child_code.decode(&mut source)?;
            DagNode::Merge { kind, left, right }
        };
        nodes.push(node);
    }
    if leaves as usize != alphabet.len() {
        return Err(Error::corrupt("label without a leaf"));
    }
    TopDag::from_nodes(alphabet, &nodes, Some(root))
}

/// Decodes what [`compress_tree`] wrote back into the tree.
pub fn decompress_tree<L: Label, R: Read>(input: R) -> Result<Tree<L>> {
    decompress_dag(input)?.unpack()
}

/// Compresses a tree in sequence mode: RePair over its open/close tags.
pub fn compress_tree_tags<L, W>(
    tree: &Tree<L>,
    config: &RepairConfig,
    out: W,
) -> Result<(W, SequenceReport)>
where
    L: Label,
    W: Write,
{
    tree.check_consistency()?;
    compress_sequence(&tree.tags(), config, out)
}

/// Decodes what [`compress_tree_tags`] wrote.
pub fn decompress_tree_tags<L: Label, R: Read>(input: R) -> Result<Tree<L>> {
    Tree::from_tags(decompress_sequence::<Tag<L>, R>(input)?)
}
