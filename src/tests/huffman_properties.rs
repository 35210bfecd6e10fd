use crate::bit_sink::{BitSink, BitSource};
use crate::coder::{compress_sequence, decompress_sequence};
use crate::config::RepairConfig;
use crate::entropy::FrequencyTable;
use crate::huffman::HuffmanCode;
use proptest::prelude::*;

fn code_for(input: &[u8]) -> (FrequencyTable<u8>, HuffmanCode<u8>) {
    let table: FrequencyTable<u8> = input.iter().copied().collect();
    let code = HuffmanCode::build(&table).unwrap();
    (table, code)
}

proptest! {
    /// Property 1: Entropy bound
    /// entropy <= average code length < entropy + 1 with two or more symbols.
    #[test]
    fn prop_entropy_bound(input in prop::collection::vec(0u8..16, 1..400)) {
        let (table, code) = code_for(&input);
        let average = code.average_length();
        let entropy = table.entropy();

        if table.len() == 1 {
            prop_assert_eq!(average, 1.0);
        } else {
            prop_assert!(entropy <= average + 1e-9, "{} > {}", entropy, average);
            prop_assert!(average < entropy + 1.0, "{} >= {} + 1", average, entropy);
        }
    }

    /// Property 2: Prefix-free, and complete (Kraft sum of one)
    #[test]
    fn prop_prefix_free(input in prop::collection::vec(any::<u8>(), 2..400)) {
        let (table, code) = code_for(&input);
        prop_assume!(table.len() >= 2);

        let codes: Vec<_> = code.codes().map(|(_, codeword)| codeword).collect();
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
                let prefix = long.bits() >> (long.len() - short.len());
                prop_assert!(prefix != short.bits(), "{:?} is a prefix of {:?}", short, long);
            }
        }
        let kraft: f64 = codes.iter().map(|c| 0.5f64.powi(i32::from(c.len()))).sum();
        prop_assert!((kraft - 1.0).abs() < 1e-9);
    }

    /// Property 3: Bits written through the sink decode back to the input
    #[test]
    fn prop_codewords_roundtrip(input in prop::collection::vec(0u8..32, 1..400)) {
        let (_, code) = code_for(&input);

        let mut sink = BitSink::new(Vec::new());
        for byte in &input {
            sink.write_codeword(code.code(byte).unwrap()).unwrap();
        }
        prop_assert_eq!(sink.bits_written(), code.bits_needed());
        let bytes = sink.finish().unwrap();

        let mut source = BitSource::new(bytes.as_slice());
        for byte in &input {
            prop_assert_eq!(code.decode(&mut source).unwrap(), byte);
        }
    }

    /// Property 4: The rebuilt code is identical when the table is replayed
    /// in the same order
    #[test]
    fn prop_code_is_deterministic(input in prop::collection::vec(0u8..10, 1..200)) {
        let (table, code) = code_for(&input);
        let mut replayed = FrequencyTable::new();
        for (&symbol, count) in table.iter() {
            replayed.add_count(symbol, count);
        }
        let rebuilt = HuffmanCode::build(&replayed).unwrap();

        let original: Vec<_> = code.codes().collect();
        let again: Vec<_> = rebuilt.codes().collect();
        prop_assert_eq!(original, again);
    }

    /// Property 5: Sequence bitstream round trip
    #[test]
    fn prop_sequence_codec_roundtrip(input in prop::collection::vec("[a-c]{1,2}", 0..200)) {
        let (bytes, report) =
            compress_sequence(&input, &RepairConfig::default(), Vec::new()).unwrap();
        prop_assert_eq!(report.input_length, input.len());
        prop_assert_eq!(bytes.len() as u64, report.total_bits.div_ceil(8));

        let decoded: Vec<String> = decompress_sequence(bytes.as_slice()).unwrap();
        prop_assert_eq!(decoded, input);
    }
}

/// Bolero fuzz test: byte values survive the sequence codec
#[test]
fn fuzz_sequence_codec_roundtrip() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|input| {
        let (bytes, _) =
            compress_sequence(input.as_slice(), &RepairConfig::default(), Vec::new()).unwrap();
        let decoded: Vec<u8> = decompress_sequence(bytes.as_slice()).unwrap();
        assert_eq!(decoded, *input);
    });
}

/// Bolero fuzz test: any byte string gets a usable code
#[test]
fn fuzz_huffman_roundtrip() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|input| {
        let (_, code) = code_for(input);
        let mut sink = BitSink::new(Vec::new());
        for byte in input {
            sink.write_codeword(code.code(byte).unwrap()).unwrap();
        }
        let bytes = sink.finish().unwrap();
        let mut source = BitSource::new(bytes.as_slice());
        for byte in input {
            assert_eq!(code.decode(&mut source).unwrap(), byte);
        }
    });
}
