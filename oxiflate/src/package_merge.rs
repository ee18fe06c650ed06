//! Length-limited canonical Huffman code construction.
//!
//! [`HuffmanBuilder`] turns symbol frequencies into code lengths that are
//! optimal under a maximum length, using the reverse package-merge
//! algorithm. [`canonical_codes`] then derives the canonical codes from the
//! lengths: codes are handed out by increasing length, and within a length
//! by increasing symbol, which is the assignment every DEFLATE decoder
//! reconstructs from the transmitted lengths.
//!
//! # Reverse package-merge
//!
//! The symbols are ordered from most to least frequent. Every symbol starts
//! at the maximum length `L`. Levels are then built from depth `L - 1` up to
//! depth 0; each level merges pairs ("packages") from the level below
//! with the raw symbols, taking whichever is heavier first. A bit of the
//! code space excess (`2^L - n`) is assigned to each level up front; at every
//! level whose bit is set, one item is taken from the front of the level,
//! and every symbol inside it is shortened by one bit. The result meets the
//! Kraft equality exactly and never exceeds `L`.

use crate::heap::{HeapEntry, PriorityHeap};
use oxiflate_core::bitstream::reverse_bits;

/// A canonical Huffman code ready for transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanonicalCode {
    /// Code bits, already reversed so they can be written LSB-first.
    pub code: u32,
    /// Code length in bits (0 for unused symbols).
    pub length: u8,
}

/// Derive canonical codes from code lengths.
///
/// `lengths[i]` is the code length of symbol `i`; symbols with length 0 get
/// an empty code.
pub fn canonical_codes(lengths: &[u8]) -> Vec<CanonicalCode> {
    let mut counts = [0u32; 16];
    for &len in lengths {
        if (1..=15).contains(&len) {
            counts[len as usize] += 1;
        }
    }

    let mut next_code = [0u32; 16];
    let mut code = 0u32;
    for bits in 1..16 {
        code = (code + counts[bits - 1]) << 1;
        next_code[bits] = code;
    }

    lengths
        .iter()
        .map(|&len| {
            if (1..=15).contains(&len) {
                let canonical = next_code[len as usize];
                next_code[len as usize] += 1;
                CanonicalCode {
                    code: reverse_bits(canonical, len),
                    length: len,
                }
            } else {
                CanonicalCode::default()
            }
        })
        .collect()
}

/// Builder for length-limited Huffman code lengths from frequencies.
#[derive(Debug, Clone)]
pub struct HuffmanBuilder {
    frequencies: Vec<u64>,
    max_length: u8,
}

impl HuffmanBuilder {
    /// Create a new builder for an alphabet of `alphabet_size` symbols.
    pub fn new(alphabet_size: usize, max_length: u8) -> Self {
        Self {
            frequencies: vec![0; alphabet_size],
            max_length,
        }
    }

    /// Create a builder from an existing frequency table.
    pub fn from_frequencies(frequencies: &[u64], max_length: u8) -> Self {
        Self {
            frequencies: frequencies.to_vec(),
            max_length,
        }
    }

    /// Add a symbol occurrence.
    pub fn add(&mut self, symbol: u16) {
        self.add_count(symbol, 1);
    }

    /// Add multiple occurrences of a symbol.
    pub fn add_count(&mut self, symbol: u16, count: u64) {
        if let Some(freq) = self.frequencies.get_mut(symbol as usize) {
            *freq += count;
        }
    }

    /// The accumulated frequencies.
    pub fn frequencies(&self) -> &[u64] {
        &self.frequencies
    }

    /// Build code lengths from frequencies.
    ///
    /// Returns an array where `result[i]` is the code length for symbol `i`.
    /// Unused symbols get 0. A lone used symbol gets length 1, since a
    /// zero-length code cannot be transmitted.
    pub fn build_lengths(&self) -> Vec<u8> {
        let mut lengths = vec![0u8; self.frequencies.len()];

        let mut heap = PriorityHeap::with_capacity(self.frequencies.len());
        for (symbol, &freq) in self.frequencies.iter().enumerate() {
            if freq > 0 {
                heap.push(symbol as u16, freq);
            }
        }

        if heap.len() == 1 {
            if let Some(entry) = heap.pop() {
                lengths[entry.symbol as usize] = 1;
            }
            return lengths;
        }
        if heap.is_empty() {
            return lengths;
        }

        // Most frequent first.
        let ordered: Vec<HeapEntry> = heap.collect();
        let weights: Vec<u64> = ordered.iter().map(|e| e.frequency).collect();

        // The limit must leave room for every used symbol.
        let min_limit = usize::BITS - (ordered.len() - 1).leading_zeros();
        let limit = (self.max_length as u32).clamp(min_limit, 15) as usize;

        let code_lengths = package_merge(&weights, limit);
        for (entry, len) in ordered.iter().zip(code_lengths) {
            lengths[entry.symbol as usize] = len;
        }

        lengths
    }

    /// Build code lengths and the matching canonical codes.
    pub fn build_codes(&self) -> (Vec<u8>, Vec<CanonicalCode>) {
        let lengths = self.build_lengths();
        let codes = canonical_codes(&lengths);
        (lengths, codes)
    }
}

/// An item at one package-merge level.
#[derive(Debug, Clone, Copy)]
enum Node {
    /// A raw symbol (index into the ordered weights).
    Symbol(usize),
    /// Two items of the level below.
    Package,
}

/// Reverse package-merge over weights ordered from heaviest to lightest.
///
/// Requires `2 <= weights.len() <= 2^limit`.
fn package_merge(weights: &[u64], limit: usize) -> Vec<u8> {
    let n = weights.len();
    debug_assert!(n >= 2 && n <= 1 << limit);

    // Number of items per level and which levels take an item from the front.
    let mut counts = vec![0usize; limit];
    let mut takes = vec![false; limit];
    let mut excess = (1usize << limit) - n;
    let half = 1usize << (limit - 1);

    counts[limit - 1] = n;
    for j in 0..limit {
        if excess >= half {
            takes[j] = true;
            excess -= half;
        }
        excess <<= 1;
        if limit >= j + 2 {
            counts[limit - 2 - j] = counts[limit - 1 - j] / 2 + n;
        }
    }
    counts[0] = takes[0] as usize;
    for j in 1..limit {
        counts[j] = counts[j].min(2 * counts[j - 1] + takes[j] as usize);
    }

    let mut levels: Vec<Vec<(u64, Node)>> =
        counts.iter().map(|&c| Vec::with_capacity(c)).collect();
    levels[limit - 1].extend(
        weights
            .iter()
            .take(counts[limit - 1])
            .enumerate()
            .map(|(i, &w)| (w, Node::Symbol(i))),
    );

    let mut lengths = vec![limit as u8; n];
    let mut cursor = vec![0usize; limit];
    if takes[limit - 1] {
        lengths[0] -= 1;
        cursor[limit - 1] += 1;
    }

    for j in (0..limit - 1).rev() {
        let (upper, lower) = levels.split_at_mut(j + 1);
        let level = &mut upper[j];
        let below = &lower[0];

        let mut symbol = 0;
        let mut next = cursor[j + 1];
        for _ in 0..counts[j] {
            let package = (next + 1 < below.len()).then(|| below[next].0 + below[next + 1].0);
            match package {
                Some(weight) if symbol >= n || weight > weights[symbol] => {
                    level.push((weight, Node::Package));
                    next += 2;
                }
                _ if symbol < n => {
                    level.push((weights[symbol], Node::Symbol(symbol)));
                    symbol += 1;
                }
                _ => break,
            }
        }

        cursor[j] = 0;
        if takes[j] {
            take_package(&levels, &mut cursor, &mut lengths, j);
        }
    }

    lengths
}

/// Take the next item of `level`, shortening every symbol it contains.
fn take_package(
    levels: &[Vec<(u64, Node)>],
    cursor: &mut [usize],
    lengths: &mut [u8],
    level: usize,
) {
    let item = levels.get(level).and_then(|l| l.get(cursor[level]));
    match item {
        Some(&(_, Node::Package)) => {
            take_package(levels, cursor, lengths, level + 1);
            take_package(levels, cursor, lengths, level + 1);
        }
        Some(&(_, Node::Symbol(s))) => {
            lengths[s] = lengths[s].saturating_sub(1);
        }
        None => {}
    }
    cursor[level] += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    fn lengths_for(freqs: &[u64], limit: u8) -> Vec<u8> {
        HuffmanBuilder::from_frequencies(freqs, limit).build_lengths()
    }

    fn kraft_sum(lengths: &[u8]) -> f64 {
        lengths
            .iter()
            .filter(|&&l| l > 0)
            .map(|&l| 2f64.powi(-(l as i32)))
            .sum()
    }

    /// Cost and depth of an unconstrained Huffman tree.
    fn huffman_cost(freqs: &[u64]) -> (u64, u32) {
        let mut heap: BinaryHeap<Reverse<(u64, u32)>> = freqs
            .iter()
            .filter(|&&f| f > 0)
            .map(|&f| Reverse((f, 0)))
            .collect();
        let mut cost = 0;
        while heap.len() > 1 {
            let Reverse((a, da)) = heap.pop().unwrap();
            let Reverse((b, db)) = heap.pop().unwrap();
            cost += a + b;
            heap.push(Reverse((a + b, da.max(db) + 1)));
        }
        let depth = heap.pop().map(|Reverse((_, d))| d).unwrap_or(0);
        (cost, depth)
    }

    fn assert_valid(freqs: &[u64], lengths: &[u8], limit: u8) {
        assert!(lengths.iter().all(|&l| l <= limit), "{:?}", lengths);
        for (f, l) in freqs.iter().zip(lengths) {
            assert_eq!(*f > 0, *l > 0, "{:?} / {:?}", freqs, lengths);
        }
        if freqs.iter().filter(|&&f| f > 0).count() >= 2 {
            assert!((kraft_sum(lengths) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_no_symbols() {
        assert_eq!(lengths_for(&[0, 0, 0], 15), vec![0, 0, 0]);
    }

    #[test]
    fn test_single_symbol() {
        assert_eq!(lengths_for(&[0, 0, 9, 0], 15), vec![0, 0, 1, 0]);
    }

    #[test]
    fn test_two_symbols() {
        assert_eq!(lengths_for(&[1, 1], 15), vec![1, 1]);
        assert_eq!(lengths_for(&[0, 100, 0, 1], 7), vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_skewed_small() {
        assert_eq!(lengths_for(&[5, 1, 1, 1], 7), vec![1, 2, 3, 3]);
    }

    #[test]
    fn test_fibonacci_hits_limit() {
        let mut fib = vec![1u64, 1];
        while fib.len() < 30 {
            fib.push(fib[fib.len() - 1] + fib[fib.len() - 2]);
        }

        let lengths = lengths_for(&fib, 15);
        assert_eq!(
            lengths,
            vec![
                15, 15, 15, 15, 14, 14, 13, 13, 12, 12, 11, 11, 10, 10, 9, 9, 8, 8, 7, 7, 6, 6, 5,
                5, 4, 4, 3, 3, 2, 2
            ]
        );

        let lengths = lengths_for(&fib[..19], 7);
        assert_eq!(
            lengths,
            vec![7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 5, 4, 4, 3, 3, 2, 2]
        );
        assert_valid(&fib[..19], &lengths, 7);
    }

    #[test]
    fn test_full_alphabet_uniform() {
        let freqs = vec![3u64; 286];
        let lengths = lengths_for(&freqs, 15);
        assert_valid(&freqs, &lengths, 15);
        assert!(lengths.iter().all(|&l| l == 8 || l == 9));
    }

    #[test]
    fn test_random_distributions_respect_limit() {
        let mut rng = StdRng::seed_from_u64(1951);
        for _ in 0..400 {
            let n = [2usize, 3, 5, 19, 30, 286][rng.gen_range(0..6)];
            let limit = if n <= 128 && rng.gen_bool(0.5) { 7 } else { 15 };
            let freqs: Vec<u64> = (0..n)
                .map(|_| {
                    if rng.gen_bool(0.3) {
                        0
                    } else {
                        1u64 << rng.gen_range(0..30)
                    }
                })
                .collect();
            let lengths = lengths_for(&freqs, limit);
            assert_valid(&freqs, &lengths, limit);
        }
    }

    #[test]
    fn test_optimal_when_limit_not_binding() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..300 {
            let n = rng.gen_range(2..40);
            let freqs: Vec<u64> = (0..n).map(|_| rng.gen_range(1..100)).collect();
            let lengths = lengths_for(&freqs, 15);
            assert_valid(&freqs, &lengths, 15);

            let (cost, depth) = huffman_cost(&freqs);
            if depth <= 15 {
                let ours: u64 = freqs
                    .iter()
                    .zip(&lengths)
                    .map(|(&f, &l)| f * l as u64)
                    .sum();
                assert_eq!(ours, cost, "{:?}", freqs);
            }
        }
    }

    #[test]
    fn test_canonical_codes() {
        // RFC 1951 Section 3.2.2 example: ABCDEFGH with lengths (3,3,3,3,3,2,4,4)
        let codes = canonical_codes(&[3, 3, 3, 3, 3, 2, 4, 4]);
        let expected = [0b010, 0b011, 0b100, 0b101, 0b110, 0b00, 0b1110, 0b1111];
        for (c, (&e, len)) in codes.iter().zip(expected.iter().zip([3, 3, 3, 3, 3, 2, 4, 4])) {
            assert_eq!(c.length, len);
            assert_eq!(c.code, reverse_bits(e, len));
        }
    }

    #[test]
    fn test_unused_symbols_have_empty_codes() {
        let codes = canonical_codes(&[0, 1, 0, 1]);
        assert_eq!(codes[0], CanonicalCode::default());
        assert_eq!(codes[1], CanonicalCode { code: 0, length: 1 });
        assert_eq!(codes[3], CanonicalCode { code: 1, length: 1 });
    }

    #[test]
    fn test_builder_accumulates() {
        let mut builder = HuffmanBuilder::new(4, 15);
        builder.add_count(0, 100);
        builder.add_count(1, 50);
        builder.add(2);
        builder.add(3);
        builder.add(9); // out of range, ignored
        assert_eq!(builder.frequencies(), &[100, 50, 1, 1]);

        let (lengths, codes) = builder.build_codes();
        assert_eq!(lengths, vec![1, 2, 3, 3]);
        assert_eq!(codes.len(), 4);
    }
}
