//! LZ77 matching for DEFLATE.
//!
//! This module finds repeated sequences in the input and replaces them with
//! back-references (length, distance pairs).
//!
//! # Algorithm
//!
//! Every position is hashed on its 3-byte prefix into one of 32768 buckets,
//! each holding the earlier positions with that hash in ascending order.
//! Positions more than 32 KiB behind the cursor are dropped from the front
//! of a bucket before it is searched. Candidates are examined newest first,
//! so among matches of equal length the shortest distance wins.
//!
//! With a non-zero lazy threshold, a match shorter than the threshold is
//! held back for one position: if the match found at the next position is
//! longer, the held byte is emitted as a literal and the longer match is
//! taken instead.
//!
//! The encoder also counts literal/length and distance symbols as it emits
//! tokens, so the block encoder can build dynamic codes without a second
//! pass.

use crate::tables::{
    DISTANCE_ALPHABET_SIZE, END_OF_BLOCK, LITLEN_ALPHABET_SIZE, MAX_MATCH, MIN_MATCH, WINDOW_SIZE,
    distance_to_code, length_to_code,
};
use oxiflate_core::error::{OxiflateError, Result};
use std::collections::VecDeque;

/// Number of hash buckets (power of 2).
const HASH_SIZE: usize = 32768;

/// Hash mask.
const HASH_MASK: usize = HASH_SIZE - 1;

/// A token produced by LZ77 matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lz77Token {
    /// A literal byte.
    Literal(u8),
    /// A back-reference to previously seen data.
    Match {
        /// Number of bytes to copy (3-258).
        length: u16,
        /// Distance back into the window (1-32768).
        distance: u16,
    },
}

impl Lz77Token {
    /// Number of input bytes the token stands for.
    pub fn len(&self) -> usize {
        match self {
            Self::Literal(_) => 1,
            Self::Match { length, .. } => *length as usize,
        }
    }

    /// Whether the token covers no input. Never true for valid tokens.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    length: usize,
    distance: usize,
}

/// LZ77 encoder for DEFLATE compression.
#[derive(Debug)]
pub struct Lz77Encoder {
    /// Positions seen so far, bucketed by prefix hash.
    buckets: Vec<VecDeque<u32>>,
    /// Lazy-match threshold (0 = greedy).
    lazy: usize,
    /// Candidates examined per search.
    max_chain: usize,
    /// Literal/length symbol counts, end-of-block included.
    litlen_frequencies: Vec<u64>,
    /// Distance symbol counts.
    distance_frequencies: Vec<u64>,
}

impl Lz77Encoder {
    /// Create a greedy encoder with an unbounded candidate search.
    pub fn new() -> Self {
        Self::with_params(0, usize::MAX)
    }

    /// Create an encoder with a lazy threshold and candidate search bound.
    pub fn with_params(lazy: usize, max_chain: usize) -> Self {
        let mut encoder = Self {
            buckets: vec![VecDeque::new(); HASH_SIZE],
            lazy,
            max_chain: max_chain.max(1),
            litlen_frequencies: vec![0; LITLEN_ALPHABET_SIZE],
            distance_frequencies: vec![0; DISTANCE_ALPHABET_SIZE],
        };
        encoder.reset();
        encoder
    }

    /// Reset the encoder state.
    pub fn reset(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.litlen_frequencies.fill(0);
        self.litlen_frequencies[END_OF_BLOCK as usize] = 1;
        self.distance_frequencies.fill(0);
    }

    /// Literal/length symbol counts of the last [`compress`](Self::compress)
    /// call. The end-of-block symbol is always counted once.
    pub fn litlen_frequencies(&self) -> &[u64] {
        &self.litlen_frequencies
    }

    /// Distance symbol counts of the last [`compress`](Self::compress) call.
    pub fn distance_frequencies(&self) -> &[u64] {
        &self.distance_frequencies
    }

    #[inline(always)]
    fn hash(b0: u8, b1: u8, b2: u8) -> usize {
        (((b0 as usize) << 10) ^ ((b1 as usize) << 5) ^ b2 as usize) & HASH_MASK
    }

    /// Split `input` into literals and matches.
    ///
    /// Resets the encoder first; one call covers one block.
    ///
    /// # Errors
    ///
    /// [`OxiflateError::InvalidMatch`] if a match falls outside the ranges
    /// DEFLATE can encode.
    pub fn compress(&mut self, input: &[u8]) -> Result<Vec<Lz77Token>> {
        self.reset();

        let n = input.len();
        let mut tokens = Vec::with_capacity(n / 2 + 1);
        let mut deferred: Option<Candidate> = None;
        let mut skip = 0usize;
        let mut pos = 0usize;

        while pos < n {
            if pos + MIN_MATCH >= n {
                let tail = match deferred.take() {
                    Some(held) => {
                        self.push_match(&mut tokens, held)?;
                        pos - 1 + held.length
                    }
                    None => pos + skip,
                };
                for &byte in &input[tail.min(n)..] {
                    self.push_literal(&mut tokens, byte);
                }
                break;
            }

            let key = Self::hash(input[pos], input[pos + 1], input[pos + 2]);
            if skip > 0 {
                skip -= 1;
                self.buckets[key].push_back(pos as u32);
                pos += 1;
                continue;
            }

            match (self.longest_match(input, pos, key), deferred.take()) {
                (Some(found), Some(held)) if held.length < found.length => {
                    self.push_literal(&mut tokens, input[pos - 1]);
                    self.push_match(&mut tokens, found)?;
                    skip = found.length - 1;
                }
                (Some(_), Some(held)) | (None, Some(held)) => {
                    self.push_match(&mut tokens, held)?;
                    skip = held.length - 2;
                }
                (Some(found), None) if found.length < self.lazy => deferred = Some(found),
                (Some(found), None) => {
                    self.push_match(&mut tokens, found)?;
                    skip = found.length - 1;
                }
                (None, None) => self.push_literal(&mut tokens, input[pos]),
            }

            self.buckets[key].push_back(pos as u32);
            pos += 1;
        }

        Ok(tokens)
    }

    /// Find the longest match for `pos` among the positions in bucket `key`.
    fn longest_match(&mut self, input: &[u8], pos: usize, key: usize) -> Option<Candidate> {
        let bucket = &mut self.buckets[key];
        while let Some(&oldest) = bucket.front() {
            if pos - oldest as usize > WINDOW_SIZE {
                bucket.pop_front();
            } else {
                break;
            }
        }

        let limit = MAX_MATCH.min(input.len() - pos);
        let mut best_len = 0;
        let mut best_pos = 0;

        for &candidate in bucket.iter().rev().take(self.max_chain) {
            let p = candidate as usize;
            if input[p..p + MIN_MATCH] != input[pos..pos + MIN_MATCH] {
                continue;
            }
            // Quick rejection on the last byte of the current best
            if best_len > MIN_MATCH && input[p + best_len - 1] != input[pos + best_len - 1] {
                continue;
            }

            let mut len = MIN_MATCH;
            while len < limit && input[p + len] == input[pos + len] {
                len += 1;
            }

            if len > best_len {
                best_len = len;
                best_pos = p;
            }
            if len == MAX_MATCH {
                break;
            }
        }

        (best_len >= MIN_MATCH).then_some(Candidate {
            length: best_len,
            distance: pos - best_pos,
        })
    }

    fn push_literal(&mut self, tokens: &mut Vec<Lz77Token>, byte: u8) {
        self.litlen_frequencies[byte as usize] += 1;
        tokens.push(Lz77Token::Literal(byte));
    }

    fn push_match(&mut self, tokens: &mut Vec<Lz77Token>, found: Candidate) -> Result<()> {
        let invalid = || OxiflateError::invalid_match(found.length, found.distance);
        let (length_code, _, _) = length_to_code(found.length).ok_or_else(invalid)?;
        let (distance_code, _, _) = distance_to_code(found.distance).ok_or_else(invalid)?;

        self.litlen_frequencies[length_code as usize] += 1;
        self.distance_frequencies[distance_code as usize] += 1;
        tokens.push(Lz77Token::Match {
            length: found.length as u16,
            distance: found.distance as u16,
        });
        Ok(())
    }

    /// Tokenize `input` with a fresh encoder (convenience method).
    pub fn compress_all(input: &[u8], lazy: usize) -> Result<Vec<Lz77Token>> {
        Self::with_params(lazy, usize::MAX).compress(input)
    }
}

impl Default for Lz77Encoder {
    fn default() -> Self {
        Self::new()
    }
}
