//! Huffman decoding tables for DEFLATE.
//!
//! DEFLATE uses canonical Huffman codes, where codes of the same length are
//! assigned consecutive values in symbol order. A [`HuffmanTable`] is a flat
//! lookup table indexed by the next `max_length` bits of the stream (in
//! stream order). Every code is replicated across all extensions of its
//! "don't care" bits, so one lookup resolves a symbol no matter how many
//! extra bits were peeked past its true length.
//!
//! # Alphabets
//!
//! DEFLATE uses three Huffman alphabets:
//! - **Literal/Length**: 0-285 (0-255 literals, 256 EOB, 257-285 lengths)
//! - **Distance**: 0-29 (back-reference distances)
//! - **Code Length**: 0-18 (for encoding dynamic Huffman trees)

use oxiflate_core::bitstream::{BitReader, reverse_bits};
use oxiflate_core::error::{OxiflateError, Result};

/// Longest code any DEFLATE alphabet uses.
const MAX_BITS: usize = 15;

/// A canonical Huffman lookup table.
///
/// Entries are `(length << 16) | symbol`; a zero entry marks a bit pattern
/// no code covers.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// Lookup table of size `1 << max_length`.
    table: Vec<u32>,
    /// Longest code length in the table.
    max_length: u8,
    /// Shortest code length in the table.
    min_length: u8,
}

impl HuffmanTable {
    /// Build a table from per-symbol code lengths, validating them.
    ///
    /// # Arguments
    ///
    /// * `lengths` - `lengths[i]` is the bit length for symbol `i`; 0 means unused
    /// * `limit` - Maximum allowed code length for this alphabet
    ///
    /// # Errors
    ///
    /// [`OxiflateError::CodeLengthTooLong`] if a length exceeds `limit`, and
    /// [`OxiflateError::OversubscribedCode`] if the lengths describe more codes
    /// than fit. Incomplete codes are accepted; patterns they leave
    /// unassigned fail at decode time.
    pub fn from_lengths(lengths: &[u8], limit: u8) -> Result<Self> {
        let limit = limit.min(MAX_BITS as u8);
        let mut counts = [0u32; MAX_BITS + 1];
        for &len in lengths {
            if len > limit {
                return Err(OxiflateError::code_length_too_long(len, limit));
            }
            counts[len as usize] += 1;
        }

        let mut left: i64 = 1;
        for &count in &counts[1..] {
            left = (left << 1) - count as i64;
            if left < 0 {
                return Err(OxiflateError::OversubscribedCode);
            }
        }

        Ok(Self::build(lengths))
    }

    /// Build a table from code lengths known to be valid.
    pub(crate) fn build(lengths: &[u8]) -> Self {
        let mut counts = [0u32; MAX_BITS + 1];
        let mut max_length = 0u8;
        let mut min_length = u8::MAX;
        for &len in lengths {
            if len > 0 && (len as usize) <= MAX_BITS {
                counts[len as usize] += 1;
                max_length = max_length.max(len);
                min_length = min_length.min(len);
            }
        }

        if max_length == 0 {
            return Self {
                table: vec![0],
                max_length: 0,
                min_length: 0,
            };
        }

        // First canonical code of each length (RFC 1951 algorithm)
        let mut next_code = [0u32; MAX_BITS + 1];
        let mut code = 0u32;
        for bits in 1..=MAX_BITS {
            code = (code + counts[bits - 1]) << 1;
            next_code[bits] = code;
        }
        // Length zero never receives a code.
        next_code[0] = 0;

        let size = 1usize << max_length;
        let mut table = vec![0u32; size];

        for (symbol, &len) in lengths.iter().enumerate() {
            if len == 0 || len as usize > MAX_BITS {
                continue;
            }
            let canonical = next_code[len as usize];
            next_code[len as usize] += 1;

            let entry = ((len as u32) << 16) | symbol as u32;
            let step = 1usize << len;
            let mut index = reverse_bits(canonical, len) as usize;
            while index < size {
                table[index] = entry;
                index += step;
            }
        }

        Self {
            table,
            max_length,
            min_length,
        }
    }

    /// Longest code length, or 0 for an empty table.
    pub fn max_length(&self) -> u8 {
        self.max_length
    }

    /// Shortest code length, or 0 for an empty table.
    pub fn min_length(&self) -> u8 {
        self.min_length
    }

    /// Whether no symbol has a code.
    pub fn is_empty(&self) -> bool {
        self.max_length == 0
    }

    /// Look up a window of `max_length` stream bits.
    ///
    /// Returns `(symbol, length)` or `None` if no code matches.
    #[inline]
    pub fn lookup(&self, window: u32) -> Option<(u16, u8)> {
        let entry = *self.table.get(window as usize)?;
        let length = (entry >> 16) as u8;
        (length != 0).then_some((entry as u16, length))
    }

    /// Decode one symbol from the bit stream.
    ///
    /// Peeks `max_length` bits, looks them up, and consumes only the decoded
    /// code's length.
    ///
    /// # Errors
    ///
    /// [`OxiflateError::InputExhausted`] if the stream ends before a code is
    /// complete (nothing is consumed), or
    /// [`OxiflateError::InvalidHuffmanCode`] if the bits match no code.
    #[inline]
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        let max = self.max_length as u32;
        let (bits, available) = reader.peek_bits(max);

        match self.lookup(bits) {
            Some((symbol, length)) if length as u32 <= available => {
                reader.consume(length as u32);
                Ok(symbol)
            }
            Some((_, length)) => Err(OxiflateError::input_exhausted(length as u32, available)),
            None if available < max => Err(OxiflateError::input_exhausted(max, available)),
            None => Err(OxiflateError::invalid_huffman(reader.bit_position())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package_merge::{HuffmanBuilder, canonical_codes};
    use crate::tables::{MAX_CODE_LENGTH, MAX_CODELEN_CODE_LENGTH};
    use oxiflate_core::BitWriter;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_huffman_table_simple() {
        // Simple code: A=0, B=10, C=11
        // In LSB-first: A=0, B=01 (reversed from 10), C=11
        let table = HuffmanTable::from_lengths(&[1, 2, 2], 15).unwrap();
        assert_eq!(table.max_length(), 2);
        assert_eq!(table.min_length(), 1);

        // Bits: 0 (A) + 01 (B) + 11 (C) + 0 (A) = 7 bits
        // Packed LSB-first: 0b00011010 = 0x1A
        let data = [0b00011010u8];
        let mut reader = BitReader::new(&data);

        assert_eq!(table.decode(&mut reader).unwrap(), 0); // A
        assert_eq!(table.decode(&mut reader).unwrap(), 1); // B
        assert_eq!(table.decode(&mut reader).unwrap(), 2); // C
        assert_eq!(table.decode(&mut reader).unwrap(), 0); // A
        assert_eq!(reader.bit_position(), 7);
    }

    #[test]
    fn test_every_window_resolves_for_complete_code() {
        let lengths = [3u8, 3, 3, 3, 3, 2, 4, 4];
        let table = HuffmanTable::from_lengths(&lengths, 15).unwrap();
        for window in 0..(1u32 << table.max_length()) {
            let (symbol, length) = table.lookup(window).unwrap();
            assert!(length <= table.max_length());
            assert_eq!(lengths[symbol as usize], length);
        }
    }

    #[test]
    fn test_random_lengths_resolve_every_window() {
        let mut rng = StdRng::seed_from_u64(0x1951);
        for round in 0..100 {
            let (n, limit) = if round % 2 == 0 {
                (19, MAX_CODELEN_CODE_LENGTH)
            } else {
                (286, MAX_CODE_LENGTH)
            };
            let mut freqs: Vec<u64> = (0..n)
                .map(|_| {
                    if rng.gen_bool(0.4) {
                        0
                    } else {
                        1u64 << rng.gen_range(0..30)
                    }
                })
                .collect();
            freqs[0] = freqs[0].max(1);
            freqs[n - 1] = freqs[n - 1].max(1);

            let lengths = HuffmanBuilder::from_frequencies(&freqs, limit).build_lengths();
            assert!(lengths.iter().all(|&l| l <= limit));
            let codes = canonical_codes(&lengths);
            let table = HuffmanTable::from_lengths(&lengths, limit).unwrap();

            for window in 0..(1u32 << table.max_length()) {
                let (symbol, length) = table.lookup(window).unwrap();
                assert!(length <= table.max_length());
                assert_eq!(lengths[symbol as usize], length);
                assert_eq!(codes[symbol as usize].code, window & ((1 << length) - 1));
            }
        }
    }

    #[test]
    fn test_decode_canonical_codes() {
        // Write every symbol with its canonical code, then decode.
        let lengths = [2u8, 0, 3, 3, 3, 3, 0, 4, 4, 3];
        let codes = canonical_codes(&lengths);
        let table = HuffmanTable::from_lengths(&lengths, 15).unwrap();

        let symbols = [0u16, 2, 9, 7, 8, 5, 0, 3, 4];
        let mut writer = BitWriter::new();
        for &s in &symbols {
            let c = codes[s as usize];
            writer.write_bits(c.code, c.length);
        }
        let data = writer.finish();

        let mut reader = BitReader::new(&data);
        for &s in &symbols {
            assert_eq!(table.decode(&mut reader).unwrap(), s);
        }
    }

    #[test]
    fn test_oversubscribed() {
        let err = HuffmanTable::from_lengths(&[1, 1, 1], 15).unwrap_err();
        assert!(matches!(err, OxiflateError::OversubscribedCode));
    }

    #[test]
    fn test_length_over_limit() {
        let err = HuffmanTable::from_lengths(&[1, 8], 7).unwrap_err();
        assert!(matches!(
            err,
            OxiflateError::CodeLengthTooLong {
                length: 8,
                limit: 7
            }
        ));
    }

    #[test]
    fn test_empty_table() {
        let table = HuffmanTable::from_lengths(&[0, 0, 0, 0], 15).unwrap();
        assert!(table.is_empty());

        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        assert!(matches!(
            table.decode(&mut reader),
            Err(OxiflateError::InvalidHuffmanCode { .. })
        ));
    }

    #[test]
    fn test_single_symbol_incomplete_code() {
        let table = HuffmanTable::from_lengths(&[0, 1, 0, 0], 15).unwrap();

        let data = [0b10];
        let mut reader = BitReader::new(&data);
        assert_eq!(table.decode(&mut reader).unwrap(), 1);
        // Pattern `1` has no code.
        assert!(matches!(
            table.decode(&mut reader),
            Err(OxiflateError::InvalidHuffmanCode { bit_position: 1 })
        ));
    }

    #[test]
    fn test_short_input_is_exhaustion() {
        // 9-bit code for symbol 1 needs more bits than one byte holds.
        let mut lengths = vec![1u8, 9];
        lengths.extend(std::iter::repeat_n(9u8, 255));
        let table = HuffmanTable::from_lengths(&lengths, 15).unwrap();

        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        let err = table.decode(&mut reader).unwrap_err();
        assert!(err.is_input_exhausted());
        assert_eq!(reader.bit_position(), 0);

        // A short code still decodes from a partial window.
        let data = [0x00];
        let mut reader = BitReader::new(&data);
        assert_eq!(table.decode(&mut reader).unwrap(), 0);
    }
}
