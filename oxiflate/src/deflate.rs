//! DEFLATE compression.
//!
//! This module implements DEFLATE compression as specified in RFC 1951.
//! It supports:
//! - Stored blocks (no compression)
//! - Fixed Huffman codes
//! - Dynamic Huffman codes
//!
//! Stored output is split into blocks of at most 65535 bytes. Fixed and
//! dynamic output is a single block covering the whole input.

use crate::lz77::{Lz77Encoder, Lz77Token};
use crate::options::{CompressionType, DeflateOptions};
use crate::package_merge::{CanonicalCode, HuffmanBuilder};
use crate::tables::{
    CODE_LENGTH_ORDER, CODELEN_ALPHABET_SIZE, END_OF_BLOCK, MAX_CODE_LENGTH,
    MAX_CODELEN_CODE_LENGTH, MAX_STORED_BLOCK, distance_to_code, fixed_litlen_code,
    length_to_code,
};
use oxiflate_core::BitWriter;
use oxiflate_core::error::{OxiflateError, Result};
use oxiflate_core::traits::{CompressStatus, CompressionLevel, Compressor, FlushMode};

/// Longest zero run one symbol 18 can carry.
const MAX_ZERO_RUN: usize = 138;
/// Longest repeat of the previous length one symbol 16 can carry.
const MAX_REPEAT_RUN: usize = 6;
/// Shortest run any repeat symbol can carry.
const MIN_RUN: usize = 3;

/// One symbol of the run-length encoded code length sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CodeLengthSymbol {
    symbol: u8,
    extra: u8,
    extra_bits: u8,
}

impl CodeLengthSymbol {
    fn length(length: u8) -> Self {
        Self {
            symbol: length,
            extra: 0,
            extra_bits: 0,
        }
    }

    /// Repeat-previous (16), short zero run (17) or long zero run (18).
    fn repeat(symbol: u8, run: usize) -> Self {
        let (base, extra_bits) = match symbol {
            16 => (3, 2),
            17 => (3, 3),
            _ => (11, 7),
        };
        Self {
            symbol,
            extra: (run - base) as u8,
            extra_bits,
        }
    }
}

/// DEFLATE compressor.
#[derive(Debug)]
pub struct Deflater {
    /// Encoder settings.
    options: DeflateOptions,
    /// LZ77 encoder.
    lz77: Lz77Encoder,
    /// Input buffered through the [`Compressor`] interface.
    pending: Vec<u8>,
    /// Encoded stream waiting to be drained through [`Compressor`].
    encoded: Option<Vec<u8>>,
    /// Bytes of `encoded` already handed out.
    drained: usize,
    /// Whether compression is finished.
    finished: bool,
}

impl Deflater {
    /// Create a compressor with default options (dynamic codes, greedy
    /// matching).
    pub fn new() -> Self {
        Self::with_options(DeflateOptions::default())
    }

    /// Create a compressor with explicit options.
    pub fn with_options(options: DeflateOptions) -> Self {
        Self {
            options,
            lz77: Lz77Encoder::with_params(options.lazy, options.max_chain),
            pending: Vec::new(),
            encoded: None,
            drained: 0,
            finished: false,
        }
    }

    /// Create a compressor with the preset for a level (0-9).
    pub fn with_level(level: impl Into<CompressionLevel>) -> Self {
        Self::with_options(DeflateOptions::from_level(level.into()))
    }

    /// The encoder settings.
    pub fn options(&self) -> &DeflateOptions {
        &self.options
    }

    /// Reset the compressor.
    pub fn reset(&mut self) {
        self.lz77.reset();
        self.pending.clear();
        self.encoded = None;
        self.drained = 0;
        self.finished = false;
    }

    /// Compress `data` into a complete DEFLATE stream.
    pub fn compress(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() / 2 + 16);
        self.compress_into(data, &mut output)?;
        Ok(output)
    }

    /// Compress `data`, appending the stream after the existing contents of
    /// `output`.
    ///
    /// Wrapper formats use this to write their header first. On error
    /// `output` is left unchanged.
    pub fn compress_into(&mut self, data: &[u8], output: &mut Vec<u8>) -> Result<()> {
        let prefix_len = output.len();
        let mut writer = BitWriter::from_vec(std::mem::take(output));

        let result = match self.options.compression_type {
            CompressionType::Stored => {
                Self::write_stored_blocks(data, &mut writer);
                Ok(())
            }
            CompressionType::Fixed => self.write_fixed_block(data, &mut writer),
            CompressionType::Dynamic => self.write_dynamic_block(data, &mut writer),
        };

        let mut stream = writer.finish();
        if result.is_err() {
            stream.truncate(prefix_len);
        }
        *output = stream;
        result
    }

    /// Write stored (uncompressed) blocks.
    fn write_stored_blocks(data: &[u8], writer: &mut BitWriter) {
        let mut chunks = data.chunks(MAX_STORED_BLOCK).peekable();

        // An empty input still needs one final block.
        if chunks.peek().is_none() {
            Self::write_stored_block(&[], true, writer);
        }
        while let Some(chunk) = chunks.next() {
            let is_final = chunks.peek().is_none();
            Self::write_stored_block(chunk, is_final, writer);
        }

        log::debug!(
            "oxiflate::deflate: stored {} bytes in {} block(s)",
            data.len(),
            data.len().div_ceil(MAX_STORED_BLOCK).max(1)
        );
    }

    fn write_stored_block(chunk: &[u8], is_final: bool, writer: &mut BitWriter) {
        writer.write_bit(is_final);
        writer.write_bits(CompressionType::Stored.btype() as u32, 2);
        writer.align_to_byte();

        // LEN and NLEN
        let len = chunk.len() as u16;
        writer.write_bits(len as u32, 16);
        writer.write_bits(!len as u32, 16);
        writer.write_bytes(chunk);
    }

    /// Write one final block using the fixed Huffman codes.
    fn write_fixed_block(&mut self, data: &[u8], writer: &mut BitWriter) -> Result<()> {
        let tokens = self.lz77.compress(data)?;

        writer.write_bit(true);
        writer.write_bits(CompressionType::Fixed.btype() as u32, 2);

        let write_litlen = |writer: &mut BitWriter, symbol: u16| {
            let (code, len) = fixed_litlen_code(symbol);
            writer.write_bits_reversed(code, len);
        };

        for token in &tokens {
            match *token {
                Lz77Token::Literal(byte) => write_litlen(writer, byte as u16),
                Lz77Token::Match { length, distance } => {
                    let (len_code, len_extra_bits, len_extra) = encode_length(length, distance)?;
                    write_litlen(writer, len_code);
                    writer.write_bits(len_extra as u32, len_extra_bits);

                    // Fixed distance codes are the 5-bit code value itself
                    let (dist_code, dist_extra_bits, dist_extra) =
                        encode_distance(length, distance)?;
                    writer.write_bits_reversed(dist_code as u32, 5);
                    writer.write_bits(dist_extra as u32, dist_extra_bits);
                }
            }
        }
        write_litlen(writer, END_OF_BLOCK);

        log::debug!(
            "oxiflate::deflate: fixed block, final=true, {} tokens for {} bytes",
            tokens.len(),
            data.len()
        );
        Ok(())
    }

    /// Write one final block using dynamic Huffman codes.
    fn write_dynamic_block(&mut self, data: &[u8], writer: &mut BitWriter) -> Result<()> {
        let tokens = self.lz77.compress(data)?;

        let (litlen_lengths, litlen_codes) =
            HuffmanBuilder::from_frequencies(self.lz77.litlen_frequencies(), MAX_CODE_LENGTH)
                .build_codes();
        let (dist_lengths, dist_codes) =
            HuffmanBuilder::from_frequencies(self.lz77.distance_frequencies(), MAX_CODE_LENGTH)
                .build_codes();

        let hlit = trimmed_len(&litlen_lengths, 257);
        let hdist = trimmed_len(&dist_lengths, 1);

        let mut combined = Vec::with_capacity(hlit + hdist);
        combined.extend_from_slice(&litlen_lengths[..hlit]);
        combined.extend_from_slice(&dist_lengths[..hdist]);
        let (codelen_symbols, codelen_freqs) = rle_encode_lengths(&combined);

        let (codelen_lengths, codelen_codes) =
            HuffmanBuilder::from_frequencies(&codelen_freqs, MAX_CODELEN_CODE_LENGTH).build_codes();
        let transmitted: Vec<u8> = CODE_LENGTH_ORDER
            .iter()
            .map(|&symbol| codelen_lengths[symbol])
            .collect();
        let hclen = trimmed_len(&transmitted, 4);

        // Block header
        writer.write_bit(true);
        writer.write_bits(CompressionType::Dynamic.btype() as u32, 2);
        writer.write_bits((hlit - 257) as u32, 5);
        writer.write_bits((hdist - 1) as u32, 5);
        writer.write_bits((hclen - 4) as u32, 4);
        for &len in &transmitted[..hclen] {
            writer.write_bits(len as u32, 3);
        }

        // Code length sequence
        for entry in &codelen_symbols {
            write_code(writer, codelen_codes[entry.symbol as usize]);
            writer.write_bits(entry.extra as u32, entry.extra_bits);
        }

        for token in &tokens {
            match *token {
                Lz77Token::Literal(byte) => write_code(writer, litlen_codes[byte as usize]),
                Lz77Token::Match { length, distance } => {
                    let (len_code, len_extra_bits, len_extra) = encode_length(length, distance)?;
                    write_code(writer, litlen_codes[len_code as usize]);
                    writer.write_bits(len_extra as u32, len_extra_bits);

                    let (dist_code, dist_extra_bits, dist_extra) =
                        encode_distance(length, distance)?;
                    write_code(writer, dist_codes[dist_code as usize]);
                    writer.write_bits(dist_extra as u32, dist_extra_bits);
                }
            }
        }
        write_code(writer, litlen_codes[END_OF_BLOCK as usize]);

        log::debug!(
            "oxiflate::deflate: dynamic block, final=true, {} tokens for {} bytes, \
             hlit={} hdist={} hclen={}",
            tokens.len(),
            data.len(),
            hlit,
            hdist,
            hclen
        );
        Ok(())
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for Deflater {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        if self.finished {
            return Ok((0, 0, CompressStatus::Done));
        }

        let consumed = if self.encoded.is_none() {
            self.pending.extend_from_slice(input);
            input.len()
        } else {
            0
        };

        if self.encoded.is_none() {
            if flush != FlushMode::Finish {
                return Ok((consumed, 0, CompressStatus::NeedsInput));
            }
            let pending = std::mem::take(&mut self.pending);
            self.encoded = Some(Deflater::compress(self, &pending)?);
        }

        let Some(encoded) = self.encoded.as_ref() else {
            return Ok((consumed, 0, CompressStatus::NeedsInput));
        };
        let remaining = &encoded[self.drained..];
        let produced = remaining.len().min(output.len());
        output[..produced].copy_from_slice(&remaining[..produced]);
        self.drained += produced;

        if self.drained == encoded.len() {
            self.finished = true;
            Ok((consumed, produced, CompressStatus::Done))
        } else {
            Ok((consumed, produced, CompressStatus::NeedsOutput))
        }
    }

    fn reset(&mut self) {
        Deflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

fn encode_length(length: u16, distance: u16) -> Result<(u16, u8, u16)> {
    length_to_code(length as usize)
        .ok_or_else(|| OxiflateError::invalid_match(length as usize, distance as usize))
}

fn encode_distance(length: u16, distance: u16) -> Result<(u16, u8, u16)> {
    distance_to_code(distance as usize)
        .ok_or_else(|| OxiflateError::invalid_match(length as usize, distance as usize))
}

#[inline]
fn write_code(writer: &mut BitWriter, code: CanonicalCode) {
    writer.write_bits(code.code, code.length);
}

/// Length of `lengths` without trailing zeros, never below `min`.
fn trimmed_len(lengths: &[u8], min: usize) -> usize {
    let used = lengths.iter().rposition(|&len| len != 0).map_or(0, |i| i + 1);
    used.max(min).min(lengths.len())
}

/// Run-length encode a code length sequence with the meta alphabet.
///
/// Returns the symbols and the frequency of each meta symbol.
fn rle_encode_lengths(lengths: &[u8]) -> (Vec<CodeLengthSymbol>, [u64; CODELEN_ALPHABET_SIZE]) {
    let mut symbols = Vec::new();
    let mut freqs = [0u64; CODELEN_ALPHABET_SIZE];
    let mut push = |symbols: &mut Vec<CodeLengthSymbol>, entry: CodeLengthSymbol| {
        freqs[entry.symbol as usize] += 1;
        symbols.push(entry);
    };

    let mut i = 0;
    while i < lengths.len() {
        let len = lengths[i];
        let run_len = lengths[i..].iter().take_while(|&&l| l == len).count();
        let mut run = run_len;

        if len == 0 && run >= MIN_RUN {
            while run > 0 {
                let rpt = split_run(run, MAX_ZERO_RUN);
                let symbol = if rpt <= 10 { 17 } else { 18 };
                push(&mut symbols, CodeLengthSymbol::repeat(symbol, rpt));
                run -= rpt;
            }
        } else if len == 0 {
            for _ in 0..run {
                push(&mut symbols, CodeLengthSymbol::length(0));
            }
        } else {
            push(&mut symbols, CodeLengthSymbol::length(len));
            run -= 1;
            if run < MIN_RUN {
                for _ in 0..run {
                    push(&mut symbols, CodeLengthSymbol::length(len));
                }
            } else {
                while run > 0 {
                    let rpt = split_run(run, MAX_REPEAT_RUN);
                    push(&mut symbols, CodeLengthSymbol::repeat(16, rpt));
                    run -= rpt;
                }
            }
        }

        i += run_len;
    }

    (symbols, freqs)
}

/// Take the longest legal chunk of a run, leaving a remainder of zero or at
/// least [`MIN_RUN`].
fn split_run(run: usize, max: usize) -> usize {
    let rpt = run.min(max);
    if rpt > run - MIN_RUN && rpt < run {
        run - MIN_RUN
    } else {
        rpt
    }
}

/// Compress data with default options (convenience function).
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    Deflater::new().compress(data)
}

/// Compress data with explicit options, a [`CompressionType`] or a
/// [`CompressionLevel`] (convenience function).
pub fn deflate_with(data: &[u8], options: impl Into<DeflateOptions>) -> Result<Vec<u8>> {
    Deflater::with_options(options.into()).compress(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::inflate;

    fn expand(symbols: &[CodeLengthSymbol]) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in symbols {
            match entry.symbol {
                0..=15 => out.push(entry.symbol),
                16 => {
                    let prev = *out.last().unwrap();
                    out.extend(std::iter::repeat_n(prev, entry.extra as usize + 3));
                }
                17 => out.extend(std::iter::repeat_n(0, entry.extra as usize + 3)),
                _ => out.extend(std::iter::repeat_n(0, entry.extra as usize + 11)),
            }
        }
        out
    }

    #[test]
    fn test_stored_layout() {
        let compressed = deflate_with(b"Hello", CompressionType::Stored).unwrap();
        assert_eq!(
            compressed,
            vec![0x01, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e', b'l', b'l', b'o']
        );
    }

    #[test]
    fn test_stored_empty() {
        let compressed = deflate_with(b"", CompressionType::Stored).unwrap();
        assert_eq!(compressed, vec![0x01, 0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_stored_splits_large_input() {
        let data = vec![7u8; MAX_STORED_BLOCK + 10];
        let compressed = deflate_with(&data, CompressionType::Stored).unwrap();
        // Two headers of 5 bytes each
        assert_eq!(compressed.len(), data.len() + 10);
        // First block is not final
        assert_eq!(compressed[0], 0x00);
        assert_eq!(inflate(&compressed).unwrap(), data);
    }

    #[test]
    fn test_fixed_empty() {
        // BFINAL=1, BTYPE=01, EOB (seven zero bits)
        let compressed = deflate_with(b"", CompressionType::Fixed).unwrap();
        assert_eq!(compressed, vec![0x03, 0x00]);
    }

    #[test]
    fn test_fixed_single_literal() {
        let compressed = deflate_with(b"a", CompressionType::Fixed).unwrap();
        assert_eq!(compressed, vec![0x4B, 0x04, 0x00]);
    }

    #[test]
    fn test_dynamic_roundtrip() {
        let data = b"abcabcabcabc the quick brown fox jumps over the lazy dog";
        let compressed = deflate(data).unwrap();
        assert_eq!(compressed[0] & 0b111, 0b101);
        assert_eq!(inflate(&compressed).unwrap(), data);
    }

    #[test]
    fn test_compress_into_appends() {
        let mut output = vec![0x78, 0x9C];
        Deflater::new().compress_into(b"hello hello", &mut output).unwrap();
        assert_eq!(&output[..2], &[0x78, 0x9C]);
        assert_eq!(inflate(&output[2..]).unwrap(), b"hello hello");
    }

    #[test]
    fn test_levels_roundtrip() {
        let data = b"level test level test level test".repeat(20);
        for level in 0..=9u8 {
            let compressed = deflate_with(&data, CompressionLevel::new(level)).unwrap();
            assert_eq!(inflate(&compressed).unwrap(), data, "level {}", level);
        }
    }

    #[test]
    fn test_rle_zero_runs() {
        let mut lengths = vec![0u8; 140];
        lengths.push(5);
        let (symbols, freqs) = rle_encode_lengths(&lengths);
        // 140 zeros: 137 then 3 rather than 138 then 2
        assert_eq!(symbols[0], CodeLengthSymbol::repeat(18, 137));
        assert_eq!(symbols[1], CodeLengthSymbol::repeat(17, 3));
        assert_eq!(freqs[18], 1);
        assert_eq!(freqs[17], 1);
        assert_eq!(expand(&symbols), lengths);
    }

    #[test]
    fn test_rle_repeat_previous() {
        let lengths = [8u8, 8, 8, 8, 8, 8, 8, 8, 8, 3, 3, 0, 0];
        let (symbols, _) = rle_encode_lengths(&lengths);
        // 8, then 8 repeats split 5 + 3
        assert_eq!(symbols[0], CodeLengthSymbol::length(8));
        assert_eq!(symbols[1], CodeLengthSymbol::repeat(16, 5));
        assert_eq!(symbols[2], CodeLengthSymbol::repeat(16, 3));
        assert_eq!(expand(&symbols), lengths);
        for entry in &symbols {
            if entry.symbol >= 16 {
                assert!((entry.extra as u32) < (1 << entry.extra_bits));
            }
        }
    }

    #[test]
    fn test_trimmed_len() {
        assert_eq!(trimmed_len(&[1, 0, 0], 1), 1);
        assert_eq!(trimmed_len(&[0, 0, 0], 1), 1);
        assert_eq!(trimmed_len(&[0, 0, 2, 0], 1), 3);
        assert_eq!(trimmed_len(&[0u8; 286], 257), 257);
    }

    #[test]
    fn test_compressor_trait() {
        let data = b"streaming through the compressor trait ".repeat(50);
        let mut deflater = Deflater::with_level(6);

        let mut out = [0u8; 16];
        let (consumed, produced, status) =
            Compressor::compress(&mut deflater, &data, &mut out, FlushMode::None).unwrap();
        assert_eq!((consumed, produced, status), (data.len(), 0, CompressStatus::NeedsInput));

        let mut compressed = Vec::new();
        loop {
            let (_, produced, status) =
                Compressor::compress(&mut deflater, &[], &mut out, FlushMode::Finish).unwrap();
            compressed.extend_from_slice(&out[..produced]);
            if status == CompressStatus::Done {
                break;
            }
        }
        assert!(Compressor::is_finished(&deflater));
        assert_eq!(inflate(&compressed).unwrap(), data);

        Compressor::reset(&mut deflater);
        assert!(!Compressor::is_finished(&deflater));
        let again = deflater.compress_all(b"abc").unwrap();
        assert_eq!(inflate(&again).unwrap(), b"abc");
    }
}
