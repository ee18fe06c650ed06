//! Bit-level I/O for DEFLATE streams.
//!
//! This module provides [`BitWriter`] and [`BitReader`] for packing and
//! unpacking data at the bit level, which is what variable-length Huffman
//! codes need.
//!
//! # Bit Ordering
//!
//! DEFLATE packs bits LSB-first (least significant bit first) within each
//! byte. Plain fields are written LSB-first; Huffman codes are transmitted
//! starting from their most significant bit, which [`BitWriter::write_bits_reversed`]
//! handles.
//!
//! # Rollback
//!
//! [`BitReader`] works over a borrowed byte slice and never loses state when
//! a read cannot be satisfied. Its position can be captured as a
//! [`BitCursor`] and restored later, or carried over to a new, longer slice
//! that starts with the same bytes. That is how a decoder suspends mid-symbol
//! and resumes once more input has arrived.
//!
//! # Example
//!
//! ```
//! use oxiflate_core::bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bits(0b101, 3);
//! writer.write_bits(0b1100, 4);
//! let output = writer.finish();
//!
//! let mut reader = BitReader::new(&output);
//! assert_eq!(reader.read_bits(3).unwrap(), 0b101);
//! assert_eq!(reader.read_bits(4).unwrap(), 0b1100);
//! ```

use crate::error::{OxiflateError, Result};

/// Reverse the low `count` bits of `value` (0-32).
///
/// Canonical Huffman codes are defined MSB-first, while DEFLATE packs
/// bits LSB-first, so codes are reversed before being written.
#[inline]
pub fn reverse_bits(value: u32, count: u8) -> u32 {
    debug_assert!(count <= 32, "Cannot reverse more than 32 bits");
    if count == 0 {
        0
    } else {
        value.reverse_bits() >> (32 - count as u32)
    }
}

#[inline(always)]
fn low_mask(count: u32) -> u64 {
    (1u64 << count).wrapping_sub(1)
}

/// A bit-level writer that appends to an owned, growable byte buffer.
///
/// Complete bytes are moved out of the bit accumulator as soon as they are
/// formed. Call [`finish`](Self::finish) to pad the final partial byte and
/// take the written bytes.
#[derive(Debug, Default)]
pub struct BitWriter {
    /// Bytes written so far.
    buffer: Vec<u8>,
    /// Pending bits (LSB-first).
    accumulator: u64,
    /// Number of pending bits in the accumulator (always < 8 between calls).
    bits_in_accumulator: u8,
    /// Bytes that were already in the buffer when writing started.
    prefix_len: usize,
}

impl BitWriter {
    /// Create an empty `BitWriter`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `BitWriter` with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Create a `BitWriter` that appends after the bytes already in `buffer`.
    ///
    /// Container writers use this to place a stream right after a header
    /// they have already written.
    pub fn from_vec(buffer: Vec<u8>) -> Self {
        let prefix_len = buffer.len();
        Self {
            buffer,
            prefix_len,
            ..Self::default()
        }
    }

    /// Total number of bits written, excluding any prefix bytes.
    pub fn bits_written(&self) -> u64 {
        (self.buffer.len() - self.prefix_len) as u64 * 8 + self.bits_in_accumulator as u64
    }

    /// Whether the next bit starts a new byte.
    pub fn is_aligned(&self) -> bool {
        self.bits_in_accumulator == 0
    }

    #[inline]
    fn drain_accumulator(&mut self) {
        while self.bits_in_accumulator >= 8 {
            self.buffer.push(self.accumulator as u8);
            self.accumulator >>= 8;
            self.bits_in_accumulator -= 8;
        }
    }

    /// Write the low `count` bits of `value`, least significant bit first.
    ///
    /// # Arguments
    ///
    /// * `value` - The bits to write
    /// * `count` - Number of bits to write (0-32)
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u8) {
        debug_assert!(count <= 32, "Cannot write more than 32 bits at once");
        if count == 0 {
            return;
        }

        let value = value as u64 & low_mask(count as u32);
        self.accumulator |= value << self.bits_in_accumulator;
        self.bits_in_accumulator += count;
        self.drain_accumulator();
    }

    /// Write the low `count` bits of `value`, most significant bit first.
    ///
    /// This is the transmission order of Huffman codes whose canonical value
    /// has not been reversed up front.
    #[inline]
    pub fn write_bits_reversed(&mut self, value: u32, count: u8) {
        self.write_bits(reverse_bits(value, count), count);
    }

    /// Write a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(bit as u32, 1);
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        if self.bits_in_accumulator > 0 {
            self.buffer.push(self.accumulator as u8);
            self.accumulator = 0;
            self.bits_in_accumulator = 0;
        }
    }

    /// Write raw bytes.
    ///
    /// When the writer is byte-aligned the bytes are copied directly.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.is_aligned() {
            self.buffer.extend_from_slice(bytes);
        } else {
            for &byte in bytes {
                self.write_bits(byte as u32, 8);
            }
        }
    }

    /// Pad the final partial byte with zeros and return the written bytes.
    ///
    /// The returned buffer holds exactly the bytes written (including any
    /// prefix passed to [`from_vec`](Self::from_vec)), never spare capacity
    /// contents.
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.buffer
    }
}

/// A saved [`BitReader`] position.
///
/// Capturing a cursor before a multi-step read and restoring it when the read
/// runs out of input rolls the reader back as if the read never started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitCursor {
    /// Index of the next byte to pull from the input.
    position: usize,
    /// Pulled bits not yet consumed (LSB-first).
    bit_buffer: u64,
    /// Number of valid bits in `bit_buffer`.
    bit_count: u32,
}

impl BitCursor {
    /// Cursor at the start of a byte offset, with nothing buffered.
    pub fn at(position: usize) -> Self {
        Self {
            position,
            bit_buffer: 0,
            bit_count: 0,
        }
    }

    /// Index of the next byte the reader would pull.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of buffered bits not yet consumed.
    pub fn buffered_bits(&self) -> u32 {
        self.bit_count
    }

    /// Shift the cursor back after `count` leading input bytes were discarded.
    pub fn rebase(&mut self, count: usize) {
        debug_assert!(count <= self.position, "Cannot discard unread input");
        self.position = self.position.saturating_sub(count);
    }
}

/// A bit-level reader over a borrowed byte slice.
///
/// Bytes are pulled into a 64-bit buffer only as far as a read requires.
/// A failed read returns [`OxiflateError::InputExhausted`] and leaves every
/// bit in place.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// Input bytes.
    input: &'a [u8],
    /// Index of the next byte to pull.
    position: usize,
    /// Pulled bits not yet consumed (LSB-first).
    bit_buffer: u64,
    /// Number of valid bits in `bit_buffer`.
    bit_count: u32,
}

impl<'a> BitReader<'a> {
    /// Create a reader at the start of `input`.
    pub fn new(input: &'a [u8]) -> Self {
        Self::at(input, 0)
    }

    /// Create a reader starting at byte `position` of `input`.
    pub fn at(input: &'a [u8], position: usize) -> Self {
        Self::resume(input, BitCursor::at(position))
    }

    /// Create a reader over `input` continuing from a saved cursor.
    ///
    /// `input` must contain the same bytes the cursor was taken over, up to
    /// the cursor's position.
    pub fn resume(input: &'a [u8], cursor: BitCursor) -> Self {
        Self {
            input,
            position: cursor.position,
            bit_buffer: cursor.bit_buffer,
            bit_count: cursor.bit_count,
        }
    }

    /// Capture the current position.
    #[inline]
    pub fn cursor(&self) -> BitCursor {
        BitCursor {
            position: self.position,
            bit_buffer: self.bit_buffer,
            bit_count: self.bit_count,
        }
    }

    /// Roll back to a previously captured position.
    #[inline]
    pub fn restore(&mut self, cursor: BitCursor) {
        self.position = cursor.position;
        self.bit_buffer = cursor.bit_buffer;
        self.bit_count = cursor.bit_count;
    }

    /// Current position in bits from the start of the input.
    pub fn bit_position(&self) -> u64 {
        self.position as u64 * 8 - self.bit_count as u64
    }

    /// Index of the next byte to pull from the input.
    pub fn byte_position(&self) -> usize {
        self.position
    }

    /// Number of bits still available (buffered plus unread input).
    pub fn bits_remaining(&self) -> u64 {
        self.bit_count as u64 + (self.input.len().saturating_sub(self.position)) as u64 * 8
    }

    /// Pull input bytes until at least `count` bits are buffered or the input
    /// runs out.
    #[inline]
    fn fill(&mut self, count: u32) {
        while self.bit_count < count && self.position < self.input.len() {
            self.bit_buffer |= (self.input[self.position] as u64) << self.bit_count;
            self.bit_count += 8;
            self.position += 1;
        }
    }

    /// Read `count` bits (0-32), least significant bit first.
    ///
    /// Fails with [`OxiflateError::InputExhausted`] if fewer than `count` bits
    /// remain; nothing is consumed in that case.
    #[inline]
    pub fn read_bits(&mut self, count: u32) -> Result<u32> {
        debug_assert!(count <= 32, "Cannot read more than 32 bits at once");
        if count == 0 {
            return Ok(0);
        }

        self.fill(count);
        if self.bit_count < count {
            return Err(OxiflateError::input_exhausted(count, self.bit_count));
        }

        let value = (self.bit_buffer & low_mask(count)) as u32;
        self.bit_buffer >>= count;
        self.bit_count -= count;
        Ok(value)
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Peek at up to `count` bits (0-32) without consuming them.
    ///
    /// Returns the bits together with how many of them are backed by real
    /// input. Bits past the end of the input read as zero.
    #[inline]
    pub fn peek_bits(&mut self, count: u32) -> (u32, u32) {
        debug_assert!(count <= 32, "Cannot peek more than 32 bits at once");
        self.fill(count);
        let bits = (self.bit_buffer & low_mask(count)) as u32;
        (bits, self.bit_count.min(count))
    }

    /// Consume `count` bits that were previously peeked.
    #[inline]
    pub fn consume(&mut self, count: u32) {
        debug_assert!(count <= self.bit_count, "Cannot consume unbuffered bits");
        self.bit_buffer >>= count;
        self.bit_count -= count;
    }

    /// Return whole buffered bytes to the input.
    ///
    /// Afterwards fewer than 8 bits remain buffered and
    /// [`byte_position`](Self::byte_position) points at the first byte that
    /// has not been (even partially) consumed.
    pub fn release_whole_bytes(&mut self) {
        let whole = self.bit_count / 8;
        self.position -= whole as usize;
        self.bit_count -= whole * 8;
        self.bit_buffer &= low_mask(self.bit_count);
    }

    /// Discard bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        let remainder = self.bit_count % 8;
        self.consume(remainder);
        self.release_whole_bytes();
    }

    /// Read `len` raw bytes from a byte-aligned position.
    ///
    /// Fails with [`OxiflateError::InputExhausted`] if fewer than `len` bytes
    /// remain; nothing is consumed in that case.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        debug_assert!(self.bit_count % 8 == 0, "read_bytes requires alignment");
        self.release_whole_bytes();

        let available = self.input.len().saturating_sub(self.position);
        if available < len {
            let needed = u32::try_from(len.saturating_mul(8)).unwrap_or(u32::MAX);
            let have = u32::try_from(available.saturating_mul(8)).unwrap_or(u32::MAX);
            return Err(OxiflateError::input_exhausted(needed, have));
        }

        let bytes = &self.input[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    /// Take up to `max` raw bytes from a byte-aligned position.
    ///
    /// Returns however many bytes are available, possibly none.
    pub fn take_available(&mut self, max: usize) -> &'a [u8] {
        debug_assert!(self.bit_count % 8 == 0, "take_available requires alignment");
        self.release_whole_bytes();

        let len = max.min(self.input.len().saturating_sub(self.position));
        let bytes = &self.input[self.position..self.position + len];
        self.position += len;
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitreader_basic() {
        // 0b10110101 = 0xB5
        let data = [0xB5];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(1).unwrap(), 1); // LSB first
        assert_eq!(reader.read_bits(1).unwrap(), 0);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(1).unwrap(), 0);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(1).unwrap(), 0);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
    }

    #[test]
    fn test_bitreader_multi_byte() {
        let data = [0xFF, 0x00];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(4).unwrap(), 0xF);
        assert_eq!(reader.read_bits(8).unwrap(), 0x0F); // Crosses byte boundary
        assert_eq!(reader.read_bits(4).unwrap(), 0x0);
    }

    #[test]
    fn test_read_32_bits() {
        let data = [0x78, 0x56, 0x34, 0x12, 0xFF];
        let mut reader = BitReader::new(&data);
        reader.read_bits(4).unwrap();
        assert_eq!(reader.read_bits(32).unwrap(), 0xF123_4567);
    }

    #[test]
    fn test_bitreader_exhausted_keeps_state() {
        let data = [0xAB];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(4).unwrap(), 0xB);
        let err = reader.read_bits(5).unwrap_err();
        assert!(matches!(
            err,
            OxiflateError::InputExhausted {
                needed: 5,
                available: 4
            }
        ));
        // The four remaining bits are still there.
        assert_eq!(reader.read_bits(4).unwrap(), 0xA);
    }

    #[test]
    fn test_peek_reports_available() {
        let data = [0xAB];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.peek_bits(4), (0xB, 4));
        assert_eq!(reader.peek_bits(12), (0xAB, 8));
        reader.consume(4);
        assert_eq!(reader.peek_bits(4), (0xA, 4));
    }

    #[test]
    fn test_cursor_restore() {
        let data = [0x12, 0x34, 0x56];
        let mut reader = BitReader::new(&data);
        reader.read_bits(3).unwrap();

        let cursor = reader.cursor();
        let first = reader.read_bits(13).unwrap();
        reader.restore(cursor);
        assert_eq!(reader.read_bits(13).unwrap(), first);
    }

    #[test]
    fn test_resume_on_longer_input() {
        let data = [0x12, 0x34, 0x56, 0x78];
        let mut reader = BitReader::new(&data[..2]);
        assert_eq!(reader.read_bits(12).unwrap(), 0x412);
        assert!(reader.read_bits(8).is_err());

        let cursor = reader.cursor();
        let mut reader = BitReader::resume(&data, cursor);
        assert_eq!(reader.read_bits(8).unwrap(), 0x63);
    }

    #[test]
    fn test_cursor_rebase() {
        let data = [0x00, 0x00, 0xCD];
        let mut reader = BitReader::new(&data);
        reader.read_bits(16).unwrap();

        let mut cursor = reader.cursor();
        cursor.rebase(2);
        let mut reader = BitReader::resume(&data[2..], cursor);
        assert_eq!(reader.read_bits(8).unwrap(), 0xCD);
    }

    #[test]
    fn test_align_and_read_bytes() {
        let data = [0xFF, 0xAA, 0xBB, 0xCC];
        let mut reader = BitReader::new(&data);

        reader.read_bits(3).unwrap();
        // Pull more than needed into the buffer, then align.
        reader.peek_bits(20);
        reader.align_to_byte();
        assert_eq!(reader.byte_position(), 1);
        assert_eq!(reader.read_bytes(2).unwrap(), &[0xAA, 0xBB]);
        assert!(reader.read_bytes(2).is_err());
        assert_eq!(reader.take_available(10), &[0xCC]);
        assert_eq!(reader.take_available(10), &[] as &[u8]);
    }

    #[test]
    fn test_release_whole_bytes() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = BitReader::new(&data);
        reader.read_bits(1).unwrap();
        reader.peek_bits(20);
        assert_eq!(reader.byte_position(), 3);

        reader.release_whole_bytes();
        assert_eq!(reader.byte_position(), 1);
        assert_eq!(reader.bit_position(), 1);
        assert_eq!(reader.read_bits(7).unwrap(), 0);
        assert_eq!(reader.read_bits(8).unwrap(), 0x02);
    }

    #[test]
    fn test_bitwriter_bits() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3);
        writer.write_bits(0b11001, 5);
        // 3 bits: 101, 5 bits: 11001 -> 11001_101 = 0xCD
        assert_eq!(writer.finish(), vec![0xCD]);
    }

    #[test]
    fn test_bitwriter_reversed() {
        let mut writer = BitWriter::new();
        // 0b0011 sent MSB-first lands as 1100 in the low bits.
        writer.write_bits_reversed(0b0011, 4);
        writer.write_bits(0, 4);
        assert_eq!(writer.finish(), vec![0b0000_1100]);
    }

    #[test]
    fn test_bitwriter_finish_pads() {
        let mut writer = BitWriter::with_capacity(1);
        writer.write_bit(true);
        assert_eq!(writer.bits_written(), 1);
        assert_eq!(writer.finish(), vec![0x01]);

        assert!(BitWriter::new().finish().is_empty());
    }

    #[test]
    fn test_bitwriter_grows_past_capacity() {
        let mut writer = BitWriter::with_capacity(2);
        for i in 0..1000u32 {
            writer.write_bits(i & 0xFF, 8);
        }
        let output = writer.finish();
        assert_eq!(output.len(), 1000);
        assert_eq!(output[999], (999 & 0xFF) as u8);
    }

    #[test]
    fn test_bitwriter_from_vec_appends() {
        let mut writer = BitWriter::from_vec(vec![0x78, 0x9C]);
        writer.write_bits(0x3, 2);
        assert_eq!(writer.bits_written(), 2);
        assert_eq!(writer.finish(), vec![0x78, 0x9C, 0x03]);
    }

    #[test]
    fn test_write_bytes_unaligned() {
        let mut writer = BitWriter::new();
        writer.write_bits(1, 4);
        writer.write_bytes(&[0xAB]);
        assert_eq!(writer.finish(), vec![0xB1, 0x0A]);
    }

    #[test]
    fn test_roundtrip() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3);
        writer.write_bits(0b1111, 4);
        writer.write_bits(0b10, 2);
        writer.write_bits(0xDEAD_BEEF, 32);
        writer.align_to_byte();
        writer.write_bytes(b"ok");
        let output = writer.finish();

        let mut reader = BitReader::new(&output);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(4).unwrap(), 0b1111);
        assert_eq!(reader.read_bits(2).unwrap(), 0b10);
        assert_eq!(reader.read_bits(32).unwrap(), 0xDEAD_BEEF);
        reader.align_to_byte();
        assert_eq!(reader.read_bytes(2).unwrap(), b"ok");
    }

    #[test]
    fn test_reverse_bits() {
        assert_eq!(reverse_bits(0b101, 3), 0b101);
        assert_eq!(reverse_bits(0b1100, 4), 0b0011);
        assert_eq!(reverse_bits(0b10101010, 8), 0b01010101);
        assert_eq!(reverse_bits(1, 32), 0x8000_0000);
        assert_eq!(reverse_bits(0x1234, 0), 0);
    }
}
