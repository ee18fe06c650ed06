//! Code tables for DEFLATE (RFC 1951).
//!
//! Length and distance base/extra-bit tables, the transmission order of the
//! code-length alphabet, and the fixed Huffman codes. The fixed lookup
//! tables are built once on first use and shared read-only afterwards.

use crate::huffman::HuffmanTable;
use std::sync::OnceLock;

/// Maximum code length for the literal/length and distance alphabets.
pub const MAX_CODE_LENGTH: u8 = 15;

/// Maximum code length for the code-length (meta) alphabet.
pub const MAX_CODELEN_CODE_LENGTH: u8 = 7;

/// Size of the literal/length alphabet that may carry codes (0-285).
pub const LITLEN_ALPHABET_SIZE: usize = 286;

/// Size of the distance alphabet that may carry codes (0-29).
pub const DISTANCE_ALPHABET_SIZE: usize = 30;

/// Size of the code-length alphabet (0-18).
pub const CODELEN_ALPHABET_SIZE: usize = 19;

/// End of block symbol.
pub const END_OF_BLOCK: u16 = 256;

/// Minimum match length.
pub const MIN_MATCH: usize = 3;

/// Maximum match length.
pub const MAX_MATCH: usize = 258;

/// Size of the back-reference window.
pub const WINDOW_SIZE: usize = 32768;

/// Largest payload of a single stored block.
pub const MAX_STORED_BLOCK: usize = 65535;

/// Fixed literal/length code lengths (RFC 1951 Section 3.2.6).
///
/// - Symbols 0-143: 8 bits
/// - Symbols 144-255: 9 bits
/// - Symbols 256-279: 7 bits
/// - Symbols 280-287: 8 bits
///
/// Symbols 286 and 287 have codes but never appear in valid data.
pub fn fixed_litlen_lengths() -> [u8; 288] {
    let mut lengths = [8u8; 288];
    lengths[144..256].fill(9);
    lengths[256..280].fill(7);
    lengths
}

/// Fixed distance code lengths (RFC 1951 Section 3.2.6).
///
/// All 32 distance codes use 5 bits; 30 and 31 never appear in valid data.
pub fn fixed_distance_lengths() -> [u8; 32] {
    [5u8; 32]
}

/// Get the fixed literal/length lookup table.
///
/// This table is cached after first construction.
pub fn fixed_litlen_table() -> &'static HuffmanTable {
    static TABLE: OnceLock<HuffmanTable> = OnceLock::new();
    TABLE.get_or_init(|| HuffmanTable::build(&fixed_litlen_lengths()))
}

/// Get the fixed distance lookup table.
///
/// This table is cached after first construction.
pub fn fixed_distance_table() -> &'static HuffmanTable {
    static TABLE: OnceLock<HuffmanTable> = OnceLock::new();
    TABLE.get_or_init(|| HuffmanTable::build(&fixed_distance_lengths()))
}

/// Canonical fixed literal/length code for `symbol`, MSB-first.
///
/// Returns `(code, length)`; the code must be written most significant bit
/// first.
pub fn fixed_litlen_code(symbol: u16) -> (u32, u8) {
    let symbol = symbol as u32;
    match symbol {
        0..=143 => (0x30 + symbol, 8),
        144..=255 => (0x190 + (symbol - 144), 9),
        256..=279 => (symbol - 256, 7),
        _ => (0xC0 + (symbol - 280), 8),
    }
}

/// Length code base values (RFC 1951 Section 3.2.5).
///
/// For length codes 257-285, this gives the base length value.
/// Extra bits are added to get the final length.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264: 0 extra bits
    11, 13, 15, 17, // 265-268: 1 extra bit
    19, 23, 27, 31, // 269-272: 2 extra bits
    35, 43, 51, 59, // 273-276: 3 extra bits
    67, 83, 99, 115, // 277-280: 4 extra bits
    131, 163, 195, 227, // 281-284: 5 extra bits
    258, // 285: 0 extra bits (special case)
];

/// Number of extra bits for length codes 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, // 257-264
    1, 1, 1, 1, // 265-268
    2, 2, 2, 2, // 269-272
    3, 3, 3, 3, // 273-276
    4, 4, 4, 4, // 277-280
    5, 5, 5, 5, // 281-284
    0, // 285
];

/// Distance code base values (RFC 1951 Section 3.2.5).
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Number of extra bits for distance codes 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Order of code length codes in dynamic block header.
///
/// Code length codes are transmitted in this order (RFC 1951 Section 3.2.7).
pub const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Convert a match length (3-258) to `(code, extra_bits, extra_value)`.
///
/// Returns `None` outside the range the length codes cover.
pub fn length_to_code(length: usize) -> Option<(u16, u8, u16)> {
    let code = match length {
        3..=10 => length - 3 + 257,
        11..=18 => (length - 11) / 2 + 265,
        19..=34 => (length - 19) / 4 + 269,
        35..=66 => (length - 35) / 8 + 273,
        67..=130 => (length - 67) / 16 + 277,
        131..=257 => (length - 131) / 32 + 281,
        258 => 285,
        _ => return None,
    };

    let base = LENGTH_BASE[code - 257] as usize;
    let extra_bits = LENGTH_EXTRA_BITS[code - 257];
    Some((code as u16, extra_bits, (length - base) as u16))
}

/// Convert a match distance (1-32768) to `(code, extra_bits, extra_value)`.
///
/// Returns `None` outside the window.
pub fn distance_to_code(distance: usize) -> Option<(u16, u8, u16)> {
    if !(1..=WINDOW_SIZE).contains(&distance) {
        return None;
    }

    // Each pair of codes doubles the distance span.
    let code = if distance <= 4 {
        distance - 1
    } else {
        let d = distance - 1;
        let msb = (usize::BITS - 1 - d.leading_zeros()) as usize;
        2 * msb + ((d >> (msb - 1)) & 1)
    };

    let base = DISTANCE_BASE[code] as usize;
    let extra_bits = DISTANCE_EXTRA_BITS[code];
    Some((code as u16, extra_bits, (distance - base) as u16))
}

/// Decode a length from a length code (257-285) and its extra bits.
pub fn decode_length(code: u16, extra: u32) -> usize {
    debug_assert!((257..=285).contains(&code), "Invalid length code: {}", code);
    LENGTH_BASE[(code - 257) as usize] as usize + extra as usize
}

/// Decode a distance from a distance code (0-29) and its extra bits.
pub fn decode_distance(code: u16, extra: u32) -> usize {
    debug_assert!(code < 30, "Invalid distance code: {}", code);
    DISTANCE_BASE[code as usize] as usize + extra as usize
}
