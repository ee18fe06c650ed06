//! Error types for OxiFlate operations.
//!
//! A single error enum covers every failure the codec can report: malformed
//! streams seen by the decoder, input exhaustion, and contract violations on
//! the encoder side. Streaming starvation is not an error; the streaming
//! inflater reports it through its status value instead.

use std::io;
use thiserror::Error;

/// The main error type for OxiFlate operations.
#[derive(Debug, Error)]
pub enum OxiflateError {
    /// I/O error from an output sink backed by a writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The bit reader could not satisfy a read from the bytes it was given.
    ///
    /// The reader state is left untouched, so a caller holding more input can
    /// retry the same read.
    #[error("Input exhausted: need {needed} bits, {available} available")]
    InputExhausted {
        /// Number of bits requested.
        needed: u32,
        /// Number of bits that were available.
        available: u32,
    },

    /// A one-shot decode ran past the end of a complete input buffer.
    #[error("Unexpected end of input at bit position {bit_position}")]
    UnexpectedEndOfInput {
        /// Bit position at which the read failed.
        bit_position: u64,
    },

    /// A block header is malformed (for example a stored LEN/NLEN mismatch).
    #[error("Corrupt block header at offset {offset}: {message}")]
    CorruptHeader {
        /// Byte offset of the offending header field.
        offset: u64,
        /// Description of the problem.
        message: String,
    },

    /// The reserved block type `11` was found.
    #[error("Invalid block type: {btype}")]
    InvalidBlockType {
        /// The two-bit block type value.
        btype: u8,
    },

    /// A code-length symbol could not be applied while reading a dynamic
    /// block's tree description.
    #[error("Invalid code length symbol: {symbol}")]
    InvalidCodeLengthSymbol {
        /// The offending meta-alphabet symbol.
        symbol: u16,
    },

    /// A code length exceeds the limit of its alphabet.
    #[error("Code length {length} exceeds limit {limit}")]
    CodeLengthTooLong {
        /// The offending length.
        length: u8,
        /// The limit for the alphabet.
        limit: u8,
    },

    /// A set of code lengths assigns more codes than the code space holds.
    #[error("Over-subscribed Huffman code lengths")]
    OversubscribedCode,

    /// A bit pattern does not correspond to any assigned code.
    #[error("Invalid Huffman code at bit position {bit_position}")]
    InvalidHuffmanCode {
        /// Bit position where the invalid code starts.
        bit_position: u64,
    },

    /// A decoded symbol lies outside the range DEFLATE allows.
    #[error("Invalid symbol: {symbol}")]
    InvalidSymbol {
        /// The decoded symbol.
        symbol: u16,
    },

    /// A back-reference points before the start of the output.
    #[error("Invalid back-reference distance: {distance} exceeds history size {history_size}")]
    InvalidDistance {
        /// The distance that was decoded.
        distance: usize,
        /// Number of bytes of history available.
        history_size: usize,
    },

    /// The encoder was asked to emit a match outside the supported ranges.
    #[error("Invalid match: length {length}, distance {distance}")]
    InvalidMatch {
        /// Match length.
        length: usize,
        /// Match distance.
        distance: usize,
    },

    /// An unknown compression type was selected.
    #[error("Unsupported compression type: {value}")]
    UnsupportedCompressionType {
        /// The raw selector value.
        value: u8,
    },
}

/// Result type alias for OxiFlate operations.
pub type Result<T> = std::result::Result<T, OxiflateError>;

impl OxiflateError {
    /// Create an input exhausted error.
    pub fn input_exhausted(needed: u32, available: u32) -> Self {
        Self::InputExhausted { needed, available }
    }

    /// Create an unexpected end of input error.
    pub fn unexpected_end(bit_position: u64) -> Self {
        Self::UnexpectedEndOfInput { bit_position }
    }

    /// Create a corrupt header error.
    pub fn corrupt_header(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptHeader {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid block type error.
    pub fn invalid_block_type(btype: u8) -> Self {
        Self::InvalidBlockType { btype }
    }

    /// Create an invalid code length symbol error.
    pub fn invalid_code_length_symbol(symbol: u16) -> Self {
        Self::InvalidCodeLengthSymbol { symbol }
    }

    /// Create a code length too long error.
    pub fn code_length_too_long(length: u8, limit: u8) -> Self {
        Self::CodeLengthTooLong { length, limit }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(bit_position: u64) -> Self {
        Self::InvalidHuffmanCode { bit_position }
    }

    /// Create an invalid symbol error.
    pub fn invalid_symbol(symbol: u16) -> Self {
        Self::InvalidSymbol { symbol }
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, history_size: usize) -> Self {
        Self::InvalidDistance {
            distance,
            history_size,
        }
    }

    /// Create an invalid match error.
    pub fn invalid_match(length: usize, distance: usize) -> Self {
        Self::InvalidMatch { length, distance }
    }

    /// Create an unsupported compression type error.
    pub fn unsupported_compression_type(value: u8) -> Self {
        Self::UnsupportedCompressionType { value }
    }

    /// Whether this error only means the reader ran short of input.
    pub fn is_input_exhausted(&self) -> bool {
        matches!(self, Self::InputExhausted { .. })
    }
}
