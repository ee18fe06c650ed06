//! # OxiFlate Core
//!
//! Core components for the OxiFlate DEFLATE codec.
//!
//! This crate provides the building blocks the codec is layered on:
//!
//! - [`bitstream`]: Bit-level I/O for variable-length codes, with rollback
//! - [`traits`]: Streaming compression/decompression traits and output sinks
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Container framing (zlib, gzip, zip) - outside this repo │
//! ├─────────────────────────────────────────────────────────┤
//! │ Codec (oxiflate)                                        │
//! │     LZ77, package-merge Huffman, block encoder/decoder  │
//! ├─────────────────────────────────────────────────────────┤
//! │ BitStream (this crate)                                  │
//! │     BitReader/BitWriter, BitCursor, traits, errors      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_core::bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bits(0xABC, 12);
//! let data = writer.finish();
//!
//! let mut reader = BitReader::new(&data);
//! assert_eq!(reader.read_bits(12).unwrap(), 0xABC);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod error;
pub mod traits;

// Re-exports for convenience
pub use bitstream::{BitCursor, BitReader, BitWriter};
pub use error::{OxiflateError, Result};
pub use traits::{
    CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
    OutputSink,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitReader, BitWriter};
    pub use crate::error::{OxiflateError, Result};
    pub use crate::traits::{CompressionLevel, Compressor, Decompressor, OutputSink};
}
