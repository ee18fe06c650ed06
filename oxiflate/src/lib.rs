//! # OxiFlate
//!
//! Pure Rust implementation of the DEFLATE compression algorithm (RFC 1951).
//!
//! This crate produces and consumes raw DEFLATE streams, the payload format
//! inside zlib, gzip, ZIP and PNG. Container framing is left to the caller.
//!
//! ## Features
//!
//! - **Compression**: LZ77 with hash chains and optional lazy matching,
//!   followed by one of three block encodings
//!   - Stored (uncompressed) blocks
//!   - Fixed Huffman codes
//!   - Dynamic Huffman codes, length-limited with package-merge
//! - **Decompression**: All block types, in two forms
//!   - [`Inflater`]: one-shot, with block or adaptive output buffering
//!   - [`StreamingInflater`]: incremental, accepts input in any split
//!
//! ## Example
//!
//! ```rust
//! use oxiflate::{CompressionLevel, CompressionType, DeflateOptions, deflate_with, inflate};
//!
//! let original = b"Hello, World! Hello, World!";
//!
//! let compressed = deflate_with(original, CompressionType::Dynamic).unwrap();
//! assert_eq!(inflate(&compressed).unwrap(), original);
//!
//! // Levels 0-9 map to block type, lazy matching and chain length.
//! let compressed = deflate_with(original, DeflateOptions::from_level(CompressionLevel::BEST)).unwrap();
//! assert_eq!(inflate(&compressed).unwrap(), original);
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0: Stored blocks
//! - Level 1-3: Fixed Huffman codes, short chains
//! - Level 4-9: Dynamic Huffman codes, lazy matching, longer chains

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod decode;
pub mod deflate;
pub mod heap;
pub mod huffman;
pub mod inflate;
pub mod lz77;
pub mod options;
mod output;
pub mod package_merge;
pub mod stream;
pub mod tables;

// Re-exports
pub use deflate::{Deflater, deflate, deflate_with};
pub use heap::{HeapEntry, PriorityHeap};
pub use huffman::HuffmanTable;
pub use inflate::{Inflater, inflate, inflate_with};
pub use lz77::{Lz77Encoder, Lz77Token};
pub use options::{BufferMode, CompressionType, DeflateOptions, InflateOptions};
pub use package_merge::{CanonicalCode, HuffmanBuilder, canonical_codes};
pub use stream::{DecoderState, StreamingInflater};

pub use oxiflate_core::{
    CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
    OutputSink, OxiflateError, Result,
};
