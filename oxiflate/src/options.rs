//! Encoder and decoder configuration.
//!
//! All options are plain values with sensible defaults and builder-style
//! setters:
//!
//! ```rust
//! use oxiflate::{CompressionType, DeflateOptions, InflateOptions, BufferMode};
//!
//! let deflate = DeflateOptions::default()
//!     .with_compression_type(CompressionType::Fixed)
//!     .with_lazy(8);
//! assert_eq!(deflate.lazy, 8);
//!
//! let inflate = InflateOptions::default().with_buffer_mode(BufferMode::Block);
//! assert_eq!(inflate.buffer_size, 32768);
//! ```

use oxiflate_core::error::OxiflateError;
use oxiflate_core::traits::CompressionLevel;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Block kind the encoder emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum CompressionType {
    /// Stored (uncompressed) blocks, BTYPE 00.
    Stored = 0,
    /// Fixed Huffman codes, BTYPE 01.
    Fixed = 1,
    /// Dynamic Huffman codes, BTYPE 10.
    #[default]
    Dynamic = 2,
}

impl CompressionType {
    /// The BTYPE field value written in block headers.
    pub fn btype(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for CompressionType {
    type Error = OxiflateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Stored),
            1 => Ok(Self::Fixed),
            2 => Ok(Self::Dynamic),
            _ => Err(OxiflateError::unsupported_compression_type(value)),
        }
    }
}

/// Encoder options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeflateOptions {
    /// Block kind to emit.
    pub compression_type: CompressionType,
    /// Lazy-match threshold: a match shorter than this is deferred one
    /// position in case the next one is longer. `0` disables lazy matching.
    pub lazy: usize,
    /// Maximum number of candidates examined per match search.
    pub max_chain: usize,
}

impl DeflateOptions {
    /// Unbounded candidate search.
    pub const UNBOUNDED_CHAIN: usize = usize::MAX;

    /// Create options for a compression type with greedy, unbounded matching.
    pub fn new(compression_type: CompressionType) -> Self {
        Self {
            compression_type,
            lazy: 0,
            max_chain: Self::UNBOUNDED_CHAIN,
        }
    }

    /// Options for a compression level (0-9).
    ///
    /// Level 0 stores, levels 1-3 use fixed codes with greedy matching, and
    /// levels 4-9 use dynamic codes with deeper searches and lazy matching.
    pub fn from_level(level: CompressionLevel) -> Self {
        let (compression_type, lazy, max_chain) = match level.level() {
            0 => (CompressionType::Stored, 0, 0),
            1 => (CompressionType::Fixed, 0, 4),
            2 => (CompressionType::Fixed, 0, 8),
            3 => (CompressionType::Fixed, 0, 16),
            4 => (CompressionType::Dynamic, 0, 32),
            5 => (CompressionType::Dynamic, 16, 64),
            6 => (CompressionType::Dynamic, 32, 128),
            7 => (CompressionType::Dynamic, 64, 256),
            8 => (CompressionType::Dynamic, 128, 1024),
            _ => (CompressionType::Dynamic, 258, 4096),
        };
        Self {
            compression_type,
            lazy,
            max_chain,
        }
    }

    /// Set the block kind.
    pub fn with_compression_type(mut self, compression_type: CompressionType) -> Self {
        self.compression_type = compression_type;
        self
    }

    /// Set the lazy-match threshold.
    pub fn with_lazy(mut self, lazy: usize) -> Self {
        self.lazy = lazy;
        self
    }

    /// Set the candidate search bound (at least 1).
    pub fn with_max_chain(mut self, max_chain: usize) -> Self {
        self.max_chain = max_chain.max(1);
        self
    }
}

impl Default for DeflateOptions {
    fn default() -> Self {
        Self::new(CompressionType::Dynamic)
    }
}

impl From<CompressionLevel> for DeflateOptions {
    fn from(level: CompressionLevel) -> Self {
        Self::from_level(level)
    }
}

impl From<CompressionType> for DeflateOptions {
    fn from(compression_type: CompressionType) -> Self {
        Self::new(compression_type)
    }
}

/// Output buffer strategy of the one-shot decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BufferMode {
    /// Fixed-size buffer behind a 32 KiB backward window; completed regions
    /// are flushed to a block list and joined at the end.
    Block,
    /// One buffer grown by an estimate of the remaining output.
    #[default]
    Adaptive,
}

/// One-shot decoder options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InflateOptions {
    /// Byte offset of the DEFLATE stream in the input.
    pub start: usize,
    /// Initial output capacity (adaptive) or flush block size (block).
    pub buffer_size: usize,
    /// Output buffer strategy.
    pub buffer_mode: BufferMode,
    /// Shrink the returned buffer's capacity to its length.
    pub resize: bool,
}

impl InflateOptions {
    /// Default output buffer size.
    pub const DEFAULT_BUFFER_SIZE: usize = 32768;

    /// Set the start offset.
    pub fn with_start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    /// Set the output buffer size (at least 1).
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Set the output buffer strategy.
    pub fn with_buffer_mode(mut self, buffer_mode: BufferMode) -> Self {
        self.buffer_mode = buffer_mode;
        self
    }

    /// Enable or disable trimming of the result.
    pub fn with_resize(mut self, resize: bool) -> Self {
        self.resize = resize;
        self
    }
}

impl Default for InflateOptions {
    fn default() -> Self {
        Self {
            start: 0,
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
            buffer_mode: BufferMode::default(),
            resize: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_type_from_u8() {
        assert_eq!(CompressionType::try_from(0).unwrap(), CompressionType::Stored);
        assert_eq!(CompressionType::try_from(1).unwrap(), CompressionType::Fixed);
        assert_eq!(CompressionType::try_from(2).unwrap(), CompressionType::Dynamic);
        assert!(matches!(
            CompressionType::try_from(3),
            Err(OxiflateError::UnsupportedCompressionType { value: 3 })
        ));
        assert_eq!(CompressionType::Dynamic.btype(), 2);
    }

    #[test]
    fn test_level_presets() {
        let stored = DeflateOptions::from_level(CompressionLevel::NONE);
        assert_eq!(stored.compression_type, CompressionType::Stored);

        let fast = DeflateOptions::from_level(CompressionLevel::FAST);
        assert_eq!(fast.compression_type, CompressionType::Fixed);
        assert_eq!(fast.lazy, 0);

        let mut previous = 0;
        for level in 4..=9 {
            let options = DeflateOptions::from(CompressionLevel::new(level));
            assert_eq!(options.compression_type, CompressionType::Dynamic);
            assert!(options.max_chain > previous);
            previous = options.max_chain;
        }
    }

    #[test]
    fn test_defaults() {
        let options = DeflateOptions::default();
        assert_eq!(options.compression_type, CompressionType::Dynamic);
        assert_eq!(options.lazy, 0);
        assert_eq!(options.max_chain, DeflateOptions::UNBOUNDED_CHAIN);

        let options = InflateOptions::default();
        assert_eq!(options.start, 0);
        assert_eq!(options.buffer_mode, BufferMode::Adaptive);
        assert!(!options.resize);
    }

    #[test]
    fn test_builders_clamp() {
        assert_eq!(DeflateOptions::default().with_max_chain(0).max_chain, 1);
        assert_eq!(InflateOptions::default().with_buffer_size(0).buffer_size, 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let options = InflateOptions::default()
            .with_start(2)
            .with_buffer_mode(BufferMode::Block);
        let json = serde_json::to_string(&options).unwrap();
        let back: InflateOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);

        let options = DeflateOptions::from_level(CompressionLevel::BEST);
        let json = serde_json::to_string(&options).unwrap();
        let back: DeflateOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }
}
