//! DEFLATE decompression (inflate).
//!
//! This module implements the one-shot DEFLATE decoder as specified in
//! RFC 1951. The whole compressed stream must be present; running out of
//! input is reported as [`OxiflateError::UnexpectedEndOfInput`]. It supports
//! all three block types:
//! - Type 0: Stored (uncompressed)
//! - Type 1: Fixed Huffman codes
//! - Type 2: Dynamic Huffman codes
//!
//! Use [`StreamingInflater`](crate::StreamingInflater) when input arrives in
//! pieces.

use crate::decode::{
    BlockCodes, GrowthHint, OutputWindow, ShortRead, complete, decode_symbols, read_block_header,
    read_dynamic_codes, read_stored_header,
};
use crate::options::{BufferMode, CompressionType, InflateOptions};
use crate::output::{AdaptiveBuffer, BlockBuffer};
use oxiflate_core::bitstream::BitReader;
use oxiflate_core::error::{OxiflateError, Result};

/// One-shot DEFLATE decompressor.
#[derive(Debug, Default)]
pub struct Inflater {
    /// Decoder settings.
    options: InflateOptions,
    /// Input offset just past the last decoded stream.
    consumed: usize,
    /// Number of blocks in the last decoded stream.
    blocks: usize,
}

impl Inflater {
    /// Create a decompressor with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decompressor with explicit options.
    pub fn with_options(options: InflateOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// The decoder settings.
    pub fn options(&self) -> &InflateOptions {
        &self.options
    }

    /// Byte offset in the input just past the last decoded stream.
    ///
    /// Data following the stream (a container trailer, for example) starts
    /// here.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Number of blocks in the last decoded stream.
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Decompress the DEFLATE stream starting at the configured offset of
    /// `input`.
    ///
    /// # Errors
    ///
    /// [`OxiflateError::UnexpectedEndOfInput`] if the stream is truncated,
    /// and the malformed-stream errors of [`OxiflateError`] for corrupt data.
    pub fn inflate(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let start = self.options.start;
        if start > input.len() {
            return Err(OxiflateError::unexpected_end(input.len() as u64 * 8));
        }

        let size = self.options.buffer_size;
        let resize = self.options.resize;
        match self.options.buffer_mode {
            BufferMode::Block => {
                let mut output = BlockBuffer::new(size);
                self.decode_stream(input, &mut output)?;
                Ok(output.finish(resize))
            }
            BufferMode::Adaptive => {
                let mut output = AdaptiveBuffer::new(size, start, input.len());
                self.decode_stream(input, &mut output)?;
                Ok(output.finish(resize))
            }
        }
    }

    /// Decode blocks until the final one ends.
    fn decode_stream<W: OutputWindow>(&mut self, input: &[u8], output: &mut W) -> Result<()> {
        let mut reader = BitReader::at(input, self.options.start);
        self.blocks = 0;

        loop {
            let header = complete(&mut reader, read_block_header)?;
            log::debug!(
                "oxiflate::inflate: {:?} block, final={}",
                header.kind,
                header.is_final
            );

            match header.kind {
                CompressionType::Stored => {
                    let len = complete(&mut reader, read_stored_header)?;
                    let bytes = complete(&mut reader, |r| r.read_bytes(len))?;
                    output.reserve(
                        len,
                        GrowthHint {
                            input_position: reader.byte_position(),
                            min_code_length: 8,
                        },
                    );
                    output.push_slice(bytes);
                }
                CompressionType::Fixed => {
                    decode_symbols(ShortRead::Fail, &mut reader, &BlockCodes::Fixed, output)?;
                }
                CompressionType::Dynamic => {
                    let codes = complete(&mut reader, read_dynamic_codes)?;
                    decode_symbols(ShortRead::Fail, &mut reader, &codes, output)?;
                }
            }

            self.blocks += 1;
            if header.is_final {
                break;
            }
        }

        reader.release_whole_bytes();
        self.consumed = reader.byte_position();
        Ok(())
    }
}

/// Decompress DEFLATE data with default options (convenience function).
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::new().inflate(data)
}

/// Decompress DEFLATE data with explicit options (convenience function).
pub fn inflate_with(data: &[u8], options: InflateOptions) -> Result<Vec<u8>> {
    Inflater::with_options(options).inflate(data)
}
