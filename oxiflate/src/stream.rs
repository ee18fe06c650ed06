//! Incremental DEFLATE decompression.
//!
//! [`StreamingInflater`] accepts compressed input in arbitrary pieces. Each
//! call decodes as far as the buffered input allows and hands back the
//! output produced since the previous call. When a read runs out of input in
//! the middle of a header or symbol, the reader is rolled back to the start
//! of that unit and the decoder waits for more input; nothing is lost and
//! nothing is decoded twice.
//!
//! ```rust
//! use oxiflate::{StreamingInflater, deflate};
//!
//! let compressed = deflate(b"streamed, one byte at a time").unwrap();
//!
//! let mut inflater = StreamingInflater::new();
//! let mut output = Vec::new();
//! for byte in &compressed {
//!     output.extend(inflater.decompress(std::slice::from_ref(byte)).unwrap());
//! }
//! assert!(inflater.is_done());
//! assert_eq!(output, b"streamed, one byte at a time");
//! ```

use crate::decode::{
    BlockCodes, Progress, ShortRead, decode_symbols, read_block_header, read_dynamic_codes,
    read_stored_header,
};
use crate::options::CompressionType;
use crate::tables::WINDOW_SIZE;
use oxiflate_core::bitstream::{BitCursor, BitReader};
use oxiflate_core::error::{OxiflateError, Result};
use oxiflate_core::traits::{DecompressStatus, Decompressor, OutputSink};

/// Where the streaming decoder is in the block structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DecoderState {
    /// Before the first block, or between blocks.
    #[default]
    Initialized,
    /// Waiting for a block header.
    BlockHeaderStart,
    /// Block header read.
    BlockHeaderEnd,
    /// Waiting for the stored length or the dynamic code description.
    BlockBodyStart,
    /// Block is ready to decode.
    BlockBodyEnd,
    /// Decoding block contents.
    DecodeBlockStart,
    /// Block contents complete.
    DecodeBlockEnd,
}

/// Streaming DEFLATE decompressor.
#[derive(Debug, Default)]
pub struct StreamingInflater {
    /// Buffered input; bytes before the cursor are discarded on the next
    /// call.
    input: Vec<u8>,
    /// Read position in `input`.
    cursor: BitCursor,
    /// Decoder state.
    state: DecoderState,
    /// BFINAL of the current block.
    is_final: bool,
    /// BTYPE of the current block.
    kind: CompressionType,
    /// Codes of the current compressed block.
    codes: Option<BlockCodes>,
    /// Bytes of the current stored block still to copy.
    stored_remaining: usize,
    /// History window followed by output not yet handed out.
    output: Vec<u8>,
    /// Bytes of `output` already handed out.
    emitted: usize,
    /// Total compressed bytes received.
    total_in: u64,
    /// Total bytes decoded.
    total_out: u64,
    /// Whether the final block has ended.
    done: bool,
}

impl StreamingInflater {
    /// Create a new streaming decompressor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current decoder state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Whether the end of the final block has been decoded.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Total compressed bytes received.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total bytes decoded.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Buffered input the decoder has not consumed.
    ///
    /// Once [`is_done`](Self::is_done), this is the data that followed the
    /// stream.
    pub fn remaining_input(&self) -> &[u8] {
        let position = self.cursor.position().min(self.input.len());
        &self.input[position..]
    }

    /// Append `chunk` and return the output it made available.
    ///
    /// # Errors
    ///
    /// Malformed streams fail immediately. Running out of input is not an
    /// error; call [`finish`](Self::finish) to check that the stream ended.
    pub fn decompress(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        self.feed(chunk)?;
        let produced = self.output[self.emitted..].to_vec();
        self.emitted = self.output.len();
        Ok(produced)
    }

    /// Append `chunk` and forward the output it made available to `sink`.
    ///
    /// Returns the number of bytes written to the sink.
    pub fn decompress_to<S: OutputSink + ?Sized>(
        &mut self,
        chunk: &[u8],
        sink: &mut S,
    ) -> Result<usize> {
        self.feed(chunk)?;
        let produced = &self.output[self.emitted..];
        sink.write_output(produced)?;
        let written = produced.len();
        self.emitted += written;
        Ok(written)
    }

    /// Check that the stream is complete.
    ///
    /// # Errors
    ///
    /// [`OxiflateError::UnexpectedEndOfInput`] if the final block has not
    /// ended.
    pub fn finish(&self) -> Result<()> {
        if self.done {
            Ok(())
        } else {
            Err(OxiflateError::unexpected_end(self.total_in * 8))
        }
    }

    /// Reset to decode a new stream.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        self.compact_output();
        self.discard_consumed_input();
        self.input.extend_from_slice(chunk);
        self.total_in += chunk.len() as u64;

        if self.done {
            return Ok(());
        }

        let input = std::mem::take(&mut self.input);
        let mut reader = BitReader::resume(&input, self.cursor);
        let before = self.output.len();
        let result = self.run(&mut reader);

        // Buffered whole bytes go back to the input so discarding consumed
        // input never drops unread bits.
        reader.release_whole_bytes();
        self.cursor = reader.cursor();
        self.input = input;
        self.total_out += (self.output.len() - before) as u64;
        result
    }

    /// Drive the state machine until the input runs dry or the stream ends.
    fn run(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let mode = ShortRead::Suspend;
        loop {
            match self.state {
                DecoderState::Initialized | DecoderState::BlockHeaderStart => {
                    self.state = DecoderState::BlockHeaderStart;
                    let Progress::Ready(header) = mode.attempt(reader, read_block_header)? else {
                        return self.suspend(reader);
                    };
                    log::debug!(
                        "oxiflate::stream: {:?} block, final={}",
                        header.kind,
                        header.is_final
                    );
                    self.is_final = header.is_final;
                    self.kind = header.kind;
                    self.state = DecoderState::BlockHeaderEnd;
                }
                DecoderState::BlockHeaderEnd | DecoderState::BlockBodyStart => {
                    self.state = DecoderState::BlockBodyStart;
                    match self.kind {
                        CompressionType::Stored => {
                            let Progress::Ready(len) = mode.attempt(reader, read_stored_header)?
                            else {
                                return self.suspend(reader);
                            };
                            self.stored_remaining = len;
                        }
                        CompressionType::Fixed => self.codes = Some(BlockCodes::Fixed),
                        CompressionType::Dynamic => {
                            let Progress::Ready(codes) = mode.attempt(reader, read_dynamic_codes)?
                            else {
                                return self.suspend(reader);
                            };
                            self.codes = Some(codes);
                        }
                    }
                    self.state = DecoderState::BlockBodyEnd;
                }
                DecoderState::BlockBodyEnd | DecoderState::DecodeBlockStart => {
                    self.state = DecoderState::DecodeBlockStart;
                    if self.kind == CompressionType::Stored {
                        let bytes = reader.take_available(self.stored_remaining);
                        self.output.extend_from_slice(bytes);
                        self.stored_remaining -= bytes.len();
                        if self.stored_remaining > 0 {
                            return self.suspend(reader);
                        }
                    } else {
                        let progress = match &self.codes {
                            Some(codes) => decode_symbols(mode, reader, codes, &mut self.output)?,
                            None => {
                                decode_symbols(mode, reader, &BlockCodes::Fixed, &mut self.output)?
                            }
                        };
                        if progress == Progress::Starved {
                            return self.suspend(reader);
                        }
                        self.codes = None;
                    }
                    self.state = DecoderState::DecodeBlockEnd;
                }
                DecoderState::DecodeBlockEnd => {
                    if self.is_final {
                        self.done = true;
                        return Ok(());
                    }
                    self.state = DecoderState::Initialized;
                }
            }
        }
    }

    fn suspend(&self, reader: &BitReader<'_>) -> Result<()> {
        log::trace!(
            "oxiflate::stream: waiting for input in {:?}, {} bits buffered",
            self.state,
            reader.bits_remaining()
        );
        Ok(())
    }

    /// Drop handed-out output beyond the back-reference window.
    fn compact_output(&mut self) {
        if self.emitted <= 2 * WINDOW_SIZE {
            return;
        }
        let drop = self.emitted.min(self.output.len().saturating_sub(WINDOW_SIZE));
        self.output.drain(..drop);
        self.emitted -= drop;
        log::trace!(
            "oxiflate::stream: compacted output window, dropped {} bytes",
            drop
        );
    }

    fn discard_consumed_input(&mut self) {
        let used = self.cursor.position().min(self.input.len());
        if used > 0 {
            self.input.drain(..used);
            self.cursor.rebase(used);
        }
    }

    fn status(&self) -> DecompressStatus {
        if self.emitted < self.output.len() {
            DecompressStatus::NeedsOutput
        } else if self.done {
            DecompressStatus::Done
        } else {
            DecompressStatus::NeedsInput
        }
    }
}

impl Decompressor for StreamingInflater {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        self.feed(input)?;

        // Input past the end of the stream is not consumed.
        let trailing = if self.done {
            self.remaining_input().len().min(input.len())
        } else {
            0
        };

        let pending = &self.output[self.emitted..];
        let produced = pending.len().min(output.len());
        output[..produced].copy_from_slice(&pending[..produced]);
        self.emitted += produced;

        Ok((input.len() - trailing, produced, self.status()))
    }

    fn reset(&mut self) {
        StreamingInflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.done && self.emitted == self.output.len()
    }
}
