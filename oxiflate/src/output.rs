//! Output buffers for the one-shot decoder.
//!
//! [`BlockBuffer`] keeps a fixed working area behind a 32 KiB history
//! window and moves completed output to a list of blocks whenever the area
//! fills up; the blocks are joined once decoding ends. [`AdaptiveBuffer`] is
//! a single buffer grown ahead of need by an estimate of the final size.

use crate::decode::{GrowthHint, OutputWindow, copy_match_in};
use crate::tables::{MAX_MATCH, WINDOW_SIZE};
use oxiflate_core::error::Result;

/// Buffers below this size grow by up to [`MAX_SMALL_GROWTH`]; larger ones
/// at most double.
const LARGE_BUFFER_THRESHOLD: usize = 1 << 20;

/// Largest growth factor applied to a small buffer in one step.
const MAX_SMALL_GROWTH: usize = 8;

/// Input bytes already pulled into the bit buffer but not yet decoded.
const BIT_BUFFER_SLACK: usize = 8;

/// Fixed working area behind a history window, flushed to a block list.
#[derive(Debug)]
pub(crate) struct BlockBuffer {
    /// Completed output no longer needed as history.
    blocks: Vec<Vec<u8>>,
    /// History window followed by unflushed output.
    data: Vec<u8>,
    /// Index in `data` of the first byte not yet moved to `blocks`.
    flushed_upto: usize,
    /// Total bytes in `blocks`.
    flushed_total: usize,
    /// Flush once `data` would grow past this.
    limit: usize,
}

impl BlockBuffer {
    pub(crate) fn new(block_size: usize) -> Self {
        let limit = WINDOW_SIZE + block_size + MAX_MATCH;
        Self {
            blocks: Vec::new(),
            data: Vec::with_capacity(limit),
            flushed_upto: 0,
            flushed_total: 0,
            limit,
        }
    }

    /// Total bytes decoded so far.
    pub(crate) fn len(&self) -> usize {
        self.flushed_total + self.data.len() - self.flushed_upto
    }

    /// Move unflushed output to the block list, keeping the history window.
    fn flush(&mut self) {
        let pending = &self.data[self.flushed_upto..];
        if !pending.is_empty() {
            self.flushed_total += pending.len();
            self.blocks.push(pending.to_vec());
        }

        let keep_from = self.data.len().saturating_sub(WINDOW_SIZE);
        self.data.drain(..keep_from);
        self.flushed_upto = self.data.len();
    }

    /// Join all output.
    pub(crate) fn finish(mut self, resize: bool) -> Vec<u8> {
        let mut output = if self.blocks.is_empty() {
            self.data.split_off(self.flushed_upto)
        } else {
            let mut output = Vec::with_capacity(self.len());
            for block in &self.blocks {
                output.extend_from_slice(block);
            }
            output.extend_from_slice(&self.data[self.flushed_upto..]);
            output
        };
        if resize {
            output.shrink_to_fit();
        }
        output
    }
}

impl OutputWindow for BlockBuffer {
    fn reserve(&mut self, additional: usize, _hint: GrowthHint) {
        if self.data.len() + additional > self.limit {
            self.flush();
        }
    }

    fn push_byte(&mut self, byte: u8) {
        self.data.push(byte);
    }

    fn push_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    fn copy_match(&mut self, length: usize, distance: usize) -> Result<()> {
        let history = self.len();
        copy_match_in(&mut self.data, length, distance, history)
    }
}

/// A single output buffer grown by estimated need.
#[derive(Debug)]
pub(crate) struct AdaptiveBuffer {
    data: Vec<u8>,
    /// Where the compressed stream starts in the input.
    input_start: usize,
    /// Length of the input.
    input_len: usize,
}

impl AdaptiveBuffer {
    pub(crate) fn new(capacity: usize, input_start: usize, input_len: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity.max(1)),
            input_start,
            input_len,
        }
    }

    /// Capacity to grow to.
    ///
    /// Output so far is extrapolated over the whole input, at least doubling
    /// and at most [`MAX_SMALL_GROWTH`] times for small buffers, doubling
    /// for large ones. The result never exceeds what the unread input can
    /// still produce: every symbol takes at least `min_code_length` bits and
    /// yields at most [`MAX_MATCH`] bytes.
    fn next_capacity(&self, hint: GrowthHint) -> usize {
        let current = self.data.capacity().max(1);
        let consumed = hint.input_position.saturating_sub(self.input_start).max(1);
        let total = self.input_len.saturating_sub(self.input_start);

        let remaining_bits = total
            .saturating_sub(consumed)
            .saturating_add(BIT_BUFFER_SLACK)
            .saturating_mul(8);
        let max_symbols = remaining_bits / hint.min_code_length.max(1) as usize;
        let ceiling = self
            .data
            .len()
            .saturating_add(max_symbols.saturating_mul(MAX_MATCH));

        let max_growth = if current < LARGE_BUFFER_THRESHOLD {
            MAX_SMALL_GROWTH
        } else {
            2
        };
        let ratio = (total / consumed + 1).clamp(2, max_growth);

        current.saturating_mul(ratio).min(ceiling)
    }

    pub(crate) fn finish(mut self, resize: bool) -> Vec<u8> {
        if resize {
            self.data.shrink_to_fit();
        }
        self.data
    }
}

impl OutputWindow for AdaptiveBuffer {
    fn reserve(&mut self, additional: usize, hint: GrowthHint) {
        let len = self.data.len();
        if self.data.capacity() - len >= additional {
            return;
        }
        let target = self.next_capacity(hint).max(len + additional);
        self.data.reserve_exact(target - len);
    }

    fn push_byte(&mut self, byte: u8) {
        self.data.push(byte);
    }

    fn push_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    fn copy_match(&mut self, length: usize, distance: usize) -> Result<()> {
        let history = self.data.len();
        copy_match_in(&mut self.data, length, distance, history)
    }
}
