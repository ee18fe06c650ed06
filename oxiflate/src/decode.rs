//! Decode steps shared by the one-shot and streaming decoders.
//!
//! Each step reads one self-contained unit (a block header, a stored-block
//! length pair, a dynamic code description, one literal/length symbol with
//! its distance) and either completes or fails without side effects. A
//! [`ShortRead`] mode decides what running out of input means: a fatal
//! [`OxiflateError::UnexpectedEndOfInput`] for the one-shot decoder, or a
//! rolled-back [`Progress::Starved`] for the streaming one.

use crate::huffman::HuffmanTable;
use crate::options::CompressionType;
use crate::tables::{
    CODE_LENGTH_ORDER, CODELEN_ALPHABET_SIZE, DISTANCE_ALPHABET_SIZE, DISTANCE_EXTRA_BITS,
    END_OF_BLOCK, LENGTH_EXTRA_BITS, LITLEN_ALPHABET_SIZE, MAX_CODE_LENGTH,
    MAX_CODELEN_CODE_LENGTH, MAX_MATCH, decode_distance, decode_length, fixed_distance_table,
    fixed_litlen_table,
};
use oxiflate_core::bitstream::BitReader;
use oxiflate_core::error::{OxiflateError, Result};

/// What a decode step does when the input runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShortRead {
    /// The whole input is present; running out is an error.
    Fail,
    /// More input may follow; roll back and report starvation.
    Suspend,
}

/// Outcome of a decode step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Progress<T> {
    /// The step completed.
    Ready(T),
    /// The step needs more input; the reader was rolled back.
    Starved,
}

impl ShortRead {
    /// Run `step`, rolling the reader back if it runs out of input.
    pub(crate) fn attempt<'a, T>(
        self,
        reader: &mut BitReader<'a>,
        step: impl FnOnce(&mut BitReader<'a>) -> Result<T>,
    ) -> Result<Progress<T>> {
        let snapshot = reader.cursor();
        match step(reader) {
            Ok(value) => Ok(Progress::Ready(value)),
            Err(err) if err.is_input_exhausted() => {
                reader.restore(snapshot);
                match self {
                    Self::Fail => Err(OxiflateError::unexpected_end(reader.bit_position())),
                    Self::Suspend => Ok(Progress::Starved),
                }
            }
            Err(err) => Err(err),
        }
    }
}

/// Run `step` against input that is known to be complete.
pub(crate) fn complete<'a, T>(
    reader: &mut BitReader<'a>,
    step: impl FnOnce(&mut BitReader<'a>) -> Result<T>,
) -> Result<T> {
    match ShortRead::Fail.attempt(reader, step)? {
        Progress::Ready(value) => Ok(value),
        Progress::Starved => Err(OxiflateError::unexpected_end(reader.bit_position())),
    }
}

/// Hints for output buffers that size their growth from decode progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GrowthHint {
    /// Byte position of the reader in its input.
    pub input_position: usize,
    /// Shortest literal/length code of the current block.
    pub min_code_length: u8,
}

/// Destination of decoded bytes that also serves as the back-reference
/// history.
pub(crate) trait OutputWindow {
    /// Make room for at least `additional` more bytes.
    fn reserve(&mut self, additional: usize, hint: GrowthHint);

    /// Append one byte.
    fn push_byte(&mut self, byte: u8);

    /// Append raw bytes.
    fn push_slice(&mut self, bytes: &[u8]);

    /// Append `length` bytes copied from `distance` bytes back.
    ///
    /// Fails with [`OxiflateError::InvalidDistance`] if the history is
    /// shorter than `distance`.
    fn copy_match(&mut self, length: usize, distance: usize) -> Result<()>;
}

/// Copy a back-reference inside a growable buffer.
///
/// Overlapping copies (`distance < length`) repeat the last `distance`
/// bytes.
pub(crate) fn copy_match_in(
    data: &mut Vec<u8>,
    length: usize,
    distance: usize,
    history_size: usize,
) -> Result<()> {
    if distance == 0 || distance > data.len() {
        return Err(OxiflateError::invalid_distance(distance, history_size));
    }

    let start = data.len() - distance;
    if distance >= length {
        data.extend_from_within(start..start + length);
    } else {
        data.reserve(length);
        for i in 0..length {
            let byte = data[start + i];
            data.push(byte);
        }
    }
    Ok(())
}

impl OutputWindow for Vec<u8> {
    fn reserve(&mut self, additional: usize, _hint: GrowthHint) {
        Vec::reserve(self, additional);
    }

    fn push_byte(&mut self, byte: u8) {
        self.push(byte);
    }

    fn push_slice(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    fn copy_match(&mut self, length: usize, distance: usize) -> Result<()> {
        let history = self.len();
        copy_match_in(self, length, distance, history)
    }
}

/// A parsed block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockHeader {
    /// BFINAL bit.
    pub is_final: bool,
    /// BTYPE.
    pub kind: CompressionType,
}

/// Read BFINAL and BTYPE.
pub(crate) fn read_block_header(reader: &mut BitReader<'_>) -> Result<BlockHeader> {
    let bits = reader.read_bits(3)?;
    let btype = (bits >> 1) as u8;
    let kind = match btype {
        0 => CompressionType::Stored,
        1 => CompressionType::Fixed,
        2 => CompressionType::Dynamic,
        _ => return Err(OxiflateError::invalid_block_type(btype)),
    };
    Ok(BlockHeader {
        is_final: bits & 1 != 0,
        kind,
    })
}

/// Skip to the byte boundary and read a stored block's LEN/NLEN pair.
///
/// Returns LEN.
pub(crate) fn read_stored_header(reader: &mut BitReader<'_>) -> Result<usize> {
    reader.align_to_byte();
    let offset = reader.byte_position() as u64;
    let len = reader.read_bits(16)?;
    let nlen = reader.read_bits(16)?;

    if len != !nlen & 0xFFFF {
        return Err(OxiflateError::corrupt_header(
            offset,
            format!("stored block length {:#06x} does not match complement {:#06x}", len, nlen),
        ));
    }
    Ok(len as usize)
}

/// Huffman tables of a compressed block.
#[derive(Debug, Clone)]
pub(crate) enum BlockCodes {
    /// The fixed codes.
    Fixed,
    /// Codes transmitted in the block header.
    Dynamic {
        litlen: HuffmanTable,
        distance: HuffmanTable,
    },
}

impl BlockCodes {
    pub(crate) fn litlen(&self) -> &HuffmanTable {
        match self {
            Self::Fixed => fixed_litlen_table(),
            Self::Dynamic { litlen, .. } => litlen,
        }
    }

    pub(crate) fn distance(&self) -> &HuffmanTable {
        match self {
            Self::Fixed => fixed_distance_table(),
            Self::Dynamic { distance, .. } => distance,
        }
    }
}

/// Read the code description of a dynamic block (RFC 1951 Section 3.2.7).
pub(crate) fn read_dynamic_codes(reader: &mut BitReader<'_>) -> Result<BlockCodes> {
    let offset = reader.byte_position() as u64;
    let hlit = reader.read_bits(5)? as usize + 257;
    let hdist = reader.read_bits(5)? as usize + 1;
    let hclen = reader.read_bits(4)? as usize + 4;

    if hlit > LITLEN_ALPHABET_SIZE || hdist > DISTANCE_ALPHABET_SIZE {
        return Err(OxiflateError::corrupt_header(
            offset,
            format!("too many length or distance codes: hlit={} hdist={}", hlit, hdist),
        ));
    }

    let mut codelen_lengths = [0u8; CODELEN_ALPHABET_SIZE];
    for &symbol in &CODE_LENGTH_ORDER[..hclen] {
        codelen_lengths[symbol] = reader.read_bits(3)? as u8;
    }
    let codelen_table = HuffmanTable::from_lengths(&codelen_lengths, MAX_CODELEN_CODE_LENGTH)?;

    let total = hlit + hdist;
    let mut lengths = vec![0u8; total];
    let mut filled = 0;
    while filled < total {
        let symbol = codelen_table.decode(reader)?;
        let (value, repeat) = match symbol {
            0..=15 => (symbol as u8, 1),
            16 => {
                let previous = match filled.checked_sub(1) {
                    Some(index) => lengths[index],
                    None => return Err(OxiflateError::invalid_code_length_symbol(symbol)),
                };
                (previous, 3 + reader.read_bits(2)? as usize)
            }
            17 => (0, 3 + reader.read_bits(3)? as usize),
            18 => (0, 11 + reader.read_bits(7)? as usize),
            _ => return Err(OxiflateError::invalid_code_length_symbol(symbol)),
        };

        if filled + repeat > total {
            return Err(OxiflateError::invalid_code_length_symbol(symbol));
        }
        lengths[filled..filled + repeat].fill(value);
        filled += repeat;
    }

    if lengths[END_OF_BLOCK as usize] == 0 {
        return Err(OxiflateError::corrupt_header(
            offset,
            "missing end-of-block code",
        ));
    }

    let litlen = HuffmanTable::from_lengths(&lengths[..hlit], MAX_CODE_LENGTH)?;
    let distance = HuffmanTable::from_lengths(&lengths[hlit..], MAX_CODE_LENGTH)?;

    log::trace!(
        "oxiflate::decode: dynamic codes hlit={} hdist={} hclen={}",
        hlit,
        hdist,
        hclen
    );
    Ok(BlockCodes::Dynamic { litlen, distance })
}

/// One decoded literal/length symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symbol {
    Literal(u8),
    Match { length: usize, distance: usize },
    EndOfBlock,
}

fn read_symbol(reader: &mut BitReader<'_>, codes: &BlockCodes) -> Result<Symbol> {
    let symbol = codes.litlen().decode(reader)?;
    match symbol {
        0..=255 => Ok(Symbol::Literal(symbol as u8)),
        END_OF_BLOCK => Ok(Symbol::EndOfBlock),
        257..=285 => {
            let extra_bits = LENGTH_EXTRA_BITS[(symbol - 257) as usize];
            let length = decode_length(symbol, reader.read_bits(extra_bits as u32)?);

            let dist_symbol = codes.distance().decode(reader)?;
            if dist_symbol as usize >= DISTANCE_EXTRA_BITS.len() {
                return Err(OxiflateError::invalid_symbol(dist_symbol));
            }
            let extra_bits = DISTANCE_EXTRA_BITS[dist_symbol as usize];
            let distance = decode_distance(dist_symbol, reader.read_bits(extra_bits as u32)?);
            Ok(Symbol::Match { length, distance })
        }
        _ => Err(OxiflateError::invalid_symbol(symbol)),
    }
}

/// Decode symbols of a compressed block into `out` until end-of-block.
///
/// With [`ShortRead::Suspend`] every symbol that was fully read has been
/// written when [`Progress::Starved`] is returned, and the reader sits at
/// the start of the first unread symbol.
pub(crate) fn decode_symbols<W: OutputWindow + ?Sized>(
    mode: ShortRead,
    reader: &mut BitReader<'_>,
    codes: &BlockCodes,
    out: &mut W,
) -> Result<Progress<()>> {
    let min_code_length = codes.litlen().min_length();
    loop {
        out.reserve(
            MAX_MATCH,
            GrowthHint {
                input_position: reader.byte_position(),
                min_code_length,
            },
        );

        match mode.attempt(reader, |r| read_symbol(r, codes))? {
            Progress::Starved => return Ok(Progress::Starved),
            Progress::Ready(Symbol::EndOfBlock) => return Ok(Progress::Ready(())),
            Progress::Ready(Symbol::Literal(byte)) => out.push_byte(byte),
            Progress::Ready(Symbol::Match { length, distance }) => {
                out.copy_match(length, distance)?
            }
        }
    }
}
