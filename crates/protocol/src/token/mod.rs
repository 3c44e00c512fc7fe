//! Token streams carrying delta instructions.
//!
//! The sender turns match/literal instructions into a byte stream; the
//! receiver drives a small state machine that re-emits the same events.
//! Two wire families exist:
//!
//! - **Simple** (no compression): each literal is an `int32` length
//!   followed by the bytes (split at [`CHUNK_SIZE`]), each match is the
//!   `int32` `-(block + 1)`, and a zero `int32` ends the stream.
//! - **Compressed** (zlib, zlibx, zstd, lz4): one flag byte introduces
//!   either the end marker, a token or token run (relative or absolute),
//!   or a compressed-data segment of at most [`MAX_DATA_COUNT`] bytes
//!   whose length is split across the flag's low 6 bits and one trailing
//!   byte. The deflate variants share one compressor across the stream
//!   and strip the trailing `00 00 FF FF` sync-flush marker on send,
//!   re-injecting it on receive when a literal ends; zstd and lz4
//!   compress each segment independently, lz4 halving its input window
//!   until the compressed output fits.
//!
//! After the end marker the sender may append a whole-file strong digest;
//! that exchange belongs to the caller, not the token layer.

mod block;
mod deflate;
mod simple;

use std::io::{self, Read, Write};

use compress::{CompressionAlgorithm, CompressionLevel};

use crate::wire::{read_byte, read_int, write_byte, write_int};

/// Literal chunk bound shared by every token-stream variant.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Largest compressed-data segment a flag byte can announce.
pub const MAX_DATA_COUNT: usize = 16383;

pub(crate) const END_FLAG: u8 = 0x00;
pub(crate) const TOKEN_LONG: u8 = 0x20;
pub(crate) const TOKENRUN_LONG: u8 = 0x21;
pub(crate) const DEFLATED_DATA: u8 = 0x40;
pub(crate) const TOKEN_REL: u8 = 0x80;
pub(crate) const TOKENRUN_REL: u8 = 0xC0;

/// Longest run of consecutive match tokens a single run frame can carry.
pub(crate) const MAX_RUN_LEN: i32 = 65536;

/// One decoded token-stream event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReceivedToken {
    /// Literal bytes to append to the output.
    Literal(Vec<u8>),
    /// A basis block to copy, by block index.
    Match(i32),
    /// End of the token stream.
    End,
}

/// Run-length accumulator shared by the compressed senders.
///
/// Consecutive match tokens collapse into one run frame; the frame's token
/// field is encoded relative to the previous frame's final token when the
/// distance fits six bits.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    last_token: i32,
    pending: Option<(i32, i32)>,
}

impl RunState {
    pub(crate) fn push<W: Write>(&mut self, writer: &mut W, token: i32) -> io::Result<()> {
        if let Some((first, last)) = self.pending {
            if token == last + 1 && token < first + MAX_RUN_LEN {
                self.pending = Some((first, token));
                return Ok(());
            }
            self.flush(writer)?;
        }
        self.pending = Some((token, token));
        Ok(())
    }

    pub(crate) fn flush<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        let Some((first, last)) = self.pending.take() else {
            return Ok(());
        };
        let run = last - first;
        let rel = first - self.last_token;
        if (0..=63).contains(&rel) {
            let base = if run == 0 { TOKEN_REL } else { TOKENRUN_REL };
            write_byte(writer, base | rel as u8)?;
        } else {
            write_byte(writer, if run == 0 { TOKEN_LONG } else { TOKENRUN_LONG })?;
            write_int(writer, first)?;
        }
        if run != 0 {
            write_byte(writer, (run & 0xFF) as u8)?;
            write_byte(writer, (run >> 8) as u8)?;
        }
        self.last_token = last;
        Ok(())
    }
}

/// Reads one flag byte and decodes a token or run frame, updating the
/// receiver's token cursor. Returns the run length that follows the first
/// token (zero for a single token).
pub(crate) fn decode_token_flag<R: Read>(
    reader: &mut R,
    flag: u8,
    rx_token: &mut i32,
) -> io::Result<u32> {
    let run = if flag & TOKEN_REL != 0 {
        *rx_token += i32::from(flag & 0x3F);
        flag & 0x40 != 0
    } else {
        if flag & !0x01 != TOKEN_LONG {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown token flag byte {flag:#04x}"),
            ));
        }
        *rx_token = read_int(reader)?;
        flag & 0x01 != 0
    };
    if !run {
        return Ok(0);
    }
    let low = u32::from(read_byte(reader)?);
    let high = u32::from(read_byte(reader)?);
    Ok(low | (high << 8))
}

/// Reads a compressed-data segment length from its flag byte.
pub(crate) fn read_segment_len<R: Read>(reader: &mut R, flag: u8) -> io::Result<usize> {
    let high = usize::from(flag & 0x3F);
    let low = usize::from(read_byte(reader)?);
    Ok((high << 8) | low)
}

/// Writes `payload` as compressed-data segments of at most
/// [`MAX_DATA_COUNT`] bytes.
pub(crate) fn write_segments<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    for segment in payload.chunks(MAX_DATA_COUNT) {
        write_byte(writer, DEFLATED_DATA | (segment.len() >> 8) as u8)?;
        write_byte(writer, (segment.len() & 0xFF) as u8)?;
        writer.write_all(segment)?;
    }
    Ok(())
}

enum WriterKind {
    Simple,
    Deflate(deflate::DeflateSender),
    Block(block::BlockSender),
}

/// Token-stream encoder for one file transfer.
pub struct TokenWriter {
    inner: WriterKind,
}

impl TokenWriter {
    /// Creates a writer for the negotiated compression algorithm.
    #[must_use]
    pub fn new(algorithm: CompressionAlgorithm, level: CompressionLevel) -> Self {
        let inner = match algorithm {
            CompressionAlgorithm::None => WriterKind::Simple,
            CompressionAlgorithm::Zlib | CompressionAlgorithm::ZlibX => {
                WriterKind::Deflate(deflate::DeflateSender::new(level))
            }
            #[cfg(feature = "zstd")]
            CompressionAlgorithm::Zstd => {
                WriterKind::Block(block::BlockSender::new(block::BlockCodec::Zstd, level))
            }
            #[cfg(feature = "lz4")]
            CompressionAlgorithm::Lz4 => {
                WriterKind::Block(block::BlockSender::new(block::BlockCodec::Lz4, level))
            }
        };
        Self { inner }
    }

    /// Emits a literal run of new-file bytes.
    ///
    /// # Errors
    ///
    /// Propagates writer and compressor failures.
    pub fn write_literal<W: Write>(&mut self, writer: &mut W, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        match &mut self.inner {
            WriterKind::Simple => simple::write_literal(writer, data),
            WriterKind::Deflate(sender) => sender.write_literal(writer, data),
            WriterKind::Block(sender) => sender.write_literal(writer, data),
        }
    }

    /// Emits a match of the given basis block index.
    ///
    /// # Errors
    ///
    /// Propagates writer failures.
    pub fn write_match<W: Write>(&mut self, writer: &mut W, block: i32) -> io::Result<()> {
        match &mut self.inner {
            WriterKind::Simple => simple::write_match(writer, block),
            WriterKind::Deflate(sender) => sender.write_match(writer, block),
            WriterKind::Block(sender) => sender.write_match(writer, block),
        }
    }

    /// Terminates the token stream.
    ///
    /// # Errors
    ///
    /// Propagates writer and compressor failures.
    pub fn finish<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        match &mut self.inner {
            WriterKind::Simple => simple::write_end(writer),
            WriterKind::Deflate(sender) => sender.finish(writer),
            WriterKind::Block(sender) => sender.finish(writer),
        }
    }
}

enum ReaderKind {
    Simple,
    Deflate(deflate::DeflateReceiver),
    Block(block::BlockReceiver),
}

/// Token-stream decoder for one file transfer.
pub struct TokenReader {
    inner: ReaderKind,
    rx_token: i32,
    rx_run: u32,
    finished: bool,
}

impl TokenReader {
    /// Creates a reader for the negotiated compression algorithm.
    #[must_use]
    pub fn new(algorithm: CompressionAlgorithm) -> Self {
        let inner = match algorithm {
            CompressionAlgorithm::None => ReaderKind::Simple,
            CompressionAlgorithm::Zlib | CompressionAlgorithm::ZlibX => {
                ReaderKind::Deflate(deflate::DeflateReceiver::new())
            }
            #[cfg(feature = "zstd")]
            CompressionAlgorithm::Zstd => ReaderKind::Block(block::BlockReceiver::new(
                block::BlockCodec::Zstd,
            )),
            #[cfg(feature = "lz4")]
            CompressionAlgorithm::Lz4 => {
                ReaderKind::Block(block::BlockReceiver::new(block::BlockCodec::Lz4))
            }
        };
        Self {
            inner,
            rx_token: 0,
            rx_run: 0,
            finished: false,
        }
    }

    /// Decodes the next token-stream event.
    ///
    /// # Errors
    ///
    /// Malformed streams surface as [`io::ErrorKind::InvalidData`];
    /// transport failures propagate. Reading past [`ReceivedToken::End`]
    /// keeps returning `End`.
    pub fn read_token<R: Read>(&mut self, reader: &mut R) -> io::Result<ReceivedToken> {
        if self.finished {
            return Ok(ReceivedToken::End);
        }
        if self.rx_run > 0 {
            self.rx_token += 1;
            self.rx_run -= 1;
            return Ok(ReceivedToken::Match(self.rx_token));
        }

        let event = match &mut self.inner {
            ReaderKind::Simple => simple::read_token(reader)?,
            ReaderKind::Deflate(receiver) => {
                receiver.read_token(reader, &mut self.rx_token, &mut self.rx_run)?
            }
            ReaderKind::Block(receiver) => {
                receiver.read_token(reader, &mut self.rx_token, &mut self.rx_run)?
            }
        };
        if event == ReceivedToken::End {
            self.finished = true;
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn algorithms() -> Vec<CompressionAlgorithm> {
        let mut list = vec![
            CompressionAlgorithm::None,
            CompressionAlgorithm::Zlib,
            CompressionAlgorithm::ZlibX,
        ];
        #[cfg(feature = "zstd")]
        list.push(CompressionAlgorithm::Zstd);
        #[cfg(feature = "lz4")]
        list.push(CompressionAlgorithm::Lz4);
        list
    }

    /// Encodes the script and decodes it back, returning the events with
    /// adjacent literals merged for comparison.
    fn round_trip(
        algorithm: CompressionAlgorithm,
        script: &[ReceivedToken],
    ) -> Vec<ReceivedToken> {
        let mut writer = TokenWriter::new(algorithm, CompressionLevel::Default);
        let mut wire = Vec::new();
        for event in script {
            match event {
                ReceivedToken::Literal(data) => {
                    writer.write_literal(&mut wire, data).expect("literal")
                }
                ReceivedToken::Match(block) => {
                    writer.write_match(&mut wire, *block).expect("match")
                }
                ReceivedToken::End => {}
            }
        }
        writer.finish(&mut wire).expect("finish");

        let mut reader = TokenReader::new(algorithm);
        let mut cursor = Cursor::new(wire);
        let mut events: Vec<ReceivedToken> = Vec::new();
        loop {
            match reader.read_token(&mut cursor).expect("read token") {
                ReceivedToken::End => break,
                ReceivedToken::Literal(chunk) => {
                    if let Some(ReceivedToken::Literal(previous)) = events.last_mut() {
                        previous.extend_from_slice(&chunk);
                    } else {
                        events.push(ReceivedToken::Literal(chunk));
                    }
                }
                matched => events.push(matched),
            }
        }
        events
    }

    /// Merges adjacent literals of the input script the same way the
    /// reader side reports them.
    fn normalized(script: &[ReceivedToken]) -> Vec<ReceivedToken> {
        let mut out: Vec<ReceivedToken> = Vec::new();
        for event in script {
            match (out.last_mut(), event) {
                (Some(ReceivedToken::Literal(previous)), ReceivedToken::Literal(data)) => {
                    previous.extend_from_slice(data);
                }
                (_, event) => out.push(event.clone()),
            }
        }
        out
    }

    #[test]
    fn mixed_scripts_round_trip_for_every_algorithm() {
        let script = vec![
            ReceivedToken::Literal(b"hello world, this is literal data".to_vec()),
            ReceivedToken::Match(0),
            ReceivedToken::Match(1),
            ReceivedToken::Match(2),
            ReceivedToken::Literal(vec![0xAB; 70_000]),
            ReceivedToken::Match(9),
            ReceivedToken::Match(4),
            ReceivedToken::Literal(b"tail".to_vec()),
        ];
        for algorithm in algorithms() {
            assert_eq!(
                round_trip(algorithm, &script),
                normalized(&script),
                "algorithm {algorithm}"
            );
        }
    }

    #[test]
    fn long_match_runs_round_trip() {
        let mut script = Vec::new();
        for block in 0..70_000 {
            script.push(ReceivedToken::Match(block));
        }
        for algorithm in algorithms() {
            assert_eq!(
                round_trip(algorithm, &script),
                normalized(&script),
                "algorithm {algorithm}"
            );
        }
    }

    #[test]
    fn backward_jumps_use_the_absolute_form() {
        let script = vec![
            ReceivedToken::Match(100),
            ReceivedToken::Match(3),
            ReceivedToken::Match(2),
            ReceivedToken::Match(500_000),
        ];
        for algorithm in algorithms() {
            assert_eq!(
                round_trip(algorithm, &script),
                normalized(&script),
                "algorithm {algorithm}"
            );
        }
    }

    #[test]
    fn empty_scripts_round_trip() {
        for algorithm in algorithms() {
            assert_eq!(round_trip(algorithm, &[]), Vec::<ReceivedToken>::new());
        }
    }

    #[test]
    fn literal_only_scripts_round_trip() {
        let script = vec![ReceivedToken::Literal(
            b"no matches at all in this stream".repeat(1000),
        )];
        for algorithm in algorithms() {
            assert_eq!(
                round_trip(algorithm, &script),
                normalized(&script),
                "algorithm {algorithm}"
            );
        }
    }

    #[test]
    fn incompressible_literals_round_trip() {
        // Pseudo-random bytes defeat the compressors, forcing the segment
        // bound (and the lz4 window halving) to do their work.
        let mut state = 0x1234_5678u32;
        let data: Vec<u8> = (0..100_000)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            })
            .collect();
        let script = vec![ReceivedToken::Literal(data)];
        for algorithm in algorithms() {
            assert_eq!(
                round_trip(algorithm, &script),
                normalized(&script),
                "algorithm {algorithm}"
            );
        }
    }

    #[test]
    fn reading_past_end_keeps_returning_end() {
        let mut writer = TokenWriter::new(CompressionAlgorithm::None, CompressionLevel::Default);
        let mut wire = Vec::new();
        writer.finish(&mut wire).expect("finish");

        let mut reader = TokenReader::new(CompressionAlgorithm::None);
        let mut cursor = Cursor::new(wire);
        assert_eq!(reader.read_token(&mut cursor).expect("end"), ReceivedToken::End);
        assert_eq!(reader.read_token(&mut cursor).expect("end"), ReceivedToken::End);
    }

    #[test]
    fn simple_mode_rejects_oversized_literal_lengths() {
        let mut wire = Vec::new();
        write_int(&mut wire, (CHUNK_SIZE + 1) as i32).expect("length");
        let mut reader = TokenReader::new(CompressionAlgorithm::None);
        let err = reader.read_token(&mut Cursor::new(wire)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn compressed_mode_rejects_unknown_flags() {
        let mut reader = TokenReader::new(CompressionAlgorithm::Zlib);
        let err = reader
            .read_token(&mut Cursor::new(vec![0x1Fu8]))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
