//! Stateful deflate token stream (zlib and zlibx).
//!
//! One raw-deflate compressor persists across the whole stream. Literal
//! bytes are deflated as they arrive; when a token or the end marker
//! interrupts a literal run, the stream is sync-flushed and the trailing
//! `00 00 FF FF` empty-block marker is stripped before the remaining
//! output goes out as data segments. The receiver mirrors this with one
//! persistent inflater, re-injecting the marker when a literal run ends so
//! the inflate state stays aligned with the sender.

use std::io::{self, Read, Write};

use compress::CompressionLevel;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress};

use super::{
    decode_token_flag, read_segment_len, write_segments, ReceivedToken, DEFLATED_DATA, END_FLAG,
    MAX_DATA_COUNT, RunState,
};
use crate::wire::read_byte;

const SYNC_MARKER: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

fn compress_error(err: impl std::error::Error + Send + Sync + 'static) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}

/// Drives the compressor over `input`, appending output to `out`.
fn drive_compress(
    compressor: &mut Compress,
    mut input: &[u8],
    out: &mut Vec<u8>,
    flush: FlushCompress,
) -> io::Result<()> {
    loop {
        if out.capacity() == out.len() {
            out.reserve(4096);
        }
        let before_in = compressor.total_in();
        let before_out = compressor.total_out();
        compressor
            .compress_vec(input, out, flush)
            .map_err(compress_error)?;
        let consumed = (compressor.total_in() - before_in) as usize;
        input = &input[consumed..];
        let produced = compressor.total_out() - before_out;

        if input.is_empty() {
            match flush {
                FlushCompress::None => return Ok(()),
                _ if produced == 0 => return Ok(()),
                _ => {}
            }
        }
    }
}

pub(super) struct DeflateSender {
    runs: RunState,
    compressor: Compress,
    pending: Vec<u8>,
    in_literal: bool,
}

impl DeflateSender {
    pub(super) fn new(level: CompressionLevel) -> Self {
        Self {
            runs: RunState::default(),
            compressor: Compress::new(Compression::from(level), false),
            pending: Vec::new(),
            in_literal: false,
        }
    }

    pub(super) fn write_literal<W: Write>(&mut self, writer: &mut W, data: &[u8]) -> io::Result<()> {
        self.runs.flush(writer)?;
        drive_compress(
            &mut self.compressor,
            data,
            &mut self.pending,
            FlushCompress::None,
        )?;
        self.in_literal = true;
        // Emit every full segment now so an all-literal stream never
        // accumulates unbounded output; the tail stays pending because the
        // sync marker must be stripped from it later.
        let full = self.pending.len() - self.pending.len() % MAX_DATA_COUNT;
        if full > 0 && self.pending.len() > full {
            write_segments(writer, &self.pending[..full])?;
            self.pending.drain(..full);
        }
        Ok(())
    }

    pub(super) fn write_match<W: Write>(&mut self, writer: &mut W, block: i32) -> io::Result<()> {
        self.end_literal(writer)?;
        self.runs.push(writer, block)
    }

    pub(super) fn finish<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.end_literal(writer)?;
        self.runs.flush(writer)?;
        writer.write_all(&[END_FLAG])
    }

    fn end_literal<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        if !self.in_literal {
            return Ok(());
        }
        self.in_literal = false;
        drive_compress(
            &mut self.compressor,
            &[],
            &mut self.pending,
            FlushCompress::Sync,
        )?;
        if !self.pending.ends_with(&SYNC_MARKER) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "deflate sync flush did not end with the empty-block marker",
            ));
        }
        let stripped = self.pending.len() - SYNC_MARKER.len();
        write_segments(writer, &self.pending[..stripped])?;
        self.pending.clear();
        Ok(())
    }
}

/// Drives the inflater over `input`, appending output to `out`.
fn drive_decompress(
    decompressor: &mut Decompress,
    mut input: &[u8],
    out: &mut Vec<u8>,
) -> io::Result<()> {
    loop {
        if out.capacity() == out.len() {
            out.reserve(4096);
        }
        let before_in = decompressor.total_in();
        let before_out = decompressor.total_out();
        decompressor
            .decompress_vec(input, out, FlushDecompress::None)
            .map_err(compress_error)?;
        let consumed = (decompressor.total_in() - before_in) as usize;
        input = &input[consumed..];
        let produced = decompressor.total_out() - before_out;

        if input.is_empty() && produced == 0 {
            return Ok(());
        }
    }
}

pub(super) struct DeflateReceiver {
    decompressor: Decompress,
    saved_flag: Option<u8>,
    in_literal: bool,
}

impl DeflateReceiver {
    pub(super) fn new() -> Self {
        Self {
            decompressor: Decompress::new(false),
            saved_flag: None,
            in_literal: false,
        }
    }

    pub(super) fn read_token<R: Read>(
        &mut self,
        reader: &mut R,
        rx_token: &mut i32,
        rx_run: &mut u32,
    ) -> io::Result<ReceivedToken> {
        loop {
            let flag = match self.saved_flag.take() {
                Some(flag) => flag,
                None => read_byte(reader)?,
            };

            if flag & 0xC0 == DEFLATED_DATA {
                let len = read_segment_len(reader, flag)?;
                let mut compressed = vec![0u8; len];
                reader.read_exact(&mut compressed)?;
                let mut output = Vec::new();
                drive_decompress(&mut self.decompressor, &compressed, &mut output)?;
                self.in_literal = true;
                if output.is_empty() {
                    continue;
                }
                return Ok(ReceivedToken::Literal(output));
            }

            if self.in_literal {
                // The sender stripped the sync marker when this literal
                // run ended; feed it back before acting on the flag.
                self.in_literal = false;
                self.saved_flag = Some(flag);
                let mut output = Vec::new();
                drive_decompress(&mut self.decompressor, &SYNC_MARKER, &mut output)?;
                if !output.is_empty() {
                    return Ok(ReceivedToken::Literal(output));
                }
                continue;
            }

            if flag == END_FLAG {
                return Ok(ReceivedToken::End);
            }

            *rx_run = decode_token_flag(reader, flag, rx_token)?;
            return Ok(ReceivedToken::Match(*rx_token));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn literal_then_token_round_trips_through_the_sync_marker() {
        let payload = b"compressible compressible compressible".repeat(50);
        let mut sender = DeflateSender::new(CompressionLevel::Default);
        let mut wire = Vec::new();
        sender.write_literal(&mut wire, &payload).expect("literal");
        sender.write_match(&mut wire, 3).expect("match");
        sender.finish(&mut wire).expect("finish");

        let mut receiver = DeflateReceiver::new();
        let mut cursor = Cursor::new(wire);
        let mut rx_token = 0;
        let mut rx_run = 0;
        let mut literal = Vec::new();
        loop {
            match receiver
                .read_token(&mut cursor, &mut rx_token, &mut rx_run)
                .expect("token")
            {
                ReceivedToken::Literal(chunk) => literal.extend_from_slice(&chunk),
                ReceivedToken::Match(block) => {
                    assert_eq!(block, 3);
                    break;
                }
                ReceivedToken::End => panic!("unexpected end"),
            }
        }
        assert_eq!(literal, payload);
    }

    #[test]
    fn consecutive_literals_share_one_deflate_run() {
        let mut sender = DeflateSender::new(CompressionLevel::Default);
        let mut wire = Vec::new();
        sender.write_literal(&mut wire, b"first part ").expect("literal");
        sender.write_literal(&mut wire, b"second part").expect("literal");
        sender.finish(&mut wire).expect("finish");

        let mut receiver = DeflateReceiver::new();
        let mut cursor = Cursor::new(wire);
        let mut rx_token = 0;
        let mut rx_run = 0;
        let mut literal = Vec::new();
        loop {
            match receiver
                .read_token(&mut cursor, &mut rx_token, &mut rx_run)
                .expect("token")
            {
                ReceivedToken::Literal(chunk) => literal.extend_from_slice(&chunk),
                ReceivedToken::End => break,
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(literal, b"first part second part");
    }
}
