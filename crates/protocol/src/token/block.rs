//! Per-segment compressed token streams (zstd and lz4).
//!
//! Unlike the deflate variants, each data segment here is a self-contained
//! compressed block. The sender carves literal runs into bounded windows
//! and halves a window until its compressed form fits the segment limit;
//! the receiver decompresses one segment at a time with no cross-segment
//! state.

use std::io::{self, Read, Write};

use compress::CompressionLevel;

use super::{
    decode_token_flag, read_segment_len, write_segments, ReceivedToken, DEFLATED_DATA, END_FLAG,
    MAX_DATA_COUNT, CHUNK_SIZE, RunState,
};
use crate::wire::read_byte;

#[derive(Clone, Copy, Debug)]
pub(super) enum BlockCodec {
    #[cfg(feature = "zstd")]
    Zstd,
    #[cfg(feature = "lz4")]
    Lz4,
}

impl BlockCodec {
    fn compress(self, input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
        match self {
            #[cfg(feature = "zstd")]
            Self::Zstd => compress::zstd::compress_to_vec(input, level),
            #[cfg(feature = "lz4")]
            Self::Lz4 => {
                let _ = level;
                Ok(compress::lz4::compress_block(input))
            }
        }
    }

    fn decompress(self, input: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            #[cfg(feature = "zstd")]
            Self::Zstd => compress::zstd::decompress_to_vec(input),
            #[cfg(feature = "lz4")]
            Self::Lz4 => compress::lz4::decompress_block(input),
        }
    }
}

pub(super) struct BlockSender {
    runs: RunState,
    codec: BlockCodec,
    level: CompressionLevel,
}

impl BlockSender {
    pub(super) fn new(codec: BlockCodec, level: CompressionLevel) -> Self {
        Self {
            runs: RunState::default(),
            codec,
            level,
        }
    }

    pub(super) fn write_literal<W: Write>(&mut self, writer: &mut W, data: &[u8]) -> io::Result<()> {
        self.runs.flush(writer)?;
        let mut rest = data;
        while !rest.is_empty() {
            let mut window = rest.len().min(CHUNK_SIZE);
            loop {
                let compressed = self.codec.compress(&rest[..window], self.level)?;
                if compressed.len() <= MAX_DATA_COUNT {
                    write_segments(writer, &compressed)?;
                    rest = &rest[window..];
                    break;
                }
                window /= 2;
                if window == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "compressed output exceeds the segment bound for a one-byte window",
                    ));
                }
            }
        }
        Ok(())
    }

    pub(super) fn write_match<W: Write>(&mut self, writer: &mut W, block: i32) -> io::Result<()> {
        self.runs.push(writer, block)
    }

    pub(super) fn finish<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.runs.flush(writer)?;
        writer.write_all(&[END_FLAG])
    }
}

pub(super) struct BlockReceiver {
    codec: BlockCodec,
}

impl BlockReceiver {
    pub(super) fn new(codec: BlockCodec) -> Self {
        Self { codec }
    }

    pub(super) fn read_token<R: Read>(
        &mut self,
        reader: &mut R,
        rx_token: &mut i32,
        rx_run: &mut u32,
    ) -> io::Result<ReceivedToken> {
        let flag = read_byte(reader)?;

        if flag & 0xC0 == DEFLATED_DATA {
            let len = read_segment_len(reader, flag)?;
            let mut compressed = vec![0u8; len];
            reader.read_exact(&mut compressed)?;
            let output = self.codec.decompress(&compressed)?;
            return Ok(ReceivedToken::Literal(output));
        }

        if flag == END_FLAG {
            return Ok(ReceivedToken::End);
        }

        *rx_run = decode_token_flag(reader, flag, rx_token)?;
        Ok(ReceivedToken::Match(*rx_token))
    }
}

#[cfg(all(test, feature = "lz4"))]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn incompressible_windows_are_halved_until_they_fit() {
        let mut state = 0xdead_beefu32;
        let data: Vec<u8> = (0..CHUNK_SIZE)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            })
            .collect();

        let mut sender = BlockSender::new(BlockCodec::Lz4, CompressionLevel::Default);
        let mut wire = Vec::new();
        sender.write_literal(&mut wire, &data).expect("literal");
        sender.finish(&mut wire).expect("finish");

        let mut receiver = BlockReceiver::new(BlockCodec::Lz4);
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
        assert_eq!(literal, data);
    }
}
