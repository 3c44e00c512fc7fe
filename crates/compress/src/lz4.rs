#![allow(clippy::module_name_repetitions)]

//! One-shot LZ4 block helpers sized for token segments.
//!
//! Token segments are compressed as independent LZ4 blocks with the
//! uncompressed size prepended, so the receiver can size its output buffer
//! without trusting the wire. The sender halves its input window until the
//! compressed block fits the segment bound, so blocks stay small.

use std::io;

/// Compresses `input` into a new LZ4 block with the uncompressed size
/// prepended.
#[must_use]
pub fn compress_block(input: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress_prepend_size(input)
}

/// Decompresses a size-prepended LZ4 block into a new [`Vec`].
///
/// # Errors
///
/// Returns [`io::ErrorKind::InvalidData`] when the block is malformed.
pub fn decompress_block(input: &[u8]) -> io::Result<Vec<u8>> {
    lz4_flex::block::decompress_size_prepended(input)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}
