#![allow(clippy::module_name_repetitions)]

//! One-shot Zstandard helpers sized for token segments.
//!
//! The interface mirrors the zlib helpers so the token-stream layer can
//! switch algorithms without reworking its plumbing. Each token segment is
//! compressed independently, so the bounded one-shot forms are sufficient.

use std::io;

use crate::zlib::CompressionLevel;

/// Compresses `input` into a new Zstandard frame.
///
/// # Errors
///
/// Propagates any error reported by the zstd backend.
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    zstd::stream::encode_all(input, zstd_level(level))
}

/// Decompresses a Zstandard frame into a new [`Vec`].
///
/// # Errors
///
/// Propagates any error reported by the zstd backend, including corrupt
/// frame diagnostics.
pub fn decompress_to_vec(input: &[u8]) -> io::Result<Vec<u8>> {
    zstd::stream::decode_all(input)
}

/// Maps the shared level ladder onto zstd's native range.
fn zstd_level(level: CompressionLevel) -> i32 {
    match level {
        CompressionLevel::None | CompressionLevel::Fast => 1,
        CompressionLevel::Default => zstd::DEFAULT_COMPRESSION_LEVEL,
        CompressionLevel::Best => 19,
        CompressionLevel::Precise(value) => i32::from(value.get()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_payload() {
        let payload = b"zstd round trip payload".repeat(16);
        let compressed = compress_to_vec(&payload, CompressionLevel::Default).expect("compress");
        let decompressed = decompress_to_vec(&compressed).expect("decompress");
        assert_eq!(decompressed, payload);
    }

    #[test]
    fn empty_input_round_trips() {
        let compressed = compress_to_vec(b"", CompressionLevel::Default).expect("compress");
        let decompressed = decompress_to_vec(&compressed).expect("decompress");
        assert!(decompressed.is_empty());
    }

    #[test]
    fn corrupt_frames_are_rejected() {
        assert!(decompress_to_vec(b"not a zstd frame").is_err());
    }

    #[test]
    fn all_shared_levels_round_trip() {
        let payload = b"shared level ladder".repeat(32);
        for level in [
            CompressionLevel::None,
            CompressionLevel::Fast,
            CompressionLevel::Default,
            CompressionLevel::Best,
        ] {
            let compressed = compress_to_vec(&payload, level).expect("compress");
            assert_eq!(decompress_to_vec(&compressed).expect("decompress"), payload);
        }
    }
}
