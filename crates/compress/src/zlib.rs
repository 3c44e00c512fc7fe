#![allow(clippy::module_name_repetitions)]

//! Raw deflate helpers.
//!
//! All output is bare DEFLATE with no zlib header or Adler-32 trailer,
//! matching upstream rsync's `deflateInit2()` with negative window bits.
//! The token stream's stateful deflate framing (sync-flush marker handling)
//! lives in the protocol layer; these helpers cover one-shot needs and the
//! level ladder shared by every backend.

use std::io::{self, Read, Write};
use std::num::NonZeroU8;

use thiserror::Error;

use flate2::{
    Compression,
    read::DeflateDecoder,
    write::DeflateEncoder,
};

/// Compression levels recognised by the codecs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionLevel {
    /// No compression (level 0) - data is stored without deflation.
    None,
    /// Favour speed over compression ratio.
    Fast,
    /// Use the backend's default balance between speed and ratio.
    Default,
    /// Favour the best possible compression ratio.
    Best,
    /// Use an explicit zlib-style level in the range `1..=9`.
    Precise(NonZeroU8),
}

impl CompressionLevel {
    /// Creates a [`CompressionLevel`] from an explicit numeric level.
    ///
    /// Level 0 maps to [`CompressionLevel::None`]; levels 1-9 map to
    /// [`CompressionLevel::Precise`].
    ///
    /// # Errors
    ///
    /// Returns [`CompressionLevelError`] when `level` falls outside the
    /// inclusive range `0..=9`.
    pub fn from_numeric(level: u32) -> Result<Self, CompressionLevelError> {
        if level > 9 {
            return Err(CompressionLevelError::new(level));
        }
        if level == 0 {
            return Ok(Self::None);
        }
        let as_u8 = u8::try_from(level).map_err(|_| CompressionLevelError::new(level))?;
        let precise = NonZeroU8::new(as_u8).ok_or_else(|| CompressionLevelError::new(level))?;
        Ok(Self::Precise(precise))
    }

    /// Returns the numeric zlib-style level.
    #[must_use]
    pub const fn as_numeric(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Fast => 1,
            Self::Default => 6,
            Self::Best => 9,
            Self::Precise(value) => value.get() as u32,
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::Default
    }
}

impl From<CompressionLevel> for Compression {
    fn from(level: CompressionLevel) -> Self {
        match level {
            CompressionLevel::None => Compression::none(),
            CompressionLevel::Fast => Compression::fast(),
            CompressionLevel::Default => Compression::default(),
            CompressionLevel::Best => Compression::best(),
            CompressionLevel::Precise(value) => Compression::new(u32::from(value.get())),
        }
    }
}

/// Error returned when a requested compression level falls outside the
/// permissible range.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("compression level {level} is outside the supported range 0-9")]
pub struct CompressionLevelError {
    level: u32,
}

impl CompressionLevelError {
    const fn new(level: u32) -> Self {
        Self { level }
    }

    /// Returns the invalid compression level that triggered the error.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }
}

/// Compresses `input` into a new raw-deflate buffer.
///
/// # Errors
///
/// Propagates any I/O error reported by the deflate backend.
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), level.into());
    encoder.write_all(input)?;
    encoder.finish()
}

/// Decompresses a raw-deflate buffer into a new [`Vec`].
///
/// # Errors
///
/// Propagates any I/O error reported by the inflate backend, including
/// corrupt-stream diagnostics.
pub fn decompress_to_vec(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(input);
    let mut output = Vec::new();
    decoder.read_to_end(&mut output)?;
    Ok(output)
}
