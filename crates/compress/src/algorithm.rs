//! Shared enumeration describing the compression algorithms the wire
//! protocol can negotiate.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Compression algorithms recognised on the negotiation wire.
///
/// `ZlibX` shares zlib's byte framing; the variants differ in whether a
/// peer primes the compressor history with matched data, which is a
/// negotiation-name distinction rather than a codec one for this engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CompressionAlgorithm {
    /// No compression; token streams use the simple encoding.
    None,
    /// Classic zlib/deflate compression.
    Zlib,
    /// Deflate without compressor-history priming (`zlibx`).
    ZlibX,
    /// Zstandard compression.
    #[cfg(feature = "zstd")]
    Zstd,
    /// LZ4 block compression.
    #[cfg(feature = "lz4")]
    Lz4,
}

impl CompressionAlgorithm {
    /// Returns the canonical name used on the negotiation wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Zlib => "zlib",
            Self::ZlibX => "zlibx",
            #[cfg(feature = "zstd")]
            Self::Zstd => "zstd",
            #[cfg(feature = "lz4")]
            Self::Lz4 => "lz4",
        }
    }

    /// Returns the default algorithm used when compression is enabled.
    #[must_use]
    pub const fn default_algorithm() -> Self {
        Self::Zlib
    }

    /// Returns `true` when token streams for this algorithm carry
    /// compressed segments.
    #[must_use]
    pub const fn is_compressed(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns the set of algorithms available in the current build, in
    /// preference order for negotiation lists.
    #[must_use]
    pub fn available() -> &'static [Self] {
        #[cfg(all(feature = "zstd", feature = "lz4"))]
        {
            const ALGORITHMS: &[CompressionAlgorithm] = &[
                CompressionAlgorithm::Zstd,
                CompressionAlgorithm::Lz4,
                CompressionAlgorithm::Zlib,
                CompressionAlgorithm::ZlibX,
                CompressionAlgorithm::None,
            ];
            ALGORITHMS
        }

        #[cfg(all(feature = "zstd", not(feature = "lz4")))]
        {
            const ALGORITHMS: &[CompressionAlgorithm] = &[
                CompressionAlgorithm::Zstd,
                CompressionAlgorithm::Zlib,
                CompressionAlgorithm::ZlibX,
                CompressionAlgorithm::None,
            ];
            ALGORITHMS
        }

        #[cfg(all(feature = "lz4", not(feature = "zstd")))]
        {
            const ALGORITHMS: &[CompressionAlgorithm] = &[
                CompressionAlgorithm::Lz4,
                CompressionAlgorithm::Zlib,
                CompressionAlgorithm::ZlibX,
                CompressionAlgorithm::None,
            ];
            ALGORITHMS
        }

        #[cfg(all(not(feature = "zstd"), not(feature = "lz4")))]
        {
            const ALGORITHMS: &[CompressionAlgorithm] = &[
                CompressionAlgorithm::Zlib,
                CompressionAlgorithm::ZlibX,
                CompressionAlgorithm::None,
            ];
            ALGORITHMS
        }
    }
}

impl Default for CompressionAlgorithm {
    fn default() -> Self {
        Self::default_algorithm()
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when attempting to parse an unsupported compression
/// algorithm name.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("unsupported compression algorithm: {input}")]
pub struct CompressionAlgorithmParseError {
    input: String,
}

impl CompressionAlgorithmParseError {
    /// Creates a parse error capturing the original input.
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Returns the invalid input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = CompressionAlgorithmParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "zlib" => Ok(Self::Zlib),
            "zlibx" => Ok(Self::ZlibX),
            #[cfg(feature = "zstd")]
            "zstd" => Ok(Self::Zstd),
            #[cfg(feature = "lz4")]
            "lz4" => Ok(Self::Lz4),
            other => Err(CompressionAlgorithmParseError::new(other.to_string())),
        }
    }
}
