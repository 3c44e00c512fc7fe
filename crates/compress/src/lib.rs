#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `compress` provides the compression primitives backing the delta-sync
//! token streams. The zlib helpers produce *raw* deflate output (no zlib
//! header or Adler-32 trailer), matching the wire format upstream rsync
//! obtains from `deflateInit2()` with negative window bits. Zstandard and
//! LZ4 helpers are feature-gated the same way the token-stream variants
//! they serve are.
//!
//! # Design
//!
//! - [`CompressionAlgorithm`] enumerates the names exchanged during
//!   negotiation (`none`, `zlib`, `zlibx`, `zstd`, `lz4`).
//! - [`zlib`] exposes one-shot raw-deflate helpers and the
//!   [`zlib::CompressionLevel`] ladder shared by every backend.
//! - [`zstd`] and [`lz4`] expose bounded one-shot helpers sized for token
//!   segments.
//!
//! The stateful deflate framing of the token stream itself lives in the
//! protocol layer; this crate only supplies the codecs.

pub mod algorithm;
pub mod zlib;

#[cfg(feature = "lz4")]
pub mod lz4;
#[cfg(feature = "zstd")]
pub mod zstd;

pub use algorithm::{CompressionAlgorithm, CompressionAlgorithmParseError};
pub use zlib::CompressionLevel;
