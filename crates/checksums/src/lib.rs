#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` provides the rolling and strong checksum primitives used by
//! the delta-sync engine. The algorithms are byte-for-byte compatible with
//! the rsync wire protocol (versions 20 through 32) so signatures and delta
//! streams remain interchangeable with compatible peers.
//!
//! # Design
//!
//! The crate offers two modules:
//!
//! - [`rolling`] implements the Adler-32–style weak checksum (`rsum`) used
//!   for block matching, including the O(1) slide and shrink updates the
//!   matcher applies per byte.
//! - [`strong`] exposes the MD4 family, MD5, SHA-1/256/512, XXH64, and XXH3
//!   (64- and 128-bit) digests behind the [`strong::StrongDigest`] trait,
//!   plus [`strong::StrongSummer`], the seed-aware accumulator higher layers
//!   use once an algorithm has been negotiated.
//!
//! # Invariants
//!
//! - `RollingChecksum` truncates both state components to 16 bits after
//!   every update.
//! - Rolling updates reject empty windows so callers never observe silent
//!   state corruption.
//! - Seed placement is applied exactly once per digest: the md4 family
//!   appends the 4-byte little-endian seed, md5 prepends or appends it
//!   depending on the negotiated seed order, the sha family prepends it,
//!   and the xxh family passes it as the algorithm's seed parameter.
//!
//! # Examples
//!
//! Compute a rolling checksum for a block and slide the window.
//!
//! ```
//! use checksums::RollingChecksum;
//!
//! let mut rolling = RollingChecksum::new();
//! rolling.update(b"abcd");
//! rolling.roll(b'a', b'e').unwrap();
//! assert_eq!(rolling.len(), 4);
//! ```

pub mod rolling;
pub mod strong;

pub use rolling::{RollingChecksum, RollingDigest, RollingError};
