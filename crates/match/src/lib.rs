#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `matching` turns a file signature and a new byte stream into a delta:
//! an ordered sequence of copy and literal instructions whose application
//! against the basis reproduces the new file byte for byte.
//!
//! # Design
//!
//! - [`SignatureIndex`] buckets block signatures by a hash of the weak
//!   checksum; lookups return candidate blocks in ascending block order,
//!   filtered by block length.
//! - [`DeltaGenerator`] slides a window over the new file, maintaining the
//!   weak checksum in O(1) per byte, verifying weak hits with the strong
//!   digest, and favouring adjacent blocks (`want_i`) so the output
//!   run-length-codes well. An updating-basis mode adds the offset bypass
//!   and aligned fast path needed for safe in-place updates.
//! - [`DeltaScript`] owns the resulting tokens, per-file statistics, and
//!   the whole-file digest computed during the single scan.
//! - [`apply_delta`] reconstructs the new file from a basis and a script.
//!
//! The matcher never fails on well-formed input; a signature with no
//! blocks degenerates to one literal covering the whole input.

mod apply;
mod delta;
mod generator;
mod index;
mod stats;

pub use apply::{apply_delta, DeltaApplyError};
pub use delta::{DeltaScript, DeltaToken};
pub use generator::{generate_delta, DeltaError, DeltaGenerator, DEFAULT_CHUNK_SIZE};
pub use index::SignatureIndex;
pub use stats::MatchStats;
