#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `signature` builds block signatures over a basis stream: the layout
//! module derives the block length (the square-root heuristic) and the
//! transmitted strong-digest prefix length from the file length and the
//! protocol version, and the generator streams the basis through the
//! rolling and strong checksums one block at a time.
//!
//! # Design
//!
//! - [`SignatureLayoutParams`] + [`calculate_signature_layout`] produce an
//!   immutable [`SignatureLayout`].
//! - [`generate_file_signature`] (and the seeded variant) consume any
//!   [`std::io::Read`] with a single block-sized buffer, so the whole
//!   basis never has to sit in memory.
//! - [`SignatureBlockIter`] exposes the same production as an iterator
//!   for callers that stream blocks straight onto the wire.
//!
//! A [`FileSignature`] is immutable after construction; the matcher's
//! hash index borrows it for the lifetime of a transfer.

mod generate;
mod layout;
mod types;

pub use checksums::strong::ChecksumAlgorithmKind as SignatureAlgorithm;
pub use generate::{
    generate_file_signature, generate_file_signature_with_seed, SignatureBlockIter,
};
pub use layout::{calculate_signature_layout, SignatureLayout, SignatureLayoutError,
    SignatureLayoutParams};
pub use types::{FileSignature, SignatureBlock, SignatureError};
