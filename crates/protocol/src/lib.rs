#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `protocol` implements the wire layer of the delta-sync engine: protocol
//! version handling, the tagged multiplex framing of the data channel, the
//! little-endian integer and variable-length codecs, the sum-header and
//! file-entry formats, the token streams that carry delta instructions, and
//! the session negotiation handshake.
//!
//! # Design
//!
//! - [`version`] models the supported protocol range (20 through 40 on the
//!   wire, 32 being the newest this implementation speaks) and the limits
//!   that depend on it.
//! - [`envelope`] defines the multiplexed message codes and the 4-byte
//!   `(tag, length)` header; [`multiplex`] builds the data-channel reader
//!   and writer on top of it.
//! - [`wire`] provides `int32`/`int64`, `varint`, `varlong`, and `vstring`
//!   codecs with the protocol-30 dispatch helpers.
//! - [`sums`] carries the signature sum header; [`flist`] the stateful
//!   file-entry codec driven by `XMIT_*` transfer flags.
//! - [`token`] encodes delta instructions as simple or compressed token
//!   streams and decodes them back into `(token, bytes)` events.
//! - [`negotiation`] runs the session handshake: version exchange, compat
//!   flags, negotiated algorithm names, and the checksum seed.
//!
//! Everything here is strictly sequential over `std::io` streams; the only
//! suspension points are the caller-supplied transports.

pub mod envelope;
pub mod flist;
pub mod multiplex;
pub mod negotiation;
pub mod sums;
pub mod token;
pub mod version;
pub mod wire;

pub use envelope::{
    EnvelopeError, MessageCode, MessageHeader, HEADER_LEN, MAX_PAYLOAD_LENGTH, MPLEX_BASE,
};
pub use multiplex::{recv_msg, recv_msg_into, send_msg, DemuxReader, MessageFrame, MuxWriter};
pub use negotiation::{
    CompatFlags, NegotiatedSession, NegotiationError, NegotiationOptions, Role,
};
pub use sums::SumHead;
pub use version::ProtocolVersion;
