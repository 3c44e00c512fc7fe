//! Signature sum header.
//!
//! The sum header precedes a block-signature stream and carries the block
//! count, the block length, the transmitted strong-prefix length, and the
//! final short-block remainder. All four fields are plain little-endian
//! `int32`s; the strong-prefix length is only present from protocol 27 on
//! and defaults to 2 before that.

use std::io::{self, Read, Write};

use crate::version::ProtocolVersion;
use crate::wire::{read_int, write_int};

/// Widest strong-checksum prefix the wire format can carry (SHA-512).
pub const MAX_S2_LENGTH: i32 = 64;

/// Strong-prefix length implied below protocol 27.
pub const LEGACY_S2_LENGTH: i32 = 2;

/// The signature sum header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SumHead {
    /// Number of block signatures that follow.
    pub count: i32,
    /// Block length in bytes.
    pub block_length: i32,
    /// Transmitted strong-digest prefix length in bytes.
    pub s2_length: i32,
    /// Length of the final short block (`0` when every block is full).
    pub remainder: i32,
}

impl SumHead {
    /// Validates the header fields against the protocol's limits.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::InvalidData`] naming the offending field.
    pub fn validate(&self, protocol: ProtocolVersion) -> io::Result<()> {
        let fail = |what: String| Err(io::Error::new(io::ErrorKind::InvalidData, what));

        if self.count < 0 {
            return fail(format!("sum header count {} is negative", self.count));
        }
        if self.block_length < 0 {
            return fail(format!(
                "sum header block length {} is negative",
                self.block_length
            ));
        }
        if self.block_length as u32 > protocol.max_block_length() {
            return fail(format!(
                "sum header block length {} exceeds the protocol {} limit of {}",
                self.block_length,
                protocol,
                protocol.max_block_length()
            ));
        }
        if self.count > 0 && self.block_length == 0 {
            return fail(format!(
                "sum header announces {} blocks with a zero block length",
                self.count
            ));
        }
        if !(0..=MAX_S2_LENGTH).contains(&self.s2_length) {
            return fail(format!(
                "sum header strong-prefix length {} is outside 0-{MAX_S2_LENGTH}",
                self.s2_length
            ));
        }
        if self.remainder < 0 || self.remainder > self.block_length {
            return fail(format!(
                "sum header remainder {} is outside 0-{}",
                self.remainder, self.block_length
            ));
        }
        Ok(())
    }

    /// Writes the header in the protocol's wire layout.
    ///
    /// # Errors
    ///
    /// Propagates writer failures.
    pub fn write<W: Write>(&self, writer: &mut W, protocol: ProtocolVersion) -> io::Result<()> {
        write_int(writer, self.count)?;
        write_int(writer, self.block_length)?;
        if protocol.carries_s2_length() {
            write_int(writer, self.s2_length)?;
        }
        write_int(writer, self.remainder)
    }

    /// Reads and validates a header in the protocol's wire layout.
    ///
    /// # Errors
    ///
    /// Reader failures propagate; out-of-range fields surface as
    /// [`io::ErrorKind::InvalidData`].
    pub fn read<R: Read>(reader: &mut R, protocol: ProtocolVersion) -> io::Result<Self> {
        let count = read_int(reader)?;
        let block_length = read_int(reader)?;
        let s2_length = if protocol.carries_s2_length() {
            read_int(reader)?
        } else {
            LEGACY_S2_LENGTH
        };
        let remainder = read_int(reader)?;

        let head = Self {
            count,
            block_length,
            s2_length,
            remainder,
        };
        head.validate(protocol)?;
        Ok(head)
    }
}
