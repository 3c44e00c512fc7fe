//! Protocol version handling.
//!
//! Wire protocol versions 20 through 40 are representable; this
//! implementation itself speaks up to [`ProtocolVersion::NEWEST`] (32) and
//! negotiates down to the peer's version with the `min` rule. Versions gate
//! several wire features: variable-length integers and negotiated strings
//! arrive with protocol 30, which also raises the maximum block length from
//! 8 KiB to 128 KiB.

use std::fmt;
use std::num::NonZeroU8;

use thiserror::Error;

/// A validated protocol version in the supported wire range.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ProtocolVersion(NonZeroU8);

impl ProtocolVersion {
    /// Oldest protocol version the wire format supports.
    pub const OLDEST: Self = match NonZeroU8::new(20) {
        Some(value) => Self(value),
        None => unreachable!(),
    };

    /// Newest protocol version this implementation speaks.
    pub const NEWEST: Self = match NonZeroU8::new(32) {
        Some(value) => Self(value),
        None => unreachable!(),
    };

    /// Highest version a peer may advertise before it is rejected.
    pub const MAX_ADVERTISED: u8 = 40;

    /// Returns the numeric protocol version.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0.get()
    }

    /// Returns the version as the `int32` written on the wire.
    #[inline]
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0.get() as i32
    }

    /// Returns every version this implementation can negotiate, oldest
    /// first.
    #[must_use]
    pub fn supported_versions() -> Vec<Self> {
        (Self::OLDEST.as_u8()..=Self::NEWEST.as_u8())
            .filter_map(|value| NonZeroU8::new(value).map(Self))
            .collect()
    }

    /// Maximum block length a signature may use at this version: 8 KiB
    /// below protocol 30, 128 KiB from protocol 30 on.
    #[must_use]
    pub const fn max_block_length(self) -> u32 {
        if self.as_u8() < 30 {
            8 * 1024
        } else {
            128 * 1024
        }
    }

    /// Reports whether this version uses variable-length integers for the
    /// `varint30`/`varlong30` dispatch points.
    #[inline]
    #[must_use]
    pub const fn uses_varint(self) -> bool {
        self.as_u8() >= 30
    }

    /// Reports whether sum headers at this version carry an explicit
    /// strong-prefix length field.
    #[inline]
    #[must_use]
    pub const fn carries_s2_length(self) -> bool {
        self.as_u8() >= 27
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Error returned when a version value falls outside the supported range.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("protocol version {version} is outside the supported range 20-40")]
pub struct UnsupportedVersionError {
    version: i64,
}

impl UnsupportedVersionError {
    /// Returns the rejected version value.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = UnsupportedVersionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value < Self::OLDEST.as_u8() || value > Self::MAX_ADVERTISED {
            return Err(UnsupportedVersionError {
                version: i64::from(value),
            });
        }
        NonZeroU8::new(value)
            .map(Self)
            .ok_or(UnsupportedVersionError {
                version: i64::from(value),
            })
    }
}

impl TryFrom<i32> for ProtocolVersion {
    type Error = UnsupportedVersionError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| UnsupportedVersionError {
                version: i64::from(value),
            })
            .and_then(Self::try_from)
    }
}

/// Applies the negotiation rule to a local/peer version pair.
///
/// The negotiated version is the minimum of the two, decremented by one
/// when the sides run different subprotocols of that version (pre-release
/// peers must not assume each other's drafts agree).
#[must_use]
pub fn negotiated_version(
    local: ProtocolVersion,
    peer: ProtocolVersion,
    subprotocols_differ: bool,
) -> ProtocolVersion {
    let mut value = local.as_u8().min(peer.as_u8());
    if subprotocols_differ && value > ProtocolVersion::OLDEST.as_u8() {
        value -= 1;
    }
    ProtocolVersion::try_from(value).unwrap_or(ProtocolVersion::OLDEST)
}
