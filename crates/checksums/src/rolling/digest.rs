use super::checksum::RollingChecksum;

/// Digest produced by the rolling checksum.
///
/// Block signatures carry the packed 32-bit value on the wire; the digest
/// keeps the two 16-bit components and the window length so the checksum
/// state can be captured and restored without recomputation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct RollingDigest {
    s1: u16,
    s2: u16,
    len: usize,
}

impl RollingDigest {
    /// Digest representing an empty window.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Creates a digest from individual components.
    #[must_use]
    pub const fn new(sum1: u16, sum2: u16, len: usize) -> Self {
        Self {
            s1: sum1,
            s2: sum2,
            len,
        }
    }

    /// Computes the digest for the provided byte slice.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut checksum = RollingChecksum::new();
        checksum.update(bytes);
        checksum.digest()
    }

    /// Constructs a digest from the packed 32-bit wire representation.
    ///
    /// The block length is carried separately on the wire, so the caller
    /// provides it explicitly.
    #[must_use]
    pub const fn from_value(value: u32, len: usize) -> Self {
        Self {
            s1: value as u16,
            s2: (value >> 16) as u16,
            len,
        }
    }

    /// Constructs a digest from the little-endian byte array used on the wire.
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 4], len: usize) -> Self {
        Self::from_value(u32::from_le_bytes(bytes), len)
    }

    /// Serialises the digest using the little-endian wire format.
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 4] {
        self.value().to_le_bytes()
    }

    /// Returns the packed 32-bit representation `(s2 << 16) | s1`.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u32 {
        ((self.s2 as u32) << 16) | (self.s1 as u32)
    }

    /// Length of the data that contributed to the digest.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.len
    }

    /// Returns whether the digest was computed from zero bytes.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    /// First 16-bit component of the rolling checksum (`s1`).
    #[inline]
    #[must_use]
    pub const fn sum1(self) -> u16 {
        self.s1
    }

    /// Second 16-bit component of the rolling checksum (`s2`).
    #[inline]
    #[must_use]
    pub const fn sum2(self) -> u16 {
        self.s2
    }
}

impl From<RollingDigest> for u32 {
    #[inline]
    fn from(digest: RollingDigest) -> Self {
        digest.value()
    }
}

impl From<RollingDigest> for [u8; 4] {
    #[inline]
    fn from(digest: RollingDigest) -> Self {
        digest.to_le_bytes()
    }
}
