use super::digest::RollingDigest;
use super::error::RollingError;

/// Rolling checksum used for weak block matching (often called `rsum`).
///
/// `s1` accumulates the byte sum and `s2` accumulates prefix sums, both
/// truncated to 16 bits after every update. [`value`](Self::value) packs the
/// pair as `(s2 << 16) | s1`, the representation stored in block signatures
/// and used for hash-table lookups.
#[doc(alias = "rsum")]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RollingChecksum {
    s1: u32,
    s2: u32,
    len: usize,
}

impl RollingChecksum {
    /// Creates a new rolling checksum with zeroed state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            s1: 0,
            s2: 0,
            len: 0,
        }
    }

    /// Reconstructs a rolling checksum from a previously captured digest.
    #[must_use]
    pub const fn from_digest(digest: RollingDigest) -> Self {
        Self {
            s1: digest.sum1() as u32,
            s2: digest.sum2() as u32,
            len: digest.len(),
        }
    }

    /// Resets the checksum back to its initial state.
    pub const fn reset(&mut self) {
        self.s1 = 0;
        self.s2 = 0;
        self.len = 0;
    }

    /// Returns the number of bytes in the current window.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no bytes have been observed yet.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Updates the checksum with an additional slice of bytes.
    ///
    /// ```
    /// use checksums::RollingChecksum;
    ///
    /// let mut split = RollingChecksum::new();
    /// split.update(b"Hello, ");
    /// split.update(b"world");
    ///
    /// let mut whole = RollingChecksum::new();
    /// whole.update(b"Hello, world");
    /// assert_eq!(split.value(), whole.value());
    /// ```
    #[inline]
    pub fn update(&mut self, chunk: &[u8]) {
        let mut s1 = self.s1;
        let mut s2 = self.s2;

        let mut iter = chunk.chunks_exact(4);
        for block in &mut iter {
            s1 = s1.wrapping_add(u32::from(block[0]));
            s2 = s2.wrapping_add(s1);

            s1 = s1.wrapping_add(u32::from(block[1]));
            s2 = s2.wrapping_add(s1);

            s1 = s1.wrapping_add(u32::from(block[2]));
            s2 = s2.wrapping_add(s1);

            s1 = s1.wrapping_add(u32::from(block[3]));
            s2 = s2.wrapping_add(s1);
        }
        for &byte in iter.remainder() {
            s1 = s1.wrapping_add(u32::from(byte));
            s2 = s2.wrapping_add(s1);
        }

        self.s1 = s1 & 0xffff;
        self.s2 = s2 & 0xffff;
        self.len = self.len.saturating_add(chunk.len());
    }

    /// Clears the state and updates with `block`.
    #[inline]
    pub fn update_from_block(&mut self, block: &[u8]) {
        self.reset();
        self.update(block);
    }

    /// Slides the window one byte, removing `outgoing` from the front and
    /// appending `incoming` at the back. The window length is unchanged.
    ///
    /// ```
    /// use checksums::RollingChecksum;
    ///
    /// let data = b"ABCDE";
    /// let mut rolling = RollingChecksum::new();
    /// rolling.update(&data[0..3]);
    /// rolling.roll(data[0], data[3]).unwrap();
    ///
    /// let mut fresh = RollingChecksum::new();
    /// fresh.update(&data[1..4]);
    /// assert_eq!(rolling.value(), fresh.value());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`RollingError::EmptyWindow`] if no bytes have been processed.
    #[inline]
    pub fn roll(&mut self, outgoing: u8, incoming: u8) -> Result<(), RollingError> {
        let window_len = self.window_len_u32()?;

        let out = u32::from(outgoing);
        let inn = u32::from(incoming);

        let new_s1 = self.s1.wrapping_sub(out).wrapping_add(inn) & 0xffff;
        let new_s2 = self
            .s2
            .wrapping_sub(window_len.wrapping_mul(out))
            .wrapping_add(new_s1)
            & 0xffff;

        self.s1 = new_s1;
        self.s2 = new_s2;
        Ok(())
    }

    /// Sheds the leading window byte without admitting a replacement,
    /// shrinking the window by one. Used at the EOF tail where the window's
    /// right edge is pinned at the end of the input.
    ///
    /// ```
    /// use checksums::RollingChecksum;
    ///
    /// let data = b"ABCDE";
    /// let mut rolling = RollingChecksum::new();
    /// rolling.update(data);
    /// rolling.roll_out(data[0]).unwrap();
    ///
    /// let mut fresh = RollingChecksum::new();
    /// fresh.update(&data[1..]);
    /// assert_eq!(rolling.value(), fresh.value());
    /// assert_eq!(rolling.len(), 4);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`RollingError::EmptyWindow`] if no bytes have been processed.
    #[inline]
    pub fn roll_out(&mut self, outgoing: u8) -> Result<(), RollingError> {
        let window_len = self.window_len_u32()?;

        let out = u32::from(outgoing);
        self.s1 = self.s1.wrapping_sub(out) & 0xffff;
        self.s2 = self.s2.wrapping_sub(window_len.wrapping_mul(out)) & 0xffff;
        self.len -= 1;
        Ok(())
    }

    /// Returns the checksum in the packed 32-bit wire representation
    /// `(s2 << 16) | s1`.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }

    /// Returns the current state as a structured digest.
    #[must_use]
    pub const fn digest(&self) -> RollingDigest {
        RollingDigest::new(self.s1 as u16, self.s2 as u16, self.len)
    }

    #[inline]
    fn window_len_u32(&self) -> Result<u32, RollingError> {
        if self.len == 0 {
            return Err(RollingError::EmptyWindow);
        }
        u32::try_from(self.len).map_err(|_| RollingError::WindowTooLarge { len: self.len })
    }
}

impl From<RollingDigest> for RollingChecksum {
    fn from(digest: RollingDigest) -> Self {
        Self::from_digest(digest)
    }
}
