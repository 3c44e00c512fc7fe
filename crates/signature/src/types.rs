//! Signature data types.

use std::io;

use checksums::strong::ChecksumDigest;
use checksums::RollingDigest;
use protocol::sums::SumHead;
use thiserror::Error;

use crate::layout::SignatureLayout;
use crate::SignatureAlgorithm;

/// Errors reported while generating a signature.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The basis stream ended at a different length than the layout
    /// was calculated for.
    #[error("basis stream supplied {actual} bytes but the layout covers {expected}")]
    LengthMismatch {
        /// Bytes the layout was calculated for.
        expected: u64,
        /// Bytes the stream actually supplied.
        actual: u64,
    },
    /// The basis stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One block signature: the weak rolling checksum plus a strong-digest
/// prefix, with the block's position in the basis.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignatureBlock {
    index: u32,
    rolling: RollingDigest,
    strong: ChecksumDigest,
    offset: u64,
    len: u32,
}

impl SignatureBlock {
    /// Creates a block signature.
    #[must_use]
    pub const fn new(
        index: u32,
        rolling: RollingDigest,
        strong: ChecksumDigest,
        offset: u64,
        len: u32,
    ) -> Self {
        Self {
            index,
            rolling,
            strong,
            offset,
            len,
        }
    }

    /// Returns the block index in basis order.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Returns the packed 32-bit weak checksum.
    #[must_use]
    pub const fn weak(&self) -> u32 {
        self.rolling.value()
    }

    /// Returns the rolling digest.
    #[must_use]
    pub const fn rolling(&self) -> RollingDigest {
        self.rolling
    }

    /// Returns the transmitted strong-digest prefix.
    #[must_use]
    pub fn strong(&self) -> &[u8] {
        self.strong.as_bytes()
    }

    /// Returns the block's byte offset in the basis.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the block length in bytes.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// Returns `true` for a zero-length block (never produced by the
    /// generator).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// An immutable file signature: the layout plus every block signature.
#[derive(Clone, Debug)]
pub struct FileSignature {
    layout: SignatureLayout,
    algorithm: SignatureAlgorithm,
    seed: i32,
    proper_seed_order: bool,
    blocks: Vec<SignatureBlock>,
    total_bytes: u64,
}

impl FileSignature {
    pub(crate) const fn from_parts(
        layout: SignatureLayout,
        algorithm: SignatureAlgorithm,
        seed: i32,
        proper_seed_order: bool,
        blocks: Vec<SignatureBlock>,
        total_bytes: u64,
    ) -> Self {
        Self {
            layout,
            algorithm,
            seed,
            proper_seed_order,
            blocks,
            total_bytes,
        }
    }

    /// Returns the layout the signature was generated with.
    #[must_use]
    pub const fn layout(&self) -> SignatureLayout {
        self.layout
    }

    /// Returns the strong algorithm the blocks were hashed with.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Returns the checksum seed the blocks were hashed with.
    #[must_use]
    pub const fn seed(&self) -> i32 {
        self.seed
    }

    /// Reports whether the md5 seed was hashed before the data.
    #[must_use]
    pub const fn proper_seed_order(&self) -> bool {
        self.proper_seed_order
    }

    /// Returns the block signatures in basis order.
    #[must_use]
    pub fn blocks(&self) -> &[SignatureBlock] {
        &self.blocks
    }

    /// Returns the number of basis bytes the signature covers.
    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Returns the wire sum header describing the signature.
    #[must_use]
    pub const fn sum_head(&self) -> SumHead {
        self.layout.sum_head()
    }
}
