//! Delta script types.

use checksums::strong::ChecksumDigest;

use crate::stats::MatchStats;

/// One delta instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeltaToken {
    /// Copy a basis block into the output.
    Copy {
        /// Basis block index.
        block: u32,
        /// Offset of the copied range in the new file.
        offset: u64,
        /// Number of bytes copied (the block's length).
        len: u32,
    },
    /// Append literal bytes to the output.
    Literal {
        /// Offset of the literal range in the new file.
        offset: u64,
        /// The literal bytes.
        data: Vec<u8>,
    },
}

impl DeltaToken {
    /// Returns the number of new-file bytes the token covers.
    #[must_use]
    pub fn covered_len(&self) -> u64 {
        match self {
            Self::Copy { len, .. } => u64::from(*len),
            Self::Literal { data, .. } => data.len() as u64,
        }
    }

    /// Returns the token's offset in the new file.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        match self {
            Self::Copy { offset, .. } | Self::Literal { offset, .. } => *offset,
        }
    }
}

/// An ordered delta: tokens whose ranges partition the new file exactly
/// once, plus the statistics and whole-file digest gathered during the
/// scan.
#[derive(Clone, Debug)]
pub struct DeltaScript {
    tokens: Vec<DeltaToken>,
    basis_len: u64,
    input_len: u64,
    block_length: u32,
    stats: MatchStats,
    file_sum: Option<ChecksumDigest>,
}

impl DeltaScript {
    pub(crate) const fn from_parts(
        tokens: Vec<DeltaToken>,
        basis_len: u64,
        input_len: u64,
        block_length: u32,
        stats: MatchStats,
        file_sum: Option<ChecksumDigest>,
    ) -> Self {
        Self {
            tokens,
            basis_len,
            input_len,
            block_length,
            stats,
            file_sum,
        }
    }

    /// Returns the delta instructions in ascending new-file order.
    #[must_use]
    pub fn tokens(&self) -> &[DeltaToken] {
        &self.tokens
    }

    /// Returns the basis file length the delta was computed against.
    #[must_use]
    pub const fn basis_len(&self) -> u64 {
        self.basis_len
    }

    /// Returns the new file length the delta reproduces.
    #[must_use]
    pub const fn input_len(&self) -> u64 {
        self.input_len
    }

    /// Returns the signature block length the matcher used.
    #[must_use]
    pub const fn block_length(&self) -> u32 {
        self.block_length
    }

    /// Returns the per-file match statistics.
    #[must_use]
    pub const fn stats(&self) -> &MatchStats {
        &self.stats
    }

    /// Returns the whole-file strong digest of the new file, when the
    /// generator was asked to compute one.
    #[must_use]
    pub const fn file_sum(&self) -> Option<&ChecksumDigest> {
        self.file_sum.as_ref()
    }

    /// Returns the number of bytes covered by copy tokens.
    #[must_use]
    pub const fn copy_bytes(&self) -> u64 {
        self.stats.matched_data
    }

    /// Returns the number of bytes carried as literals.
    #[must_use]
    pub const fn literal_bytes(&self) -> u64 {
        self.stats.literal_data
    }

    /// Returns the fraction of bytes covered by matches.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        self.stats.compression_ratio()
    }
}
