//! Signature layout calculation.
//!
//! The block length follows the square-root heuristic: small files use the
//! traditional 700-byte block, larger files grow the block roughly with
//! the square root of the file length (snapped to a multiple of 8), and
//! the protocol version caps the result. The transmitted strong-digest
//! prefix length grows with the file so the probability of an undetected
//! block collision stays bounded as files get larger.

use std::num::{NonZeroU8, NonZeroU32};

use protocol::ProtocolVersion;
use protocol::sums::SumHead;
use thiserror::Error;

/// Traditional block length, also the lower clamp of the heuristic.
pub const MIN_BLOCK_LENGTH: u32 = 700;

/// Smallest strong-digest prefix ever transmitted.
pub const MIN_STRONG_LENGTH: u8 = 2;

/// Bias added to the collision-probability bit budget.
const BLOCKSUM_BIAS: i64 = 10;

/// Inputs to [`calculate_signature_layout`].
#[derive(Clone, Copy, Debug)]
pub struct SignatureLayoutParams {
    file_len: u64,
    block_length_override: Option<NonZeroU32>,
    protocol: ProtocolVersion,
    max_strong_len: NonZeroU8,
}

impl SignatureLayoutParams {
    /// Creates layout parameters.
    ///
    /// `max_strong_len` is the digest length of the negotiated strong
    /// algorithm, the widest prefix the layout may choose.
    #[must_use]
    pub const fn new(
        file_len: u64,
        block_length_override: Option<NonZeroU32>,
        protocol: ProtocolVersion,
        max_strong_len: NonZeroU8,
    ) -> Self {
        Self {
            file_len,
            block_length_override,
            protocol,
            max_strong_len,
        }
    }

    /// Returns the basis file length.
    #[must_use]
    pub const fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Returns the protocol version the layout targets.
    #[must_use]
    pub const fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }
}

/// Errors reported by layout calculation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum SignatureLayoutError {
    /// A forced block length exceeds the protocol's cap.
    #[error("block length {requested} exceeds the protocol limit of {max}")]
    BlockLengthTooLarge {
        /// The requested block length.
        requested: u32,
        /// The protocol's maximum block length.
        max: u32,
    },
    /// The block count does not fit the wire's signed 32-bit count field.
    #[error("{count} blocks exceed the wire count field")]
    TooManyBlocks {
        /// The computed block count.
        count: u64,
    },
}

/// The immutable signature layout.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignatureLayout {
    file_len: u64,
    block_length: u32,
    block_count: u64,
    remainder: u32,
    s2_length: u8,
    protocol: ProtocolVersion,
}

impl SignatureLayout {
    /// Returns the basis file length.
    #[must_use]
    pub const fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Returns the block length in bytes.
    #[must_use]
    pub const fn block_length(&self) -> u32 {
        self.block_length
    }

    /// Returns the number of blocks, the last possibly short.
    #[must_use]
    pub const fn block_count(&self) -> u64 {
        self.block_count
    }

    /// Returns the length of the final short block (`0` when every block
    /// is full or the signature is empty).
    #[must_use]
    pub const fn remainder(&self) -> u32 {
        self.remainder
    }

    /// Returns the transmitted strong-digest prefix length.
    #[must_use]
    pub const fn s2_length(&self) -> u8 {
        self.s2_length
    }

    /// Returns the protocol version the layout targets.
    #[must_use]
    pub const fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    /// Returns the length of the block at `index`.
    #[must_use]
    pub const fn block_len_at(&self, index: u64) -> u32 {
        if index + 1 == self.block_count && self.remainder != 0 {
            self.remainder
        } else {
            self.block_length
        }
    }

    /// Returns the wire sum header describing this layout.
    #[must_use]
    pub const fn sum_head(&self) -> SumHead {
        SumHead {
            count: self.block_count as i32,
            block_length: self.block_length as i32,
            s2_length: self.s2_length as i32,
            remainder: self.remainder as i32,
        }
    }
}

/// Derives the block length for `file_len` without an override.
fn heuristic_block_length(file_len: u64, max_block_length: u32) -> u32 {
    if file_len <= u64::from(MIN_BLOCK_LENGTH) * u64::from(MIN_BLOCK_LENGTH) {
        return MIN_BLOCK_LENGTH;
    }

    // c becomes the highest power of two at roughly sqrt(file_len).
    let mut c: u64 = 1;
    let mut l = file_len;
    loop {
        l >>= 2;
        if l == 0 {
            break;
        }
        c <<= 1;
    }

    if c >= u64::from(max_block_length) {
        return max_block_length;
    }

    // Greedily set bits from c downward while the square stays within the
    // file, stopping at 8 so the result is a multiple of 8.
    let mut block_length: u64 = 0;
    let mut bit = c;
    while bit >= 8 {
        block_length |= bit;
        if file_len < block_length * block_length {
            block_length &= !bit;
        }
        bit >>= 1;
    }
    (block_length as u32).max(MIN_BLOCK_LENGTH)
}

/// Derives the transmitted strong-prefix length.
fn strong_prefix_length(
    file_len: u64,
    block_length: u32,
    protocol: ProtocolVersion,
    max_strong_len: u8,
) -> u8 {
    if !protocol.carries_s2_length() {
        return MIN_STRONG_LENGTH;
    }

    let mut bits = BLOCKSUM_BIAS;
    let mut l = file_len;
    loop {
        l >>= 1;
        if l == 0 {
            break;
        }
        bits += 2;
    }
    let mut c = block_length;
    loop {
        c >>= 1;
        if c == 0 || bits == 0 {
            break;
        }
        bits -= 1;
    }

    let derived = (bits + 1 - 32 + 7) / 8;
    let clamped = derived.clamp(i64::from(MIN_STRONG_LENGTH), i64::from(max_strong_len));
    clamped as u8
}

/// Computes the signature layout for the given parameters.
///
/// # Errors
///
/// Returns [`SignatureLayoutError`] when a forced block length exceeds the
/// protocol's cap or the resulting block count cannot be represented on
/// the wire.
pub fn calculate_signature_layout(
    params: SignatureLayoutParams,
) -> Result<SignatureLayout, SignatureLayoutError> {
    let max_block_length = params.protocol.max_block_length();
    let block_length = match params.block_length_override {
        Some(forced) => {
            if forced.get() > max_block_length {
                return Err(SignatureLayoutError::BlockLengthTooLarge {
                    requested: forced.get(),
                    max: max_block_length,
                });
            }
            forced.get()
        }
        None => heuristic_block_length(params.file_len, max_block_length),
    };

    let block_count = params.file_len.div_ceil(u64::from(block_length));
    if block_count > i32::MAX as u64 {
        return Err(SignatureLayoutError::TooManyBlocks { count: block_count });
    }
    let remainder = (params.file_len % u64::from(block_length)) as u32;
    let s2_length = strong_prefix_length(
        params.file_len,
        block_length,
        params.protocol,
        params.max_strong_len.get(),
    );

    Ok(SignatureLayout {
        file_len: params.file_len,
        block_length,
        block_count,
        remainder,
        s2_length,
        protocol: params.protocol,
    })
}
