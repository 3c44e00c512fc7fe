//! Delta application against a random-access basis.

use std::io::{self, Read, Seek, SeekFrom, Write};

use signature::FileSignature;
use thiserror::Error;

use crate::delta::{DeltaScript, DeltaToken};

/// Errors reported while applying a delta.
#[derive(Debug, Error)]
pub enum DeltaApplyError {
    /// A copy token named a block the signature does not have.
    #[error("copy token names block {block} but the signature has {count} blocks")]
    BadBlockIndex {
        /// The block index from the token.
        block: u32,
        /// The signature's block count.
        count: u64,
    },
    /// A copy token's length disagrees with the signature block.
    #[error("copy token covers {token_len} bytes but block {block} is {block_len} bytes")]
    BlockLengthMismatch {
        /// The block index from the token.
        block: u32,
        /// The token's length.
        token_len: u32,
        /// The signature block's length.
        block_len: u32,
    },
    /// The basis or output stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Applies `script` against `basis`, writing the reconstructed file.
///
/// Tokens are applied in order: copies seek into the basis and forward the
/// block's bytes, literals pass through verbatim. The basis must contain
/// every block the signature describes.
///
/// # Errors
///
/// Returns [`DeltaApplyError::BadBlockIndex`] /
/// [`DeltaApplyError::BlockLengthMismatch`] for scripts that do not match
/// the signature, and propagates stream failures.
pub fn apply_delta<B: Read + Seek, W: Write>(
    basis: &mut B,
    output: &mut W,
    signature: &FileSignature,
    script: &DeltaScript,
) -> Result<(), DeltaApplyError> {
    let blocks = signature.blocks();
    let mut copy_buf = vec![0u8; signature.layout().block_length().max(1) as usize];

    for token in script.tokens() {
        match token {
            DeltaToken::Literal { data, .. } => output.write_all(data)?,
            DeltaToken::Copy { block, len, .. } => {
                let Some(entry) = blocks.get(*block as usize) else {
                    return Err(DeltaApplyError::BadBlockIndex {
                        block: *block,
                        count: blocks.len() as u64,
                    });
                };
                if entry.len() != *len {
                    return Err(DeltaApplyError::BlockLengthMismatch {
                        block: *block,
                        token_len: *len,
                        block_len: entry.len(),
                    });
                }
                basis.seek(SeekFrom::Start(entry.offset()))?;
                let wanted = *len as usize;
                basis.read_exact(&mut copy_buf[..wanted])?;
                output.write_all(&copy_buf[..wanted])?;
            }
        }
    }
    Ok(())
}
