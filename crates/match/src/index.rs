//! Weak-checksum hash index over a file signature.

use signature::{FileSignature, SignatureBlock};

/// Traditional fixed table size, also the lower bound of dynamic sizing.
const TRADITIONAL_TABLE_SIZE: usize = 65536;

const EMPTY: i32 = -1;

/// Bucketed index mapping weak checksums to candidate blocks.
///
/// The index borrows the signature; blocks are never duplicated. Buckets
/// chain block indices in ascending order, so equal-weak blocks are
/// offered to the matcher in basis order and the `want_i` adjacency rule
/// can break the remaining ties.
#[derive(Debug)]
pub struct SignatureIndex<'a> {
    signature: &'a FileSignature,
    heads: Vec<i32>,
    next: Vec<i32>,
}

impl<'a> SignatureIndex<'a> {
    /// Builds an index with dynamic table sizing.
    ///
    /// Returns `None` for a signature with no blocks: there is nothing to
    /// look up, and the matcher short-circuits to a whole-file literal.
    #[must_use]
    pub fn from_signature(signature: &'a FileSignature) -> Option<Self> {
        Self::with_table_size(signature, true)
    }

    /// Builds an index with either dynamic sizing or the traditional
    /// fixed 65536-entry table.
    #[must_use]
    pub fn with_table_size(signature: &'a FileSignature, dynamic: bool) -> Option<Self> {
        let blocks = signature.blocks();
        if blocks.is_empty() {
            return None;
        }

        let table_size = if dynamic {
            ((blocks.len() / 8) * 10 + 11).max(TRADITIONAL_TABLE_SIZE)
        } else {
            TRADITIONAL_TABLE_SIZE
        };

        let mut heads = vec![EMPTY; table_size];
        let mut next = vec![EMPTY; blocks.len()];
        // Insert in reverse so each bucket chains ascending block indices.
        for (i, block) in blocks.iter().enumerate().rev() {
            let bucket = hash_weak(block.weak(), table_size);
            next[i] = heads[bucket];
            heads[bucket] = i as i32;
        }

        Some(Self {
            signature,
            heads,
            next,
        })
    }

    /// Returns the signature the index was built over.
    #[must_use]
    pub const fn signature(&self) -> &'a FileSignature {
        self.signature
    }

    /// Returns the bucket count.
    #[must_use]
    pub fn table_size(&self) -> usize {
        self.heads.len()
    }

    /// Returns the candidate blocks whose weak checksum and length both
    /// match, in ascending block order.
    pub fn candidates(&self, weak: u32, len: u32) -> impl Iterator<Item = &SignatureBlock> + '_ {
        let bucket = hash_weak(weak, self.heads.len());
        Chain {
            index: self,
            cursor: self.heads[bucket],
        }
        .filter(move |block| block.weak() == weak && block.len() == len)
    }
}

/// The protocol's bucket hash: fold the two 16-bit halves for the
/// traditional table, plain modulo otherwise.
fn hash_weak(weak: u32, table_size: usize) -> usize {
    if table_size == TRADITIONAL_TABLE_SIZE {
        (((weak & 0xFFFF) + (weak >> 16)) & 0xFFFF) as usize
    } else {
        (weak as usize) % table_size
    }
}

struct Chain<'a, 'b> {
    index: &'b SignatureIndex<'a>,
    cursor: i32,
}

impl<'a> Iterator for Chain<'a, '_> {
    type Item = &'a SignatureBlock;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == EMPTY {
            return None;
        }
        let position = self.cursor as usize;
        self.cursor = self.index.next[position];
        Some(&self.index.signature.blocks()[position])
    }
}
