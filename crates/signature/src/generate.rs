//! Streaming signature generation.

use std::io::{self, Read};

use checksums::strong::{ChecksumDigest, StrongSummer};
use checksums::RollingDigest;

use crate::layout::SignatureLayout;
use crate::types::{FileSignature, SignatureBlock, SignatureError};
use crate::SignatureAlgorithm;

/// Iterator producing block signatures from a basis stream.
///
/// The iterator owns a single block-sized buffer; memory use is bounded by
/// the layout's block length regardless of the basis size. After the last
/// block the stream must be exhausted, otherwise the final call yields a
/// [`SignatureError::LengthMismatch`].
pub struct SignatureBlockIter<R> {
    reader: R,
    layout: SignatureLayout,
    algorithm: SignatureAlgorithm,
    seed: i32,
    proper_seed_order: bool,
    buffer: Vec<u8>,
    index: u64,
    offset: u64,
    failed: bool,
}

impl<R: Read> SignatureBlockIter<R> {
    /// Creates an iterator over `reader` with the given layout.
    #[must_use]
    pub fn new(
        reader: R,
        layout: SignatureLayout,
        algorithm: SignatureAlgorithm,
        seed: i32,
        proper_seed_order: bool,
    ) -> Self {
        Self {
            reader,
            layout,
            algorithm,
            seed,
            proper_seed_order,
            buffer: vec![0u8; layout.block_length().max(1) as usize],
            index: 0,
            offset: 0,
            failed: false,
        }
    }

    /// Returns the layout the iterator was created with.
    #[must_use]
    pub const fn layout(&self) -> SignatureLayout {
        self.layout
    }

    fn fill_block(&mut self, want: usize) -> io::Result<usize> {
        let mut read = 0;
        while read < want {
            match self.reader.read(&mut self.buffer[read..want]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(read)
    }

    fn next_block(&mut self) -> Result<Option<SignatureBlock>, SignatureError> {
        if self.index >= self.layout.block_count() {
            // The layout promised no more blocks; any trailing byte means
            // the stream and the layout disagree.
            let trailing = self.fill_block(1)?;
            if trailing > 0 {
                return Err(SignatureError::LengthMismatch {
                    expected: self.layout.file_len(),
                    actual: self.offset + trailing as u64,
                });
            }
            return Ok(None);
        }

        let want = self.layout.block_len_at(self.index) as usize;
        let read = self.fill_block(want)?;
        if read < want {
            return Err(SignatureError::LengthMismatch {
                expected: self.layout.file_len(),
                actual: self.offset + read as u64,
            });
        }

        let data = &self.buffer[..want];
        let rolling = RollingDigest::from_bytes(data);
        let full = StrongSummer::digest(self.algorithm, self.seed, self.proper_seed_order, data);
        let strong = ChecksumDigest::new(full.prefix(usize::from(self.layout.s2_length())));

        let block = SignatureBlock::new(
            self.index as u32,
            rolling,
            strong,
            self.offset,
            want as u32,
        );
        self.index += 1;
        self.offset += want as u64;
        Ok(Some(block))
    }
}

impl<R: Read> Iterator for SignatureBlockIter<R> {
    type Item = Result<SignatureBlock, SignatureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Generates a complete signature from a basis stream with a zero seed.
///
/// # Errors
///
/// Returns [`SignatureError::LengthMismatch`] when the stream length
/// disagrees with the layout and propagates reader failures.
pub fn generate_file_signature<R: Read>(
    reader: R,
    layout: SignatureLayout,
    algorithm: SignatureAlgorithm,
) -> Result<FileSignature, SignatureError> {
    generate_file_signature_with_seed(reader, layout, algorithm, 0, true)
}

/// Generates a complete signature from a basis stream with the negotiated
/// seed placement.
///
/// # Errors
///
/// Returns [`SignatureError::LengthMismatch`] when the stream length
/// disagrees with the layout and propagates reader failures.
pub fn generate_file_signature_with_seed<R: Read>(
    reader: R,
    layout: SignatureLayout,
    algorithm: SignatureAlgorithm,
    seed: i32,
    proper_seed_order: bool,
) -> Result<FileSignature, SignatureError> {
    let iter = SignatureBlockIter::new(reader, layout, algorithm, seed, proper_seed_order);
    let mut blocks = Vec::with_capacity(layout.block_count() as usize);
    let mut total_bytes = 0u64;
    for block in iter {
        let block = block?;
        total_bytes += u64::from(block.len());
        blocks.push(block);
    }
    Ok(FileSignature::from_parts(
        layout,
        algorithm,
        seed,
        proper_seed_order,
        blocks,
        total_bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{calculate_signature_layout, SignatureLayoutParams};
    use protocol::ProtocolVersion;
    use std::io::Cursor;
    use std::num::{NonZeroU8, NonZeroU32};

    fn layout_for(data_len: u64, block_len: u32) -> SignatureLayout {
        calculate_signature_layout(SignatureLayoutParams::new(
            data_len,
            NonZeroU32::new(block_len),
            ProtocolVersion::NEWEST,
            NonZeroU8::new(16).unwrap(),
        ))
        .expect("layout")
    }

    #[test]
    fn blocks_partition_the_basis_exactly() {
        let data: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
        let layout = layout_for(data.len() as u64, 1024);
        let signature =
            generate_file_signature(Cursor::new(&data), layout, SignatureAlgorithm::Md5)
                .expect("signature");

        assert_eq!(signature.blocks().len(), 3);
        assert_eq!(signature.total_bytes(), 2500);
        assert_eq!(signature.blocks()[0].len(), 1024);
        assert_eq!(signature.blocks()[1].offset(), 1024);
        assert_eq!(signature.blocks()[2].len(), 452);

        for (index, block) in signature.blocks().iter().enumerate() {
            assert_eq!(block.index() as usize, index);
            let start = block.offset() as usize;
            let slice = &data[start..start + block.len() as usize];
            assert_eq!(block.weak(), RollingDigest::from_bytes(slice).value());
            assert_eq!(block.strong().len(), usize::from(layout.s2_length()));
        }
    }

    #[test]
    fn empty_basis_yields_no_blocks() {
        let layout = layout_for(0, 700);
        let signature = generate_file_signature(
            Cursor::new(Vec::new()),
            layout,
            SignatureAlgorithm::Md4,
        )
        .expect("signature");
        assert!(signature.blocks().is_empty());
        assert_eq!(signature.total_bytes(), 0);
    }

    #[test]
    fn short_streams_are_rejected() {
        let layout = layout_for(1000, 256);
        let err = generate_file_signature(
            Cursor::new(vec![0u8; 900]),
            layout,
            SignatureAlgorithm::Md5,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SignatureError::LengthMismatch {
                expected: 1000,
                actual: 900,
            }
        ));
    }

    #[test]
    fn long_streams_are_rejected() {
        let layout = layout_for(1000, 256);
        let err = generate_file_signature(
            Cursor::new(vec![0u8; 1001]),
            layout,
            SignatureAlgorithm::Md5,
        )
        .unwrap_err();
        assert!(matches!(err, SignatureError::LengthMismatch { .. }));
    }

    #[test]
    fn seeded_signatures_differ_from_unseeded_ones() {
        let data = vec![0x42u8; 2048];
        let layout = layout_for(2048, 1024);
        let unseeded =
            generate_file_signature(Cursor::new(&data), layout, SignatureAlgorithm::Md5)
                .expect("unseeded");
        let seeded = generate_file_signature_with_seed(
            Cursor::new(&data),
            layout,
            SignatureAlgorithm::Md5,
            0x1234,
            true,
        )
        .expect("seeded");

        assert_eq!(unseeded.blocks()[0].weak(), seeded.blocks()[0].weak());
        assert_ne!(unseeded.blocks()[0].strong(), seeded.blocks()[0].strong());
        assert_eq!(seeded.seed(), 0x1234);
    }

    #[test]
    fn iterator_form_matches_the_batch_form() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i * 7 % 256) as u8).collect();
        let layout = layout_for(data.len() as u64, 700);

        let batch = generate_file_signature(Cursor::new(&data), layout, SignatureAlgorithm::Xxh64)
            .expect("batch");
        let streamed: Result<Vec<_>, _> = SignatureBlockIter::new(
            Cursor::new(&data),
            layout,
            SignatureAlgorithm::Xxh64,
            0,
            true,
        )
        .collect();

        assert_eq!(batch.blocks(), streamed.expect("streamed").as_slice());
    }
}
