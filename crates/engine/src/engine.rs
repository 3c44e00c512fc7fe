//! The engine facade.

use std::io::{Cursor, Read};
use std::num::NonZeroU8;

use checksums::strong::StrongSummer;
use matching::{apply_delta, DeltaGenerator, DeltaScript, SignatureIndex};
use signature::{
    calculate_signature_layout, generate_file_signature_with_seed, FileSignature,
    SignatureBlockIter, SignatureLayout, SignatureLayoutParams,
};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// The synchronization engine.
///
/// One engine carries the immutable per-session configuration and exposes
/// both roles: signature generation over a basis, delta generation against
/// a signature, and delta application. The wire entry points live in
/// [`crate::wire`].
#[derive(Clone, Debug)]
pub struct SyncEngine {
    config: EngineConfig,
}

impl SyncEngine {
    /// Builds an engine, validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for a block length beyond the
    /// protocol's cap or a zero chunk size.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        if let Some(block_length) = config.block_length {
            let max = config.protocol.max_block_length();
            if block_length.get() > max {
                return Err(EngineError::Validation(format!(
                    "block length {block_length} exceeds the protocol {} limit of {max}",
                    config.protocol
                )));
            }
        }
        if config.chunk_size == 0 {
            return Err(EngineError::Validation(
                "chunk size must be positive".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Returns the engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn check_in_memory(&self, size: u64) -> Result<(), EngineError> {
        if size > self.config.max_in_memory_file {
            return Err(EngineError::ResourceLimit {
                size,
                limit: self.config.max_in_memory_file,
            });
        }
        Ok(())
    }

    /// Computes the signature layout for a basis of `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when no layout exists for the
    /// configuration.
    pub fn layout_for(&self, len: u64) -> Result<SignatureLayout, EngineError> {
        let digest_len = self.config.algorithm.digest_len().min(64) as u8;
        let max_strong = NonZeroU8::new(digest_len)
            .ok_or_else(|| EngineError::Validation("algorithm has no digest".to_string()))?;
        Ok(calculate_signature_layout(SignatureLayoutParams::new(
            len,
            self.config.block_length,
            self.config.protocol,
            max_strong,
        ))?)
    }

    /// Generates a signature over an in-memory basis.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ResourceLimit`] beyond the in-memory bound.
    pub fn generate_signature(&self, basis: &[u8]) -> Result<FileSignature, EngineError> {
        self.check_in_memory(basis.len() as u64)?;
        let layout = self.layout_for(basis.len() as u64)?;
        Ok(generate_file_signature_with_seed(
            Cursor::new(basis),
            layout,
            self.config.algorithm,
            self.config.seed,
            self.config.proper_seed_order,
        )?)
    }

    /// Streams signature blocks from a basis of known length.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when no layout exists for the
    /// configuration.
    pub fn generate_signature_stream<R: Read>(
        &self,
        basis: R,
        basis_len: u64,
    ) -> Result<SignatureBlockIter<R>, EngineError> {
        let layout = self.layout_for(basis_len)?;
        Ok(SignatureBlockIter::new(
            basis,
            layout,
            self.config.algorithm,
            self.config.seed,
            self.config.proper_seed_order,
        ))
    }

    fn generator(&self) -> DeltaGenerator {
        DeltaGenerator::new()
            .updating_basis(self.config.updating_basis_file)
            .compute_file_sum(self.config.verify_file_sum)
            .chunk_size(self.config.chunk_size)
    }

    /// Generates a delta transforming the signature's basis into `input`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ResourceLimit`] beyond the in-memory bound.
    pub fn generate_delta(
        &self,
        signature: &FileSignature,
        input: &[u8],
    ) -> Result<DeltaScript, EngineError> {
        self.check_in_memory(input.len() as u64)?;
        let generator = self.generator();
        let script = match SignatureIndex::from_signature(signature) {
            Some(index) => generator.generate(input, &index)?,
            None => generator.literal_script(input, signature)?,
        };
        Ok(script)
    }

    /// Streaming form of [`Self::generate_delta`].
    ///
    /// # Errors
    ///
    /// Propagates reader failures.
    pub fn generate_delta_stream<R: Read>(
        &self,
        signature: &FileSignature,
        input: R,
    ) -> Result<DeltaScript, EngineError> {
        let generator = self.generator();
        let script = match SignatureIndex::from_signature(signature) {
            Some(index) => generator.generate_stream(input, &index)?,
            None => generator.literal_script_stream(input, signature)?,
        };
        Ok(script)
    }

    /// Applies a delta against an in-memory basis, returning the
    /// reconstructed file.
    ///
    /// When the engine verifies whole-file digests and the script carries
    /// one, the reconstruction is checked against it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Protocol`] for scripts that do not match
    /// the signature and [`EngineError::DataIntegrity`] on digest
    /// mismatch.
    pub fn apply_delta(
        &self,
        basis: &[u8],
        signature: &FileSignature,
        script: &DeltaScript,
    ) -> Result<Vec<u8>, EngineError> {
        self.check_in_memory(script.input_len())?;
        let mut output = Vec::with_capacity(script.input_len() as usize);
        apply_delta(&mut Cursor::new(basis), &mut output, signature, script)?;

        if self.config.verify_file_sum {
            if let Some(expected) = script.file_sum() {
                let actual = StrongSummer::digest(
                    self.config.algorithm,
                    self.config.seed,
                    self.config.proper_seed_order,
                    &output,
                );
                if expected != &actual {
                    return Err(EngineError::DataIntegrity {
                        sender: expected.to_string(),
                        receiver: actual.to_string(),
                    });
                }
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checksums::strong::ChecksumAlgorithmKind;
    use std::num::NonZeroU32;

    fn engine_with(block: u32) -> SyncEngine {
        SyncEngine::new(EngineConfig {
            block_length: NonZeroU32::new(block),
            ..EngineConfig::default()
        })
        .expect("engine")
    }

    #[test]
    fn oversized_block_lengths_are_rejected() {
        let err = SyncEngine::new(EngineConfig {
            block_length: NonZeroU32::new(1 << 20),
            ..EngineConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn in_memory_bound_is_enforced() {
        let engine = SyncEngine::new(EngineConfig {
            max_in_memory_file: 16,
            ..EngineConfig::default()
        })
        .expect("engine");
        let err = engine.generate_signature(&[0u8; 64]).unwrap_err();
        assert!(matches!(err, EngineError::ResourceLimit { size: 64, limit: 16 }));
    }

    #[test]
    fn signature_delta_apply_round_trip() {
        let engine = engine_with(512);
        let basis: Vec<u8> = (0..10_000u32).map(|i| (i * 7 % 256) as u8).collect();
        let mut input = basis.clone();
        input.splice(3_000..3_200, std::iter::repeat_n(0x99, 300));

        let signature = engine.generate_signature(&basis).expect("signature");
        let script = engine.generate_delta(&signature, &input).expect("delta");
        let output = engine.apply_delta(&basis, &signature, &script).expect("apply");
        assert_eq!(output, input);
    }

    #[test]
    fn corrupted_reconstruction_fails_integrity_verification() {
        let engine = engine_with(512);
        let basis = vec![1u8; 4096];
        let input = vec![2u8; 4096];

        let signature = engine.generate_signature(&basis).expect("signature");
        let script = engine.generate_delta(&signature, &input).expect("delta");

        // Applying against a *different* basis corrupts nothing here (the
        // delta is all literal), so corrupt the basis for a matched case.
        let mut matched_input = basis.clone();
        matched_input.extend_from_slice(&[3u8; 100]);
        let matched_script = engine
            .generate_delta(&signature, &matched_input)
            .expect("delta");
        let mut wrong_basis = basis.clone();
        wrong_basis[100] ^= 0xFF;
        let err = engine
            .apply_delta(&wrong_basis, &signature, &matched_script)
            .unwrap_err();
        assert!(matches!(err, EngineError::DataIntegrity { .. }));
        let _ = script;
    }

    #[test]
    fn seeded_engines_produce_matching_round_trips() {
        let engine = SyncEngine::new(EngineConfig {
            block_length: NonZeroU32::new(700),
            algorithm: ChecksumAlgorithmKind::Xxh64,
            seed: 0x5eed,
            ..EngineConfig::default()
        })
        .expect("engine");

        let basis: Vec<u8> = (0..5_000u32).map(|i| (i % 256) as u8).collect();
        let signature = engine.generate_signature(&basis).expect("signature");
        let script = engine.generate_delta(&signature, &basis).expect("delta");
        assert_eq!(script.literal_bytes(), 0);
        assert_eq!(
            engine.apply_delta(&basis, &signature, &script).expect("apply"),
            basis
        );
    }

    #[test]
    fn streamed_signature_matches_in_memory_signature() {
        let engine = engine_with(700);
        let basis: Vec<u8> = (0..7_000u32).map(|i| (i * 3 % 256) as u8).collect();
        let in_memory = engine.generate_signature(&basis).expect("in-memory");
        let streamed: Result<Vec<_>, _> = engine
            .generate_signature_stream(Cursor::new(&basis), basis.len() as u64)
            .expect("stream")
            .collect();
        assert_eq!(in_memory.blocks(), streamed.expect("blocks").as_slice());
    }
}
