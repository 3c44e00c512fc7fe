//! Integration tests for block matching and delta generation.
//!
//! These exercise the complete pipeline: signature generation over a
//! basis, hash-index construction, delta generation against new data, and
//! reconstruction by applying the delta back to the basis.

use std::io::Cursor;
use std::num::{NonZeroU8, NonZeroU32};

use matching::{
    apply_delta, generate_delta, DeltaGenerator, DeltaScript, DeltaToken, SignatureIndex,
};
use protocol::ProtocolVersion;
use signature::{
    calculate_signature_layout, generate_file_signature, FileSignature, SignatureAlgorithm,
    SignatureLayoutParams,
};

fn build_signature(basis: &[u8], block_len: u32) -> FileSignature {
    let layout = calculate_signature_layout(SignatureLayoutParams::new(
        basis.len() as u64,
        NonZeroU32::new(block_len),
        ProtocolVersion::NEWEST,
        NonZeroU8::new(16).expect("non-zero"),
    ))
    .expect("layout");
    generate_file_signature(Cursor::new(basis), layout, SignatureAlgorithm::Md5)
        .expect("signature")
}

fn reconstruct(basis: &[u8], signature: &FileSignature, script: &DeltaScript) -> Vec<u8> {
    let mut output = Vec::new();
    apply_delta(&mut Cursor::new(basis), &mut output, signature, script)
        .expect("apply_delta succeeds");
    output
}

/// Generates a delta and verifies round-trip reconstruction.
fn verify_round_trip(basis: &[u8], input: &[u8], block_len: u32) -> DeltaScript {
    let signature = build_signature(basis, block_len);
    let script = match SignatureIndex::from_signature(&signature) {
        Some(index) => generate_delta(input, &index).expect("generate_delta"),
        None => DeltaGenerator::new()
            .literal_script(input, &signature)
            .expect("literal script"),
    };
    let reconstructed = reconstruct(basis, &signature, &script);
    assert_eq!(reconstructed, input, "round trip must reproduce the input");

    // Token ranges must partition the input in ascending order.
    let mut covered = 0u64;
    for token in script.tokens() {
        assert_eq!(token.offset(), covered, "tokens must be contiguous");
        covered += token.covered_len();
    }
    assert_eq!(covered, input.len() as u64);
    assert_eq!(
        script.literal_bytes() + script.copy_bytes(),
        input.len() as u64
    );
    script
}

#[test]
fn identical_files_match_every_block() {
    let basis: Vec<u8> = (0..8192u32).map(|i| (i * 17 % 256) as u8).collect();
    let script = verify_round_trip(&basis, &basis, 512);

    // Every block matches, including the final full block, and nothing is
    // sent as literal data.
    assert_eq!(script.literal_bytes(), 0);
    assert_eq!(script.stats().matches, 16);
    assert!((script.compression_ratio() - 1.0).abs() < f64::EPSILON);

    // Adjacent blocks should match in order thanks to the want_i rule.
    let blocks: Vec<u32> = script
        .tokens()
        .iter()
        .filter_map(|token| match token {
            DeltaToken::Copy { block, .. } => Some(*block),
            DeltaToken::Literal { .. } => None,
        })
        .collect();
    assert_eq!(blocks, (0..16).collect::<Vec<u32>>());
}

#[test]
fn identical_files_with_short_tail_match_every_block() {
    let basis: Vec<u8> = (0..5000u32).map(|i| (i * 13 % 256) as u8).collect();
    let script = verify_round_trip(&basis, &basis, 1024);

    assert_eq!(script.literal_bytes(), 0, "the short tail block must match");
    assert_eq!(script.stats().matches, 5);
    assert!((script.compression_ratio() - 1.0).abs() < f64::EPSILON);
}

#[test]
fn uniform_identical_data_is_mostly_copies() {
    let basis = vec![0xAA; 8192];
    let script = verify_round_trip(&basis, &basis, 512);
    assert!(script.copy_bytes() > script.literal_bytes());
}

#[test]
fn completely_different_data_is_all_literals() {
    let basis = vec![0xAA; 10_000];
    let input = vec![0xBB; 10_000];
    let script = verify_round_trip(&basis, &input, 1024);

    assert_eq!(script.stats().matches, 0);
    assert_eq!(script.literal_bytes(), 10_000);
}

#[test]
fn mid_file_edit_keeps_surrounding_blocks() {
    let basis = vec![b'A'; 10_000];
    let mut input = basis.clone();
    input.splice(5000..5100, std::iter::repeat_n(b'B', 100));

    let script = verify_round_trip(&basis, &input, 512);
    assert!(script.copy_bytes() >= 7500, "copies: {}", script.copy_bytes());
    assert!(
        script.literal_bytes() <= 2048,
        "literals: {}",
        script.literal_bytes()
    );
}

#[test]
fn insertion_shifts_are_recovered() {
    let basis: Vec<u8> = (0..16_384u32).map(|i| (i * 31 % 251) as u8).collect();
    let mut input = basis.clone();
    input.splice(4096..4096, b"inserted run".iter().copied());

    let script = verify_round_trip(&basis, &input, 512);
    // Everything after the insertion still matches at shifted offsets.
    assert!(script.copy_bytes() >= 14_000, "copies: {}", script.copy_bytes());
}

#[test]
fn append_matches_the_basis_prefix() {
    let basis = b"Original content".to_vec();
    let mut appended = basis.clone();
    appended.extend_from_slice(b"\nAppended");

    let script = verify_round_trip(&basis, &appended, 16);
    assert!(script.stats().matches >= 1, "prefix block should match");
}

#[test]
fn prepend_matches_the_basis_suffix() {
    let basis = b"Original content".to_vec();
    let mut prepended = b"Prepended\n".to_vec();
    prepended.extend_from_slice(&basis);

    let script = verify_round_trip(&basis, &prepended, 16);
    assert!(script.stats().matches >= 1, "suffix block should match");
}

#[test]
fn block_reordering_is_expressed_as_copies() {
    let block: Vec<u8> = (0..512u32).map(|i| (i % 256) as u8).collect();
    let other: Vec<u8> = (0..512u32).map(|i| (i * 7 % 256) as u8).collect();
    let mut basis = Vec::new();
    basis.extend_from_slice(&block);
    basis.extend_from_slice(&other);

    let mut input = Vec::new();
    input.extend_from_slice(&other);
    input.extend_from_slice(&block);

    let script = verify_round_trip(&basis, &input, 512);
    assert_eq!(script.literal_bytes(), 0);
    assert_eq!(script.stats().matches, 2);
}

#[test]
fn empty_input_produces_an_empty_script() {
    let basis = vec![0x11; 4096];
    let script = verify_round_trip(&basis, &[], 512);
    assert!(script.tokens().is_empty());
    assert_eq!(script.input_len(), 0);
}

#[test]
fn empty_basis_produces_one_literal_run() {
    let input: Vec<u8> = (0..100_000u32).map(|i| (i % 256) as u8).collect();
    let script = verify_round_trip(&[], &input, 700);
    assert_eq!(script.literal_bytes(), input.len() as u64);
    assert_eq!(script.stats().matches, 0);
    for token in script.tokens() {
        assert!(token.covered_len() <= 32 * 1024, "literal chunk bound");
    }
}

#[test]
fn input_smaller_than_the_block_size_still_matches_the_tail() {
    let basis: Vec<u8> = (0..700u32).map(|i| (i % 256) as u8).collect();
    // The new file equals the final 100 bytes of the basis; only a
    // same-length block could match, so this stays literal.
    let input = basis[600..].to_vec();
    let script = verify_round_trip(&basis, &input, 512);
    assert_eq!(script.literal_bytes() + script.copy_bytes(), 100);
}

#[test]
fn streaming_generation_matches_in_memory_generation() {
    let basis: Vec<u8> = (0..50_000u32).map(|i| (i * 101 % 256) as u8).collect();
    let mut input = basis.clone();
    input.splice(20_000..20_000, (0..999u32).map(|i| (i % 256) as u8));
    input.truncate(40_000);

    let signature = build_signature(&basis, 700);
    let index = SignatureIndex::from_signature(&signature).expect("index");

    let in_memory = generate_delta(&input, &index).expect("in-memory");
    let streamed = DeltaGenerator::new()
        .generate_stream(Cursor::new(&input), &index)
        .expect("streamed");

    assert_eq!(in_memory.tokens(), streamed.tokens());
    assert_eq!(in_memory.stats(), streamed.stats());
    assert_eq!(
        in_memory.file_sum().map(|sum| sum.as_bytes().to_vec()),
        streamed.file_sum().map(|sum| sum.as_bytes().to_vec())
    );

    assert_eq!(reconstruct(&basis, &signature, &streamed), input);
}

#[test]
fn file_sum_matches_an_independent_digest() {
    use checksums::strong::StrongSummer;

    let basis = vec![3u8; 4096];
    let input = vec![4u8; 5000];
    let signature = build_signature(&basis, 1024);
    let index = SignatureIndex::from_signature(&signature).expect("index");
    let script = generate_delta(&input, &index).expect("delta");

    let expected = StrongSummer::digest(SignatureAlgorithm::Md5, 0, true, &input);
    assert_eq!(script.file_sum().expect("file sum"), &expected);
}

#[test]
fn distinct_blocks_match_without_false_alarms() {
    let mut basis = vec![0u8; 1024];
    basis[512..].copy_from_slice(&[1u8; 512]);
    let signature = build_signature(&basis, 512);
    let index = SignatureIndex::from_signature(&signature).expect("index");

    let input = basis[512..].to_vec();
    let script = generate_delta(&input, &index).expect("delta");
    assert_eq!(script.stats().matches, 1);
    assert_eq!(script.stats().false_alarms, 0);
    assert_eq!(script.stats().hash_hits, 1);
}

#[test]
fn updating_basis_bypasses_blocks_behind_the_cursor() {
    // The new file asks for basis block 1's data at position 0. With
    // in-place updates the receiver would have already overwritten that
    // region, except block signatures at or past the cursor stay valid.
    let mut basis = Vec::new();
    basis.extend_from_slice(&[b'x'; 512]);
    basis.extend_from_slice(&[b'y'; 512]);
    let signature = build_signature(&basis, 512);
    let index = SignatureIndex::from_signature(&signature).expect("index");

    // Block 1 (the y block) sits at basis offset 512 >= cursor 0, so it
    // is still usable; block 0 re-used at offset 512 is also fine since
    // 0 < 512 is behind the cursor and gets bypassed into literal data.
    let mut input = Vec::new();
    input.extend_from_slice(&[b'y'; 512]);
    input.extend_from_slice(&[b'x'; 512]);

    let script = DeltaGenerator::new()
        .updating_basis(true)
        .generate(&input, &index)
        .expect("delta");

    let copied: Vec<u32> = script
        .tokens()
        .iter()
        .filter_map(|token| match token {
            DeltaToken::Copy { block, .. } => Some(*block),
            DeltaToken::Literal { .. } => None,
        })
        .collect();
    assert_eq!(copied, vec![1], "only the forward block may be copied");
    assert_eq!(script.literal_bytes(), 512);

    assert_eq!(reconstruct(&basis, &signature, &script), input);
}

#[test]
fn updating_basis_accepts_aligned_matches() {
    // Identical input: every window is already basis-aligned, so the
    // aligned fast path accepts each block in place.
    let basis: Vec<u8> = (0..4096u32).map(|i| (i * 11 % 256) as u8).collect();
    let signature = build_signature(&basis, 512);
    let index = SignatureIndex::from_signature(&signature).expect("index");

    let script = DeltaGenerator::new()
        .updating_basis(true)
        .generate(&basis, &index)
        .expect("delta");

    assert_eq!(script.literal_bytes(), 0);
    assert_eq!(script.stats().matches, 8);
    assert_eq!(reconstruct(&basis, &signature, &script), basis);
}

#[test]
fn deterministic_output_for_identical_inputs() {
    let basis: Vec<u8> = (0..20_000u32).map(|i| (i * 73 % 256) as u8).collect();
    let mut input = basis.clone();
    input.splice(9_000..9_500, std::iter::repeat_n(0xEE, 700));

    let signature = build_signature(&basis, 700);
    let index = SignatureIndex::from_signature(&signature).expect("index");
    let first = generate_delta(&input, &index).expect("first run");
    let second = generate_delta(&input, &index).expect("second run");
    assert_eq!(first.tokens(), second.tokens());
    assert_eq!(first.stats(), second.stats());
}
