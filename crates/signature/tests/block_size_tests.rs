//! Block sizing behaviour across file sizes and protocol versions.
//!
//! The layout heuristic mirrors the classic `sum_sizes_sqroot` behaviour:
//! a fixed 700-byte block up to 700^2 bytes, square-root growth above
//! that, and a protocol-dependent upper cap.

use std::io::Cursor;
use std::num::{NonZeroU8, NonZeroU32};

use protocol::ProtocolVersion;
use signature::{
    calculate_signature_layout, generate_file_signature, SignatureAlgorithm,
    SignatureLayoutParams,
};

fn layout_params(file_len: u64, protocol: u8) -> SignatureLayoutParams {
    SignatureLayoutParams::new(
        file_len,
        None,
        ProtocolVersion::try_from(protocol).expect("valid protocol"),
        NonZeroU8::new(16).expect("non-zero"),
    )
}

#[test]
fn block_length_is_monotonic_in_file_size() {
    let mut previous = 0;
    for exponent in 10..40u32 {
        let layout = calculate_signature_layout(layout_params(1 << exponent, 32))
            .expect("layout succeeds");
        assert!(
            layout.block_length() >= previous,
            "block length shrank at 2^{exponent}"
        );
        previous = layout.block_length();
    }
}

#[test]
fn protocol_29_and_30_disagree_only_on_the_cap() {
    for file_len in [1u64 << 20, 1 << 26, 1 << 34] {
        let old = calculate_signature_layout(layout_params(file_len, 29)).expect("layout");
        let new = calculate_signature_layout(layout_params(file_len, 30)).expect("layout");
        if new.block_length() <= 8 * 1024 {
            assert_eq!(old.block_length(), new.block_length());
        } else {
            assert_eq!(old.block_length(), 8 * 1024);
        }
    }
}

#[test]
fn generated_blocks_cover_every_byte_once() {
    for (file_len, block_len) in [(1u64, 700u32), (700, 700), (701, 700), (65_536, 4096)] {
        let data: Vec<u8> = (0..file_len).map(|i| (i % 256) as u8).collect();
        let layout = calculate_signature_layout(SignatureLayoutParams::new(
            file_len,
            NonZeroU32::new(block_len),
            ProtocolVersion::NEWEST,
            NonZeroU8::new(16).expect("non-zero"),
        ))
        .expect("layout");

        let signature = generate_file_signature(Cursor::new(&data), layout, SignatureAlgorithm::Md5)
            .expect("signature");

        let mut covered = 0u64;
        for block in signature.blocks() {
            assert_eq!(block.offset(), covered, "blocks must be contiguous");
            covered += u64::from(block.len());
        }
        assert_eq!(covered, file_len);
    }
}
