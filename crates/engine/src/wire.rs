//! Wire entry points: sum-header exchange, token-stream sending, and the
//! receiver-side reconstructor.

use std::io::{self, Read, Seek, SeekFrom, Write};

use checksums::strong::{ChecksumAlgorithmKind, StrongSummer};
use compress::{CompressionAlgorithm, CompressionLevel};
use logging::{debug_event, DebugFlag};
use matching::{DeltaScript, DeltaToken, MatchStats};
use protocol::sums::SumHead;
use protocol::token::{ReceivedToken, TokenReader, TokenWriter};
use protocol::ProtocolVersion;
use signature::FileSignature;

use crate::error::EngineError;

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut out, "{byte:02x}").expect("write! to String cannot fail");
    }
    out
}

/// Writes a sum header in the protocol's wire layout.
///
/// # Errors
///
/// Returns [`EngineError::Protocol`] for headers the protocol cannot
/// represent and propagates transport failures.
pub fn send_sum_head<W: Write>(
    sink: &mut W,
    head: &SumHead,
    protocol: ProtocolVersion,
) -> Result<(), EngineError> {
    head.validate(protocol).map_err(EngineError::from)?;
    head.write(sink, protocol).map_err(EngineError::from)
}

/// Reads and validates a sum header.
///
/// # Errors
///
/// Returns [`EngineError::Protocol`] for out-of-range fields and
/// truncated streams.
pub fn read_sum_head<R: Read>(
    source: &mut R,
    protocol: ProtocolVersion,
) -> Result<SumHead, EngineError> {
    SumHead::read(source, protocol).map_err(EngineError::from)
}

/// Encodes a delta script as a token stream, then appends the whole-file
/// digest prefix when the script carries one.
///
/// # Errors
///
/// Propagates transport and compressor failures.
pub fn send_delta_tokens<W: Write>(
    sink: &mut W,
    signature: &FileSignature,
    script: &DeltaScript,
    compression: CompressionAlgorithm,
    level: CompressionLevel,
) -> Result<(), EngineError> {
    let mut writer = TokenWriter::new(compression, level);
    for token in script.tokens() {
        match token {
            DeltaToken::Literal { data, .. } => writer.write_literal(sink, data)?,
            DeltaToken::Copy { block, .. } => writer.write_match(sink, *block as i32)?,
        }
    }
    writer.finish(sink)?;

    if let Some(file_sum) = script.file_sum() {
        let prefix_len = usize::from(signature.layout().s2_length());
        sink.write_all(file_sum.prefix(prefix_len))
            .map_err(EngineError::from)?;
    }
    Ok(())
}

/// Consumes a token stream, reconstructing the new file into `output`.
///
/// Literal tokens pass through verbatim; match tokens copy the named
/// block out of the random-access basis using the sum header's geometry.
/// After the end marker, `expected_file_sum_len` bytes of the sender's
/// whole-file digest are read and compared against the locally computed
/// digest (pass `0` to skip the exchange entirely).
///
/// # Errors
///
/// Returns [`EngineError::Protocol`] for invalid block numbers, basis
/// range overruns, and truncated streams; [`EngineError::DataIntegrity`]
/// when the digests disagree.
#[allow(clippy::too_many_arguments)]
pub fn receive_into<W: Write, R: Read, B: Read + Seek>(
    output: &mut W,
    source: &mut R,
    basis: &mut B,
    sum_head: &SumHead,
    algorithm: ChecksumAlgorithmKind,
    seed: i32,
    proper_seed_order: bool,
    compression: CompressionAlgorithm,
    expected_file_sum_len: usize,
) -> Result<MatchStats, EngineError> {
    let mut reader = TokenReader::new(compression);
    let mut stats = MatchStats::default();
    let mut summer = (expected_file_sum_len > 0)
        .then(|| StrongSummer::new(algorithm, seed, proper_seed_order));
    let mut copy_buf = vec![0u8; sum_head.block_length.max(1) as usize];

    loop {
        match reader.read_token(source)? {
            ReceivedToken::End => break,
            ReceivedToken::Literal(data) => {
                if let Some(summer) = summer.as_mut() {
                    summer.update(&data);
                }
                output.write_all(&data).map_err(EngineError::FileIo)?;
                stats.literal_data += data.len() as u64;
            }
            ReceivedToken::Match(block_num) => {
                if block_num < 0 || block_num >= sum_head.count {
                    return Err(EngineError::Protocol(format!(
                        "match token names block {block_num} but the sum header has {} blocks",
                        sum_head.count
                    )));
                }
                let offset = u64::from(block_num as u32) * u64::from(sum_head.block_length as u32);
                let len = if block_num == sum_head.count - 1 && sum_head.remainder > 0 {
                    sum_head.remainder as usize
                } else {
                    sum_head.block_length as usize
                };
                basis
                    .seek(SeekFrom::Start(offset))
                    .map_err(EngineError::FileIo)?;
                basis.read_exact(&mut copy_buf[..len]).map_err(|err| {
                    if err.kind() == io::ErrorKind::UnexpectedEof {
                        EngineError::Protocol(format!(
                            "basis range {offset}..{} overruns the basis file",
                            offset + len as u64
                        ))
                    } else {
                        EngineError::FileIo(err)
                    }
                })?;
                if let Some(summer) = summer.as_mut() {
                    summer.update(&copy_buf[..len]);
                }
                output.write_all(&copy_buf[..len]).map_err(EngineError::FileIo)?;
                stats.matched_data += len as u64;
                stats.matches += 1;
            }
        }
    }

    if let Some(summer) = summer {
        let mut sender_sum = vec![0u8; expected_file_sum_len];
        source.read_exact(&mut sender_sum).map_err(EngineError::from)?;
        let local = summer.finalize();
        let local_prefix = local.prefix(expected_file_sum_len);
        if sender_sum != local_prefix {
            return Err(EngineError::DataIntegrity {
                sender: to_hex(&sender_sum),
                receiver: to_hex(local_prefix),
            });
        }
        debug_event(DebugFlag::Recv, 2, || {
            format!("file sum verified ({expected_file_sum_len} bytes)")
        });
    }

    Ok(stats)
}
