//! The delta matcher.
//!
//! One implementation serves both the in-memory and the streaming entry
//! points: the input sits behind a small window abstraction that fills a
//! growable buffer on demand and drops the prefix once the lowest
//! outstanding literal has been flushed. The hot loop maintains the weak
//! checksum in O(1) per byte and touches the strong digest only on weak
//! hits.

use std::io::{self, Read};

use checksums::strong::StrongSummer;
use checksums::{RollingChecksum, RollingDigest, RollingError};
use logging::{debug_event, DebugFlag};
use rustc_hash::FxHashSet;
use signature::FileSignature;
use thiserror::Error;

use crate::delta::{DeltaScript, DeltaToken};
use crate::index::SignatureIndex;
use crate::stats::MatchStats;

/// Default literal-token chunk boundary.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Errors reported by delta generation.
#[derive(Debug, Error)]
pub enum DeltaError {
    /// The new-file stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn rolling_to_io(err: RollingError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}

/// Bounded input window over a slice or a stream.
enum Source<'a, R> {
    Slice(&'a [u8]),
    Stream {
        reader: R,
        buf: Vec<u8>,
        base: u64,
        eof: bool,
    },
}

impl<R: Read> Source<'_, R> {
    /// Tries to make bytes up to `end` available; returns the absolute
    /// end of available data (which is `end` unless EOF intervenes).
    fn ensure(&mut self, end: u64) -> io::Result<u64> {
        match self {
            Source::Slice(data) => Ok(end.min(data.len() as u64)),
            Source::Stream {
                reader,
                buf,
                base,
                eof,
            } => {
                let mut available = *base + buf.len() as u64;
                while !*eof && available < end {
                    let want = (end - available)
                        .clamp(1, 4 * DEFAULT_CHUNK_SIZE as u64)
                        .max(DEFAULT_CHUNK_SIZE as u64) as usize;
                    let old_len = buf.len();
                    buf.resize(old_len + want, 0);
                    let read = loop {
                        match reader.read(&mut buf[old_len..old_len + want]) {
                            Ok(n) => break n,
                            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                            Err(err) => {
                                buf.truncate(old_len);
                                return Err(err);
                            }
                        }
                    };
                    buf.truncate(old_len + read);
                    if read == 0 {
                        *eof = true;
                    }
                    available = *base + buf.len() as u64;
                }
                Ok(end.min(available))
            }
        }
    }

    /// Returns available bytes `[start, end)`; the range must have been
    /// ensured.
    fn get(&self, start: u64, end: u64) -> &[u8] {
        match self {
            Source::Slice(data) => &data[start as usize..end as usize],
            Source::Stream { buf, base, .. } => {
                &buf[(start - base) as usize..(end - base) as usize]
            }
        }
    }

    /// Drops buffered bytes below `lo` once the dead prefix exceeds
    /// `threshold`.
    fn retain_from(&mut self, lo: u64, threshold: usize) {
        if let Source::Stream { buf, base, .. } = self {
            let dead = (lo - *base) as usize;
            if dead > threshold {
                buf.drain(..dead);
                *base = lo;
            }
        }
    }
}

/// Configurable delta generator.
///
/// The defaults match a plain transfer: no in-place update rules, 32 KiB
/// literal chunks, and a whole-file digest computed during the scan.
#[derive(Clone, Copy, Debug)]
pub struct DeltaGenerator {
    updating_basis: bool,
    compute_file_sum: bool,
    chunk_size: usize,
}

impl Default for DeltaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaGenerator {
    /// Creates a generator with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            updating_basis: false,
            compute_file_sum: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Enables the in-place update rules: candidates behind the write
    /// cursor are bypassed and basis-aligned matches are preferred.
    #[must_use]
    pub const fn updating_basis(mut self, enabled: bool) -> Self {
        self.updating_basis = enabled;
        self
    }

    /// Controls whether a whole-file digest is computed during the scan.
    #[must_use]
    pub const fn compute_file_sum(mut self, enabled: bool) -> Self {
        self.compute_file_sum = enabled;
        self
    }

    /// Overrides the literal chunk boundary.
    #[must_use]
    pub const fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Generates a delta for an in-memory new file.
    ///
    /// # Errors
    ///
    /// In-memory generation cannot fail; the `Result` matches the
    /// streaming form.
    pub fn generate(
        &self,
        input: &[u8],
        index: &SignatureIndex<'_>,
    ) -> Result<DeltaScript, DeltaError> {
        self.run(
            Source::<'_, &[u8]>::Slice(input),
            index.signature(),
            Some(index),
        )
    }

    /// Generates a delta from a new-file stream with bounded memory.
    ///
    /// # Errors
    ///
    /// Propagates reader failures.
    pub fn generate_stream<R: Read>(
        &self,
        reader: R,
        index: &SignatureIndex<'_>,
    ) -> Result<DeltaScript, DeltaError> {
        self.run(
            Source::Stream {
                reader,
                buf: Vec::new(),
                base: 0,
                eof: false,
            },
            index.signature(),
            Some(index),
        )
    }

    /// Produces the degenerate all-literal delta used when the signature
    /// has no blocks.
    ///
    /// # Errors
    ///
    /// In-memory generation cannot fail; the `Result` matches the
    /// streaming form.
    pub fn literal_script(
        &self,
        input: &[u8],
        signature: &FileSignature,
    ) -> Result<DeltaScript, DeltaError> {
        self.run(Source::<'_, &[u8]>::Slice(input), signature, None)
    }

    /// Streaming form of [`Self::literal_script`].
    ///
    /// # Errors
    ///
    /// Propagates reader failures.
    pub fn literal_script_stream<R: Read>(
        &self,
        reader: R,
        signature: &FileSignature,
    ) -> Result<DeltaScript, DeltaError> {
        self.run(
            Source::Stream {
                reader,
                buf: Vec::new(),
                base: 0,
                eof: false,
            },
            signature,
            None,
        )
    }

    fn run<R: Read>(
        &self,
        mut input: Source<'_, R>,
        signature: &FileSignature,
        index: Option<&SignatureIndex<'_>>,
    ) -> Result<DeltaScript, DeltaError> {
        let layout = signature.layout();
        let block_len = u64::from(layout.block_length());
        let s2len = usize::from(layout.s2_length());
        let algorithm = signature.algorithm();
        let seed = signature.seed();
        let proper = signature.proper_seed_order();
        let chunk = self.chunk_size.max(1) as u64;
        let retain_threshold = (block_len as usize).max(self.chunk_size);

        let mut tokens: Vec<DeltaToken> = Vec::new();
        let mut stats = MatchStats::default();
        let mut summer = self
            .compute_file_sum
            .then(|| StrongSummer::new(algorithm, seed, proper));

        // Emits [literal_lo, upto) as literal tokens of at most one chunk.
        macro_rules! flush_literal {
            ($literal_lo:expr, $upto:expr) => {{
                let mut at: u64 = $literal_lo;
                while at < $upto {
                    let end = ($upto).min(at + chunk);
                    let data = input.get(at, end).to_vec();
                    if let Some(summer) = summer.as_mut() {
                        summer.update(&data);
                    }
                    stats.literal_data += data.len() as u64;
                    tokens.push(DeltaToken::Literal { offset: at, data });
                    at = end;
                }
            }};
        }

        let Some(index) = index else {
            // No blocks to match against: the whole input is one literal
            // run, still chunked and still feeding the whole-file digest.
            let mut pos = 0u64;
            loop {
                let avail = input.ensure(pos + chunk)?;
                if avail == pos {
                    break;
                }
                flush_literal!(pos, avail);
                pos = avail;
                input.retain_from(pos, retain_threshold);
            }
            let file_sum = summer.map(StrongSummer::finalize);
            return Ok(DeltaScript::from_parts(
                tokens,
                signature.total_bytes(),
                pos,
                layout.block_length(),
                stats,
                file_sum,
            ));
        };

        let blocks = signature.blocks();
        let last_block_len = u64::from(blocks[blocks.len() - 1].len());

        let mut offset = 0u64;
        let mut literal_lo = 0u64;
        let mut last_match = 0u64;
        let mut want_i = 0u64;
        let mut aligned_i = 0u64;
        let mut aligned_off = 0u64;
        let mut same_offset: FxHashSet<u32> = FxHashSet::default();
        let mut known_len: Option<u64> = None;
        let mut scratch: Vec<u8> = Vec::new();

        let avail = input.ensure(block_len)?;
        if avail < block_len {
            known_len = Some(avail);
        }
        let mut k = avail.min(block_len);
        let mut rolling = RollingChecksum::new();
        if k > 0 {
            rolling.update(input.get(0, k));
        }

        while k > 0 {
            if let Some(n) = known_len {
                let end = (n + 1).saturating_sub(last_block_len);
                if offset >= end {
                    break;
                }
            }
            stats.blocks_scanned += 1;
            let weak = rolling.value();

            let mut accepted: Option<u32> = None;
            if index.candidates(weak, k as u32).next().is_some() {
                stats.hash_hits += 1;
                scratch.clear();
                scratch.extend_from_slice(input.get(offset, offset + k));
                let digest = StrongSummer::digest(algorithm, seed, proper, &scratch);

                let mut tentative: Option<u32> = None;
                for candidate in index.candidates(weak, k as u32) {
                    if self.updating_basis
                        && candidate.offset() < offset
                        && !same_offset.contains(&candidate.index())
                    {
                        continue;
                    }
                    if digest.prefix(s2len) == candidate.strong() {
                        tentative = Some(candidate.index());
                        break;
                    }
                    stats.false_alarms += 1;
                }

                // Adjacency tie-break: prefer the block following the
                // previous match when it verifies equally well.
                if let Some(found) = tentative {
                    if u64::from(found) != want_i && (want_i as usize) < blocks.len() {
                        let wanted = &blocks[want_i as usize];
                        let usable = !self.updating_basis
                            || wanted.offset() >= offset
                            || same_offset.contains(&wanted.index());
                        if usable
                            && wanted.weak() == weak
                            && u64::from(wanted.len()) == k
                            && digest.prefix(s2len) == wanted.strong()
                        {
                            tentative = Some(wanted.index());
                        }
                    }
                }

                // Aligned fast path: an in-place receiver writes blocks at
                // block_len boundaries, so prefer the basis-aligned block
                // and, when the window sits before its aligned home (a run
                // of zeros), re-verify and jump to the aligned position.
                if self.updating_basis {
                    if let Some(found) = tentative {
                        while aligned_off < offset {
                            aligned_off += block_len;
                            aligned_i += 1;
                        }
                        let window_zero = weak == 0 && k == block_len;
                        if (offset == aligned_off || window_zero)
                            && (aligned_i as usize) < blocks.len()
                        {
                            let avail = input.ensure(aligned_off + k)?;
                            if known_len.is_none() && avail < aligned_off + k {
                                known_len = Some(avail);
                            }
                            if aligned_off + k <= avail {
                                let aligned_block = &blocks[aligned_i as usize];
                                let mut chosen = found;
                                let mut ok = true;
                                if chosen != aligned_block.index() {
                                    ok = aligned_block.weak() == weak
                                        && u64::from(aligned_block.len()) == k
                                        && digest.prefix(s2len) == aligned_block.strong();
                                    if ok {
                                        chosen = aligned_block.index();
                                    }
                                }
                                if ok && offset != aligned_off {
                                    scratch.clear();
                                    scratch
                                        .extend_from_slice(input.get(aligned_off, aligned_off + k));
                                    let aligned_weak = RollingDigest::from_bytes(&scratch).value();
                                    let target = &blocks[chosen as usize];
                                    ok = aligned_weak == target.weak() && {
                                        let aligned_digest =
                                            StrongSummer::digest(algorithm, seed, proper, &scratch);
                                        aligned_digest.prefix(s2len) == target.strong()
                                    };
                                    if ok {
                                        offset = aligned_off;
                                    }
                                }
                                if ok {
                                    same_offset.insert(chosen);
                                    tentative = Some(chosen);
                                }
                            }
                        }
                    }
                }

                accepted = tentative;
            }

            if let Some(block_index) = accepted {
                debug_event(DebugFlag::Deltasum, 3, || {
                    format!("match block {block_index} at offset {offset} ({k} bytes)")
                });
                flush_literal!(literal_lo, offset);
                if let Some(summer) = summer.as_mut() {
                    summer.update(input.get(offset, offset + k));
                }
                tokens.push(DeltaToken::Copy {
                    block: block_index,
                    offset,
                    len: k as u32,
                });
                stats.matches += 1;
                stats.matched_data += k;
                want_i = u64::from(block_index) + 1;
                last_match = offset + k;
                offset += k;
                literal_lo = offset;

                let avail = input.ensure(offset + block_len)?;
                if known_len.is_none() && avail < offset + block_len {
                    known_len = Some(avail);
                }
                k = avail.saturating_sub(offset).min(block_len);
                if k > 0 {
                    rolling.update_from_block(input.get(offset, offset + k));
                }
                input.retain_from(literal_lo.min(offset), retain_threshold);
                continue;
            }

            // No match: slide the window one byte, or shed its head once
            // the right edge is pinned at EOF.
            let avail = input.ensure(offset + k + 1)?;
            if known_len.is_none() && avail < offset + k + 1 {
                known_len = Some(avail);
            }
            let outgoing = input.get(offset, offset + 1)[0];
            if offset + k < avail {
                let incoming = input.get(offset + k, offset + k + 1)[0];
                rolling.roll(outgoing, incoming).map_err(rolling_to_io)?;
            } else {
                rolling.roll_out(outgoing).map_err(rolling_to_io)?;
                k -= 1;
            }
            offset += 1;

            // Early flush: long literal runs go out before the scan ends
            // so the streaming sender never sits on unbounded data.
            if offset - last_match >= block_len + chunk {
                let far_from_end = match known_len {
                    Some(n) => (n + 1).saturating_sub(last_block_len).saturating_sub(offset) > chunk,
                    None => true,
                };
                let flush_to = offset - block_len;
                if far_from_end && flush_to > literal_lo {
                    flush_literal!(literal_lo, flush_to);
                    literal_lo = flush_to;
                    last_match = flush_to;
                }
            }
            input.retain_from(literal_lo.min(offset), retain_threshold);
        }

        // The window is exhausted; everything still outstanding is
        // literal. At this point EOF has been observed, so the total
        // length is known.
        let input_len = match known_len {
            Some(n) => n,
            None => input.ensure(u64::MAX)?,
        };
        flush_literal!(literal_lo, input_len);

        let file_sum = summer.map(StrongSummer::finalize);
        debug_event(DebugFlag::Deltasum, 2, || {
            format!("delta complete: {}", stats)
        });
        Ok(DeltaScript::from_parts(
            tokens,
            signature.total_bytes(),
            input_len,
            layout.block_length(),
            stats,
            file_sum,
        ))
    }
}

/// Generates a delta with default settings.
///
/// # Errors
///
/// In-memory generation cannot fail; the `Result` matches the streaming
/// form.
pub fn generate_delta(
    input: &[u8],
    index: &SignatureIndex<'_>,
) -> Result<DeltaScript, DeltaError> {
    DeltaGenerator::new().generate(input, index)
}
