//! Engine configuration.

use std::num::NonZeroU32;

use checksums::strong::ChecksumAlgorithmKind;
use protocol::negotiation::NegotiatedSession;
use protocol::ProtocolVersion;

/// Default bound on bytes accepted by the non-streaming entry points.
pub const DEFAULT_MAX_IN_MEMORY_FILE: u64 = 256 * 1024 * 1024;

/// Default literal chunk boundary.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Knobs fixing one engine's behaviour for a session.
///
/// A config is immutable once the engine is built; per-session values
/// (algorithm, seed, protocol) normally come out of negotiation via
/// [`EngineConfig::for_session`].
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Forced block length; `None` selects the square-root heuristic.
    pub block_length: Option<NonZeroU32>,
    /// Strong checksum algorithm for block and whole-file digests.
    pub algorithm: ChecksumAlgorithmKind,
    /// Checksum seed (0 leaves digests unseeded).
    pub seed: i32,
    /// Protocol version the wire formats target.
    pub protocol: ProtocolVersion,
    /// Whether the md5 seed is hashed before the data.
    pub proper_seed_order: bool,
    /// Enables the matcher's in-place update rules.
    pub updating_basis_file: bool,
    /// Whether the sender's whole-file digest is verified after
    /// reconstruction.
    pub verify_file_sum: bool,
    /// Bound on bytes accepted in memory before callers must switch to
    /// the streaming entry points.
    pub max_in_memory_file: u64,
    /// Literal-token chunk boundary.
    pub chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_length: None,
            algorithm: ChecksumAlgorithmKind::Md5,
            seed: 0,
            protocol: ProtocolVersion::NEWEST,
            proper_seed_order: true,
            updating_basis_file: false,
            verify_file_sum: true,
            max_in_memory_file: DEFAULT_MAX_IN_MEMORY_FILE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl EngineConfig {
    /// Derives a config from a completed negotiation.
    ///
    /// Unknown checksum names fall back to the protocol default, matching
    /// the handshake's behaviour when negotiated strings are disabled.
    #[must_use]
    pub fn for_session(session: &NegotiatedSession) -> Self {
        let protocol = session.protocol;
        let algorithm = ChecksumAlgorithmKind::from_name(&session.checksum)
            .map(|kind| match kind {
                // The md4 wire name resolves to the peer's protocol era.
                ChecksumAlgorithmKind::Md4 => {
                    ChecksumAlgorithmKind::md4_for_protocol(protocol.as_u8())
                }
                other => other,
            })
            .unwrap_or_else(|| ChecksumAlgorithmKind::default_for_protocol(protocol.as_u8()));
        Self {
            algorithm,
            seed: session.seed,
            protocol,
            proper_seed_order: session.proper_seed_order(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::negotiation::CompatFlags;

    fn session(protocol: u8, checksum: &str, flags: CompatFlags) -> NegotiatedSession {
        NegotiatedSession {
            protocol: ProtocolVersion::try_from(protocol).expect("version"),
            compat_flags: flags,
            checksum: checksum.to_string(),
            compression: compress::CompressionAlgorithm::None,
            seed: 77,
        }
    }

    #[test]
    fn session_configs_carry_the_negotiated_values() {
        let config = EngineConfig::for_session(&session(
            31,
            "xxh128",
            CompatFlags::CHKSUM_SEED_FIX,
        ));
        assert_eq!(config.algorithm, ChecksumAlgorithmKind::Xxh3_128);
        assert_eq!(config.seed, 77);
        assert!(config.proper_seed_order);
    }

    #[test]
    fn md4_resolves_to_the_protocol_era() {
        let config = EngineConfig::for_session(&session(26, "md4", CompatFlags::empty()));
        assert_eq!(config.algorithm, ChecksumAlgorithmKind::Md4Busted);
        assert!(!config.proper_seed_order);
    }

    #[test]
    fn unknown_names_fall_back_to_the_protocol_default() {
        let config = EngineConfig::for_session(&session(30, "mystery", CompatFlags::empty()));
        assert_eq!(config.algorithm, ChecksumAlgorithmKind::Md5);
    }
}
