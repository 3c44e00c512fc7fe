//! Seed-aware strong checksum selection.
//!
//! Once negotiation has fixed a strong algorithm and a checksum seed, every
//! per-block and whole-file digest must apply the same seed placement:
//!
//! | family        | placement                                            |
//! |---------------|------------------------------------------------------|
//! | md4 (all eras)| 4-byte little-endian seed appended after the data    |
//! | md5           | seed prepended when the proper order was negotiated, |
//! |               | appended otherwise                                   |
//! | sha1/256/512  | seed prepended                                       |
//! | xxh64/xxh3    | seed passed as the algorithm's seed parameter        |
//! | none          | seed ignored, digest is the constant byte `0x00`     |
//!
//! A seed of zero means the session is unseeded and no bytes are inserted.
//! [`StrongSummer`] owns these rules; it is an enum rather than a boxed
//! trait object because the matcher computes one digest per candidate window
//! on its hot path and must not allocate there.

use std::fmt;

use super::{Md4, Md5, Md5Seed, Sha1, Sha256, Sha512, Xxh3, Xxh3_128, Xxh64};

/// Maximum digest length for any supported algorithm (SHA-512 = 64 bytes).
pub const MAX_DIGEST_LEN: usize = 64;

/// A checksum digest with a fixed maximum capacity.
///
/// Avoids heap allocation by storing digest bytes inline; the actual length
/// varies by algorithm.
#[derive(Clone, Copy)]
pub struct ChecksumDigest {
    buffer: [u8; MAX_DIGEST_LEN],
    len: usize,
}

impl ChecksumDigest {
    /// Creates a new digest from a byte slice.
    ///
    /// # Panics
    ///
    /// Panics if `bytes.len() > MAX_DIGEST_LEN`.
    #[must_use]
    pub fn new(bytes: &[u8]) -> Self {
        assert!(
            bytes.len() <= MAX_DIGEST_LEN,
            "digest length {} exceeds maximum {}",
            bytes.len(),
            MAX_DIGEST_LEN
        );
        let mut buffer = [0u8; MAX_DIGEST_LEN];
        buffer[..bytes.len()].copy_from_slice(bytes);
        Self {
            buffer,
            len: bytes.len(),
        }
    }

    /// Returns the digest length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the digest is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the digest as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// Returns the leading `len` bytes, clamped to the digest length.
    ///
    /// Block signatures transmit only a negotiated prefix of the full
    /// digest; this is the accessor the signature builder and matcher use.
    #[must_use]
    pub fn prefix(&self, len: usize) -> &[u8] {
        &self.buffer[..len.min(self.len)]
    }
}

impl AsRef<[u8]> for ChecksumDigest {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialEq for ChecksumDigest {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for ChecksumDigest {}

impl fmt::Debug for ChecksumDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChecksumDigest({:02x?})", self.as_bytes())
    }
}

impl fmt::Display for ChecksumDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Enumeration of the strong checksum algorithms the wire protocol can
/// negotiate.
///
/// The md4 family carries three historical variants alongside the modern
/// one; they are selected by protocol era rather than by name and all share
/// the canonical wire name `md4`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ChecksumAlgorithmKind {
    /// No verification; the digest is a single constant byte.
    None,
    /// MD4 as spoken by protocol 20 peers.
    Md4Archaic,
    /// MD4 as spoken by protocols 21-26.
    Md4Busted,
    /// MD4 as spoken by protocols 27-29.
    Md4Old,
    /// Modern MD4.
    Md4,
    /// MD5, the default from protocol 30 on.
    Md5,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-512.
    Sha512,
    /// XXH64.
    Xxh64,
    /// XXH3, 64-bit variant.
    Xxh3,
    /// XXH3, 128-bit variant.
    Xxh3_128,
}

impl ChecksumAlgorithmKind {
    /// Returns the canonical name used on the negotiation wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Md4Archaic | Self::Md4Busted | Self::Md4Old | Self::Md4 => "md4",
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Xxh64 => "xxh64",
            Self::Xxh3 => "xxh3",
            Self::Xxh3_128 => "xxh128",
        }
    }

    /// Returns the digest length for the algorithm in bytes.
    #[must_use]
    pub const fn digest_len(&self) -> usize {
        match self {
            Self::None => 1,
            Self::Md4Archaic
            | Self::Md4Busted
            | Self::Md4Old
            | Self::Md4
            | Self::Md5
            | Self::Xxh3_128 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
            Self::Xxh64 | Self::Xxh3 => 8,
        }
    }

    /// Returns `true` for cryptographic hash algorithms.
    #[must_use]
    pub const fn is_cryptographic(&self) -> bool {
        matches!(
            self,
            Self::Md4Archaic
                | Self::Md4Busted
                | Self::Md4Old
                | Self::Md4
                | Self::Md5
                | Self::Sha1
                | Self::Sha256
                | Self::Sha512
        )
    }

    /// Parses an algorithm from a negotiation-wire name.
    ///
    /// Accepts canonical names and common aliases (case-insensitive). The
    /// name `md4` resolves to the modern variant; historical eras are chosen
    /// by protocol version via [`Self::md4_for_protocol`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "md4" => Some(Self::Md4),
            "md5" => Some(Self::Md5),
            "sha1" | "sha-1" => Some(Self::Sha1),
            "sha256" | "sha-256" => Some(Self::Sha256),
            "sha512" | "sha-512" => Some(Self::Sha512),
            "xxh64" | "xxhash64" => Some(Self::Xxh64),
            "xxh3" | "xxhash3" => Some(Self::Xxh3),
            "xxh128" | "xxh3-128" | "xxhash128" => Some(Self::Xxh3_128),
            _ => None,
        }
    }

    /// Returns the md4 era a peer of the given protocol version speaks.
    #[must_use]
    pub const fn md4_for_protocol(protocol: u8) -> Self {
        if protocol < 21 {
            Self::Md4Archaic
        } else if protocol < 27 {
            Self::Md4Busted
        } else if protocol < 30 {
            Self::Md4Old
        } else {
            Self::Md4
        }
    }

    /// Returns the default algorithm for a protocol version when negotiated
    /// strings are disabled: md5 from protocol 30 on, the era-appropriate
    /// md4 before that.
    #[must_use]
    pub const fn default_for_protocol(protocol: u8) -> Self {
        if protocol >= 30 {
            Self::Md5
        } else {
            Self::md4_for_protocol(protocol)
        }
    }

    /// Returns every algorithm kind.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::None,
            Self::Md4Archaic,
            Self::Md4Busted,
            Self::Md4Old,
            Self::Md4,
            Self::Md5,
            Self::Sha1,
            Self::Sha256,
            Self::Sha512,
            Self::Xxh64,
            Self::Xxh3,
            Self::Xxh3_128,
        ]
    }
}

impl fmt::Display for ChecksumAlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Streaming strong-digest accumulator applying the negotiated seed
/// placement.
///
/// One summer computes one digest; the matcher creates a fresh summer per
/// candidate window and the engine keeps a long-lived one for the
/// whole-file digest. Enum dispatch keeps the per-window path free of heap
/// traffic.
#[derive(Clone)]
pub struct StrongSummer {
    kind: ChecksumAlgorithmKind,
    state: SummerState,
    trailer: Option<[u8; 4]>,
}

#[derive(Clone)]
enum SummerState {
    None,
    Md4(Md4),
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
    Xxh64(Xxh64),
    Xxh3(Xxh3),
    Xxh3_128(Xxh3_128),
}

impl StrongSummer {
    /// Creates a summer for the negotiated `(algorithm, seed, seed order)`
    /// triple. A zero seed leaves every algorithm unseeded.
    #[must_use]
    pub fn new(kind: ChecksumAlgorithmKind, seed: i32, proper_seed_order: bool) -> Self {
        let mut trailer = None;
        let state = match kind {
            ChecksumAlgorithmKind::None => SummerState::None,
            ChecksumAlgorithmKind::Md4Archaic
            | ChecksumAlgorithmKind::Md4Busted
            | ChecksumAlgorithmKind::Md4Old
            | ChecksumAlgorithmKind::Md4 => {
                if seed != 0 {
                    trailer = Some(seed.to_le_bytes());
                }
                SummerState::Md4(Md4::new())
            }
            ChecksumAlgorithmKind::Md5 => {
                let md5_seed = if seed == 0 {
                    Md5Seed::none()
                } else if proper_seed_order {
                    Md5Seed::proper(seed)
                } else {
                    Md5Seed::legacy(seed)
                };
                SummerState::Md5(Md5::with_seed(md5_seed))
            }
            ChecksumAlgorithmKind::Sha1 => {
                let mut hasher = Sha1::new();
                if seed != 0 {
                    hasher.update(&seed.to_le_bytes());
                }
                SummerState::Sha1(hasher)
            }
            ChecksumAlgorithmKind::Sha256 => {
                let mut hasher = Sha256::new();
                if seed != 0 {
                    hasher.update(&seed.to_le_bytes());
                }
                SummerState::Sha256(hasher)
            }
            ChecksumAlgorithmKind::Sha512 => {
                let mut hasher = Sha512::new();
                if seed != 0 {
                    hasher.update(&seed.to_le_bytes());
                }
                SummerState::Sha512(hasher)
            }
            ChecksumAlgorithmKind::Xxh64 => {
                SummerState::Xxh64(Xxh64::with_seed(u64::from(seed as u32)))
            }
            ChecksumAlgorithmKind::Xxh3 => {
                SummerState::Xxh3(Xxh3::with_seed(u64::from(seed as u32)))
            }
            ChecksumAlgorithmKind::Xxh3_128 => {
                SummerState::Xxh3_128(Xxh3_128::with_seed(u64::from(seed as u32)))
            }
        };
        Self {
            kind,
            state,
            trailer,
        }
    }

    /// Returns the algorithm kind this summer computes.
    #[must_use]
    pub const fn kind(&self) -> ChecksumAlgorithmKind {
        self.kind
    }

    /// Returns the digest length the summer will produce.
    #[must_use]
    pub const fn digest_len(&self) -> usize {
        self.kind().digest_len()
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            SummerState::None => {}
            SummerState::Md4(hasher) => hasher.update(data),
            SummerState::Md5(hasher) => hasher.update(data),
            SummerState::Sha1(hasher) => hasher.update(data),
            SummerState::Sha256(hasher) => hasher.update(data),
            SummerState::Sha512(hasher) => hasher.update(data),
            SummerState::Xxh64(hasher) => hasher.update(data),
            SummerState::Xxh3(hasher) => hasher.update(data),
            SummerState::Xxh3_128(hasher) => hasher.update(data),
        }
    }

    /// Finalises the digest, appending the md4-family seed trailer when one
    /// was configured.
    #[must_use]
    pub fn finalize(mut self) -> ChecksumDigest {
        if let Some(trailer) = self.trailer.take() {
            self.update(&trailer);
        }
        match self.state {
            SummerState::None => ChecksumDigest::new(&[0]),
            SummerState::Md4(hasher) => ChecksumDigest::new(&hasher.finalize()),
            SummerState::Md5(hasher) => ChecksumDigest::new(&hasher.finalize()),
            SummerState::Sha1(hasher) => ChecksumDigest::new(&hasher.finalize()),
            SummerState::Sha256(hasher) => ChecksumDigest::new(&hasher.finalize()),
            SummerState::Sha512(hasher) => ChecksumDigest::new(&hasher.finalize()),
            SummerState::Xxh64(hasher) => ChecksumDigest::new(&hasher.finalize()),
            SummerState::Xxh3(hasher) => ChecksumDigest::new(&hasher.finalize()),
            SummerState::Xxh3_128(hasher) => ChecksumDigest::new(&hasher.finalize()),
        }
    }

    /// One-shot helper computing the seeded digest of `data`.
    #[must_use]
    pub fn digest(
        kind: ChecksumAlgorithmKind,
        seed: i32,
        proper_seed_order: bool,
        data: &[u8],
    ) -> ChecksumDigest {
        let mut summer = Self::new(kind, seed, proper_seed_order);
        summer.update(data);
        summer.finalize()
    }
}
