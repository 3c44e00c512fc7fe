//! Strong checksum implementations backed by well-known hash algorithms.
//!
//! The delta-sync protocol negotiates the strong checksum algorithm from the
//! protocol version and the peers' preference lists. This module exposes
//! streaming wrappers for the MD4 family, MD5, SHA-1/256/512, XXH64, and
//! XXH3 (64- and 128-bit) together with the [`StrongDigest`] trait, and the
//! [`strategy`] module that applies the negotiated seed placement rules on
//! top of the raw hashers.

mod md4;
mod md5;
mod sha1;
mod sha256;
mod sha512;
pub mod strategy;
mod xxhash;

pub use md4::Md4;
pub use md5::{Md5, Md5Seed};
pub use sha1::Sha1;
pub use sha256::Sha256;
pub use sha512::Sha512;
pub use strategy::{ChecksumAlgorithmKind, ChecksumDigest, StrongSummer, MAX_DIGEST_LEN};
pub use xxhash::{Xxh3, Xxh3_128, Xxh64};

/// Trait implemented by strong checksum algorithms.
///
/// Implementors provide a streaming interface: callers feed data
/// incrementally via [`Self::update`] and obtain the final digest through
/// [`Self::finalize`]. The associated [`DIGEST_LEN`](Self::DIGEST_LEN)
/// constant exposes the byte width of the resulting hash so higher layers
/// can size buffers without hard-coding algorithm knowledge.
pub trait StrongDigest: Sized {
    /// Type used to parameterise a new digest instance.
    type Seed: Default;

    /// Type returned when finalising the digest.
    type Digest: AsRef<[u8]> + Copy;

    /// Length of the final digest in bytes.
    const DIGEST_LEN: usize;

    /// Creates a new hasher with an empty state.
    fn new() -> Self {
        Self::with_seed(Default::default())
    }

    /// Creates a new hasher using the provided seed value.
    fn with_seed(seed: Self::Seed) -> Self;

    /// Feeds additional bytes into the digest state.
    fn update(&mut self, data: &[u8]);

    /// Finalises the digest and returns the resulting hash.
    fn finalize(self) -> Self::Digest;

    /// Convenience helper that hashes `data` in a single call.
    fn digest(data: &[u8]) -> Self::Digest {
        Self::digest_with_seed(Default::default(), data)
    }

    /// Convenience helper that hashes `data` using an explicit seed value.
    fn digest_with_seed(seed: Self::Seed, data: &[u8]) -> Self::Digest {
        let mut hasher = Self::with_seed(seed);
        hasher.update(data);
        hasher.finalize()
    }
}
