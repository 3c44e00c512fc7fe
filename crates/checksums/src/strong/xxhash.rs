use xxhash_rust::xxh3::Xxh3 as Xxh3State;
use xxhash_rust::xxh64::Xxh64 as Xxh64State;

use super::StrongDigest;

/// Streaming XXH64 hasher.
///
/// The checksum seed is supplied through the algorithm's own seed parameter;
/// the data stream is never mutated. Digest bytes are the hash value in
/// little-endian order, the canonical wire representation for the xxh
/// family.
#[derive(Clone)]
pub struct Xxh64 {
    inner: Xxh64State,
}

impl Xxh64 {
    /// Creates a hasher with the provided seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            inner: Xxh64State::new(seed),
        }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest and returns the hash in little-endian order.
    #[must_use]
    pub fn finalize(self) -> [u8; 8] {
        self.inner.digest().to_le_bytes()
    }
}

impl StrongDigest for Xxh64 {
    type Seed = u64;
    type Digest = [u8; 8];
    const DIGEST_LEN: usize = 8;

    fn with_seed(seed: Self::Seed) -> Self {
        Xxh64::with_seed(seed)
    }

    fn update(&mut self, data: &[u8]) {
        Xxh64::update(self, data);
    }

    fn finalize(self) -> Self::Digest {
        Xxh64::finalize(self)
    }
}

/// Streaming XXH3 hasher producing the 64-bit variant.
#[derive(Clone)]
pub struct Xxh3 {
    inner: Xxh3State,
}

impl Xxh3 {
    /// Creates a hasher with the provided seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            inner: Xxh3State::with_seed(seed),
        }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest and returns the hash in little-endian order.
    #[must_use]
    pub fn finalize(self) -> [u8; 8] {
        self.inner.digest().to_le_bytes()
    }
}

impl StrongDigest for Xxh3 {
    type Seed = u64;
    type Digest = [u8; 8];
    const DIGEST_LEN: usize = 8;

    fn with_seed(seed: Self::Seed) -> Self {
        Xxh3::with_seed(seed)
    }

    fn update(&mut self, data: &[u8]) {
        Xxh3::update(self, data);
    }

    fn finalize(self) -> Self::Digest {
        Xxh3::finalize(self)
    }
}

/// Streaming XXH3 hasher producing the 128-bit variant.
#[derive(Clone)]
pub struct Xxh3_128 {
    inner: Xxh3State,
}

impl Xxh3_128 {
    /// Creates a hasher with the provided seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            inner: Xxh3State::with_seed(seed),
        }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest and returns the hash in little-endian order.
    #[must_use]
    pub fn finalize(self) -> [u8; 16] {
        self.inner.digest128().to_le_bytes()
    }
}

impl StrongDigest for Xxh3_128 {
    type Seed = u64;
    type Digest = [u8; 16];
    const DIGEST_LEN: usize = 16;

    fn with_seed(seed: Self::Seed) -> Self {
        Xxh3_128::with_seed(seed)
    }

    fn update(&mut self, data: &[u8]) {
        Xxh3_128::update(self, data);
    }

    fn finalize(self) -> Self::Digest {
        Xxh3_128::finalize(self)
    }
}
