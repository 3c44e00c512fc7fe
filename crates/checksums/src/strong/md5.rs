use digest::Digest;

use super::StrongDigest;

/// Seed configuration for MD5 digests.
///
/// Protocol 30 introduced MD5 as the default strong checksum, but the seed
/// was hashed *after* the data until the `CF_CHKSUM_SEED_FIX` compat flag
/// fixed the ordering. Both placements therefore remain reachable:
///
/// - [`Md5Seed::proper`] hashes the 4-byte little-endian seed before the
///   data (the fixed ordering).
/// - [`Md5Seed::legacy`] hashes it after the data.
/// - [`Md5Seed::none`] leaves the digest unseeded.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Md5Seed {
    placement: Placement,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Placement {
    #[default]
    None,
    Proper(i32),
    Legacy(i32),
}

impl Md5Seed {
    /// No seed; the digest is plain RFC 1321 MD5.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            placement: Placement::None,
        }
    }

    /// Seed hashed before the data (`CF_CHKSUM_SEED_FIX` negotiated).
    #[must_use]
    pub const fn proper(seed: i32) -> Self {
        Self {
            placement: Placement::Proper(seed),
        }
    }

    /// Seed hashed after the data (historical ordering).
    #[must_use]
    pub const fn legacy(seed: i32) -> Self {
        Self {
            placement: Placement::Legacy(seed),
        }
    }
}

/// Streaming MD5 hasher with protocol-aware seed placement.
#[derive(Clone, Debug)]
pub struct Md5 {
    inner: md5::Md5,
    trailer: Option<[u8; 4]>,
}

impl Default for Md5 {
    fn default() -> Self {
        Self::new()
    }
}

impl Md5 {
    /// Creates an unseeded hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(Md5Seed::none())
    }

    /// Creates a hasher applying the provided seed placement.
    #[must_use]
    pub fn with_seed(seed: Md5Seed) -> Self {
        let mut inner = md5::Md5::new();
        let mut trailer = None;
        match seed.placement {
            Placement::None => {}
            Placement::Proper(value) => inner.update(value.to_le_bytes()),
            Placement::Legacy(value) => trailer = Some(value.to_le_bytes()),
        }
        Self { inner, trailer }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest, appending a legacy seed when configured.
    #[must_use]
    pub fn finalize(mut self) -> [u8; 16] {
        if let Some(trailer) = self.trailer.take() {
            self.inner.update(trailer);
        }
        self.inner.finalize().into()
    }
}

impl StrongDigest for Md5 {
    type Seed = Md5Seed;
    type Digest = [u8; 16];
    const DIGEST_LEN: usize = 16;

    fn with_seed(seed: Self::Seed) -> Self {
        Md5::with_seed(seed)
    }

    fn update(&mut self, data: &[u8]) {
        Md5::update(self, data);
    }

    fn finalize(self) -> Self::Digest {
        Md5::finalize(self)
    }
}
