//! Rolling weak checksum (`rsum`) used for block matching.
//!
//! The checksum keeps two 16-bit accumulators: `s1` sums the window's bytes
//! and `s2` sums the running prefixes, giving later bytes lower weight. Both
//! support O(1) updates when the window slides one byte ([`RollingChecksum::
//! roll`]) or sheds its leading byte at the EOF tail ([`RollingChecksum::
//! roll_out`]). The byte offset added to each input byte is zero; peers that
//! advertise a non-zero offset are not wire compatible with this engine.

mod checksum;
mod digest;
mod error;

pub use checksum::RollingChecksum;
pub use digest::RollingDigest;
pub use error::RollingError;
