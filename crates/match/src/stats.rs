//! Per-file match statistics.

use std::fmt;
use std::ops::AddAssign;

/// Counters the matcher maintains while scanning one file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MatchStats {
    /// Weak-checksum hits whose strong digest did not confirm.
    pub false_alarms: u64,
    /// Window positions where the hash index returned candidates.
    pub hash_hits: u64,
    /// Accepted block matches.
    pub matches: u64,
    /// Bytes emitted as literal data.
    pub literal_data: u64,
    /// Bytes covered by block matches.
    pub matched_data: u64,
    /// Window positions examined.
    pub blocks_scanned: u64,
}

impl MatchStats {
    /// Resets every counter to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns the total number of bytes the delta covers.
    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.literal_data + self.matched_data
    }

    /// Returns the fraction of bytes covered by matches (1.0 for an empty
    /// file).
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        let total = self.total_bytes();
        if total == 0 {
            return 1.0;
        }
        self.matched_data as f64 / total as f64
    }
}

impl AddAssign for MatchStats {
    fn add_assign(&mut self, other: Self) {
        self.false_alarms += other.false_alarms;
        self.hash_hits += other.hash_hits;
        self.matches += other.matches;
        self.literal_data += other.literal_data;
        self.matched_data += other.matched_data;
        self.blocks_scanned += other.blocks_scanned;
    }
}

impl fmt::Display for MatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hash hits {}, false alarms {}, matches {}, literal {} bytes, matched {} bytes",
            self.hash_hits, self.false_alarms, self.matches, self.literal_data, self.matched_data
        )
    }
}
