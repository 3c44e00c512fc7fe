//! Session transfer statistics.

use std::fmt;

use matching::MatchStats;

/// Accumulated statistics for a whole session.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TransferStats {
    /// Number of files a delta was generated or received for.
    pub files_transferred: u64,
    /// Aggregated per-file matcher counters.
    pub match_stats: MatchStats,
}

impl TransferStats {
    /// Resets the accumulator.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Folds one file's counters into the session totals.
    pub fn accumulate(&mut self, stats: &MatchStats) {
        self.files_transferred += 1;
        self.match_stats += *stats;
    }

    /// Returns the total bytes covered across the session.
    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.match_stats.total_bytes()
    }

    /// Renders a match report in the classic verbose-statistics shape.
    #[must_use]
    pub fn match_report(&self) -> String {
        format!(
            "total: matches={}  hash_hits={}  false_alarms={} data={}",
            self.match_stats.matches,
            self.match_stats.hash_hits,
            self.match_stats.false_alarms,
            self.match_stats.total_bytes(),
        )
    }
}

impl fmt::Display for TransferStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files, literal {} matched {}",
            self.files_transferred,
            format_size(self.match_stats.literal_data),
            format_size(self.match_stats.matched_data),
        )
    }
}

/// Formats a byte count with a binary-unit suffix.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["", "K", "M", "G", "T"];

    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            if unit.is_empty() {
                return format!("{bytes}");
            }
            return format!("{value:.2}{unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2}P")
}
