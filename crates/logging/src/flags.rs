//! Info and debug flag enumerations.
//!
//! Upstream rsync controls its diagnostic output through two families of
//! named flags (`--info=FLAGS` and `--debug=FLAGS`), each carrying a small
//! numeric level. The engine core consults the debug flags on its hot paths
//! so diagnostic work is skipped entirely unless a flag was raised.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Informational output categories.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InfoFlag {
    /// Per-transfer statistics summaries.
    Stats,
    /// Progress of individual file transfers.
    Progress,
    /// File-list construction and exchange.
    Flist,
}

impl InfoFlag {
    /// Canonical lowercase name accepted by flag parsers.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stats => "stats",
            Self::Progress => "progress",
            Self::Flist => "flist",
        }
    }

    /// Returns every info flag in declaration order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Stats, Self::Progress, Self::Flist]
    }
}

impl fmt::Display for InfoFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InfoFlag {
    type Err = UnknownFlagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|flag| flag.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFlagError::new(s))
    }
}

/// Debug output categories consulted by the engine core.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DebugFlag {
    /// Checksum computation (rolling and strong digests).
    Chksum,
    /// Delta matcher decisions: hash hits, false alarms, accepted matches.
    Deltasum,
    /// Multiplexed message framing.
    Io,
    /// Protocol negotiation: versions, compat flags, algorithm lists.
    Proto,
    /// Receiver-side reconstruction.
    Recv,
}

impl DebugFlag {
    /// Canonical lowercase name accepted by flag parsers.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Chksum => "chksum",
            Self::Deltasum => "deltasum",
            Self::Io => "io",
            Self::Proto => "proto",
            Self::Recv => "recv",
        }
    }

    /// Returns every debug flag in declaration order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Chksum,
            Self::Deltasum,
            Self::Io,
            Self::Proto,
            Self::Recv,
        ]
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Chksum => 0,
            Self::Deltasum => 1,
            Self::Io => 2,
            Self::Proto => 3,
            Self::Recv => 4,
        }
    }

    /// Number of distinct debug flags.
    pub(crate) const COUNT: usize = 5;
}

impl fmt::Display for DebugFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DebugFlag {
    type Err = UnknownFlagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|flag| flag.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFlagError::new(s))
    }
}

/// Error returned when parsing an unrecognised flag name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownFlagError {
    name: String,
}

impl UnknownFlagError {
    fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the flag name that failed to parse.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for UnknownFlagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown verbosity flag name: {:?}", self.name)
    }
}

impl std::error::Error for UnknownFlagError {}
