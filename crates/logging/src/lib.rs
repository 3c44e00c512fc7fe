#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` provides the verbosity flag system shared by the delta-sync
//! engine crates. It mirrors upstream rsync's `--info`/`--debug` flag
//! families: each flag names an output area and carries a small numeric
//! level, and hot paths gate their diagnostic work on a cheap level check.
//!
//! # Design
//!
//! - [`InfoFlag`] and [`DebugFlag`] enumerate the output areas.
//! - [`set_debug_level`] / [`debug_enabled`] manage a process-wide registry
//!   backed by atomics so checks cost a single relaxed load.
//! - [`debug_event`] defers message formatting until a flag is known to be
//!   enabled, keeping disabled diagnostics free of allocation.
//!
//! The registry is configured once at session start and read-only afterwards;
//! the engine never mutates it mid-transfer.
//!
//! # Examples
//!
//! ```
//! use logging::{DebugFlag, debug_enabled, set_debug_level};
//!
//! set_debug_level(DebugFlag::Chksum, 1);
//! assert!(debug_enabled(DebugFlag::Chksum, 1));
//! set_debug_level(DebugFlag::Chksum, 0);
//! ```

mod flags;
mod verbosity;

pub use flags::{DebugFlag, InfoFlag, UnknownFlagError};
pub use verbosity::{
    debug_enabled, debug_event, debug_level, set_debug_level, set_verbosity, verbosity,
};
