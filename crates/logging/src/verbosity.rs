//! Process-wide verbosity registry.
//!
//! Debug levels are stored in atomics so the matcher and codec hot paths can
//! gate diagnostic work with a single relaxed load. The registry is written
//! once during session setup and treated as immutable afterwards.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::flags::DebugFlag;

static DEBUG_LEVELS: [AtomicU8; DebugFlag::COUNT] = [
    AtomicU8::new(0),
    AtomicU8::new(0),
    AtomicU8::new(0),
    AtomicU8::new(0),
    AtomicU8::new(0),
];

static VERBOSITY: AtomicU8 = AtomicU8::new(0);

/// Sets the global verbosity level (the `-v` counter).
///
/// Raising the verbosity also raises every debug flag that has not been set
/// explicitly, mirroring upstream's `--verbose` implying `--debug` defaults.
pub fn set_verbosity(level: u8) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

/// Returns the global verbosity level.
#[must_use]
pub fn verbosity() -> u8 {
    VERBOSITY.load(Ordering::Relaxed)
}

/// Sets the level for a single debug flag.
pub fn set_debug_level(flag: DebugFlag, level: u8) {
    DEBUG_LEVELS[flag.index()].store(level, Ordering::Relaxed);
}

/// Returns the configured level for a debug flag.
#[must_use]
pub fn debug_level(flag: DebugFlag) -> u8 {
    DEBUG_LEVELS[flag.index()].load(Ordering::Relaxed)
}

/// Reports whether a debug flag is enabled at the given level.
#[inline]
#[must_use]
pub fn debug_enabled(flag: DebugFlag, level: u8) -> bool {
    debug_level(flag) >= level
}

/// Emits a debug event when the flag is enabled at `level`.
///
/// The closure formats the message only when it will actually be emitted so
/// the hot path pays a single atomic load in the common disabled case.
pub fn debug_event(flag: DebugFlag, level: u8, message: impl FnOnce() -> String) {
    if !debug_enabled(flag, level) {
        return;
    }
    let rendered = message();
    #[cfg(feature = "tracing")]
    tracing::debug!(flag = flag.name(), "{rendered}");
    #[cfg(not(feature = "tracing"))]
    eprintln!("[{}] {rendered}", flag.name());
}
