use thiserror::Error;

/// Errors reported by rolling checksum updates.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum RollingError {
    /// A slide or shrink update was requested before any bytes were observed.
    #[error("rolling checksum window is empty")]
    EmptyWindow,
    /// The window length no longer fits the 32-bit arithmetic of the update.
    #[error("rolling checksum window of {len} bytes exceeds the 32-bit update range")]
    WindowTooLarge {
        /// Window length that triggered the failure.
        len: usize,
    },
}
