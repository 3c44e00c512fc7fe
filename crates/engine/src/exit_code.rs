//! Exit codes surfaced to collaborators that wrap the engine as a
//! program.

use std::fmt;

/// Numeric exit codes for engine failures.
///
/// The set follows the rsync numbering where the engine can produce the
/// condition; `Data` (4) and `Protocol` (9) carry the data-integrity and
/// negotiation-failure outcomes of this engine's error taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful completion.
    Ok = 0,
    /// Invalid argument at an API boundary.
    Syntax = 1,
    /// Errors selecting input files.
    FileSelect = 3,
    /// Reconstructed data failed integrity verification.
    Data = 4,
    /// Protocol negotiation failed.
    Protocol = 9,
    /// Error in socket I/O.
    SocketIo = 10,
    /// Error in file I/O.
    FileIo = 11,
    /// Error in the protocol data stream.
    StreamIo = 12,
    /// Error in the message channel.
    MessageIo = 13,
    /// A memory bound was exceeded.
    Malloc = 22,
    /// Partial transfer due to error.
    PartialTransfer = 23,
    /// Timeout in data send/receive.
    Timeout = 30,
}

impl ExitCode {
    /// Returns the numeric process exit code.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns a short description of the failure class.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Ok => "success",
            Self::Syntax => "syntax or usage error",
            Self::FileSelect => "errors selecting input/output files",
            Self::Data => "data integrity error",
            Self::Protocol => "protocol incompatibility",
            Self::SocketIo => "error in socket IO",
            Self::FileIo => "error in file IO",
            Self::StreamIo => "error in protocol data stream",
            Self::MessageIo => "errors with program diagnostics",
            Self::Malloc => "error allocating core memory buffers",
            Self::PartialTransfer => "some files could not be transferred",
            Self::Timeout => "timeout in data send/receive",
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_i32(), self.description())
    }
}
