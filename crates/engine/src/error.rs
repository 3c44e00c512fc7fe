//! Engine error taxonomy.

use std::io;

use protocol::negotiation::NegotiationError;
use thiserror::Error;

use crate::exit_code::ExitCode;

/// Errors surfaced by the engine's public operations.
///
/// No error is recovered internally; each carries enough context for a
/// wrapping collaborator to decide whether to abort the session, and maps
/// to a numeric [`ExitCode`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// An argument was invalid at the API boundary.
    #[error("invalid argument: {0}")]
    Validation(String),
    /// A non-streaming entry point was handed more data than the
    /// configured in-memory bound allows.
    #[error("input of {size} bytes exceeds the in-memory bound of {limit} bytes")]
    ResourceLimit {
        /// The offered input size.
        size: u64,
        /// The configured bound.
        limit: u64,
    },
    /// A received wire element was malformed or truncated.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Negotiation failed: version out of range or no algorithm overlap.
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),
    /// The underlying transport or file source failed.
    #[error(transparent)]
    FileIo(io::Error),
    /// The reconstructed file's digest disagreed with the sender's.
    #[error("sender_file_sum mismatch: sender={sender} receiver={receiver}")]
    DataIntegrity {
        /// Hex digest the sender transmitted.
        sender: String,
        /// Hex digest the receiver computed.
        receiver: String,
    },
}

impl EngineError {
    /// Returns the exit code a wrapping program should surface.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Validation(_) => ExitCode::Syntax,
            Self::ResourceLimit { .. } => ExitCode::Malloc,
            Self::Protocol(_) => ExitCode::StreamIo,
            Self::ProtocolMismatch(_) => ExitCode::Protocol,
            Self::FileIo(_) => ExitCode::FileIo,
            Self::DataIntegrity { .. } => ExitCode::Data,
        }
    }
}

impl From<io::Error> for EngineError {
    /// Classifies transport failures: malformed and truncated wire data
    /// are protocol errors, everything else is file I/O.
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::InvalidData => Self::Protocol(err.to_string()),
            io::ErrorKind::UnexpectedEof => Self::Protocol(format!("Unexpected EOF: {err}")),
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::FileIo(err),
            _ => Self::FileIo(err),
        }
    }
}

impl From<NegotiationError> for EngineError {
    fn from(err: NegotiationError) -> Self {
        match err {
            NegotiationError::Io(io_err) => Self::from(io_err),
            other => Self::ProtocolMismatch(other.to_string()),
        }
    }
}

impl From<signature::SignatureError> for EngineError {
    fn from(err: signature::SignatureError) -> Self {
        match err {
            signature::SignatureError::Io(io_err) => Self::from(io_err),
            other @ signature::SignatureError::LengthMismatch { .. } => {
                Self::Validation(other.to_string())
            }
        }
    }
}

impl From<matching::DeltaError> for EngineError {
    fn from(err: matching::DeltaError) -> Self {
        match err {
            matching::DeltaError::Io(io_err) => Self::from(io_err),
        }
    }
}

impl From<matching::DeltaApplyError> for EngineError {
    fn from(err: matching::DeltaApplyError) -> Self {
        match err {
            matching::DeltaApplyError::Io(io_err) => Self::from(io_err),
            other => Self::Protocol(other.to_string()),
        }
    }
}

impl From<signature::SignatureLayoutError> for EngineError {
    fn from(err: signature::SignatureLayoutError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_the_documented_exit_codes() {
        assert_eq!(
            EngineError::Validation("bad".into()).exit_code(),
            ExitCode::Syntax
        );
        assert_eq!(
            EngineError::ResourceLimit { size: 2, limit: 1 }.exit_code(),
            ExitCode::Malloc
        );
        assert_eq!(
            EngineError::Protocol("truncated".into()).exit_code(),
            ExitCode::StreamIo
        );
        assert_eq!(
            EngineError::ProtocolMismatch("no overlap".into()).exit_code(),
            ExitCode::Protocol
        );
        assert_eq!(
            EngineError::DataIntegrity {
                sender: "aa".into(),
                receiver: "bb".into(),
            }
            .exit_code(),
            ExitCode::Data
        );
    }

    #[test]
    fn truncated_streams_become_protocol_errors() {
        let err = EngineError::from(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "needed 4, got 2",
        ));
        assert!(matches!(err, EngineError::Protocol(_)));
        assert!(err.to_string().contains("Unexpected EOF"));
    }

    #[test]
    fn integrity_failures_render_both_digests() {
        let err = EngineError::DataIntegrity {
            sender: "deadbeef".into(),
            receiver: "cafef00d".into(),
        };
        assert_eq!(
            err.to_string(),
            "sender_file_sum mismatch: sender=deadbeef receiver=cafef00d"
        );
    }
}
