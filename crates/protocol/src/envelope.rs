//! Multiplexed message codes and the frame header.
//!
//! Every payload on the data channel is wrapped in a 4-byte little-endian
//! header whose high 8 bits carry `MPLEX_BASE + tag` and whose low 24 bits
//! carry the payload length. The tag values match upstream rsync's `MSG_*`
//! identifiers so control messages remain interchangeable with compatible
//! peers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Offset added to every message tag in the multiplex header.
pub const MPLEX_BASE: u8 = 7;

/// Length of the multiplex header in bytes.
pub const HEADER_LEN: usize = 4;

/// Maximum payload length representable in the 24-bit length field.
pub const MAX_PAYLOAD_LENGTH: u32 = 0x00FF_FFFF;

/// Mask isolating the 24-bit payload length from a raw header word.
pub const PAYLOAD_MASK: u32 = 0x00FF_FFFF;

/// Multiplexed message codes.
///
/// The numeric values are upstream rsync's `MSG_*` constants. `Data` frames
/// carry the file-transfer byte stream; every other code is a control
/// message delivered out of band by the demultiplexer. A zero-length
/// [`MessageCode::ErrorExit`] frame marks the clean end of the data
/// channel.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum MessageCode {
    /// File-transfer data stream.
    Data = 0,
    /// Transfer error; the sender will continue with other files.
    ErrorXfer = 1,
    /// Informational text for the user.
    Info = 2,
    /// Fatal error text.
    Error = 3,
    /// Warning text.
    Warning = 4,
    /// Socket-level error text.
    ErrorSocket = 5,
    /// Log-file-only text.
    Log = 6,
    /// Text destined for the client side.
    Client = 7,
    /// Filename failed UTF-8 conversion.
    ErrorUtf8 = 8,
    /// Request to redo a file transfer.
    Redo = 9,
    /// Transfer statistics block.
    Stats = 10,
    /// A file-list I/O error occurred.
    IoError = 22,
    /// An I/O timeout was observed.
    IoTimeout = 33,
    /// Keep-alive with no payload.
    NoOp = 42,
    /// Graceful end-of-session notice; empty payload ends the data channel.
    ErrorExit = 86,
    /// A file transfer completed successfully.
    Success = 100,
    /// A file was deleted at the destination.
    Deleted = 101,
    /// The sender declined to transfer a file.
    NoSend = 102,
}

impl MessageCode {
    /// Alias used when flushing buffered informational output.
    pub const FLUSH: Self = Self::Info;

    /// Returns the numeric tag value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Looks up a code from its numeric tag value.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Data),
            1 => Some(Self::ErrorXfer),
            2 => Some(Self::Info),
            3 => Some(Self::Error),
            4 => Some(Self::Warning),
            5 => Some(Self::ErrorSocket),
            6 => Some(Self::Log),
            7 => Some(Self::Client),
            8 => Some(Self::ErrorUtf8),
            9 => Some(Self::Redo),
            10 => Some(Self::Stats),
            22 => Some(Self::IoError),
            33 => Some(Self::IoTimeout),
            42 => Some(Self::NoOp),
            86 => Some(Self::ErrorExit),
            100 => Some(Self::Success),
            101 => Some(Self::Deleted),
            102 => Some(Self::NoSend),
            _ => None,
        }
    }

    /// Returns the upstream identifier for the code.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Data => "MSG_DATA",
            Self::ErrorXfer => "MSG_ERROR_XFER",
            Self::Info => "MSG_INFO",
            Self::Error => "MSG_ERROR",
            Self::Warning => "MSG_WARNING",
            Self::ErrorSocket => "MSG_ERROR_SOCKET",
            Self::Log => "MSG_LOG",
            Self::Client => "MSG_CLIENT",
            Self::ErrorUtf8 => "MSG_ERROR_UTF8",
            Self::Redo => "MSG_REDO",
            Self::Stats => "MSG_STATS",
            Self::IoError => "MSG_IO_ERROR",
            Self::IoTimeout => "MSG_IO_TIMEOUT",
            Self::NoOp => "MSG_NOOP",
            Self::ErrorExit => "MSG_ERROR_EXIT",
            Self::Success => "MSG_SUCCESS",
            Self::Deleted => "MSG_DELETED",
            Self::NoSend => "MSG_NO_SEND",
        }
    }

    /// Reports whether the code carries logging text.
    #[must_use]
    pub const fn is_logging(self) -> bool {
        matches!(
            self,
            Self::ErrorXfer
                | Self::Info
                | Self::Error
                | Self::Warning
                | Self::ErrorSocket
                | Self::ErrorUtf8
                | Self::Log
                | Self::Client
        )
    }

    /// Returns every code sorted by numeric value.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Data,
            Self::ErrorXfer,
            Self::Info,
            Self::Error,
            Self::Warning,
            Self::ErrorSocket,
            Self::Log,
            Self::Client,
            Self::ErrorUtf8,
            Self::Redo,
            Self::Stats,
            Self::IoError,
            Self::IoTimeout,
            Self::NoOp,
            Self::ErrorExit,
            Self::Success,
            Self::Deleted,
            Self::NoSend,
        ]
    }
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<MessageCode> for u8 {
    fn from(code: MessageCode) -> Self {
        code.as_u8()
    }
}

impl TryFrom<u8> for MessageCode {
    type Error = EnvelopeError;

    fn try_from(value: u8) -> Result<Self, EnvelopeError> {
        Self::from_u8(value).ok_or(EnvelopeError::UnknownMessageCode(value))
    }
}

/// Error returned when parsing an unknown message-code name.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("unknown multiplexed message code name: {name:?}")]
pub struct MessageCodeParseError {
    name: String,
}

impl MessageCodeParseError {
    /// Returns the name that failed to parse.
    #[must_use]
    pub fn invalid_name(&self) -> &str {
        &self.name
    }
}

impl FromStr for MessageCode {
    type Err = MessageCodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "MSG_FLUSH" {
            return Ok(Self::FLUSH);
        }
        Self::all()
            .iter()
            .copied()
            .find(|code| code.name() == s)
            .ok_or_else(|| MessageCodeParseError {
                name: s.to_string(),
            })
    }
}

/// Errors reported while encoding or decoding multiplex headers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum EnvelopeError {
    /// The tag byte was below [`MPLEX_BASE`].
    #[error("multiplexed header contained invalid tag byte {0}")]
    InvalidTag(u8),
    /// The tag byte named a message code this implementation does not know.
    #[error("multiplexed header contained unknown message code {0}")]
    UnknownMessageCode(u8),
    /// The payload length exceeded the 24-bit field.
    #[error("multiplexed payload of {0} bytes exceeds the 24-bit length field")]
    OversizedPayload(u32),
    /// Fewer than [`HEADER_LEN`] bytes were available.
    #[error("multiplexed header truncated: {actual} of 4 bytes")]
    TruncatedHeader {
        /// Number of bytes that were available.
        actual: usize,
    },
}

/// The 4-byte multiplex frame header.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct MessageHeader {
    code: MessageCode,
    payload_len: u32,
}

impl MessageHeader {
    /// Creates a header for `code` with the given payload length.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::OversizedPayload`] when `payload_len` does
    /// not fit the 24-bit length field.
    pub const fn new(code: MessageCode, payload_len: u32) -> Result<Self, EnvelopeError> {
        if payload_len > MAX_PAYLOAD_LENGTH {
            return Err(EnvelopeError::OversizedPayload(payload_len));
        }
        Ok(Self { code, payload_len })
    }

    /// Returns the message code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> MessageCode {
        self.code
    }

    /// Returns the payload length.
    #[inline]
    #[must_use]
    pub const fn payload_len(self) -> u32 {
        self.payload_len
    }

    /// Returns the payload length as a `usize`.
    #[inline]
    #[must_use]
    pub const fn payload_len_usize(self) -> usize {
        self.payload_len as usize
    }

    /// Returns the raw 32-bit header word.
    #[must_use]
    pub const fn encode_raw(self) -> u32 {
        (((MPLEX_BASE as u32) + (self.code.as_u8() as u32)) << 24) | self.payload_len
    }

    /// Encodes the header into its little-endian wire bytes.
    #[must_use]
    pub const fn encode(self) -> [u8; HEADER_LEN] {
        self.encode_raw().to_le_bytes()
    }

    /// Decodes a header from a raw 32-bit word.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidTag`] when the tag byte is below
    /// [`MPLEX_BASE`] and [`EnvelopeError::UnknownMessageCode`] when it
    /// names no known code. The payload length is masked to 24 bits.
    pub const fn from_raw(raw: u32) -> Result<Self, EnvelopeError> {
        let tag = (raw >> 24) as u8;
        if tag < MPLEX_BASE {
            return Err(EnvelopeError::InvalidTag(tag));
        }
        let code_value = tag - MPLEX_BASE;
        let Some(code) = MessageCode::from_u8(code_value) else {
            return Err(EnvelopeError::UnknownMessageCode(code_value));
        };
        Ok(Self {
            code,
            payload_len: raw & PAYLOAD_MASK,
        })
    }

    /// Decodes a header from its little-endian wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::TruncatedHeader`] for short input, then the
    /// same failures as [`Self::from_raw`].
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() < HEADER_LEN {
            return Err(EnvelopeError::TruncatedHeader {
                actual: bytes.len(),
            });
        }
        let raw = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Self::from_raw(raw)
    }
}

impl TryFrom<[u8; HEADER_LEN]> for MessageHeader {
    type Error = EnvelopeError;

    fn try_from(bytes: [u8; HEADER_LEN]) -> Result<Self, EnvelopeError> {
        Self::decode(&bytes)
    }
}

impl TryFrom<&[u8; HEADER_LEN]> for MessageHeader {
    type Error = EnvelopeError;

    fn try_from(bytes: &[u8; HEADER_LEN]) -> Result<Self, EnvelopeError> {
        Self::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn header_round_trips_for_all_codes_and_sample_lengths() {
        const PAYLOAD_SAMPLES: [u32; 3] = [0, 1, MAX_PAYLOAD_LENGTH];

        for &code in MessageCode::all() {
            for &len in &PAYLOAD_SAMPLES {
                let header = MessageHeader::new(code, len).expect("constructible header");
                let decoded = MessageHeader::decode(&header.encode()).expect("decode succeeds");
                assert_eq!(decoded.code(), code);
                assert_eq!(decoded.payload_len(), len);
            }
        }
    }

    #[test]
    fn encode_uses_little_endian_layout() {
        let payload_len = 0x00A1_B2C3;
        let header = MessageHeader::new(MessageCode::Info, payload_len).expect("header");
        let expected_raw =
            ((u32::from(MPLEX_BASE) + u32::from(MessageCode::Info.as_u8())) << 24) | payload_len;
        assert_eq!(header.encode(), expected_raw.to_le_bytes());
    }

    #[test]
    fn new_rejects_oversized_payloads() {
        let err = MessageHeader::new(MessageCode::Info, MAX_PAYLOAD_LENGTH + 1).unwrap_err();
        assert_eq!(err, EnvelopeError::OversizedPayload(MAX_PAYLOAD_LENGTH + 1));
    }

    #[test]
    fn decode_rejects_tag_without_base_offset() {
        let raw = (u32::from(MPLEX_BASE - 1) << 24) | 1;
        let err = MessageHeader::decode(&raw.to_le_bytes()).unwrap_err();
        assert_eq!(err, EnvelopeError::InvalidTag(MPLEX_BASE - 1));
    }

    #[test]
    fn decode_rejects_unknown_message_codes() {
        let unknown_code = 11u8;
        let tag = u32::from(MPLEX_BASE) + u32::from(unknown_code);
        let raw = (tag << 24) | 5;
        let err = MessageHeader::decode(&raw.to_le_bytes()).unwrap_err();
        assert_eq!(err, EnvelopeError::UnknownMessageCode(unknown_code));
    }

    #[test]
    fn decode_rejects_truncated_headers() {
        let err = MessageHeader::decode(&[0u8; 2]).unwrap_err();
        assert_eq!(err, EnvelopeError::TruncatedHeader { actual: 2 });
    }

    #[test]
    fn decode_masks_payload_length_to_24_bits() {
        let tag = (u32::from(MPLEX_BASE) + u32::from(MessageCode::Info.as_u8())) << 24;
        let raw = tag | (MAX_PAYLOAD_LENGTH + 1);
        let header = MessageHeader::decode(&raw.to_le_bytes()).expect("masked decode");
        assert_eq!(header.payload_len(), (MAX_PAYLOAD_LENGTH + 1) & PAYLOAD_MASK);
    }

    #[test]
    fn from_raw_round_trips_through_encode_raw() {
        let header = MessageHeader::new(MessageCode::Stats, 0x0055_AA11).expect("header");
        let decoded = MessageHeader::from_raw(header.encode_raw()).expect("raw decodes");
        assert_eq!(decoded, header);
    }

    #[test]
    fn message_code_values_match_upstream_identifiers() {
        use MessageCode::*;

        let expected = [
            (Data, 0, "MSG_DATA"),
            (ErrorXfer, 1, "MSG_ERROR_XFER"),
            (Info, 2, "MSG_INFO"),
            (Error, 3, "MSG_ERROR"),
            (Warning, 4, "MSG_WARNING"),
            (ErrorSocket, 5, "MSG_ERROR_SOCKET"),
            (Log, 6, "MSG_LOG"),
            (Client, 7, "MSG_CLIENT"),
            (ErrorUtf8, 8, "MSG_ERROR_UTF8"),
            (Redo, 9, "MSG_REDO"),
            (Stats, 10, "MSG_STATS"),
            (IoError, 22, "MSG_IO_ERROR"),
            (IoTimeout, 33, "MSG_IO_TIMEOUT"),
            (NoOp, 42, "MSG_NOOP"),
            (ErrorExit, 86, "MSG_ERROR_EXIT"),
            (Success, 100, "MSG_SUCCESS"),
            (Deleted, 101, "MSG_DELETED"),
            (NoSend, 102, "MSG_NO_SEND"),
        ];

        for &(code, value, name) in &expected {
            assert_eq!(code.as_u8(), value);
            assert_eq!(code.name(), name);
            assert_eq!(code.to_string(), name);
            assert_eq!(MessageCode::from_u8(value), Some(code));
        }
    }

    #[test]
    fn message_code_all_is_sorted_by_numeric_value() {
        let all = MessageCode::all();
        for window in all.windows(2) {
            assert!(window[0].as_u8() <= window[1].as_u8());
        }
    }

    #[test]
    fn message_codes_are_hashable() {
        let mut set = HashSet::new();
        assert!(set.insert(MessageCode::Data));
        assert!(set.contains(&MessageCode::Data));
        assert!(!set.insert(MessageCode::Data));
    }

    #[test]
    fn logging_classification_matches_upstream_set() {
        const LOGGING_CODES: &[MessageCode] = &[
            MessageCode::ErrorXfer,
            MessageCode::Info,
            MessageCode::Error,
            MessageCode::Warning,
            MessageCode::ErrorSocket,
            MessageCode::ErrorUtf8,
            MessageCode::Log,
            MessageCode::Client,
        ];

        for &code in MessageCode::all() {
            assert_eq!(code.is_logging(), LOGGING_CODES.contains(&code));
        }
    }

    #[test]
    fn flush_alias_matches_info() {
        assert_eq!(MessageCode::FLUSH, MessageCode::Info);
        let parsed: MessageCode = "MSG_FLUSH".parse().expect("known alias");
        assert_eq!(parsed, MessageCode::Info);
    }

    #[test]
    fn from_str_rejects_unknown_names() {
        let err = "MSG_SOMETHING_ELSE".parse::<MessageCode>().unwrap_err();
        assert_eq!(err.invalid_name(), "MSG_SOMETHING_ELSE");
    }
}
