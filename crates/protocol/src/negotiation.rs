//! Session negotiation: protocol versions, compat flags, algorithm names,
//! and the checksum seed.
//!
//! Both sides write their protocol version and read the peer's; the
//! session runs at the minimum of the two. From protocol 30 on the server
//! sends a varint of `CF_*` compat bits, and when
//! [`CompatFlags::VARINT_FLIST_FLAGS`] is negotiated both sides exchange
//! space-separated preference lists for the strong checksum and (when
//! compression is enabled) the compression algorithm. The server finally
//! sends the 32-bit checksum seed.
//!
//! Algorithm selection is deliberately asymmetric in code but symmetric in
//! outcome: the server stops at the first client-listed name it also
//! supports, and the client picks the earliest name of its own list that
//! the server also listed. Both walks follow the client's preference
//! order, so the two sides converge on the same choice whenever the lists
//! overlap at all.

use std::io::{self, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use rustc_hash::FxHashSet;
use thiserror::Error;

use compress::CompressionAlgorithm;
use logging::{debug_event, DebugFlag};

use crate::version::{negotiated_version, ProtocolVersion};
use crate::wire::{read_int, read_varint, read_vstring, write_int, write_varint, write_vstring};

/// Longest algorithm-preference list accepted from a peer.
const MAX_NEGOTIATED_STRING: usize = 256;

/// Compat flag bits exchanged at protocol 30 and later.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct CompatFlags(u32);

impl CompatFlags {
    /// Incremental recursion is supported.
    pub const INC_RECURSE: Self = Self(1 << 0);
    /// Symlink mtimes are preserved.
    pub const SYMLINK_TIMES: Self = Self(1 << 1);
    /// Symlink targets pass through character-set conversion.
    pub const SYMLINK_ICONV: Self = Self(1 << 2);
    /// File-list entries are checked for unsafe paths.
    pub const SAFE_FLIST: Self = Self(1 << 3);
    /// The xattr-optimization workaround is required.
    pub const AVOID_XATTR_OPTIM: Self = Self(1 << 4);
    /// The md5 seed is hashed before the data (proper order).
    pub const CHKSUM_SEED_FIX: Self = Self(1 << 5);
    /// In-place updates may use a partial-dir copy.
    pub const INPLACE_PARTIAL_DIR: Self = Self(1 << 6);
    /// File-list flag words are varints; implies negotiated strings.
    pub const VARINT_FLIST_FLAGS: Self = Self(1 << 7);
    /// Uid/gid 0 may transmit names.
    pub const ID0_NAMES: Self = Self(1 << 8);

    /// Returns the empty flag set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Creates a flag set from its raw wire value.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw wire value.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Reports whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for CompatFlags {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        self.union(other)
    }
}

/// Which side of the handshake this engine is running.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    /// The side that derives and sends the compat flags and the seed.
    Server,
    /// The side that reads the compat flags and the seed.
    Client,
}

/// Local configuration feeding the handshake.
#[derive(Clone, Debug)]
pub struct NegotiationOptions {
    /// Which side of the handshake to run.
    pub role: Role,
    /// Local protocol version (usually [`ProtocolVersion::NEWEST`]).
    pub protocol: ProtocolVersion,
    /// Local subprotocol (non-zero only for pre-release builds).
    pub subprotocol: u8,
    /// Peer subprotocol, when known from an outer greeting exchange.
    pub peer_subprotocol: u8,
    /// Compat flags the server derives for the session (ignored by the
    /// client role).
    pub compat_flags: CompatFlags,
    /// Strong-checksum preference names, most preferred first.
    pub checksum_preferences: Vec<String>,
    /// Fixed checksum choice; skips the string exchange when set.
    pub checksum_choice: Option<String>,
    /// Whether a compression algorithm should be negotiated.
    pub compression_enabled: bool,
    /// Compression preference names, most preferred first.
    pub compression_preferences: Vec<String>,
    /// Fixed compression choice; skips the string exchange when set.
    pub compression_choice: Option<CompressionAlgorithm>,
    /// Checksum seed the server sends (a random positive seed is
    /// generated when `None`).
    pub seed: Option<i32>,
}

impl NegotiationOptions {
    /// Creates options for the given role with this build's defaults.
    #[must_use]
    pub fn new(role: Role) -> Self {
        let checksum_preferences = ["xxh128", "xxh3", "xxh64", "md5", "md4"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let compression_preferences = CompressionAlgorithm::available()
            .iter()
            .map(|algorithm| algorithm.name().to_string())
            .collect();
        Self {
            role,
            protocol: ProtocolVersion::NEWEST,
            subprotocol: 0,
            peer_subprotocol: 0,
            compat_flags: CompatFlags::CHKSUM_SEED_FIX | CompatFlags::VARINT_FLIST_FLAGS,
            checksum_preferences,
            checksum_choice: None,
            compression_enabled: false,
            compression_preferences,
            compression_choice: None,
            seed: None,
        }
    }
}

/// The immutable outcome of a completed handshake.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NegotiatedSession {
    /// Protocol version the session runs at.
    pub protocol: ProtocolVersion,
    /// Compat flags in effect (empty below protocol 30).
    pub compat_flags: CompatFlags,
    /// Negotiated strong-checksum name.
    pub checksum: String,
    /// Negotiated compression algorithm.
    pub compression: CompressionAlgorithm,
    /// Checksum seed for the session.
    pub seed: i32,
}

impl NegotiatedSession {
    /// Reports whether file-list flag words are varints.
    #[must_use]
    pub const fn xfer_flags_as_varint(&self) -> bool {
        self.compat_flags.contains(CompatFlags::VARINT_FLIST_FLAGS)
    }

    /// Reports whether the md5 seed is hashed before the data.
    #[must_use]
    pub const fn proper_seed_order(&self) -> bool {
        self.compat_flags.contains(CompatFlags::CHKSUM_SEED_FIX)
    }
}

/// Errors reported by the handshake.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The peer advertised a version outside the supported wire range.
    #[error("peer protocol version {version} is outside the supported range 20-40")]
    PeerVersionOutOfRange {
        /// The version the peer advertised.
        version: i32,
    },
    /// The checksum preference lists share no name.
    #[error("no mutual checksum algorithm: local {local:?}, peer {peer:?}")]
    NoMutualChecksum {
        /// The local preference list.
        local: Vec<String>,
        /// The peer's preference list.
        peer: Vec<String>,
    },
    /// The compression preference lists share no name.
    #[error("no mutual compression algorithm: local {local:?}, peer {peer:?}")]
    NoMutualCompression {
        /// The local preference list.
        local: Vec<String>,
        /// The peer's preference list.
        peer: Vec<String>,
    },
    /// A peer list contained bytes that were not valid UTF-8.
    #[error("peer preference list is not valid UTF-8")]
    MalformedPeerList,
    /// The transport failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Selects the mutually acceptable name both sides converge on.
///
/// The walk follows the client's preference order and returns the first
/// name the server also lists; the server calls this with the peer's list
/// first and the client with its own list first, which is the same walk.
#[must_use]
pub fn select_algorithm<'a>(
    client_list: &'a [String],
    server_list: &[String],
) -> Option<&'a str> {
    let server_names: FxHashSet<&str> = server_list.iter().map(String::as_str).collect();
    client_list
        .iter()
        .map(String::as_str)
        .find(|name| server_names.contains(name))
}

fn generate_seed() -> i32 {
    // Matches upstream's habit of seeding from the clock and pid; the seed
    // only has to differ between sessions, not be unpredictable.
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or(0);
    let mixed = nanos ^ std::process::id();
    ((mixed & 0x7FFF_FFFF) | 1) as i32
}

fn exchange_list<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    local: &[String],
) -> Result<Vec<String>, NegotiationError> {
    let joined = local.join(" ");
    write_vstring(writer, joined.as_bytes())?;
    writer.flush()?;
    let peer_raw = read_vstring(reader, MAX_NEGOTIATED_STRING)?;
    let peer_text =
        String::from_utf8(peer_raw).map_err(|_| NegotiationError::MalformedPeerList)?;
    Ok(peer_text
        .split_ascii_whitespace()
        .map(ToString::to_string)
        .collect())
}

/// Runs the handshake over the supplied transports.
///
/// # Errors
///
/// Returns [`NegotiationError::PeerVersionOutOfRange`] for unsupported
/// peers, the `NoMutual*` variants when a preference exchange finds no
/// overlap, and I/O failures from the transports.
pub fn negotiate<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    options: &NegotiationOptions,
) -> Result<NegotiatedSession, NegotiationError> {
    write_int(writer, options.protocol.as_i32())?;
    writer.flush()?;
    let peer_raw = read_int(reader)?;
    let peer = ProtocolVersion::try_from(peer_raw)
        .map_err(|_| NegotiationError::PeerVersionOutOfRange { version: peer_raw })?;

    let subprotocols_differ = options.subprotocol != options.peer_subprotocol;
    let protocol = negotiated_version(options.protocol, peer, subprotocols_differ);
    debug_event(DebugFlag::Proto, 1, || {
        format!("negotiated protocol {protocol} (local {}, peer {peer})", options.protocol)
    });

    let compat_flags = if protocol.uses_varint() {
        match options.role {
            Role::Server => {
                write_varint(writer, options.compat_flags.bits() as i32)?;
                writer.flush()?;
                options.compat_flags
            }
            Role::Client => CompatFlags::from_bits(read_varint(reader)? as u32),
        }
    } else {
        CompatFlags::empty()
    };

    let negotiated_strings = compat_flags.contains(CompatFlags::VARINT_FLIST_FLAGS);

    let checksum = if let Some(choice) = &options.checksum_choice {
        choice.clone()
    } else if negotiated_strings {
        let peer_list = exchange_list(reader, writer, &options.checksum_preferences)?;
        let (client_list, server_list): (&[String], &[String]) = match options.role {
            Role::Server => (&peer_list, &options.checksum_preferences),
            Role::Client => (&options.checksum_preferences, &peer_list),
        };
        select_algorithm(client_list, server_list)
            .map(ToString::to_string)
            .ok_or_else(|| NegotiationError::NoMutualChecksum {
                local: options.checksum_preferences.clone(),
                peer: peer_list.clone(),
            })?
    } else if protocol.as_u8() >= 30 {
        "md5".to_string()
    } else {
        "md4".to_string()
    };

    let compression = if !options.compression_enabled {
        CompressionAlgorithm::None
    } else if let Some(choice) = options.compression_choice {
        choice
    } else if negotiated_strings {
        let peer_list = exchange_list(reader, writer, &options.compression_preferences)?;
        let (client_list, server_list): (&[String], &[String]) = match options.role {
            Role::Server => (&peer_list, &options.compression_preferences),
            Role::Client => (&options.compression_preferences, &peer_list),
        };
        let name = select_algorithm(client_list, server_list)
            .map(ToString::to_string)
            .ok_or_else(|| NegotiationError::NoMutualCompression {
                local: options.compression_preferences.clone(),
                peer: peer_list.clone(),
            })?;
        name.parse()
            .map_err(|_| NegotiationError::NoMutualCompression {
                local: options.compression_preferences.clone(),
                peer: peer_list,
            })?
    } else {
        CompressionAlgorithm::Zlib
    };

    let seed = match options.role {
        Role::Server => {
            let seed = options.seed.unwrap_or_else(generate_seed);
            write_int(writer, seed)?;
            writer.flush()?;
            seed
        }
        Role::Client => read_int(reader)?,
    };
    debug_event(DebugFlag::Proto, 1, || {
        format!("session: checksum {checksum}, compression {compression}, seed {seed:#x}")
    });

    Ok(NegotiatedSession {
        protocol,
        compat_flags,
        checksum,
        compression,
        seed,
    })
}
