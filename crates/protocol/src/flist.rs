//! File-list entry wire codec.
//!
//! Entries are delta-encoded against the previously transmitted entry: a
//! per-entry `XMIT_*` flag word records which fields repeat the previous
//! values and which optional fields follow. The encoder and decoder each
//! hold a "previous entry" context that must stay in lockstep, so one
//! codec instance serves exactly one file-list stream.

use std::io::{self, Read, Write};

use crate::version::ProtocolVersion;
use crate::wire::{
    read_byte, read_int, read_varint, read_varint30, read_varlong, read_varlong30, write_byte,
    write_int, write_varint, write_varint30, write_varlong, write_varlong30,
};

/// First entry in a top-level transfer (also reused to keep an otherwise
/// empty flag word non-zero).
pub const XMIT_TOP_DIR: u32 = 1 << 0;
/// Mode equals the previous entry's mode.
pub const XMIT_SAME_MODE: u32 = 1 << 1;
/// A second flag byte follows (protocols 28 and later).
pub const XMIT_EXTENDED_FLAGS: u32 = 1 << 2;
/// Uid equals the previous entry's uid.
pub const XMIT_SAME_UID: u32 = 1 << 3;
/// Gid equals the previous entry's gid.
pub const XMIT_SAME_GID: u32 = 1 << 4;
/// The name shares a prefix with the previous name; the prefix length
/// byte follows.
pub const XMIT_SAME_NAME: u32 = 1 << 5;
/// The name suffix length needs more than one byte.
pub const XMIT_LONG_NAME: u32 = 1 << 6;
/// Mtime equals the previous entry's mtime.
pub const XMIT_SAME_TIME: u32 = 1 << 7;
/// Device major equals the previous entry's (protocols 28+, devices).
pub const XMIT_SAME_RDEV_MAJOR: u32 = 1 << 8;
/// Entry participates in a hard-link group (protocols 28+).
pub const XMIT_HLINKED: u32 = 1 << 9;
/// A user name string follows the uid (protocols 30+).
pub const XMIT_USER_NAME_FOLLOWS: u32 = 1 << 10;
/// A group name string follows the gid (protocols 30+).
pub const XMIT_GROUP_NAME_FOLLOWS: u32 = 1 << 11;
/// First entry of a hard-link group (protocols 30+).
pub const XMIT_HLINK_FIRST: u32 = 1 << 12;
/// Modification time carries a nanosecond field (protocols 31+).
pub const XMIT_MOD_NSEC: u32 = 1 << 13;
/// Access time equals the previous entry's atime.
pub const XMIT_SAME_ATIME: u32 = 1 << 14;
/// Creation time equals the mtime.
pub const XMIT_CRTIME_EQ_MTIME: u32 = 1 << 16;

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
const S_IFLNK: u32 = 0o120000;
const S_IFCHR: u32 = 0o020000;
const S_IFBLK: u32 = 0o060000;

/// Longest shared-prefix length a single byte can express.
const MAX_NAME_PREFIX: usize = 255;

/// A wire-oriented file-list entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileEntry {
    /// Relative path, UTF-8.
    pub name: String,
    /// File length in bytes.
    pub length: i64,
    /// Wire-canonical mode bits.
    pub mode: u32,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
    /// Optional user name transmitted alongside the uid.
    pub user_name: Option<String>,
    /// Optional group name transmitted alongside the gid.
    pub group_name: Option<String>,
    /// Modification time in seconds.
    pub mtime: i64,
    /// Nanosecond part of the modification time (protocols 31+).
    pub mtime_nsec: Option<u32>,
    /// Access time in seconds, when atimes are preserved.
    pub atime: Option<i64>,
    /// Creation time in seconds, when crtimes are preserved.
    pub crtime: Option<i64>,
    /// Device numbers for device and special entries.
    pub rdev: Option<(u32, u32)>,
    /// Symlink target, when links are preserved.
    pub link_target: Option<String>,
}

impl FileEntry {
    /// Creates a regular-file entry with the common fields populated.
    #[must_use]
    pub fn regular(name: impl Into<String>, length: i64, mode: u32, mtime: i64) -> Self {
        Self {
            name: name.into(),
            length,
            mode,
            uid: 0,
            gid: 0,
            user_name: None,
            group_name: None,
            mtime,
            mtime_nsec: None,
            atime: None,
            crtime: None,
            rdev: None,
            link_target: None,
        }
    }

    /// Reports whether the mode names a directory.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    /// Reports whether the mode names a symlink.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
    }

    /// Reports whether the mode names a character or block device.
    #[must_use]
    pub const fn is_device(&self) -> bool {
        matches!(self.mode & S_IFMT, S_IFCHR | S_IFBLK)
    }
}

/// Options fixing the optional-field layout of a file-list stream.
///
/// Both sides of a session must derive identical options from the
/// negotiation outcome or the stateful codecs fall out of step.
#[derive(Clone, Copy, Debug)]
pub struct FileEntryCodecOptions {
    /// Negotiated protocol version.
    pub protocol: ProtocolVersion,
    /// Flag words are varints (`CF_VARINT_FLIST_FLAGS` negotiated).
    pub xfer_flags_as_varint: bool,
    /// Uids (and optional user names) are transmitted.
    pub preserve_uid: bool,
    /// Gids (and optional group names) are transmitted.
    pub preserve_gid: bool,
    /// Symlink targets are transmitted.
    pub preserve_links: bool,
    /// Device numbers are transmitted.
    pub preserve_devices: bool,
    /// Access times are transmitted.
    pub atimes: bool,
    /// Creation times are transmitted.
    pub crtimes: bool,
}

impl FileEntryCodecOptions {
    /// Creates options for the given protocol with every optional field
    /// disabled.
    #[must_use]
    pub const fn new(protocol: ProtocolVersion) -> Self {
        Self {
            protocol,
            xfer_flags_as_varint: false,
            preserve_uid: false,
            preserve_gid: false,
            preserve_links: false,
            preserve_devices: false,
            atimes: false,
            crtimes: false,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct PreviousEntry {
    name: Vec<u8>,
    mode: u32,
    uid: u32,
    gid: u32,
    mtime: i64,
    atime: i64,
    crtime: i64,
    rdev_major: u32,
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter()
        .zip(b.iter())
        .take_while(|(x, y)| x == y)
        .count()
        .min(MAX_NAME_PREFIX)
}

fn protocol_error(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

/// Stateful file-entry encoder.
#[derive(Debug)]
pub struct FileEntryEncoder {
    opts: FileEntryCodecOptions,
    prev: PreviousEntry,
}

impl FileEntryEncoder {
    /// Creates an encoder with an empty previous-entry context.
    #[must_use]
    pub fn new(opts: FileEntryCodecOptions) -> Self {
        debug_assert!(
            !opts.xfer_flags_as_varint || opts.protocol.uses_varint(),
            "varint flag words require protocol 30"
        );
        Self {
            opts,
            prev: PreviousEntry::default(),
        }
    }

    /// Encodes one entry against the previous-entry context.
    ///
    /// # Errors
    ///
    /// Propagates writer failures; entries whose fields cannot be
    /// represented at the negotiated protocol surface as
    /// [`io::ErrorKind::InvalidInput`].
    pub fn encode<W: Write>(&mut self, writer: &mut W, entry: &FileEntry) -> io::Result<()> {
        let opts = self.opts;
        let protocol = opts.protocol;
        let name = entry.name.as_bytes();

        let mut xflags = 0u32;
        if entry.mode == self.prev.mode {
            xflags |= XMIT_SAME_MODE;
        }
        if !opts.preserve_uid || entry.uid == self.prev.uid {
            xflags |= XMIT_SAME_UID;
        } else if protocol.uses_varint() && entry.user_name.is_some() {
            xflags |= XMIT_USER_NAME_FOLLOWS;
        }
        if !opts.preserve_gid || entry.gid == self.prev.gid {
            xflags |= XMIT_SAME_GID;
        } else if protocol.uses_varint() && entry.group_name.is_some() {
            xflags |= XMIT_GROUP_NAME_FOLLOWS;
        }
        if entry.mtime == self.prev.mtime {
            xflags |= XMIT_SAME_TIME;
        }
        if protocol.as_u8() >= 31 && entry.mtime_nsec.is_some() {
            xflags |= XMIT_MOD_NSEC;
        }
        if opts.crtimes && entry.crtime.unwrap_or(entry.mtime) == entry.mtime {
            xflags |= XMIT_CRTIME_EQ_MTIME;
        }
        if opts.atimes && !entry.is_dir() && entry.atime.unwrap_or(0) == self.prev.atime {
            xflags |= XMIT_SAME_ATIME;
        }
        let send_rdev = opts.preserve_devices && entry.is_device();
        if send_rdev
            && protocol.as_u8() >= 28
            && entry.rdev.map(|(major, _)| major) == Some(self.prev.rdev_major)
        {
            xflags |= XMIT_SAME_RDEV_MAJOR;
        }

        let l1 = common_prefix_len(&self.prev.name, name);
        let l2 = name.len() - l1;
        if l1 > 0 {
            xflags |= XMIT_SAME_NAME;
        }
        if l2 > 255 {
            xflags |= XMIT_LONG_NAME;
        }

        // A zero flag word would read as the end-of-list sentinel.
        if xflags == 0 {
            xflags |= XMIT_TOP_DIR;
        }

        if opts.xfer_flags_as_varint {
            write_varint(writer, xflags as i32)?;
        } else if protocol.as_u8() >= 28 {
            let mut flags = xflags;
            if flags & !0xFF != 0 || flags & 0xFF == 0 {
                flags |= XMIT_EXTENDED_FLAGS;
                if flags > 0xFFFF {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("flag word {flags:#x} does not fit the two-byte form"),
                    ));
                }
                write_byte(writer, (flags & 0xFF) as u8)?;
                write_byte(writer, (flags >> 8) as u8)?;
            } else {
                write_byte(writer, (flags & 0xFF) as u8)?;
            }
            xflags = flags;
        } else {
            if xflags & !0xFF != 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("flag word {xflags:#x} does not fit protocol {protocol}"),
                ));
            }
            write_byte(writer, (xflags & 0xFF) as u8)?;
        }

        if xflags & XMIT_SAME_NAME != 0 {
            write_byte(writer, l1 as u8)?;
        }
        if xflags & XMIT_LONG_NAME != 0 {
            write_varint30(writer, protocol, l2 as i32)?;
        } else {
            write_byte(writer, l2 as u8)?;
        }
        writer.write_all(&name[l1..])?;

        write_varlong30(writer, protocol, entry.length, 3)?;

        if xflags & XMIT_SAME_TIME == 0 {
            if protocol.uses_varint() {
                write_varlong(writer, entry.mtime, 4)?;
            } else {
                write_int(writer, entry.mtime as i32)?;
            }
        }
        if xflags & XMIT_MOD_NSEC != 0 {
            write_varint(writer, entry.mtime_nsec.unwrap_or(0) as i32)?;
        }
        if opts.crtimes && xflags & XMIT_CRTIME_EQ_MTIME == 0 {
            write_varlong(writer, entry.crtime.unwrap_or(0), 4)?;
        }
        if xflags & XMIT_SAME_MODE == 0 {
            write_int(writer, entry.mode as i32)?;
        }
        if opts.atimes && !entry.is_dir() && xflags & XMIT_SAME_ATIME == 0 {
            write_varlong(writer, entry.atime.unwrap_or(0), 4)?;
        }

        if opts.preserve_uid && xflags & XMIT_SAME_UID == 0 {
            if protocol.uses_varint() {
                write_varint(writer, entry.uid as i32)?;
            } else {
                write_int(writer, entry.uid as i32)?;
            }
            if xflags & XMIT_USER_NAME_FOLLOWS != 0 {
                let user = entry.user_name.as_deref().unwrap_or_default().as_bytes();
                write_byte(writer, user.len().min(255) as u8)?;
                writer.write_all(&user[..user.len().min(255)])?;
            }
        }
        if opts.preserve_gid && xflags & XMIT_SAME_GID == 0 {
            if protocol.uses_varint() {
                write_varint(writer, entry.gid as i32)?;
            } else {
                write_int(writer, entry.gid as i32)?;
            }
            if xflags & XMIT_GROUP_NAME_FOLLOWS != 0 {
                let group = entry.group_name.as_deref().unwrap_or_default().as_bytes();
                write_byte(writer, group.len().min(255) as u8)?;
                writer.write_all(&group[..group.len().min(255)])?;
            }
        }

        if send_rdev {
            let (major, minor) = entry.rdev.unwrap_or((0, 0));
            if protocol.as_u8() < 28 {
                write_int(writer, ((major << 8) | (minor & 0xFF)) as i32)?;
            } else {
                if xflags & XMIT_SAME_RDEV_MAJOR == 0 {
                    write_varint30(writer, protocol, major as i32)?;
                }
                if protocol.uses_varint() {
                    write_varint(writer, minor as i32)?;
                } else {
                    write_int(writer, minor as i32)?;
                }
            }
        }

        if opts.preserve_links && entry.is_symlink() {
            let target = entry.link_target.as_deref().unwrap_or_default().as_bytes();
            write_varint30(writer, protocol, target.len() as i32)?;
            writer.write_all(target)?;
        }

        self.remember(entry, name);
        Ok(())
    }

    /// Writes the end-of-list sentinel.
    ///
    /// # Errors
    ///
    /// Propagates writer failures.
    pub fn finish<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        if self.opts.xfer_flags_as_varint {
            write_varint(writer, 0)?;
            write_varint(writer, 0)
        } else {
            write_byte(writer, 0)
        }
    }

    fn remember(&mut self, entry: &FileEntry, name: &[u8]) {
        self.prev.name = name.to_vec();
        self.prev.mode = entry.mode;
        self.prev.uid = entry.uid;
        self.prev.gid = entry.gid;
        self.prev.mtime = entry.mtime;
        if let Some(atime) = entry.atime {
            self.prev.atime = atime;
        }
        if let Some(crtime) = entry.crtime {
            self.prev.crtime = crtime;
        }
        if let Some((major, _)) = entry.rdev {
            self.prev.rdev_major = major;
        }
    }
}

/// Stateful file-entry decoder.
#[derive(Debug)]
pub struct FileEntryDecoder {
    opts: FileEntryCodecOptions,
    prev: PreviousEntry,
}

impl FileEntryDecoder {
    /// Creates a decoder with an empty previous-entry context.
    #[must_use]
    pub fn new(opts: FileEntryCodecOptions) -> Self {
        Self {
            opts,
            prev: PreviousEntry::default(),
        }
    }

    /// Decodes the next entry, or `None` at the end-of-list sentinel.
    ///
    /// # Errors
    ///
    /// Malformed entries surface as [`io::ErrorKind::InvalidData`]; reader
    /// failures propagate.
    pub fn decode<R: Read>(&mut self, reader: &mut R) -> io::Result<Option<FileEntry>> {
        let opts = self.opts;
        let protocol = opts.protocol;

        let xflags = if opts.xfer_flags_as_varint {
            let first = read_varint(reader)?;
            if first == 0 {
                let second = read_varint(reader)?;
                if second != 0 {
                    return Err(protocol_error(format!(
                        "end-of-list sentinel followed by non-zero flag word {second:#x}"
                    )));
                }
                return Ok(None);
            }
            first as u32
        } else {
            let first = read_byte(reader)?;
            if first == 0 {
                return Ok(None);
            }
            let mut flags = u32::from(first);
            if protocol.as_u8() >= 28 && flags & XMIT_EXTENDED_FLAGS != 0 {
                flags |= u32::from(read_byte(reader)?) << 8;
            }
            flags
        };

        let l1 = if xflags & XMIT_SAME_NAME != 0 {
            usize::from(read_byte(reader)?)
        } else {
            0
        };
        if l1 > self.prev.name.len() {
            return Err(protocol_error(format!(
                "name prefix of {l1} bytes exceeds the {} byte previous name",
                self.prev.name.len()
            )));
        }
        let l2 = if xflags & XMIT_LONG_NAME != 0 {
            let len = read_varint30(reader, protocol)?;
            usize::try_from(len)
                .map_err(|_| protocol_error(format!("negative name suffix length {len}")))?
        } else {
            usize::from(read_byte(reader)?)
        };
        let mut name_bytes = Vec::with_capacity(l1 + l2);
        name_bytes.extend_from_slice(&self.prev.name[..l1]);
        let start = name_bytes.len();
        name_bytes.resize(start + l2, 0);
        reader.read_exact(&mut name_bytes[start..])?;
        let name = String::from_utf8(name_bytes.clone())
            .map_err(|_| protocol_error("file name is not valid UTF-8".to_string()))?;

        let length = read_varlong30(reader, protocol, 3)?;
        if length < 0 {
            return Err(protocol_error(format!("negative file length {length}")));
        }

        let mtime = if xflags & XMIT_SAME_TIME != 0 {
            self.prev.mtime
        } else if protocol.uses_varint() {
            read_varlong(reader, 4)?
        } else {
            i64::from(read_int(reader)?)
        };
        let mtime_nsec = if xflags & XMIT_MOD_NSEC != 0 {
            Some(read_varint(reader)? as u32)
        } else {
            None
        };
        let crtime = if opts.crtimes {
            if xflags & XMIT_CRTIME_EQ_MTIME != 0 {
                Some(mtime)
            } else {
                Some(read_varlong(reader, 4)?)
            }
        } else {
            None
        };

        let mode = if xflags & XMIT_SAME_MODE != 0 {
            self.prev.mode
        } else {
            read_int(reader)? as u32
        };
        let is_dir = mode & S_IFMT == S_IFDIR;

        let atime = if opts.atimes && !is_dir {
            if xflags & XMIT_SAME_ATIME != 0 {
                Some(self.prev.atime)
            } else {
                Some(read_varlong(reader, 4)?)
            }
        } else {
            None
        };

        let mut user_name = None;
        let uid = if !opts.preserve_uid || xflags & XMIT_SAME_UID != 0 {
            self.prev.uid
        } else {
            let uid = if protocol.uses_varint() {
                read_varint(reader)?
            } else {
                read_int(reader)?
            } as u32;
            if xflags & XMIT_USER_NAME_FOLLOWS != 0 {
                user_name = Some(read_short_name(reader)?);
            }
            uid
        };
        let mut group_name = None;
        let gid = if !opts.preserve_gid || xflags & XMIT_SAME_GID != 0 {
            self.prev.gid
        } else {
            let gid = if protocol.uses_varint() {
                read_varint(reader)?
            } else {
                read_int(reader)?
            } as u32;
            if xflags & XMIT_GROUP_NAME_FOLLOWS != 0 {
                group_name = Some(read_short_name(reader)?);
            }
            gid
        };

        let is_device = matches!(mode & S_IFMT, S_IFCHR | S_IFBLK);
        let rdev = if opts.preserve_devices && is_device {
            if protocol.as_u8() < 28 {
                let combined = read_int(reader)? as u32;
                Some((combined >> 8, combined & 0xFF))
            } else {
                let major = if xflags & XMIT_SAME_RDEV_MAJOR != 0 {
                    self.prev.rdev_major
                } else {
                    read_varint30(reader, protocol)? as u32
                };
                let minor = if protocol.uses_varint() {
                    read_varint(reader)?
                } else {
                    read_int(reader)?
                } as u32;
                Some((major, minor))
            }
        } else {
            None
        };

        let is_symlink = mode & S_IFMT == S_IFLNK;
        let link_target = if opts.preserve_links && is_symlink {
            let len = read_varint30(reader, protocol)?;
            let len = usize::try_from(len)
                .map_err(|_| protocol_error(format!("negative symlink length {len}")))?;
            let mut target = vec![0u8; len];
            reader.read_exact(&mut target)?;
            Some(
                String::from_utf8(target)
                    .map_err(|_| protocol_error("symlink target is not valid UTF-8".to_string()))?,
            )
        } else {
            None
        };

        let entry = FileEntry {
            name,
            length,
            mode,
            uid,
            gid,
            user_name,
            group_name,
            mtime,
            mtime_nsec,
            atime,
            crtime,
            rdev,
            link_target,
        };
        self.prev.name = name_bytes;
        self.prev.mode = entry.mode;
        self.prev.uid = entry.uid;
        self.prev.gid = entry.gid;
        self.prev.mtime = entry.mtime;
        if let Some(atime) = entry.atime {
            self.prev.atime = atime;
        }
        if let Some(crtime) = entry.crtime {
            self.prev.crtime = crtime;
        }
        if let Some((major, _)) = entry.rdev {
            self.prev.rdev_major = major;
        }
        Ok(Some(entry))
    }
}

fn read_short_name<R: Read>(reader: &mut R) -> io::Result<String> {
    let len = usize::from(read_byte(reader)?);
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes)
        .map_err(|_| protocol_error("id name is not valid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn protocol(version: u8) -> ProtocolVersion {
        ProtocolVersion::try_from(version).expect("valid version")
    }

    fn round_trip(opts: FileEntryCodecOptions, entries: &[FileEntry]) -> Vec<FileEntry> {
        let mut encoder = FileEntryEncoder::new(opts);
        let mut wire = Vec::new();
        for entry in entries {
            encoder.encode(&mut wire, entry).expect("encode");
        }
        encoder.finish(&mut wire).expect("finish");

        let mut decoder = FileEntryDecoder::new(opts);
        let mut cursor = Cursor::new(wire);
        let mut decoded = Vec::new();
        while let Some(entry) = decoder.decode(&mut cursor).expect("decode") {
            decoded.push(entry);
        }
        decoded
    }

    #[test]
    fn minimal_entries_round_trip_at_protocol_30() {
        let opts = FileEntryCodecOptions::new(protocol(30));
        let entries = vec![
            FileEntry::regular("alpha.txt", 1234, 0o100644, 1_700_000_000),
            FileEntry::regular("alpha.txt.bak", 99, 0o100644, 1_700_000_000),
            FileEntry::regular("beta/gamma.log", 0, 0o100600, 1_699_999_999),
        ];
        assert_eq!(round_trip(opts, &entries), entries);
    }

    #[test]
    fn name_prefix_compression_is_applied() {
        let opts = FileEntryCodecOptions::new(protocol(31));
        let first = FileEntry::regular("dir/deeply/nested/file-one", 1, 0o100644, 10);
        let second = FileEntry::regular("dir/deeply/nested/file-two", 2, 0o100644, 10);

        let mut encoder = FileEntryEncoder::new(opts);
        let mut wire = Vec::new();
        encoder.encode(&mut wire, &first).expect("encode");
        let first_len = wire.len();
        encoder.encode(&mut wire, &second).expect("encode");
        let second_len = wire.len() - first_len;
        assert!(
            second_len < first_len,
            "shared prefix should shrink the second entry ({second_len} vs {first_len})"
        );

        assert_eq!(round_trip(opts, &[first.clone(), second.clone()]), [first, second]);
    }

    #[test]
    fn long_name_suffixes_round_trip() {
        let opts = FileEntryCodecOptions::new(protocol(30));
        let long = "x".repeat(300);
        let entries = vec![
            FileEntry::regular(long.clone(), 7, 0o100644, 42),
            FileEntry::regular(format!("{long}-sibling"), 8, 0o100644, 42),
        ];
        assert_eq!(round_trip(opts, &entries), entries);
    }

    #[test]
    fn uid_gid_and_names_round_trip_in_varint_mode() {
        let mut opts = FileEntryCodecOptions::new(protocol(31));
        opts.xfer_flags_as_varint = true;
        opts.preserve_uid = true;
        opts.preserve_gid = true;

        let mut first = FileEntry::regular("owned", 10, 0o100644, 5);
        first.uid = 1000;
        first.gid = 1000;
        first.user_name = Some("alice".to_string());
        first.group_name = Some("staff".to_string());
        let mut second = FileEntry::regular("owned-too", 11, 0o100644, 5);
        second.uid = 1000;
        second.gid = 1000;

        assert_eq!(
            round_trip(opts, &[first.clone(), second.clone()]),
            [first, second]
        );
    }

    #[test]
    fn symlinks_and_devices_round_trip() {
        let mut opts = FileEntryCodecOptions::new(protocol(31));
        opts.preserve_links = true;
        opts.preserve_devices = true;

        let mut link = FileEntry::regular("bin/sh", 9, 0o120777, 1);
        link.link_target = Some("dash".to_string());
        let mut tty = FileEntry::regular("dev/tty1", 0, 0o020600, 1);
        tty.rdev = Some((4, 1));
        let mut tty2 = FileEntry::regular("dev/tty2", 0, 0o020600, 1);
        tty2.rdev = Some((4, 2));

        assert_eq!(
            round_trip(opts, &[link.clone(), tty.clone(), tty2.clone()]),
            [link, tty, tty2]
        );
    }

    #[test]
    fn nanoseconds_atimes_and_crtimes_round_trip() {
        let mut opts = FileEntryCodecOptions::new(protocol(32));
        opts.xfer_flags_as_varint = true;
        opts.atimes = true;
        opts.crtimes = true;

        let mut first = FileEntry::regular("stamps", 1, 0o100644, 1_700_000_000);
        first.mtime_nsec = Some(123_456_789);
        first.atime = Some(1_700_000_100);
        first.crtime = Some(1_650_000_000);
        let mut second = FileEntry::regular("stamps2", 2, 0o100644, 1_700_000_001);
        second.atime = Some(1_700_000_100);
        second.crtime = Some(1_700_000_001);

        assert_eq!(
            round_trip(opts, &[first.clone(), second.clone()]),
            [first, second]
        );
    }

    #[test]
    fn byte_mode_flag_words_round_trip_at_protocol_29() {
        let opts = FileEntryCodecOptions::new(protocol(29));
        let entries = vec![
            FileEntry::regular("legacy-a", 100, 0o100644, 1_000_000),
            FileEntry::regular("legacy-b", 200, 0o100755, 1_000_000),
        ];
        assert_eq!(round_trip(opts, &entries), entries);
    }

    #[test]
    fn decoder_rejects_name_prefix_beyond_previous_name() {
        let opts = FileEntryCodecOptions::new(protocol(30));
        let mut wire = Vec::new();
        // SAME_NAME with a 10-byte prefix, but no previous entry exists.
        write_byte(&mut wire, (XMIT_SAME_NAME & 0xFF) as u8).expect("flags");
        write_byte(&mut wire, 10).expect("l1");
        write_byte(&mut wire, 0).expect("l2");

        let mut decoder = FileEntryDecoder::new(opts);
        let err = decoder.decode(&mut Cursor::new(wire)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn decoder_rejects_missing_sentinel_pair_in_varint_mode() {
        let mut opts = FileEntryCodecOptions::new(protocol(31));
        opts.xfer_flags_as_varint = true;

        let mut wire = Vec::new();
        write_varint(&mut wire, 0).expect("first zero");
        write_varint(&mut wire, 5).expect("bogus second word");

        let mut decoder = FileEntryDecoder::new(opts);
        let err = decoder.decode(&mut Cursor::new(wire)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn sentinel_terminates_the_stream() {
        let opts = FileEntryCodecOptions::new(protocol(30));
        assert_eq!(round_trip(opts, &[]), []);
    }
}
