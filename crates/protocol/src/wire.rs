//! Little-endian integer and string codecs.
//!
//! Fixed-width `int32`/`int64` values are two's complement little-endian.
//! The `varint`/`varlong` encodings pack a signed value into one prefix
//! byte plus a variable number of little-endian payload bytes: the count of
//! leading one bits in the prefix gives the number of extra bytes beyond
//! the caller's minimum, and the prefix's remaining low bits carry the
//! value's highest byte. `varint30`/`varlong30` dispatch between the fixed
//! and variable forms at protocol 30.

use std::io::{self, Read, Write};

use crate::version::ProtocolVersion;

/// Longest vstring payload the two-byte length form can carry.
pub const MAX_VSTRING_LEN: usize = 0x7FFF;

/// Writes a little-endian `int32`.
///
/// # Errors
///
/// Propagates writer failures.
pub fn write_int<W: Write>(writer: &mut W, value: i32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Reads a little-endian `int32`.
///
/// # Errors
///
/// Propagates reader failures; short input surfaces as
/// [`io::ErrorKind::UnexpectedEof`].
pub fn read_int<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes))
}

/// Writes a little-endian `int64`.
///
/// # Errors
///
/// Propagates writer failures.
pub fn write_int64<W: Write>(writer: &mut W, value: i64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Reads a little-endian `int64`.
///
/// # Errors
///
/// Propagates reader failures.
pub fn read_int64<R: Read>(reader: &mut R) -> io::Result<i64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(i64::from_le_bytes(bytes))
}

/// Writes a single byte.
///
/// # Errors
///
/// Propagates writer failures.
pub fn write_byte<W: Write>(writer: &mut W, value: u8) -> io::Result<()> {
    writer.write_all(&[value])
}

/// Reads a single byte.
///
/// # Errors
///
/// Propagates reader failures.
pub fn read_byte<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

/// Writes a signed 32-bit value in the variable-length encoding.
///
/// # Errors
///
/// Propagates writer failures.
pub fn write_varint<W: Write>(writer: &mut W, value: i32) -> io::Result<()> {
    let mut b = [0u8; 5];
    b[1..5].copy_from_slice(&value.to_le_bytes());

    let mut cnt = 4usize;
    while cnt > 1 && b[cnt] == 0 {
        cnt -= 1;
    }
    let bit = 1u8 << (8 - cnt);
    if b[cnt] >= bit {
        cnt += 1;
        b[0] = !(bit - 1);
    } else if cnt > 1 {
        b[0] = b[cnt] | !(bit.wrapping_mul(2).wrapping_sub(1));
    } else {
        b[0] = b[1];
    }
    writer.write_all(&b[..cnt])
}

/// Reads a signed 32-bit value in the variable-length encoding.
///
/// # Errors
///
/// A prefix announcing five or more extra bytes is a protocol error
/// ([`io::ErrorKind::InvalidData`]); reader failures propagate.
pub fn read_varint<R: Read>(reader: &mut R) -> io::Result<i32> {
    let prefix = read_byte(reader)?;
    let extra = prefix.leading_ones() as usize;
    if extra >= 5 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("varint prefix {prefix:#04x} announces {extra} extra bytes"),
        ));
    }

    let mut value = [0u8; 4];
    if extra == 0 {
        value[0] = prefix;
    } else {
        reader.read_exact(&mut value[..extra])?;
        let mask = (1u8 << (8 - extra)) - 1;
        if extra < 4 {
            value[extra] = prefix & mask;
        }
    }
    Ok(i32::from_le_bytes(value))
}

/// Writes a signed 64-bit value in the variable-length encoding with the
/// given minimum byte count (`1..=8`).
///
/// # Errors
///
/// Propagates writer failures.
///
/// # Panics
///
/// Debug-asserts that `min_bytes` is within `1..=8`.
pub fn write_varlong<W: Write>(writer: &mut W, value: i64, min_bytes: usize) -> io::Result<()> {
    debug_assert!((1..=8).contains(&min_bytes));

    let mut b = [0u8; 10];
    b[1..9].copy_from_slice(&value.to_le_bytes());

    let mut cnt = 8usize;
    while cnt > min_bytes && b[cnt] == 0 {
        cnt -= 1;
    }
    let bit = 1u8 << (7 - cnt + min_bytes);
    if b[cnt] >= bit {
        cnt += 1;
        b[0] = !(bit - 1);
    } else if cnt > min_bytes {
        b[0] = b[cnt] | !(bit.wrapping_mul(2).wrapping_sub(1));
    } else {
        b[0] = b[cnt];
    }

    // Wire layout: prefix, then the low payload bytes (the top byte lives
    // in the prefix when it fits).
    writer.write_all(&[b[0]])?;
    writer.write_all(&b[1..cnt])
}

/// Reads a signed 64-bit value in the variable-length encoding with the
/// given minimum byte count (`1..=8`).
///
/// # Errors
///
/// A prefix announcing more payload than a 64-bit value can hold is a
/// protocol error ([`io::ErrorKind::InvalidData`]); reader failures
/// propagate.
///
/// # Panics
///
/// Debug-asserts that `min_bytes` is within `1..=8`.
pub fn read_varlong<R: Read>(reader: &mut R, min_bytes: usize) -> io::Result<i64> {
    debug_assert!((1..=8).contains(&min_bytes));

    let prefix = read_byte(reader)?;
    let extra = prefix.leading_ones() as usize;
    if extra + min_bytes > 9 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("varlong prefix {prefix:#04x} announces {extra} extra bytes"),
        ));
    }

    let mut value = [0u8; 9];
    let raw = min_bytes - 1 + extra;
    reader.read_exact(&mut value[..raw])?;
    if extra == 0 {
        value[min_bytes - 1] = prefix;
    } else {
        let mask = if extra >= 8 {
            0
        } else {
            (1u8 << (8 - extra)) - 1
        };
        value[raw] = prefix & mask;
    }

    let mut low = [0u8; 8];
    low.copy_from_slice(&value[..8]);
    if value[8] != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "varlong value overflows 64 bits",
        ));
    }
    Ok(i64::from_le_bytes(low))
}

/// Writes a 32-bit value using `varint` at protocol 30 and later, `int32`
/// before that.
///
/// # Errors
///
/// Propagates writer failures.
pub fn write_varint30<W: Write>(
    writer: &mut W,
    protocol: ProtocolVersion,
    value: i32,
) -> io::Result<()> {
    if protocol.uses_varint() {
        write_varint(writer, value)
    } else {
        write_int(writer, value)
    }
}

/// Reads a 32-bit value using `varint` at protocol 30 and later, `int32`
/// before that.
///
/// # Errors
///
/// Same failure modes as [`read_varint`] / [`read_int`].
pub fn read_varint30<R: Read>(reader: &mut R, protocol: ProtocolVersion) -> io::Result<i32> {
    if protocol.uses_varint() {
        read_varint(reader)
    } else {
        read_int(reader)
    }
}

/// Writes a 64-bit value using `varlong` at protocol 30 and later, `int64`
/// before that.
///
/// # Errors
///
/// Propagates writer failures.
pub fn write_varlong30<W: Write>(
    writer: &mut W,
    protocol: ProtocolVersion,
    value: i64,
    min_bytes: usize,
) -> io::Result<()> {
    if protocol.uses_varint() {
        write_varlong(writer, value, min_bytes)
    } else {
        write_int64(writer, value)
    }
}

/// Reads a 64-bit value using `varlong` at protocol 30 and later, `int64`
/// before that.
///
/// # Errors
///
/// Same failure modes as [`read_varlong`] / [`read_int64`].
pub fn read_varlong30<R: Read>(
    reader: &mut R,
    protocol: ProtocolVersion,
    min_bytes: usize,
) -> io::Result<i64> {
    if protocol.uses_varint() {
        read_varlong(reader, min_bytes)
    } else {
        read_int64(reader)
    }
}

/// Writes a length-prefixed string: one length byte, or two when the high
/// bit extends the length to 15 bits.
///
/// # Errors
///
/// Returns [`io::ErrorKind::InvalidInput`] for payloads longer than
/// [`MAX_VSTRING_LEN`]; writer failures propagate.
pub fn write_vstring<W: Write>(writer: &mut W, value: &[u8]) -> io::Result<()> {
    let len = value.len();
    if len > MAX_VSTRING_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("vstring payload of {len} bytes exceeds the 15-bit length field"),
        ));
    }
    if len > 0x7F {
        write_byte(writer, ((len >> 8) as u8) | 0x80)?;
    }
    write_byte(writer, (len & 0xFF) as u8)?;
    writer.write_all(value)
}

/// Reads a length-prefixed string, rejecting payloads longer than
/// `max_len`.
///
/// # Errors
///
/// Oversized payloads are protocol errors
/// ([`io::ErrorKind::InvalidData`]); reader failures propagate.
pub fn read_vstring<R: Read>(reader: &mut R, max_len: usize) -> io::Result<Vec<u8>> {
    let first = read_byte(reader)?;
    let len = if first & 0x80 != 0 {
        let second = read_byte(reader)?;
        (usize::from(first & 0x7F) << 8) | usize::from(second)
    } else {
        usize::from(first)
    };
    if len > max_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("vstring payload of {len} bytes exceeds the caller bound of {max_len}"),
        ));
    }
    let mut value = vec![0u8; len];
    reader.read_exact(&mut value)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn varint_bytes(value: i32) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, value).expect("write");
        out
    }

    fn varint_round_trip(value: i32) -> i32 {
        read_varint(&mut Cursor::new(varint_bytes(value))).expect("read")
    }

    fn varlong_round_trip(value: i64, min_bytes: usize) -> i64 {
        let mut out = Vec::new();
        write_varlong(&mut out, value, min_bytes).expect("write");
        read_varlong(&mut Cursor::new(out), min_bytes).expect("read")
    }

    #[test]
    fn int_codecs_are_little_endian() {
        let mut out = Vec::new();
        write_int(&mut out, 0x0102_0304).expect("write");
        assert_eq!(out, [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(read_int(&mut Cursor::new(out)).expect("read"), 0x0102_0304);

        let mut out = Vec::new();
        write_int64(&mut out, -2).expect("write");
        assert_eq!(read_int64(&mut Cursor::new(out)).expect("read"), -2);
    }

    #[test]
    fn varint_boundary_encodings_match_the_prefix_table() {
        assert_eq!(varint_bytes(0), [0x00]);
        assert_eq!(varint_bytes(0x7F), [0x7F]);
        assert_eq!(varint_bytes(0x80), [0x80, 0x80]);
        assert_eq!(varint_bytes(0x3FFF), [0xBF, 0xFF]);
        assert_eq!(varint_bytes(0x4000), [0xC0, 0x00, 0x40]);
        assert_eq!(varint_bytes(0x001F_FFFF), [0xDF, 0xFF, 0xFF]);
        assert_eq!(varint_bytes(0x0020_0000), [0xE0, 0x00, 0x00, 0x20]);
        assert_eq!(varint_bytes(0x7FFF_FFFF), [0xF0, 0xFF, 0xFF, 0xFF, 0x7F]);
        assert_eq!(varint_bytes(-1), [0xF0, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn varint_round_trips_boundaries() {
        for value in [
            0,
            1,
            0x7F,
            0x80,
            0x3FFF,
            0x4000,
            0x001F_FFFF,
            0x0020_0000,
            i32::MAX,
            -1,
            i32::MIN,
        ] {
            assert_eq!(varint_round_trip(value), value, "value {value:#x}");
        }
    }

    #[test]
    fn varint_rejects_overflowing_prefixes() {
        let err = read_varint(&mut Cursor::new([0xF8u8, 0, 0, 0, 0, 0])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn varlong_round_trips_across_min_bytes() {
        for min_bytes in 1..=8usize {
            for value in [
                0i64,
                1,
                0x7F,
                0x80,
                0xFFFF,
                0x0012_3456_789A,
                i64::from(i32::MAX),
                i64::MAX,
                -1,
                i64::MIN,
            ] {
                assert_eq!(
                    varlong_round_trip(value, min_bytes),
                    value,
                    "value {value:#x} min {min_bytes}"
                );
            }
        }
    }

    #[test]
    fn varlong_small_values_use_the_minimum_byte_count() {
        let mut out = Vec::new();
        write_varlong(&mut out, 0, 3).expect("write");
        assert_eq!(out.len(), 3);

        let mut out = Vec::new();
        write_varlong(&mut out, 0x12_3456, 3).expect("write");
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn varint30_dispatches_on_protocol_version() {
        let old = ProtocolVersion::try_from(29u8).unwrap();
        let new = ProtocolVersion::try_from(30u8).unwrap();

        let mut out = Vec::new();
        write_varint30(&mut out, old, 5).expect("write");
        assert_eq!(out.len(), 4);
        assert_eq!(read_varint30(&mut Cursor::new(out), old).expect("read"), 5);

        let mut out = Vec::new();
        write_varint30(&mut out, new, 5).expect("write");
        assert_eq!(out.len(), 1);
        assert_eq!(read_varint30(&mut Cursor::new(out), new).expect("read"), 5);
    }

    #[test]
    fn varlong30_dispatches_on_protocol_version() {
        let old = ProtocolVersion::try_from(29u8).unwrap();
        let new = ProtocolVersion::try_from(30u8).unwrap();

        let mut out = Vec::new();
        write_varlong30(&mut out, old, 77, 3).expect("write");
        assert_eq!(out.len(), 8);
        assert_eq!(
            read_varlong30(&mut Cursor::new(out), old, 3).expect("read"),
            77
        );

        let mut out = Vec::new();
        write_varlong30(&mut out, new, 77, 3).expect("write");
        assert_eq!(out.len(), 3);
        assert_eq!(
            read_varlong30(&mut Cursor::new(out), new, 3).expect("read"),
            77
        );
    }

    #[test]
    fn vstring_single_byte_length_round_trips() {
        let mut out = Vec::new();
        write_vstring(&mut out, b"md5 md4").expect("write");
        assert_eq!(out[0] as usize, b"md5 md4".len());
        assert_eq!(
            read_vstring(&mut Cursor::new(out), 256).expect("read"),
            b"md5 md4"
        );
    }

    #[test]
    fn vstring_two_byte_length_round_trips() {
        let payload = vec![b'x'; 300];
        let mut out = Vec::new();
        write_vstring(&mut out, &payload).expect("write");
        assert_eq!(out[0], 0x80 | (300u16 >> 8) as u8);
        assert_eq!(out[1], (300 & 0xFF) as u8);
        assert_eq!(
            read_vstring(&mut Cursor::new(out), MAX_VSTRING_LEN).expect("read"),
            payload
        );
    }

    #[test]
    fn vstring_rejects_payloads_beyond_the_caller_bound() {
        let payload = vec![b'x'; 300];
        let mut out = Vec::new();
        write_vstring(&mut out, &payload).expect("write");
        let err = read_vstring(&mut Cursor::new(out), 256).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn vstring_rejects_oversized_writes() {
        let payload = vec![b'x'; MAX_VSTRING_LEN + 1];
        let err = write_vstring(&mut Vec::new(), &payload).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    proptest! {
        #[test]
        fn varint_encode_decode_are_mutual_inverses(value in any::<i32>()) {
            prop_assert_eq!(varint_round_trip(value), value);
        }

        #[test]
        fn varlong_encode_decode_are_mutual_inverses(
            value in any::<i64>(),
            min_bytes in 1usize..=8,
        ) {
            prop_assert_eq!(varlong_round_trip(value, min_bytes), value);
        }

        #[test]
        fn vstring_round_trips_arbitrary_payloads(
            payload in proptest::collection::vec(any::<u8>(), 0..1024),
        ) {
            let mut out = Vec::new();
            write_vstring(&mut out, &payload).expect("write");
            let decoded = read_vstring(&mut Cursor::new(out), MAX_VSTRING_LEN).expect("read");
            prop_assert_eq!(decoded, payload);
        }
    }
}
