//! Uncompressed token stream.

use std::io::{self, Read, Write};

use crate::wire::{read_int, write_int};

use super::{ReceivedToken, CHUNK_SIZE};

pub(super) fn write_literal<W: Write>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    for chunk in data.chunks(CHUNK_SIZE) {
        write_int(writer, chunk.len() as i32)?;
        writer.write_all(chunk)?;
    }
    Ok(())
}

pub(super) fn write_match<W: Write>(writer: &mut W, block: i32) -> io::Result<()> {
    write_int(writer, -(block + 1))
}

pub(super) fn write_end<W: Write>(writer: &mut W) -> io::Result<()> {
    write_int(writer, 0)
}

pub(super) fn read_token<R: Read>(reader: &mut R) -> io::Result<ReceivedToken> {
    let value = read_int(reader)?;
    if value == 0 {
        return Ok(ReceivedToken::End);
    }
    if value < 0 {
        return Ok(ReceivedToken::Match(-value - 1));
    }
    let len = value as usize;
    if len > CHUNK_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("literal token of {len} bytes exceeds the {CHUNK_SIZE} byte chunk bound"),
        ));
    }
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data)?;
    Ok(ReceivedToken::Literal(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn literals_larger_than_a_chunk_are_split() {
        let data = vec![7u8; CHUNK_SIZE + 100];
        let mut wire = Vec::new();
        write_literal(&mut wire, &data).expect("write");

        let mut cursor = Cursor::new(wire);
        let first = read_token(&mut cursor).expect("first chunk");
        let second = read_token(&mut cursor).expect("second chunk");
        match (first, second) {
            (ReceivedToken::Literal(a), ReceivedToken::Literal(b)) => {
                assert_eq!(a.len(), CHUNK_SIZE);
                assert_eq!(b.len(), 100);
            }
            other => panic!("expected two literals, got {other:?}"),
        }
    }

    #[test]
    fn match_tokens_are_negative_block_indices() {
        let mut wire = Vec::new();
        write_match(&mut wire, 41).expect("write");
        assert_eq!(
            read_token(&mut Cursor::new(wire)).expect("read"),
            ReceivedToken::Match(41)
        );
    }
}
