//! Length-prefixed string encoding shared by identifiers and amounts.
//!
//! The prefix is a fixed-width big-endian `u32` rather than a varint, so the
//! encoded form of a string is never a prefix of the encoding of a longer
//! string. Storage keys depend on this for exact prefix scans.

use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, ReadExt, Write};

pub fn write_string(s: &str, writer: &mut impl BufMut) {
    (s.len() as u32).write(writer);
    writer.put_slice(s.as_bytes());
}

pub fn string_encode_size(s: &str) -> usize {
    u32::SIZE + s.len()
}

/// Reads a string of at most `max_len` bytes. `kind` names the value in errors.
pub fn read_bounded(reader: &mut impl Buf, kind: &'static str, max_len: usize) -> Result<String, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_len {
        return Err(Error::Invalid(kind, "too long"));
    }
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| Error::Invalid(kind, "invalid UTF-8"))
}

/// Reads a non-empty identifier of at most `max_len` bytes.
pub fn read_identifier(
    reader: &mut impl Buf,
    kind: &'static str,
    max_len: usize,
) -> Result<String, Error> {
    let value = read_bounded(reader, kind, max_len)?;
    if value.is_empty() {
        return Err(Error::Invalid(kind, "empty"));
    }
    Ok(value)
}
