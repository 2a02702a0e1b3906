//! XDR (RFC 4506) opaque, list, and string helpers layered on [`crate::buffer`].
//!
//! Readers never panic or throw: every decode returns `Option`/`Err` and a
//! caller that hits `None` maps it to [`Invalid`], which in turn becomes
//! `GARBAGE_ARGS` at the RPC layer (spec: procedures that consume an
//! invalid reader must report invalid arguments, not crash the connection).

use crate::buffer::{Cursor, Writer};

pub const ALIGNMENT: usize = 4;

/// Marker error for "the bytes did not parse", kept separate from I/O or
/// filesystem errors so the RPC router can map it to `GARBAGE_ARGS`
/// specifically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invalid;

pub type Result<T> = std::result::Result<T, Invalid>;

fn padded_len(n: usize) -> usize {
    n + pad_len(n)
}

fn pad_len(n: usize) -> usize {
    (ALIGNMENT - n % ALIGNMENT) % ALIGNMENT
}

pub fn read_u32(cur: &mut Cursor) -> Result<u32> {
    cur.read_u32_be().ok_or(Invalid)
}

pub fn read_u64(cur: &mut Cursor) -> Result<u64> {
    cur.read_u64_be().ok_or(Invalid)
}

pub fn read_u128(cur: &mut Cursor) -> Result<u128> {
    cur.read_u128_be().ok_or(Invalid)
}

pub fn read_bool(cur: &mut Cursor) -> Result<bool> {
    match read_u32(cur)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(Invalid),
    }
}

pub fn read_option<T>(
    cur: &mut Cursor,
    cont: impl FnOnce(&mut Cursor) -> Result<T>,
) -> Result<Option<T>> {
    if read_bool(cur)? {
        Ok(Some(cont(cur)?))
    } else {
        Ok(None)
    }
}

fn skip_padding(cur: &mut Cursor, n: usize) -> Result<()> {
    cur.skip(pad_len(n)).ok_or(Invalid)
}

/// Reads a variable-length XDR opaque value, enforcing `max_len`.
///
/// Returns the decoded bytes along with the total wire size consumed
/// (length word + data + padding), matching spec §4.1's `read_opaque`.
pub fn read_opaque(cur: &mut Cursor, max_len: usize) -> Result<(Vec<u8>, usize)> {
    let len = read_u32(cur)? as usize;
    if len > max_len {
        return Err(Invalid);
    }
    let bytes = cur.read_bytes(len).ok_or(Invalid)?.to_vec();
    skip_padding(cur, len)?;
    Ok((bytes, 4 + padded_len(len)))
}

/// Reads a fixed-size `opaque[N]`, including its padding.
pub fn read_array<const N: usize>(cur: &mut Cursor) -> Result<[u8; N]> {
    let slice = cur.read_bytes(N).ok_or(Invalid)?;
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    skip_padding(cur, N)?;
    Ok(out)
}

pub fn read_string(cur: &mut Cursor, max_len: usize) -> Result<String> {
    let (bytes, _) = read_opaque(cur, max_len)?;
    String::from_utf8(bytes).map_err(|_| Invalid)
}

/// Reads an XDR list: `(true, element)*` terminated by `false`.
pub fn read_list<T>(
    cur: &mut Cursor,
    mut read_element: impl FnMut(&mut Cursor) -> Result<T>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    while read_bool(cur)? {
        out.push(read_element(cur)?);
    }
    Ok(out)
}

pub fn write_bool(w: &mut Writer, b: bool) {
    w.append_u32(if b { 1 } else { 0 });
}

pub fn write_option<T>(w: &mut Writer, opt: &Option<T>, cont: impl FnOnce(&mut Writer, &T)) {
    match opt {
        Some(v) => {
            write_bool(w, true);
            cont(w, v);
        }
        None => write_bool(w, false),
    }
}

/// Writes a variable-length XDR opaque value: length, bytes, zero padding.
/// Fails (returns `Err`) only when `bytes.len() > max_len`, matching
/// spec §4.1's `write_opaque`.
pub fn write_opaque(w: &mut Writer, bytes: &[u8], max_len: usize) -> Result<()> {
    if bytes.len() > max_len {
        return Err(Invalid);
    }
    w.append_u32(bytes.len() as u32);
    w.append_bytes(bytes);
    w.append_bytes(&[0u8; ALIGNMENT][..pad_len(bytes.len())]);
    Ok(())
}

pub fn write_array<const N: usize>(w: &mut Writer, bytes: [u8; N]) {
    w.append_bytes(&bytes);
    w.append_bytes(&[0u8; ALIGNMENT][..pad_len(N)]);
}

pub fn write_string(w: &mut Writer, s: &str, max_len: usize) -> Result<()> {
    write_opaque(w, s.as_bytes(), max_len)
}

/// Writes an XDR list: `(true, element)*` then `false`.
pub fn write_list<T>(w: &mut Writer, items: &[T], mut write_element: impl FnMut(&mut Writer, &T)) {
    for item in items {
        write_bool(w, true);
        write_element(w, item);
    }
    write_bool(w, false);
}
