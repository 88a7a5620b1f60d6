//! Fixed-width big-endian primitives over caller-owned byte buffers.
//!
//! A 128-bit UUID is stored as 16 bytes: the most significant half first,
//! then the least significant half, each as a big-endian `u64`.

use std::io::Cursor;

use uuid::Uuid;

use crate::codec::BinaryCodec;
use crate::error::BinaryError;
use crate::value::Value;

fn slot(len: usize, offset: usize, needed: usize) -> Result<std::ops::Range<usize>, BinaryError> {
    match offset.checked_add(needed) {
        Some(end) if end <= len => Ok(offset..end),
        _ => Err(BinaryError::OutOfBounds {
            offset,
            needed,
            len,
        }),
    }
}

pub fn put_i32(value: i32, buf: &mut [u8], offset: usize) -> Result<(), BinaryError> {
    let range = slot(buf.len(), offset, 4)?;
    buf[range].copy_from_slice(&value.to_be_bytes());
    Ok(())
}

pub fn put_i64(value: i64, buf: &mut [u8], offset: usize) -> Result<(), BinaryError> {
    let range = slot(buf.len(), offset, 8)?;
    buf[range].copy_from_slice(&value.to_be_bytes());
    Ok(())
}

pub fn get_i32(buf: &[u8], offset: usize) -> Result<i32, BinaryError> {
    let range = slot(buf.len(), offset, 4)?;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[range]);
    Ok(i32::from_be_bytes(raw))
}

pub fn get_i64(buf: &[u8], offset: usize) -> Result<i64, BinaryError> {
    let range = slot(buf.len(), offset, 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[range]);
    Ok(i64::from_be_bytes(raw))
}

pub fn put_uuid(value: &Uuid, buf: &mut [u8], offset: usize) -> Result<(), BinaryError> {
    slot(buf.len(), offset, 16)?;
    let (most, least) = value.as_u64_pair();
    put_i64(most as i64, buf, offset)?;
    put_i64(least as i64, buf, offset + 8)
}

pub fn get_uuid(buf: &[u8], offset: usize) -> Result<Uuid, BinaryError> {
    slot(buf.len(), offset, 16)?;
    let most = get_i64(buf, offset)? as u64;
    let least = get_i64(buf, offset + 8)? as u64;
    Ok(Uuid::from_u64_pair(most, least))
}

pub fn i64_to_bytes(value: i64) -> [u8; 8] {
    value.to_be_bytes()
}

pub fn i32_to_bytes(value: i32) -> [u8; 4] {
    value.to_be_bytes()
}

pub fn uuid_to_bytes(value: &Uuid) -> [u8; 16] {
    let mut out = [0u8; 16];
    let (most, least) = value.as_u64_pair();
    out[..8].copy_from_slice(&most.to_be_bytes());
    out[8..].copy_from_slice(&least.to_be_bytes());
    out
}

/// Encode one value with a binary codec into a fresh buffer.
pub fn to_bytes(value: &Value, codec: &dyn BinaryCodec) -> Result<Vec<u8>, BinaryError> {
    let mut out = Vec::new();
    codec.write_binary(value, &mut out)?;
    Ok(out)
}

/// Decode one value with a binary codec, starting at `offset`.
pub fn from_bytes(buf: &[u8], offset: usize, codec: &dyn BinaryCodec) -> Result<Value, BinaryError> {
    if offset > buf.len() {
        return Err(BinaryError::OutOfBounds {
            offset,
            needed: 0,
            len: buf.len(),
        });
    }
    let mut cursor = Cursor::new(&buf[offset..]);
    Ok(codec.read_binary(&mut cursor)?)
}
