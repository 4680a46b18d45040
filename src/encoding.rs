//! Byte-string key encoding.
//!
//! Store keys are flat byte strings ordered by unsigned byte comparison. To
//! make a composite key (several fields) sort the way its fields do, every
//! field but the last is written with a fixed width, big-endian:
//! - unsigned integers: plain big-endian bytes
//! - signed integers: big-endian with the sign bit flipped, so negatives sort
//!   before positives
//! - the last field may be variable length (a name, a path, ...)
//!
//! [`KeyWriter`] builds such keys, [`KeyReader`] takes them apart again and
//! reports truncated input as [`Error::Corrupt`].

use smallvec::SmallVec;

use crate::error::{Error, Result};

/// Keys up to this many bytes are built without a heap allocation.
const INLINE_KEY_LEN: usize = 32;

/// Builder for order-preserving composite keys.
#[derive(Clone, Debug, Default)]
pub struct KeyWriter {
    buf: SmallVec<[u8; INLINE_KEY_LEN]>,
}

impl KeyWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a key below an existing prefix.
    pub fn with_prefix(prefix: &[u8]) -> Self {
        Self {
            buf: SmallVec::from_slice(prefix),
        }
    }

    pub fn push_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn push_u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn push_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn push_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn push_i32(&mut self, value: i32) -> &mut Self {
        self.push_u32((value as u32) ^ (1 << 31))
    }

    pub fn push_i64(&mut self, value: i64) -> &mut Self {
        self.push_u64((value as u64) ^ (1 << 63))
    }

    /// Current key bytes. Usable as a prefix for range queries.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf.into_vec()
    }

    /// Append the trailing variable-length field and return the key.
    pub fn finish_with(mut self, tail: &[u8]) -> Vec<u8> {
        self.buf.extend_from_slice(tail);
        self.buf.into_vec()
    }
}

/// Decoder for keys produced by [`KeyWriter`].
#[derive(Clone, Debug)]
pub struct KeyReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> KeyReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let bytes = self.data.get(self.pos..end).ok_or_else(|| {
            Error::Corrupt(format!(
                "need {N} bytes at offset {}, key has {}",
                self.pos,
                self.data.len()
            ))
        })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.pos = end;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.take().map(u16::from_be_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.take().map(u32::from_be_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.take().map(u64::from_be_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok((self.read_u32()? ^ (1 << 31)) as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok((self.read_u64()? ^ (1 << 63)) as i64)
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume the trailing variable-length field.
    pub fn rest(self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Corrupt(format!(
                "{} trailing bytes after offset {}",
                self.remaining(),
                self.pos
            )))
        }
    }
}

/// Smallest byte string greater than every string starting with `prefix`.
///
/// Trailing `0xFF` bytes are dropped and the last remaining byte is
/// incremented. Returns `None` when no such string exists (empty prefix or
/// all bytes `0xFF`).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// Printable form of a key for errors and logs.
pub fn display_key(key: &[u8]) -> String {
    key.escape_ascii().to_string()
}
