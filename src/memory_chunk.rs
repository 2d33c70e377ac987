//! Backing byte buffers used by the index load/store protocol.
//!
//! - [`MemoryChunk`]: growable, owned buffer written by `store`.
//! - [`SharedChunk`]: frozen, reference-counted buffer read by `load`.
//! - [`ChunkSlice`]: a bounds-checked `[start, end)` view into a [`SharedChunk`];
//!   loaded arrays keep one of these instead of copying their records.
//!
//! All integers in the persisted format are little-endian `u32`.

use std::ops::{Deref, Range};
use std::sync::Arc;

use crate::error::{IndexResult, PhraseIndexError};

/// Byte offset into a table image.
pub type TableOffset = u32;

/// Growable byte buffer with append / write-at / read access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryChunk {
    data: Vec<u8>,
}

impl MemoryChunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Appends `bytes` and returns the offset they start at.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        offset
    }

    /// Writes `bytes` at `offset`, zero-filling any gap and growing the buffer as needed.
    pub fn set_content(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset + bytes.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(bytes);
    }

    /// Reads `len` bytes at `offset`.
    pub fn read(&self, offset: usize, len: usize) -> IndexResult<&[u8]> {
        checked_range(self.data.len(), offset, len).map(|r| &self.data[r])
    }

    /// One past the last written byte.
    #[inline]
    pub fn current_end(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Freezes the buffer so loaded structures can share it.
    pub fn into_shared(self) -> SharedChunk {
        SharedChunk::from(self.data)
    }
}

/// Read-only, cheaply clonable buffer handed to `load`.
#[derive(Debug, Clone)]
pub struct SharedChunk {
    bytes: Arc<[u8]>,
}

impl SharedChunk {
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn read(&self, offset: usize, len: usize) -> IndexResult<&[u8]> {
        checked_range(self.bytes.len(), offset, len).map(|r| &self.bytes[r])
    }

    /// Reads a little-endian `u32` at `offset`.
    pub fn read_u32(&self, offset: usize) -> IndexResult<u32> {
        self.read(offset, 4).map(read_u32_le)
    }

    pub fn read_u8(&self, offset: usize) -> IndexResult<u8> {
        self.read(offset, 1).map(|b| b[0])
    }

    /// Borrows `[offset, end)` as a [`ChunkSlice`] after validating the bounds.
    pub fn slice(&self, offset: usize, end: usize) -> IndexResult<ChunkSlice> {
        if offset > end {
            return Err(PhraseIndexError::corrupted(format!(
                "range start {} is past its end {}",
                offset, end
            )));
        }
        let range = checked_range(self.bytes.len(), offset, end - offset)?;
        Ok(ChunkSlice {
            bytes: Arc::clone(&self.bytes),
            range,
        })
    }
}

impl From<Vec<u8>> for SharedChunk {
    fn from(data: Vec<u8>) -> Self {
        Self { bytes: data.into() }
    }
}

impl From<&[u8]> for SharedChunk {
    fn from(data: &[u8]) -> Self {
        Self { bytes: data.into() }
    }
}

/// A validated window into a [`SharedChunk`].
///
/// Dereferences to the viewed bytes; cloning only bumps the reference count.
#[derive(Debug, Clone)]
pub struct ChunkSlice {
    bytes: Arc<[u8]>,
    range: Range<usize>,
}

impl ChunkSlice {
    /// Absolute position of the view inside its chunk.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }
}

impl Deref for ChunkSlice {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.bytes[self.range.clone()]
    }
}

fn checked_range(total: usize, offset: usize, len: usize) -> IndexResult<Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= total => Ok(offset..end),
        _ => Err(PhraseIndexError::corrupted(format!(
            "read of {} bytes at offset {} exceeds buffer of {} bytes",
            len, offset, total
        ))),
    }
}

/// Decodes the first four bytes of `bytes` as a little-endian `u32`.
///
/// Callers guarantee `bytes.len() >= 4`.
#[inline]
pub fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[inline]
pub fn write_u32_le(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Converts a buffer position to a persisted offset.
pub(crate) fn to_table_offset(pos: usize) -> IndexResult<TableOffset> {
    TableOffset::try_from(pos)
        .map_err(|_| PhraseIndexError::corrupted(format!("offset {} does not fit in u32", pos)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_start_offset() {
        let mut chunk = MemoryChunk::new();
        assert_eq!(chunk.append(&[1, 2, 3]), 0);
        assert_eq!(chunk.append(&[4]), 3);
        assert_eq!(chunk.current_end(), 4);
        assert_eq!(chunk.read(1, 2).unwrap(), &[2, 3]);
    }

    #[test]
    fn set_content_grows_and_overwrites() {
        let mut chunk = MemoryChunk::new();
        chunk.set_content(2, &[9, 9]);
        assert_eq!(chunk.as_bytes(), &[0, 0, 9, 9]);
        chunk.set_content(1, &[7]);
        assert_eq!(chunk.as_bytes(), &[0, 7, 9, 9]);
    }

    #[test]
    fn out_of_bounds_reads_fail() {
        let shared = SharedChunk::from(vec![0u8; 8]);
        assert!(shared.read(6, 4).is_err());
        assert!(shared.read(usize::MAX, 2).is_err());
        assert!(shared.slice(5, 4).is_err());
        assert!(shared.slice(0, 9).is_err());
        assert_eq!(shared.slice(2, 6).unwrap().len(), 4);
    }

    #[test]
    fn u32_is_little_endian() {
        let mut out = Vec::new();
        write_u32_le(&mut out, 0x0102_0304);
        assert_eq!(out, vec![4, 3, 2, 1]);
        assert_eq!(read_u32_le(&out), 0x0102_0304);
    }
}
