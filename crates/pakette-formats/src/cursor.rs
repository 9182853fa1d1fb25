//! Bounds-checked byte cursor for binary format parsing
//!
//! Every fixed-offset read in the BSP and MD3 decoders goes through this
//! cursor. A read past the declared buffer length yields [`OutOfBounds`],
//! which the decoders surface as a structural parse error.

use thiserror::Error;

/// Attempted read past the end of the input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("read of {len} bytes at offset {offset} exceeds buffer of {available} bytes")]
pub struct OutOfBounds {
    /// Byte offset the read started at
    pub offset: usize,
    /// Number of bytes requested
    pub len: usize,
    /// Total buffer length
    pub available: usize,
}

/// Little-endian reader over an in-memory buffer
///
/// Offsets are absolute; the cursor does not track a position. Binary
/// formats in this crate address fields by offsets taken from a header
/// table, so random access is the natural shape.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    data: &'a [u8],
}

impl<'a> Cursor<'a> {
    /// Wrap a buffer
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Total buffer length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `len` bytes at `offset`
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], OutOfBounds> {
        let end = offset.checked_add(len).ok_or(OutOfBounds {
            offset,
            len,
            available: self.data.len(),
        })?;
        self.data.get(offset..end).ok_or(OutOfBounds {
            offset,
            len,
            available: self.data.len(),
        })
    }

    /// Read a little-endian `u32` at `offset`
    pub fn u32_at(&self, offset: usize) -> Result<u32, OutOfBounds> {
        let bytes = self.bytes(offset, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a little-endian `u16` at `offset`
    pub fn u16_at(&self, offset: usize) -> Result<u16, OutOfBounds> {
        let bytes = self.bytes(offset, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a fixed-size field holding a NUL-terminated string
    ///
    /// Bytes after the first NUL are ignored; a field with no NUL uses the
    /// whole width. Invalid UTF-8 is replaced rather than rejected; entry
    /// names in shipped game data are ASCII, but third-party content is not
    /// always well-formed.
    pub fn fixed_str(&self, offset: usize, width: usize) -> Result<String, OutOfBounds> {
        let raw = self.bytes(offset, width)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }
}
