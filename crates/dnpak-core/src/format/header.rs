//! Fixed-size archive header codec.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use super::{FORMAT_MARKER, HEADER_SIZE, MAGIC, STRING_REGION, read_nul_str};
use crate::error::{PakError, Result};

/// Decoded archive header.
///
/// The magic identifier and format marker are fixed constants of the
/// format; they are validated on decode and re-emitted on encode rather
/// than stored here.
///
/// Layout (little-endian):
///
/// | field             | offset | size |
/// |-------------------|--------|------|
/// | magic             | 0      | 256  |
/// | marker            | 256    | 4    |
/// | entry count       | 260    | 4    |
/// | file table offset | 264    | 4    |
/// | reserved          | 268    | 756  |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PakHeader {
    /// Number of records in the file table.
    pub entry_count: u32,
    /// Absolute byte offset of the file table.
    pub file_table_offset: u32,
}

impl PakHeader {
    /// Decodes a header from the first [`HEADER_SIZE`] bytes of an
    /// archive.
    ///
    /// # Errors
    ///
    /// `InvalidFormat` if the input is shorter than [`HEADER_SIZE`], the
    /// magic or marker do not match, or the file table offset points
    /// inside the header region.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(PakError::InvalidFormat(format!(
                "header needs {HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let magic = read_nul_str(&bytes[..STRING_REGION])?;
        if magic != MAGIC {
            return Err(PakError::InvalidFormat(format!(
                "magic mismatch: {magic:?}"
            )));
        }
        let mut cursor = Cursor::new(&bytes[STRING_REGION..STRING_REGION + 12]);
        let marker = cursor.read_u32::<LittleEndian>()?;
        if marker != FORMAT_MARKER {
            return Err(PakError::InvalidFormat(format!(
                "format marker mismatch: {marker:#x}"
            )));
        }
        let entry_count = cursor.read_u32::<LittleEndian>()?;
        let file_table_offset = cursor.read_u32::<LittleEndian>()?;
        if (file_table_offset as usize) < HEADER_SIZE {
            return Err(PakError::InvalidFormat(format!(
                "file table offset {file_table_offset:#x} points inside the header"
            )));
        }
        Ok(Self {
            entry_count,
            file_table_offset,
        })
    }

    /// Encodes the header into exactly [`HEADER_SIZE`] bytes with the
    /// reserved region zero-filled.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..MAGIC.len()].copy_from_slice(MAGIC.as_bytes());
        out[STRING_REGION..STRING_REGION + 4].copy_from_slice(&FORMAT_MARKER.to_le_bytes());
        out[260..264].copy_from_slice(&self.entry_count.to_le_bytes());
        out[264..268].copy_from_slice(&self.file_table_offset.to_le_bytes());
        out
    }
}
