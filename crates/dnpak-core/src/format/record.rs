//! File-table record codec.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use super::{RECORD_SIZE, SEPARATOR, STRING_REGION, read_nul_str, write_nul_str};
use crate::error::{PakError, Result};

/// One file-table slot: where a packed file lives and how big it is.
///
/// Layout (little-endian):
///
/// | field             | offset | size |
/// |-------------------|--------|------|
/// | path              | 0      | 256  |
/// | disk size         | 256    | 4    |
/// | decompressed size | 260    | 4    |
/// | compressed size   | 264    | 4    |
/// | disk offset       | 268    | 4    |
/// | unknown           | 272    | 4    |
/// | padding           | 276    | 40   |
///
/// The stored path is rooted with a leading separator on disk; the
/// decoded `path` field has it stripped, which is also the key used for
/// flat table lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Stored path without its leading separator, backslash-delimited.
    pub path: String,
    /// Bytes the compressed payload occupies on disk.
    pub disk_size: u32,
    /// Size of the payload once inflated.
    pub decompressed_size: u32,
    /// Compressed size; equal to `disk_size` in well-formed archives.
    pub compressed_size: u32,
    /// Absolute byte offset of the compressed payload.
    pub disk_offset: u32,
    /// Reserved field with no documented meaning, round-tripped verbatim.
    pub unknown: [u8; 4],
}

impl FileRecord {
    /// Leaf name: the substring after the last separator, or the whole
    /// path when it has no separator.
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self.path.rfind(SEPARATOR) {
            Some(at) => &self.path[at + 1..],
            None => &self.path,
        }
    }

    /// Decodes a record from one [`RECORD_SIZE`] table slot.
    ///
    /// # Errors
    ///
    /// `InvalidFormat` if the slot is too short or the path region is not
    /// valid UTF-8.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RECORD_SIZE {
            return Err(PakError::InvalidFormat(format!(
                "file record needs {RECORD_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let stored = read_nul_str(&bytes[..STRING_REGION])?;
        let path = stored.strip_prefix(SEPARATOR).unwrap_or(stored).to_string();
        let mut cursor = Cursor::new(&bytes[STRING_REGION..STRING_REGION + 16]);
        let disk_size = cursor.read_u32::<LittleEndian>()?;
        let decompressed_size = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()?;
        let disk_offset = cursor.read_u32::<LittleEndian>()?;
        let mut unknown = [0u8; 4];
        unknown.copy_from_slice(&bytes[272..276]);
        Ok(Self {
            path,
            disk_size,
            decompressed_size,
            compressed_size,
            disk_offset,
            unknown,
        })
    }

    /// Encodes the record into one [`RECORD_SIZE`] table slot with the
    /// padding zero-filled.
    ///
    /// # Errors
    ///
    /// The stored form (`'\'` plus the path) must fit 255 bytes of UTF-8;
    /// a longer path is refused rather than truncated.
    pub fn encode(&self) -> Result<[u8; RECORD_SIZE]> {
        let mut out = [0u8; RECORD_SIZE];
        let stored = format!("{SEPARATOR}{}", self.path);
        write_nul_str(&mut out[..STRING_REGION], &stored)?;
        out[256..260].copy_from_slice(&self.disk_size.to_le_bytes());
        out[260..264].copy_from_slice(&self.decompressed_size.to_le_bytes());
        out[264..268].copy_from_slice(&self.compressed_size.to_le_bytes());
        out[268..272].copy_from_slice(&self.disk_offset.to_le_bytes());
        out[272..276].copy_from_slice(&self.unknown);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileRecord {
        FileRecord {
            path: "resource\\ui\\login.dds".to_string(),
            disk_size: 1234,
            decompressed_size: 4096,
            compressed_size: 1234,
            disk_offset: 0x400,
            unknown: [0xDE, 0xAD, 0xBE, 0xEF],
        }
    }

    #[test]
    fn test_record_round_trip() {
        let record = sample();
        let bytes = record.encode().unwrap();
        assert_eq!(bytes.len(), RECORD_SIZE);
        assert_eq!(FileRecord::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn test_encode_roots_path_with_separator() {
        let bytes = sample().encode().unwrap();
        assert_eq!(bytes[0], b'\\');
        assert!(bytes[276..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_decode_strips_leading_separator() {
        let bytes = sample().encode().unwrap();
        let decoded = FileRecord::decode(&bytes).unwrap();
        assert_eq!(decoded.path, "resource\\ui\\login.dds");
        assert_eq!(decoded.file_name(), "login.dds");
    }

    #[test]
    fn test_file_name_without_separator() {
        let record = FileRecord {
            path: "version.cfg".to_string(),
            ..sample()
        };
        assert_eq!(record.file_name(), "version.cfg");
    }

    #[test]
    fn test_unknown_field_round_trips_verbatim() {
        let mut record = sample();
        record.unknown = [1, 2, 3, 4];
        let bytes = record.encode().unwrap();
        assert_eq!(&bytes[272..276], &[1, 2, 3, 4]);
        assert_eq!(FileRecord::decode(&bytes).unwrap().unknown, [1, 2, 3, 4]);
    }

    #[test]
    fn test_encode_rejects_overlong_path() {
        let record = FileRecord {
            path: "x".repeat(255),
            ..sample()
        };
        assert!(matches!(
            record.encode(),
            Err(PakError::InvalidFormat(_))
        ));

        let record = FileRecord {
            path: "x".repeat(254),
            ..sample()
        };
        assert!(record.encode().is_ok());
    }

    #[test]
    fn test_decode_rejects_short_slot() {
        let bytes = sample().encode().unwrap();
        assert!(matches!(
            FileRecord::decode(&bytes[..RECORD_SIZE - 1]),
            Err(PakError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_utf8_path() {
        let mut bytes = sample().encode().unwrap();
        bytes[0] = 0xFF;
        bytes[1] = 0xFE;
        assert!(matches!(
            FileRecord::decode(&bytes),
            Err(PakError::InvalidFormat(_))
        ));
    }
}
