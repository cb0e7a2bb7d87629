//! Archive reader: open, index, and serve raw payload ranges.
//!
//! The reader validates the header, loads the file table, and builds the
//! entry tree plus a flat path map. It never decompresses anything:
//! [`PakArchive::transfer_raw`] hands out the stored DEFLATE bytes and
//! callers wrap their sink in an inflater.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, trace};

use crate::error::{PakError, Result};
use crate::format::{FileRecord, HEADER_SIZE, PakHeader, RECORD_SIZE};
use crate::index::{EntryId, EntryTree};
use crate::inspect::Segment;

const TRANSFER_CHUNK: usize = 64 * 1024;

/// Predicate over entry leaf names used by [`PakArchive::find`] and
/// [`PakArchive::extract_one`].
#[derive(Debug, Clone)]
pub enum NameFilter {
    /// Matches every name.
    All,
    /// Case-sensitive substring match.
    Substring(String),
    /// Regular-expression search.
    Regex(Regex),
}

impl NameFilter {
    /// Builds a filter from a user-supplied pattern.
    ///
    /// # Errors
    ///
    /// `Pattern` if `is_regex` is set and the pattern fails to compile.
    pub fn from_pattern(pattern: &str, is_regex: bool) -> Result<Self> {
        if is_regex {
            Ok(Self::Regex(Regex::new(pattern)?))
        } else {
            Ok(Self::Substring(pattern.to_string()))
        }
    }

    /// Whether `name` satisfies the filter.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Substring(needle) => name.contains(needle.as_str()),
            Self::Regex(pattern) => pattern.is_match(name),
        }
    }
}

/// An open pak archive: header, entry index, and a seekable byte source.
///
/// The handle owns at most one underlying file at a time. Raw transfers
/// reposition the file cursor, so a single handle must not be shared
/// across concurrent callers; independent handles over the same path are
/// safe and isolated.
#[derive(Debug)]
pub struct PakArchive {
    path: PathBuf,
    header: PakHeader,
    tree: EntryTree,
    entries: HashMap<String, EntryId>,
    file: Option<File>,
}

impl PakArchive {
    /// Opens an archive, validates its header, and loads the file table
    /// into the entry tree and flat path map.
    ///
    /// # Errors
    ///
    /// `NotFound` / `IsDirectory` for bad paths, `Truncated` when the
    /// byte source is shorter than the header or table demands,
    /// `InvalidFormat` for bad magic/marker/offset or undecodable
    /// records, `Conflict` for a table whose paths cross a file entry.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PakError::NotFound {
                path: path.to_path_buf(),
            });
        }
        if path.is_dir() {
            return Err(PakError::IsDirectory {
                path: path.to_path_buf(),
            });
        }
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < HEADER_SIZE as u64 {
            return Err(PakError::Truncated {
                expected: HEADER_SIZE as u64,
                actual: len,
            });
        }
        let mut header_bytes = [0u8; HEADER_SIZE];
        file.read_exact(&mut header_bytes)?;
        let header = PakHeader::decode(&header_bytes)?;

        let table_end = u64::from(header.file_table_offset)
            + u64::from(header.entry_count) * RECORD_SIZE as u64;
        if len < table_end {
            return Err(PakError::Truncated {
                expected: table_end,
                actual: len,
            });
        }
        debug!(
            entries = header.entry_count,
            table_offset = header.file_table_offset,
            "loading pak file table"
        );

        file.seek(SeekFrom::Start(u64::from(header.file_table_offset)))?;
        let mut tree = EntryTree::new();
        let mut entries = HashMap::with_capacity(header.entry_count as usize);
        let mut slot = [0u8; RECORD_SIZE];
        for _ in 0..header.entry_count {
            file.read_exact(&mut slot)?;
            let record = FileRecord::decode(&slot)?;
            let stored_path = record.path.clone();
            let id = tree.insert(&stored_path, record)?;
            entries.insert(stored_path, id);
        }
        trace!(loaded = entries.len(), "file table loaded");

        Ok(Self {
            path: path.to_path_buf(),
            header,
            tree,
            entries,
            file: Some(file),
        })
    }

    /// Path of the archive on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The decoded archive header.
    #[must_use]
    pub fn header(&self) -> PakHeader {
        self.header
    }

    /// Number of file entries in the archive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive holds no file entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The hierarchical entry index.
    #[must_use]
    pub fn tree(&self) -> &EntryTree {
        &self.tree
    }

    /// Root directory of the entry index, for recursive listing.
    #[must_use]
    pub fn root(&self) -> EntryId {
        self.tree.root()
    }

    /// Looks up one record by its stored path (no leading separator).
    #[must_use]
    pub fn record(&self, path: &str) -> Option<&FileRecord> {
        self.entries.get(path).and_then(|id| self.tree.record(*id))
    }

    /// Iterates over every file record, in no particular order.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.entries
            .values()
            .filter_map(|id| self.tree.record(*id))
    }

    /// Iterates over every stored path, in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Finds entries whose leaf name matches `pattern`, returning their
    /// full stored paths. Ordering and presentation are the caller's
    /// job.
    ///
    /// # Errors
    ///
    /// `Pattern` when `is_regex` is set and the pattern is malformed.
    pub fn find(&self, pattern: &str, is_regex: bool) -> Result<Vec<String>> {
        let filter = NameFilter::from_pattern(pattern, is_regex)?;
        let matched: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, id)| {
                self.tree
                    .record(**id)
                    .is_some_and(|record| filter.matches(record.file_name()))
            })
            .map(|(path, _)| path.clone())
            .collect();
        trace!(pattern, matched = matched.len(), "name search");
        Ok(matched)
    }

    /// Copies exactly `disk_size` bytes of compressed payload starting
    /// at `disk_offset` into `sink`, returning the byte count.
    ///
    /// No decompression happens here; wrap the sink in a DEFLATE
    /// inflater to obtain file content. The underlying cursor is
    /// repositioned by this call.
    ///
    /// # Errors
    ///
    /// `Closed` if the handle was closed and not reopened, `Truncated`
    /// if the archive ends inside the recorded range, `Io` for transfer
    /// failures.
    pub fn transfer_raw<W: Write>(&self, record: &FileRecord, sink: &mut W) -> Result<u64> {
        let file = self.file.as_ref().ok_or(PakError::Closed)?;
        let mut source = file;
        source.seek(SeekFrom::Start(u64::from(record.disk_offset)))?;
        let end = u64::from(record.disk_offset) + u64::from(record.disk_size);
        let mut remaining = u64::from(record.disk_size);
        let mut buf = [0u8; TRANSFER_CHUNK];
        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let got = source.read(&mut buf[..want])?;
            if got == 0 {
                return Err(PakError::Truncated {
                    expected: end,
                    actual: end - remaining,
                });
            }
            sink.write_all(&buf[..got])?;
            remaining -= got as u64;
        }
        Ok(u64::from(record.disk_size))
    }

    /// Transfers the record's payload into `sink` when `filter` accepts
    /// its leaf name. Returns whether a transfer happened.
    ///
    /// The caller supplies the decompression side by wrapping its sink
    /// in an inflater; a malformed stream then surfaces from the sink's
    /// writes and aborts only this extraction.
    pub fn extract_one<W: Write>(
        &self,
        record: &FileRecord,
        sink: &mut W,
        filter: &NameFilter,
    ) -> Result<bool> {
        if !filter.matches(record.file_name()) {
            trace!(path = %record.path, "skipped by name filter");
            return Ok(false);
        }
        self.transfer_raw(record, sink)?;
        Ok(true)
    }

    /// Total gap bytes between stored payload ranges; see
    /// [`crate::inspect::discontinuity`].
    #[must_use]
    pub fn discontinuity(&self) -> i64 {
        crate::inspect::discontinuity(self.records())
    }

    /// Coalesced occupied byte ranges; see [`crate::inspect::coalesce`].
    #[must_use]
    pub fn coalesce(&self) -> Vec<Segment> {
        crate::inspect::coalesce(self.records())
    }

    /// Releases the underlying file handle. Raw transfers fail with
    /// `Closed` until the archive is reopened; the index stays usable.
    pub fn close(&mut self) {
        self.file = None;
    }

    /// Whether the underlying file handle is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Reopens the underlying file, dropping any current handle first.
    ///
    /// # Errors
    ///
    /// `Io` if the archive path can no longer be opened.
    pub fn reopen(&mut self) -> Result<()> {
        self.file = Some(File::open(&self.path)?);
        Ok(())
    }

    /// Opens the underlying file only if the handle is currently closed.
    ///
    /// # Errors
    ///
    /// `Io` if the archive path can no longer be opened.
    pub fn open_if_closed(&mut self) -> Result<()> {
        if self.file.is_none() {
            self.file = Some(File::open(&self.path)?);
        }
        Ok(())
    }
}
