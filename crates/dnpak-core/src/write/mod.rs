//! Two-phase archive writer.
//!
//! Payload bodies are streamed first (the header region is skipped and
//! written last), then the file table, then the finalized header. The
//! builder keeps an append-only list of scanned files and computes all
//! absolute offsets during the single write pass; no partially-valid
//! header ever exists in memory.

mod progress;

pub use progress::{NullProgress, ProgressSink, WriteProgress};
use progress::{ProgressThrottle, REPORT_INTERVAL};

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{PakError, Result};
use crate::format::{FileRecord, HEADER_SIZE, PakHeader, SEPARATOR};
use crate::io::CountingWriter;

const CHUNK_SIZE: usize = 64 * 1024;

/// One source file queued for packing.
#[derive(Debug, Clone)]
pub struct PendingFile {
    /// Location of the source file on disk.
    pub source: PathBuf,
    /// Destination path inside the archive, rooted with a leading
    /// separator and backslash-delimited.
    pub archive_path: String,
    /// Decompressed size of the source file in bytes.
    pub size: u64,
}

/// Summary of one completed write pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    /// Number of payloads written.
    pub files_written: usize,
    /// Total source bytes consumed.
    pub bytes_read: u64,
    /// Total compressed bytes written, excluding header and table.
    pub bytes_written: u64,
}

/// Collects pending files from a source directory, then writes them into
/// a single archive.
#[derive(Debug)]
pub struct PakBuilder {
    pending: Vec<PendingFile>,
    total_bytes: u64,
}

impl PakBuilder {
    /// Collects every regular file under `source_dir`, in walk order.
    ///
    /// Symbolic links are followed, so link cycles surface as walk
    /// errors; unreadable entries abort the scan rather than being
    /// skipped.
    ///
    /// # Errors
    ///
    /// `Io` for walk or metadata failures, `InvalidFormat` for file
    /// names that are not valid UTF-8.
    pub fn scan<P: AsRef<Path>>(source_dir: P) -> Result<Self> {
        let root = source_dir.as_ref();
        let mut pending = Vec::new();
        let mut total_bytes = 0u64;
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.depth() == 0 || !entry.file_type().is_file() {
                continue;
            }
            let metadata = entry.metadata().map_err(std::io::Error::from)?;
            let archive_path = archive_path_for(root, entry.path())?;
            total_bytes += metadata.len();
            pending.push(PendingFile {
                source: entry.path().to_path_buf(),
                archive_path,
                size: metadata.len(),
            });
        }
        debug!(
            files = pending.len(),
            bytes = total_bytes,
            "scanned source directory"
        );
        Ok(Self {
            pending,
            total_bytes,
        })
    }

    /// The files queued for packing, in walk order.
    #[must_use]
    pub fn pending(&self) -> &[PendingFile] {
        &self.pending
    }

    /// Sum of the pending decompressed sizes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Streams every pending file into a new archive at `dest`.
    ///
    /// The first [`HEADER_SIZE`] bytes are reserved and written last,
    /// after the payload bodies and the file table. `sink` receives
    /// rate-limited [`WriteProgress`] snapshots plus one final forced
    /// snapshot.
    ///
    /// Any I/O error aborts the pass and leaves the destination in a
    /// non-archive state; there is no rollback. Callers needing
    /// atomicity should write to a temporary path and rename on
    /// success.
    ///
    /// # Errors
    ///
    /// `Io` for stream failures, `InvalidFormat` when an offset, size,
    /// or path exceeds what a record can carry.
    pub fn write<P: AsRef<Path>>(
        &self,
        dest: P,
        sink: &mut dyn ProgressSink,
    ) -> Result<WriteReport> {
        let dest = dest.as_ref();
        let mut out = File::create(dest)?;
        out.seek(SeekFrom::Start(HEADER_SIZE as u64))?;

        let mut records: Vec<FileRecord> = Vec::with_capacity(self.pending.len());
        let mut throttle = ProgressThrottle::new(REPORT_INTERVAL);
        let mut bytes_read = 0u64;
        let mut compressed_total = 0u64;

        for (index, file) in self.pending.iter().enumerate() {
            let disk_offset = checked_u32(out.stream_position()?, "payload offset")?;
            let (read, written) = compress_into(&file.source, &mut out)?;
            bytes_read += read;
            compressed_total += written;
            let compressed = checked_u32(written, "compressed payload size")?;
            let record = FileRecord {
                path: file
                    .archive_path
                    .trim_start_matches(SEPARATOR)
                    .to_string(),
                disk_size: compressed,
                decompressed_size: checked_u32(read, "payload size")?,
                compressed_size: compressed,
                disk_offset,
                unknown: [0; 4],
            };
            trace!(path = %record.path, compressed, "payload written");
            records.push(record);
            throttle.report(
                sink,
                index + 1,
                self.pending.len(),
                bytes_read,
                self.total_bytes,
                false,
            );
        }

        let file_table_offset = checked_u32(out.stream_position()?, "file table offset")?;
        for record in &records {
            out.write_all(&record.encode()?)?;
        }

        let header = PakHeader {
            entry_count: checked_u32(records.len() as u64, "entry count")?,
            file_table_offset,
        };
        out.seek(SeekFrom::Start(0))?;
        out.write_all(&header.encode())?;
        out.flush()?;

        throttle.report(
            sink,
            records.len(),
            records.len(),
            bytes_read,
            self.total_bytes,
            true,
        );
        debug!(
            files = records.len(),
            table_offset = file_table_offset,
            "archive finalized"
        );
        Ok(WriteReport {
            files_written: records.len(),
            bytes_read,
            bytes_written: compressed_total,
        })
    }
}

/// One-shot archive creation: scan `source_dir`, then write to `dest`.
///
/// # Examples
///
/// ```no_run
/// use dnpak_core::{NullProgress, build_and_write};
///
/// # fn main() -> dnpak_core::Result<()> {
/// let report = build_and_write("resources/", "out.pak", &mut NullProgress)?;
/// println!("packed {} files", report.files_written);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Everything [`PakBuilder::scan`] and [`PakBuilder::write`] can fail
/// with.
pub fn build_and_write<P, Q>(
    source_dir: P,
    dest: Q,
    sink: &mut dyn ProgressSink,
) -> Result<WriteReport>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    PakBuilder::scan(source_dir)?.write(dest, sink)
}

/// Streams one source file through a fresh DEFLATE encoder into `out`.
/// Returns `(source bytes consumed, compressed bytes written)`.
fn compress_into(source: &Path, out: &mut File) -> Result<(u64, u64)> {
    let mut reader = BufReader::new(File::open(source)?);
    let mut encoder = ZlibEncoder::new(CountingWriter::new(out), Compression::default());
    let mut buf = [0u8; CHUNK_SIZE];
    let mut read_total = 0u64;
    loop {
        let got = reader.read(&mut buf)?;
        if got == 0 {
            break;
        }
        encoder.write_all(&buf[..got])?;
        read_total += got as u64;
    }
    let counter = encoder.finish()?;
    Ok((read_total, counter.total_bytes()))
}

/// Converts an absolute source path into the stored archive path:
/// root-relative, backslash-delimited, rooted with a leading separator.
fn archive_path_for(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        PakError::InvalidFormat(format!(
            "path {} escapes the source root {}",
            path.display(),
            root.display()
        ))
    })?;
    let mut out = String::new();
    for component in relative.components() {
        let segment = component.as_os_str().to_str().ok_or_else(|| {
            PakError::InvalidFormat(format!(
                "non-UTF-8 file name under {}",
                root.display()
            ))
        })?;
        out.push(SEPARATOR);
        out.push_str(segment);
    }
    Ok(out)
}

fn checked_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        PakError::InvalidFormat(format!(
            "{what} {value} exceeds the 32-bit archive limit"
        ))
    })
}
