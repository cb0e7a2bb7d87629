//! Reader, writer, and diagnostics for Eyedentity pak archives.
//!
//! A pak file packs many named files into a single blob: a fixed
//! 1024-byte header, individually DEFLATE-compressed payload bodies,
//! and a trailing file table locating each payload. This crate is the
//! data plane of a pak browsing/extraction tool: it decodes and encodes
//! the binary layout, indexes entries into a directory tree, serves
//! random-access payload ranges, writes new archives from a source
//! directory, and diagnoses byte-range continuity of stored payloads.
//!
//! Everything is single-threaded, synchronous, blocking I/O. An open
//! [`PakArchive`] owns one file handle; independent handles over the
//! same path are safe and isolated.
//!
//! # Examples
//!
//! ```no_run
//! use dnpak_core::PakArchive;
//!
//! # fn main() -> dnpak_core::Result<()> {
//! let archive = PakArchive::open("resource00.pak")?;
//! for path in archive.find("login", false)? {
//!     println!("{path}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod format;
pub mod index;
pub mod inspect;
pub mod io;
pub mod read;
pub mod write;

pub use error::PakError;
pub use error::Result;
pub use format::FileRecord;
pub use format::HEADER_SIZE;
pub use format::PakHeader;
pub use format::RECORD_SIZE;
pub use index::EntryId;
pub use index::EntryTree;
pub use inspect::Segment;
pub use inspect::coalesce;
pub use inspect::discontinuity;
pub use read::NameFilter;
pub use read::PakArchive;
pub use write::NullProgress;
pub use write::PakBuilder;
pub use write::ProgressSink;
pub use write::WriteProgress;
pub use write::WriteReport;
pub use write::build_and_write;
