//! Error types for pak archive operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `PakError`.
pub type Result<T> = std::result::Result<T, PakError>;

/// Errors that can occur while reading, writing, or inspecting pak
/// archives.
#[derive(Error, Debug)]
pub enum PakError {
    /// Archive path does not exist.
    #[error("archive not found: {path}")]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Archive path names a directory instead of a regular file.
    #[error("not a pak file (is a directory): {path}")]
    IsDirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// Header or file table violates the binary format.
    #[error("invalid pak format: {0}")]
    InvalidFormat(String),

    /// Byte source ends before the header or file table demands.
    #[error("truncated archive: need {expected} bytes, have {actual}")]
    Truncated {
        /// Bytes the layout requires.
        expected: u64,
        /// Bytes actually available.
        actual: u64,
    },

    /// Tree insertion or lookup would descend through a file entry, or
    /// replace a directory with a file.
    #[error("path conflict at {path}: file entries cannot have children")]
    Conflict {
        /// The full path whose traversal failed.
        path: String,
    },

    /// Raw transfer attempted on a closed archive handle.
    #[error("archive handle is closed")]
    Closed,

    /// Malformed search pattern supplied to a name filter.
    #[error("invalid name pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PakError {
    /// Returns `true` for structural errors.
    ///
    /// Structural errors indicate the input itself is wrong rather than a
    /// transient failure, and are never retried.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat(_) | Self::Truncated { .. } | Self::Conflict { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PakError::Closed;
        assert_eq!(err.to_string(), "archive handle is closed");

        let err = PakError::Truncated {
            expected: 1024,
            actual: 12,
        };
        assert_eq!(err.to_string(), "truncated archive: need 1024 bytes, have 12");
    }

    #[test]
    fn test_conflict_display_contains_path() {
        let err = PakError::Conflict {
            path: "resource\\ui\\a.dds".to_string(),
        };
        assert!(err.to_string().contains("resource\\ui\\a.dds"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: PakError = io_err.into();
        assert!(matches!(err, PakError::Io(_)));
    }

    #[test]
    fn test_is_structural() {
        assert!(PakError::InvalidFormat("bad magic".into()).is_structural());
        assert!(
            PakError::Truncated {
                expected: 1,
                actual: 0
            }
            .is_structural()
        );
        assert!(
            PakError::Conflict {
                path: "a\\b".into()
            }
            .is_structural()
        );

        assert!(!PakError::Closed.is_structural());
        assert!(
            !PakError::NotFound {
                path: PathBuf::from("x.pak")
            }
            .is_structural()
        );
        let io_err = std::io::Error::other("boom");
        assert!(!PakError::from(io_err).is_structural());
    }
}
