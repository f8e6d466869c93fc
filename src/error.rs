//! Unified error types for chatprep.
//!
//! Every pipeline invocation either produces a normalized document or stops
//! with exactly one [`ImportError`]. All variants are terminal for the
//! invocation that raised them; none are retried internally.
//!
//! # Retry Semantics
//!
//! - [`ImportError::UnreadableSource`] is the only kind a caller may retry
//!   without new input (e.g. transient filesystem contention).
//! - Every other kind is deterministic given the same bytes.
//!
//! Encoding problems never surface here. The decoder always produces text
//! and reports degradation through [`Quality`](crate::encoding::Quality)
//! instead.

use std::io;

use thiserror::Error;

/// A specialized [`Result`] type for chatprep operations.
///
/// # Example
///
/// ```rust
/// use chatprep::error::Result;
///
/// fn my_function() -> Result<usize> {
///     Ok(0)
/// }
/// ```
pub type Result<T> = std::result::Result<T, ImportError>;

/// The error type for all import operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    /// The input contained zero bytes.
    #[error("Input is empty")]
    EmptyInput,

    /// The input (or an archive entry) exceeds the configured size limit.
    #[error("Input too large: {size} bytes (maximum: {max} bytes)")]
    TooLarge {
        /// Observed size in bytes. For streamed input this is a lower bound.
        size: u64,
        /// Configured maximum in bytes
        max: u64,
    },

    /// Reading the byte source failed.
    ///
    /// This typically happens when:
    /// - The input file doesn't exist
    /// - Permission denied
    /// - The file is locked by another process
    #[error("Could not read input: {0}")]
    UnreadableSource(#[from] io::Error),

    /// The archive was readable but held no entry that looks like a transcript.
    #[error("No chat transcript found in archive ({entries} entries scanned)")]
    NoTranscriptInArchive {
        /// Number of file entries that were inspected
        entries: usize,
    },

    /// The archive's directory structure could not be read.
    #[error("Archive is corrupt: {reason}")]
    CorruptArchive {
        /// Description of what's wrong
        reason: String,
    },

    /// The content cannot possibly be a transcript.
    ///
    /// Content-shape heuristics never produce this; they downgrade to a
    /// warning verdict instead.
    #[error("Unrecognized content: {reason}")]
    UnrecognizedContent {
        /// Description of what's wrong
        reason: String,
    },

    /// The invocation was abandoned between stages because a newer request
    /// for the same file superseded it.
    ///
    /// Only produced when a caller supplies an abandon check, as
    /// [`ImportController`](crate::controller::ImportController) does.
    #[error("Import abandoned: superseded by a newer request")]
    Abandoned,
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl ImportError {
    /// Creates a size-limit error.
    pub fn too_large(size: u64, max: u64) -> Self {
        ImportError::TooLarge { size, max }
    }

    /// Creates an archive-has-no-transcript error.
    pub fn no_transcript(entries: usize) -> Self {
        ImportError::NoTranscriptInArchive { entries }
    }

    /// Creates a corrupt archive error.
    pub fn corrupt_archive(reason: impl Into<String>) -> Self {
        ImportError::CorruptArchive {
            reason: reason.into(),
        }
    }

    /// Creates an unrecognized content error.
    pub fn unrecognized(reason: impl Into<String>) -> Self {
        ImportError::UnrecognizedContent {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is an empty input error.
    pub fn is_empty_input(&self) -> bool {
        matches!(self, ImportError::EmptyInput)
    }

    /// Returns `true` if this is a size-limit error.
    pub fn is_too_large(&self) -> bool {
        matches!(self, ImportError::TooLarge { .. })
    }

    /// Returns `true` if this is an I/O error.
    pub fn is_io(&self) -> bool {
        matches!(self, ImportError::UnreadableSource(_))
    }

    /// Returns `true` if the archive held no transcript candidate.
    pub fn is_no_transcript(&self) -> bool {
        matches!(self, ImportError::NoTranscriptInArchive { .. })
    }

    /// Returns `true` if the archive directory was unreadable.
    pub fn is_corrupt_archive(&self) -> bool {
        matches!(self, ImportError::CorruptArchive { .. })
    }

    /// Returns `true` if a newer request superseded this invocation.
    pub fn is_abandoned(&self) -> bool {
        matches!(self, ImportError::Abandoned)
    }

    /// Returns `true` if retrying with the same input may succeed.
    ///
    /// Only I/O failures qualify.
    pub fn is_retryable(&self) -> bool {
        self.is_io()
    }

    /// Short, stable identifier for this error kind.
    ///
    /// Used in machine-readable reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::EmptyInput => "empty_input",
            ImportError::TooLarge { .. } => "too_large",
            ImportError::UnreadableSource(_) => "unreadable_source",
            ImportError::NoTranscriptInArchive { .. } => "no_transcript_in_archive",
            ImportError::CorruptArchive { .. } => "corrupt_archive",
            ImportError::UnrecognizedContent { .. } => "unrecognized_content",
            ImportError::Abandoned => "abandoned",
        }
    }
}

// Archives are always read from memory, so a zip-level I/O error means the
// bytes are truncated, not that the source is unreadable.
impl From<zip::result::ZipError> for ImportError {
    fn from(err: zip::result::ZipError) -> Self {
        ImportError::corrupt_archive(err.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_display() {
        let err = ImportError::EmptyInput;
        assert_eq!(err.to_string(), "Input is empty");
    }

    #[test]
    fn test_too_large_display() {
        let err = ImportError::too_large(2048, 1024);
        let display = err.to_string();
        assert!(display.contains("2048"));
        assert!(display.contains("1024"));
    }

    #[test]
    fn test_io_error_display() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = ImportError::from(io_err);
        let display = err.to_string();
        assert!(display.contains("Could not read input"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_no_transcript_display() {
        let err = ImportError::no_transcript(3);
        assert!(err.to_string().contains("3 entries"));
    }

    #[test]
    fn test_corrupt_archive_display() {
        let err = ImportError::corrupt_archive("invalid central directory");
        assert!(err.to_string().contains("invalid central directory"));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = ImportError::from(io_err);
        assert!(err.source().is_some());
        assert!(ImportError::EmptyInput.source().is_none());
    }

    #[test]
    fn test_only_io_is_retryable() {
        let io_err = ImportError::from(io::Error::other("busy"));
        assert!(io_err.is_retryable());

        assert!(!ImportError::EmptyInput.is_retryable());
        assert!(!ImportError::too_large(2, 1).is_retryable());
        assert!(!ImportError::no_transcript(0).is_retryable());
        assert!(!ImportError::corrupt_archive("x").is_retryable());
        assert!(!ImportError::unrecognized("x").is_retryable());
        assert!(!ImportError::Abandoned.is_retryable());
    }

    #[test]
    fn test_is_methods() {
        assert!(ImportError::EmptyInput.is_empty_input());
        assert!(!ImportError::EmptyInput.is_too_large());

        let err = ImportError::too_large(10, 5);
        assert!(err.is_too_large());
        assert!(!err.is_io());

        assert!(ImportError::no_transcript(1).is_no_transcript());
        assert!(ImportError::corrupt_archive("x").is_corrupt_archive());
    }

    #[test]
    fn test_kind_identifiers() {
        assert_eq!(ImportError::EmptyInput.kind(), "empty_input");
        assert_eq!(ImportError::too_large(2, 1).kind(), "too_large");
        assert_eq!(
            ImportError::no_transcript(0).kind(),
            "no_transcript_in_archive"
        );
    }

    #[test]
    fn test_from_zip_error() {
        let err: ImportError = zip::result::ZipError::InvalidArchive("bad magic".into()).into();
        assert!(err.is_corrupt_archive());

        let err: ImportError = zip::result::ZipError::Io(io::Error::other("eof")).into();
        assert!(err.is_corrupt_archive());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_debug() {
        let err = ImportError::EmptyInput;
        let debug = format!("{:?}", err);
        assert!(debug.contains("EmptyInput"));
    }
}
