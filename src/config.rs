//! Configuration for the import pipeline.
//!
//! Process-wide limits live in an explicit [`ImportConfig`] value handed to
//! the pipeline constructor, so every instance can be tested with its own
//! limits.
//!
//! # Example
//!
//! ```rust
//! use chatprep::config::ImportConfig;
//! use chatprep::pipeline::ImportPipeline;
//!
//! let config = ImportConfig::new()
//!     .with_max_file_size(10 * 1024 * 1024)
//!     .with_normalize_lines(true);
//!
//! let pipeline = ImportPipeline::with_config(config);
//! ```

use serde::{Deserialize, Serialize};

/// Default hard upper bound on accepted input: 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Default prefix length scanned for markup fingerprints.
pub const DEFAULT_SNIFF_WINDOW: usize = 4 * 1024;

/// Configuration for the import pipeline.
///
/// All string lists are compared case-insensitively. The builders store them
/// lower-cased; deserialized lists are kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Inputs strictly larger than this are rejected (default: 100 MiB).
    /// Also caps every archive entry read.
    pub max_file_size: u64,

    /// Prefix length scanned for markup fingerprints (default: 4KB)
    pub sniff_window: usize,

    /// Entry extensions that may hold a transcript inside an archive
    /// (default: txt, html, htm)
    pub transcript_extensions: Vec<String>,

    /// Name fragments that mark an archive entry as the transcript
    /// (default: whatsapp, chat)
    pub transcript_keywords: Vec<String>,

    /// Advisory file extensions offered to users (default: txt, html, zip)
    pub accepted_extensions: Vec<String>,

    /// Trim lines and drop blank ones after sanitizing (default: false)
    pub normalize_lines: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            sniff_window: DEFAULT_SNIFF_WINDOW,
            transcript_extensions: lowercase_all(&["txt", "html", "htm"]),
            transcript_keywords: lowercase_all(&["whatsapp", "chat"]),
            accepted_extensions: lowercase_all(&["txt", "html", "zip"]),
            normalize_lines: false,
        }
    }
}

impl ImportConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum accepted input size in bytes.
    #[must_use]
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Sets the prefix length scanned for markup.
    #[must_use]
    pub fn with_sniff_window(mut self, window: usize) -> Self {
        self.sniff_window = window;
        self
    }

    /// Replaces the set of transcript extensions used inside archives.
    #[must_use]
    pub fn with_transcript_extensions(mut self, extensions: &[&str]) -> Self {
        self.transcript_extensions = lowercase_all(extensions);
        self
    }

    /// Replaces the set of transcript keywords used inside archives.
    #[must_use]
    pub fn with_transcript_keywords(mut self, keywords: &[&str]) -> Self {
        self.transcript_keywords = lowercase_all(keywords);
        self
    }

    /// Enables or disables line-array normalization.
    #[must_use]
    pub fn with_normalize_lines(mut self, enabled: bool) -> Self {
        self.normalize_lines = enabled;
        self
    }

    /// Returns whether `name` ends in one of the transcript extensions.
    ///
    /// Case-insensitive on both sides, so lists loaded through serde match
    /// the same way builder-set ones do.
    pub fn has_transcript_extension(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.transcript_extensions
            .iter()
            .any(|ext| name.ends_with(&format!(".{}", ext.to_lowercase())))
    }

    /// Returns whether `name` contains one of the transcript keywords,
    /// ignoring case.
    pub fn has_transcript_keyword(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.transcript_keywords
            .iter()
            .any(|keyword| name.contains(keyword.to_lowercase().as_str()))
    }

    /// Returns whether a filename hint carries one of the advisory extensions.
    ///
    /// The answer is never used to refuse an import.
    pub fn is_accepted_extension(&self, hint: &str) -> bool {
        let Some((_, ext)) = hint.rsplit_once('.') else {
            return false;
        };
        let ext = ext.to_lowercase();
        self.accepted_extensions
            .iter()
            .any(|e| e.to_lowercase() == ext)
    }
}

fn lowercase_all(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}
