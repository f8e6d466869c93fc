//! Locating the transcript inside a zip export.
//!
//! "Export chat → Attach media" produces a zip holding the transcript next
//! to photos, voice notes and sometimes a readme. The transcript is picked
//! by name in two passes:
//!
//! 1. the first entry ending in a transcript extension **and** containing a
//!    transcript keyword (`WhatsApp Chat with Bob.txt`);
//! 2. failing that, the first entry ending in a transcript extension at all
//!    (`notes.txt`).
//!
//! Directories, `__MACOSX/` resource forks and AppleDouble `._*` files are
//! never candidates. The chosen entry is read into a fresh buffer capped at
//! the configured maximum size.

use std::io::{Cursor, Read};

use serde::{Deserialize, Serialize};
use zip::ZipArchive;

use crate::config::ImportConfig;
use crate::error::{ImportError, Result};

/// Which selection pass matched the transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPass {
    /// Extension and keyword matched
    Keyword,
    /// Only the extension matched
    Extension,
}

/// The transcript pulled out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Full entry name inside the archive
    pub name: String,
    /// Decompressed entry contents
    pub bytes: Vec<u8>,
    /// Which pass selected this entry
    pub pass: MatchPass,
}

/// Lists the names of all file entries that could be a transcript
/// candidate, in archive order.
///
/// Directories and macOS metadata entries are left out.
pub fn list_candidates(archive_bytes: &[u8]) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))?;
    Ok(file_names(&mut archive)?
        .into_iter()
        .map(|(_, name)| name)
        .collect())
}

/// Picks a transcript among `names` using the two-pass policy.
///
/// Returns the position in `names` and the pass that matched.
///
/// # Example
///
/// ```rust
/// use chatprep::archive::{MatchPass, select_candidate};
/// use chatprep::config::ImportConfig;
///
/// let names = vec![
///     "readme.txt".to_string(),
///     "WhatsApp Chat with Bob.txt".to_string(),
/// ];
/// let picked = select_candidate(&names, &ImportConfig::default());
/// assert_eq!(picked, Some((1, MatchPass::Keyword)));
/// ```
pub fn select_candidate(names: &[String], config: &ImportConfig) -> Option<(usize, MatchPass)> {
    let by_keyword = names.iter().position(|name| {
        config.has_transcript_extension(name) && config.has_transcript_keyword(name)
    });
    if let Some(pos) = by_keyword {
        return Some((pos, MatchPass::Keyword));
    }

    names
        .iter()
        .position(|name| config.has_transcript_extension(name))
        .map(|pos| (pos, MatchPass::Extension))
}

/// Extracts the transcript entry from zip bytes.
///
/// # Errors
///
/// - [`ImportError::CorruptArchive`] if the zip directory or the entry's
///   data cannot be read
/// - [`ImportError::NoTranscriptInArchive`] if neither pass matches
/// - [`ImportError::TooLarge`] if the entry exceeds `config.max_file_size`
pub fn extract_transcript(archive_bytes: &[u8], config: &ImportConfig) -> Result<ArchiveEntry> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))?;
    let files = file_names(&mut archive)?;
    let names: Vec<String> = files.iter().map(|(_, name)| name.clone()).collect();

    let Some((pos, pass)) = select_candidate(&names, config) else {
        tracing::debug!(entries = names.len(), "no transcript candidate in archive");
        return Err(ImportError::no_transcript(names.len()));
    };
    let (index, name) = files[pos].clone();

    let max = config.max_file_size;
    let entry = archive.by_index(index)?;
    if entry.size() > max {
        return Err(ImportError::too_large(entry.size(), max));
    }

    let capacity = usize::try_from(entry.size()).unwrap_or(0);
    let mut bytes = Vec::with_capacity(capacity);
    // Declared sizes can lie; the read itself is capped too.
    entry
        .take(max.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| ImportError::corrupt_archive(format!("{name}: {e}")))?;
    if bytes.len() as u64 > max {
        return Err(ImportError::too_large(bytes.len() as u64, max));
    }

    tracing::debug!(entry = %name, pass = ?pass, bytes = bytes.len(), "extracted transcript");
    Ok(ArchiveEntry { name, bytes, pass })
}

/// `(index, name)` of every candidate file entry, in archive order.
fn file_names<R>(archive: &mut ZipArchive<R>) -> Result<Vec<(usize, String)>>
where
    R: Read + std::io::Seek,
{
    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        if entry.is_dir() || is_macos_metadata(entry.name()) {
            continue;
        }
        names.push((index, entry.name().to_string()));
    }
    Ok(names)
}

fn is_macos_metadata(name: &str) -> bool {
    let base = name.rsplit('/').next().unwrap_or(name);
    name.starts_with("__MACOSX/") || base.starts_with("._")
}
