//! Container type detection from leading bytes.
//!
//! File extensions on chat exports are untrusted: phones rename archives to
//! `.txt`, mail clients strip extensions entirely. The container kind is
//! therefore derived from bytes alone. A filename hint is consulted only by
//! the pipeline, and only after sniffing came back [`ContainerKind::Unknown`].

use serde::{Deserialize, Serialize};

/// Number of leading bytes scanned for markup fingerprints.
pub const MARKUP_SCAN_WINDOW: usize = crate::config::DEFAULT_SNIFF_WINDOW;

/// Zip local file header magic (`PK`).
const ARCHIVE_MAGIC: [u8; 2] = [0x50, 0x4B];

/// Case-insensitive markup root token.
const MARKUP_TOKEN: &[u8] = b"<html";

/// Inputs shorter than this carry no usable text signal.
const MIN_SNIFF_LEN: usize = 4;

/// Minimum share of printable characters for a prefix to count as text.
const PRINTABLE_RATIO: f64 = 0.80;

/// The true container type of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Plain text transcript
    PlainText,
    /// HTML export
    Markup,
    /// Zip archive bundling a transcript
    Archive,
    /// No signature matched
    Unknown,
}

impl ContainerKind {
    /// Returns a short lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::PlainText => "plain_text",
            ContainerKind::Markup => "markup",
            ContainerKind::Archive => "archive",
            ContainerKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies bytes using the default markup scan window.
///
/// # Example
///
/// ```rust
/// use chatprep::sniff::{ContainerKind, classify_bytes};
///
/// assert_eq!(classify_bytes(b"PK\x03\x04rest"), ContainerKind::Archive);
/// assert_eq!(classify_bytes(b"<!DOCTYPE html><HTML>"), ContainerKind::Markup);
/// assert_eq!(classify_bytes(b""), ContainerKind::Unknown);
/// ```
pub fn classify_bytes(bytes: &[u8]) -> ContainerKind {
    classify_with_window(bytes, MARKUP_SCAN_WINDOW)
}

/// Classifies bytes, scanning at most `window` leading bytes for markup.
///
/// Never fails: empty or short input is [`ContainerKind::Unknown`].
/// A prefix that is valid UTF-8 and mostly printable is reported as
/// [`ContainerKind::PlainText`]; anything else without a signature stays
/// `Unknown`.
pub fn classify_with_window(bytes: &[u8], window: usize) -> ContainerKind {
    if bytes.starts_with(&ARCHIVE_MAGIC) {
        return ContainerKind::Archive;
    }

    if bytes.len() < MIN_SNIFF_LEN {
        return ContainerKind::Unknown;
    }

    let prefix = &bytes[..bytes.len().min(window)];
    if contains_ignore_ascii_case(prefix, MARKUP_TOKEN) {
        return ContainerKind::Markup;
    }

    if is_likely_text(prefix) {
        return ContainerKind::PlainText;
    }

    ContainerKind::Unknown
}

/// Maps an advisory filename hint to a container kind.
///
/// Only the extension is looked at. Returns `None` when the hint carries no
/// recognized extension.
pub fn container_from_extension(hint: &str) -> Option<ContainerKind> {
    let (_, ext) = hint.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "txt" => Some(ContainerKind::PlainText),
        "html" | "htm" => Some(ContainerKind::Markup),
        "zip" => Some(ContainerKind::Archive),
        _ => None,
    }
}

/// Valid UTF-8 (a sequence cut off by the window is tolerated) with more
/// than 80% printable characters.
fn is_likely_text(prefix: &[u8]) -> bool {
    let text = match std::str::from_utf8(prefix) {
        Ok(t) => t,
        // error_len() == None means the prefix ends mid-sequence
        Err(e) if e.error_len().is_none() => {
            // valid_up_to() is a char boundary by construction
            match std::str::from_utf8(&prefix[..e.valid_up_to()]) {
                Ok(t) => t,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };

    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .count();
    printable as f64 / total as f64 > PRINTABLE_RATIO
}

fn contains_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || haystack.len() < needle.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle))
}
