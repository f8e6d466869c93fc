//! Pipeline input and output types.
//!
//! [`RawInput`] is what the caller hands over: bytes plus an untrusted
//! filename hint. [`NormalizedDocument`] is the only artifact passed on to
//! the message parser. It owns its text outright.
//!
//! # Example
//!
//! ```
//! use chatprep::document::RawInput;
//!
//! let input = RawInput::new(b"12/05/2023, 10:01 - Alice: hello".to_vec())
//!     .with_hint("chat.txt");
//! assert_eq!(input.extension(), Some("txt".to_string()));
//! assert_eq!(input.len(), 32);
//! ```

use serde::{Deserialize, Serialize};

use crate::encoding::{Quality, TextEncoding};
use crate::sniff::ContainerKind;

/// Bytes to normalize, plus an optional filename hint.
///
/// The hint is advisory. It is consulted only when the bytes carry no
/// recognizable signature and never overrides what the bytes say.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawInput {
    /// Input bytes
    pub bytes: Vec<u8>,

    /// Filename or extension as supplied by the user or OS
    pub hint: Option<String>,
}

impl RawInput {
    /// Wraps bytes without a hint.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            hint: None,
        }
    }

    /// Attaches a filename hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Number of input bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for zero-length input.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lower-cased extension of the hint, without the dot.
    ///
    /// A bare extension (`"txt"`) is accepted as well as a filename.
    pub fn extension(&self) -> Option<String> {
        let hint = self.hint.as_deref()?.trim();
        if hint.is_empty() {
            return None;
        }
        let ext = hint.rsplit_once('.').map_or(hint, |(_, ext)| ext);
        if ext.is_empty() || ext.contains(['/', '\\']) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Canonical text ready for the message parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    /// Decoded and sanitized text.
    pub text: String,

    /// Encoding of the decoding rung that succeeded.
    pub encoding_used: TextEncoding,

    /// Whether the text is byte-exact, substituted, or filtered.
    ///
    /// Consumers should check this before trusting the text verbatim.
    pub quality: Quality,

    /// Container kind the bytes were sniffed as.
    ///
    /// Archive-derived documents report [`ContainerKind::Archive`] even
    /// though their text came from an entry inside.
    pub source_container: ContainerKind,
}

impl NormalizedDocument {
    /// Iterates the document's lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    /// Number of lines in the document.
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    /// Returns `true` if the document carries no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns `true` unless the text decoded cleanly.
    pub fn is_degraded(&self) -> bool {
        self.quality.is_degraded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_input_extension() {
        let input = RawInput::new(vec![1]).with_hint("WhatsApp Chat.TXT");
        assert_eq!(input.extension(), Some("txt".to_string()));

        let bare = RawInput::new(vec![1]).with_hint("html");
        assert_eq!(bare.extension(), Some("html".to_string()));

        assert_eq!(RawInput::new(vec![1]).extension(), None);
        assert_eq!(RawInput::new(vec![1]).with_hint("").extension(), None);
        assert_eq!(RawInput::new(vec![1]).with_hint("chat.").extension(), None);
        assert_eq!(
            RawInput::new(vec![1]).with_hint("dir.d/chat").extension(),
            None
        );
    }

    #[test]
    fn test_raw_input_len() {
        assert!(RawInput::default().is_empty());
        assert_eq!(RawInput::new("abc").len(), 3);
    }

    #[test]
    fn test_document_lines() {
        let doc = NormalizedDocument {
            text: "a\n\nb".to_string(),
            encoding_used: TextEncoding::Utf8,
            quality: Quality::Clean,
            source_container: ContainerKind::PlainText,
        };
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.lines().last(), Some("b"));
        assert!(!doc.is_degraded());
    }

    #[test]
    fn test_document_serialization() {
        let doc = NormalizedDocument {
            text: "hi".to_string(),
            encoding_used: TextEncoding::Latin1,
            quality: Quality::Lossy,
            source_container: ContainerKind::Archive,
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains(r#""encoding_used":"latin1""#));
        assert!(json.contains(r#""quality":"lossy""#));
        assert!(json.contains(r#""source_container":"archive""#));

        let parsed: NormalizedDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);
    }
}
