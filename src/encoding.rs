//! Byte-to-text decoding with a strict-to-lenient fallback ladder.
//!
//! Chat exports arrive in whatever encoding the exporting phone's locale
//! preferred. Instead of guessing, [`decode`] walks a fixed ladder of
//! decoders, most specific first, and stops at the first rung that accepts
//! the bytes:
//!
//! | Rung | Encoding | On invalid bytes | Quality |
//! |------|----------|------------------|---------|
//! | [`Rung::StrictUtf8`] | UTF-8 | reject | `Clean` |
//! | [`Rung::LossyUtf8`] | UTF-8 | replace with U+FFFD | `Lossy` |
//! | [`Rung::Latin1`] | ISO-8859-1 | n/a | `Lossy` |
//! | [`Rung::LossyAscii`] | ASCII | replace with U+FFFD | `Lossy` |
//! | [`Rung::FilteredAscii`] | ASCII | drop | `Filtered` |
//!
//! The final rung accepts every byte sequence, so decoding is total: an
//! encoding problem is never an error, only a degraded [`Quality`].
//!
//! [`detect_likely_encoding`] is a separate advisory check for diagnostics.
//! It never changes the order in which the ladder runs.

use serde::{Deserialize, Serialize};

/// Leading sample inspected by [`detect_likely_encoding`].
pub const DETECTION_SAMPLE: usize = 1024;

/// The encoding a document was actually decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    /// UTF-8 (strict or with substitution)
    Utf8,
    /// ISO-8859-1, one byte per code point
    Latin1,
    /// 7-bit ASCII (with substitution or filtering)
    Ascii,
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "UTF-8"),
            TextEncoding::Latin1 => write!(f, "ISO-8859-1"),
            TextEncoding::Ascii => write!(f, "ASCII"),
        }
    }
}

/// How much the decoded text can be trusted verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Decoded by the first rung: the text is exactly the input.
    Clean,
    /// An intermediate rung was needed; some characters may be substituted
    /// or mis-mapped.
    Lossy,
    /// Only the terminal filter pass succeeded; bytes were dropped.
    Filtered,
}

impl Quality {
    /// Returns `true` unless the text is [`Quality::Clean`].
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Quality::Clean)
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quality::Clean => write!(f, "clean"),
            Quality::Lossy => write!(f, "lossy"),
            Quality::Filtered => write!(f, "filtered"),
        }
    }
}

/// What a rung does with bytes its encoding cannot represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Fail the rung
    RejectInvalid,
    /// Every byte maps to a character, so nothing is ever invalid
    MapAll,
    /// Substitute U+FFFD
    ReplaceInvalid,
    /// Drop the byte
    FilterInvalid,
}

/// One step of the decoding ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rung {
    /// UTF-8, rejecting any malformed sequence
    StrictUtf8,
    /// UTF-8, replacing malformed sequences with U+FFFD
    LossyUtf8,
    /// ISO-8859-1; every byte maps to the code point of the same value
    Latin1,
    /// ASCII, replacing bytes above 0x7F with U+FFFD
    LossyAscii,
    /// ASCII, keeping only printable bytes plus `\n` and `\r`
    FilteredAscii,
}

/// The fixed decoding order. Not configurable.
pub const DECODE_LADDER: [Rung; 5] = [
    Rung::StrictUtf8,
    Rung::LossyUtf8,
    Rung::Latin1,
    Rung::LossyAscii,
    Rung::FilteredAscii,
];

impl Rung {
    /// The encoding this rung assumes.
    pub fn encoding(&self) -> TextEncoding {
        match self {
            Rung::StrictUtf8 | Rung::LossyUtf8 => TextEncoding::Utf8,
            Rung::Latin1 => TextEncoding::Latin1,
            Rung::LossyAscii | Rung::FilteredAscii => TextEncoding::Ascii,
        }
    }

    /// The invalid-input policy of this rung.
    pub fn strictness(&self) -> Strictness {
        match self {
            Rung::StrictUtf8 => Strictness::RejectInvalid,
            Rung::Latin1 => Strictness::MapAll,
            Rung::LossyUtf8 | Rung::LossyAscii => Strictness::ReplaceInvalid,
            Rung::FilteredAscii => Strictness::FilterInvalid,
        }
    }

    /// The quality flag a document decoded by this rung carries.
    pub fn quality(&self) -> Quality {
        match self {
            Rung::StrictUtf8 => Quality::Clean,
            Rung::LossyUtf8 | Rung::Latin1 | Rung::LossyAscii => Quality::Lossy,
            Rung::FilteredAscii => Quality::Filtered,
        }
    }

    /// Attempts to decode `bytes` with this rung alone.
    ///
    /// Returns `None` only when a rejecting rung meets invalid input.
    pub fn attempt(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Rung::StrictUtf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Rung::LossyUtf8 => Some(String::from_utf8_lossy(bytes).into_owned()),
            Rung::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
            Rung::LossyAscii => Some(
                bytes
                    .iter()
                    .map(|&b| {
                        if b.is_ascii() {
                            char::from(b)
                        } else {
                            char::REPLACEMENT_CHARACTER
                        }
                    })
                    .collect(),
            ),
            Rung::FilteredAscii => Some(filter_printable_ascii(bytes)),
        }
    }
}

/// Result of running the decoding ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded text
    pub text: String,
    /// Encoding of the rung that succeeded
    pub encoding: TextEncoding,
    /// Quality implied by the rung that succeeded
    pub quality: Quality,
    /// The rung that succeeded
    pub rung: Rung,
}

/// Decodes bytes into text. Never fails.
///
/// # Example
///
/// ```rust
/// use chatprep::encoding::{Quality, TextEncoding, decode};
///
/// let decoded = decode("Привет".as_bytes());
/// assert_eq!(decoded.text, "Привет");
/// assert_eq!(decoded.encoding, TextEncoding::Utf8);
/// assert_eq!(decoded.quality, Quality::Clean);
///
/// let broken = decode(&[b'o', b'k', 0xFF]);
/// assert_eq!(broken.quality, Quality::Lossy);
/// ```
pub fn decode(bytes: &[u8]) -> Decoded {
    for rung in DECODE_LADDER {
        if let Some(text) = rung.attempt(bytes) {
            if rung != Rung::StrictUtf8 {
                tracing::debug!(rung = ?rung, bytes = bytes.len(), "decoding fell back");
            }
            return Decoded {
                text,
                encoding: rung.encoding(),
                quality: rung.quality(),
                rung,
            };
        }
    }

    // The ladder ends in a filter that accepts all input; kept so the
    // function stays total even if the ladder is ever reordered.
    Decoded {
        text: filter_printable_ascii(bytes),
        encoding: TextEncoding::Ascii,
        quality: Quality::Filtered,
        rung: Rung::FilteredAscii,
    }
}

fn filter_printable_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter(|&&b| matches!(b, 0x20..=0x7E | b'\n' | b'\r'))
        .map(|&b| char::from(b))
        .collect()
}

/// Best-guess encoding label, for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikelyEncoding {
    /// UTF-8 with a byte-order mark (`EF BB BF`)
    Utf8Bom,
    /// UTF-16 little endian BOM (`FF FE`)
    Utf16Le,
    /// UTF-16 big endian BOM (`FE FF`)
    Utf16Be,
    /// No high-bit bytes in the sample
    Ascii,
    /// High-bit bytes forming valid UTF-8
    Utf8,
    /// High-bit bytes that are not UTF-8; probably a legacy code page
    SingleByte,
    /// Nothing to inspect
    Unknown,
}

impl LikelyEncoding {
    /// Returns a short lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            LikelyEncoding::Utf8Bom => "utf8_bom",
            LikelyEncoding::Utf16Le => "utf16_le",
            LikelyEncoding::Utf16Be => "utf16_be",
            LikelyEncoding::Ascii => "ascii",
            LikelyEncoding::Utf8 => "utf8",
            LikelyEncoding::SingleByte => "single_byte",
            LikelyEncoding::Unknown => "unknown",
        }
    }
}

/// Output of [`detect_likely_encoding`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodingGuess {
    /// Best-guess label
    pub label: LikelyEncoding,
    /// Share of bytes with the high bit set in the leading sample (0.0-1.0)
    pub high_bit_ratio: f64,
}

/// Guesses the encoding from BOMs and the high-bit byte ratio of the first
/// [`DETECTION_SAMPLE`] bytes.
///
/// The result does not influence [`decode`]; the ladder always runs in full.
///
/// # Example
///
/// ```rust
/// use chatprep::encoding::{LikelyEncoding, detect_likely_encoding};
///
/// let guess = detect_likely_encoding(&[0xFF, 0xFE, b'h', 0x00]);
/// assert_eq!(guess.label, LikelyEncoding::Utf16Le);
/// ```
pub fn detect_likely_encoding(bytes: &[u8]) -> EncodingGuess {
    let sample = &bytes[..bytes.len().min(DETECTION_SAMPLE)];
    let high_bit = sample.iter().filter(|&&b| b >= 0x80).count();
    let high_bit_ratio = if sample.is_empty() {
        0.0
    } else {
        high_bit as f64 / sample.len() as f64
    };

    let label = if sample.starts_with(&[0xEF, 0xBB, 0xBF]) {
        LikelyEncoding::Utf8Bom
    } else if sample.starts_with(&[0xFF, 0xFE]) {
        LikelyEncoding::Utf16Le
    } else if sample.starts_with(&[0xFE, 0xFF]) {
        LikelyEncoding::Utf16Be
    } else if sample.is_empty() {
        LikelyEncoding::Unknown
    } else if high_bit == 0 {
        LikelyEncoding::Ascii
    } else if is_utf8_prefix(sample) {
        LikelyEncoding::Utf8
    } else {
        LikelyEncoding::SingleByte
    };

    EncodingGuess {
        label,
        high_bit_ratio,
    }
}

/// Valid UTF-8, allowing the sample boundary to split the last character.
fn is_utf8_prefix(sample: &[u8]) -> bool {
    match std::str::from_utf8(sample) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}
