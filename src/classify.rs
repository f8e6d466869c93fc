//! Heuristic check that decoded text plausibly is a chat transcript.
//!
//! Content shape is never a hard gate. The export format has no published
//! grammar, so a failed heuristic downgrades the verdict to
//! [`ValidationVerdict::AcceptedWithWarning`] and the import proceeds. Only
//! the size and existence checks done earlier in the pipeline reject input.
//!
//! # Policy
//!
//! - **Markup**: accepted when it has an `<html` root marker and either a
//!   source fingerprint (`WhatsApp`) or a DOCTYPE declaration.
//! - **Plain text** (and unknown): accepted when it has at least one
//!   numeric date (`12/05/2023`, `26.10.25`) and at least one message
//!   delimiter (`" - "` or `": "`). Either alone matches too much prose.
//! - **Archive**: the extracted entry is judged by whichever of the two
//!   policies its own content calls for.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::layout::{self, LineLayout};
use crate::sniff::ContainerKind;

/// Warning attached to markup without fingerprint or DOCTYPE.
pub const MARKUP_WARNING: &str = "source fingerprint not found";

/// Upper bound on tokens counted per signal; enough to tell "some" from "none".
const TOKEN_COUNT_CAP: usize = 10_000;

static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}[/.]\d{1,2}[/.](?:\d{4}|\d{2})\b").expect("date pattern is valid")
});
static HTML_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html").expect("html pattern is valid"));
static DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<!doctype\s+html").expect("doctype pattern is valid"));
static FINGERPRINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)whatsapp").expect("fingerprint pattern is valid"));

/// Outcome of content validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum ValidationVerdict {
    /// Content looks like a transcript.
    Accepted,
    /// Content is imported, but the caller should surface the reason.
    AcceptedWithWarning(String),
    /// Content must not reach the message parser.
    Rejected(String),
}

impl ValidationVerdict {
    /// Returns `true` for [`ValidationVerdict::Accepted`].
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationVerdict::Accepted)
    }

    /// Returns `true` for [`ValidationVerdict::Rejected`].
    pub fn is_rejected(&self) -> bool {
        matches!(self, ValidationVerdict::Rejected(_))
    }

    /// Returns `true` if processing may continue (accepted, with or without
    /// warning).
    pub fn proceeds(&self) -> bool {
        !self.is_rejected()
    }

    /// The warning text, if any.
    pub fn warning(&self) -> Option<&str> {
        match self {
            ValidationVerdict::AcceptedWithWarning(reason) => Some(reason),
            _ => None,
        }
    }

    /// Short lowercase label.
    pub fn label(&self) -> &'static str {
        match self {
            ValidationVerdict::Accepted => "accepted",
            ValidationVerdict::AcceptedWithWarning(_) => "accepted_with_warning",
            ValidationVerdict::Rejected(_) => "rejected",
        }
    }
}

impl std::fmt::Display for ValidationVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationVerdict::Accepted => write!(f, "accepted"),
            ValidationVerdict::AcceptedWithWarning(reason) => {
                write!(f, "accepted with warning: {reason}")
            }
            ValidationVerdict::Rejected(reason) => write!(f, "rejected: {reason}"),
        }
    }
}

/// Raw observations the verdict is derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSignals {
    /// Numeric date tokens seen (capped)
    pub date_tokens: usize,
    /// `" - "` and `": "` delimiters seen (capped)
    pub delimiter_tokens: usize,
    /// `<html` present
    pub html_root: bool,
    /// DOCTYPE declaration present
    pub doctype: bool,
    /// Source fingerprint present
    pub fingerprint: bool,
    /// Dominant header layout of a plain-text transcript
    pub layout: Option<LineLayout>,
    /// Timestamp of the first header under `layout`
    pub first_timestamp: Option<NaiveDateTime>,
}

/// Classifies `text` taken from a container of the given kind.
///
/// # Example
///
/// ```rust
/// use chatprep::classify::{ValidationVerdict, classify};
/// use chatprep::sniff::ContainerKind;
///
/// let verdict = classify("12/05/2023, 10:01 - Alice: hello", ContainerKind::PlainText);
/// assert_eq!(verdict, ValidationVerdict::Accepted);
///
/// let verdict = classify("hello world no markers here", ContainerKind::PlainText);
/// assert!(verdict.warning().is_some());
/// ```
pub fn classify(text: &str, kind: ContainerKind) -> ValidationVerdict {
    classify_with_signals(text, kind).0
}

/// Like [`classify`], also returning the observations behind the verdict.
pub fn classify_with_signals(text: &str, kind: ContainerKind) -> (ValidationVerdict, ContentSignals) {
    let signals = inspect(text, kind);
    let verdict = match effective_kind(text, kind) {
        ContainerKind::Markup => markup_verdict(&signals),
        _ => plain_text_verdict(&signals),
    };
    (verdict, signals)
}

/// Collects content signals without judging them.
pub fn inspect(text: &str, kind: ContainerKind) -> ContentSignals {
    let effective = effective_kind(text, kind);
    let html_root = HTML_ROOT.is_match(text);

    let mut signals = ContentSignals {
        date_tokens: DATE_TOKEN.find_iter(text).take(TOKEN_COUNT_CAP).count(),
        delimiter_tokens: count_delimiters(text),
        html_root,
        doctype: DOCTYPE.is_match(text),
        fingerprint: FINGERPRINT.is_match(text),
        layout: None,
        first_timestamp: None,
    };

    if effective != ContainerKind::Markup {
        signals.layout = layout::detect_layout_in(text);
        signals.first_timestamp = signals
            .layout
            .and_then(|l| layout::first_timestamp(text, l));
    }

    signals
}

/// Archives and unknown containers are judged by what their text looks like.
fn effective_kind(text: &str, kind: ContainerKind) -> ContainerKind {
    match kind {
        ContainerKind::Archive if HTML_ROOT.is_match(text) => ContainerKind::Markup,
        ContainerKind::Archive | ContainerKind::Unknown => ContainerKind::PlainText,
        other => other,
    }
}

fn markup_verdict(signals: &ContentSignals) -> ValidationVerdict {
    if signals.html_root && (signals.fingerprint || signals.doctype) {
        ValidationVerdict::Accepted
    } else {
        ValidationVerdict::AcceptedWithWarning(MARKUP_WARNING.to_string())
    }
}

fn plain_text_verdict(signals: &ContentSignals) -> ValidationVerdict {
    let has_date = signals.date_tokens > 0;
    let has_delimiter = signals.delimiter_tokens > 0;

    match (has_date, has_delimiter) {
        (true, true) => ValidationVerdict::Accepted,
        (false, true) => ValidationVerdict::AcceptedWithWarning("no date stamp found".to_string()),
        (true, false) => {
            ValidationVerdict::AcceptedWithWarning("no message delimiter found".to_string())
        }
        (false, false) => ValidationVerdict::AcceptedWithWarning(
            "no date stamp or message delimiter found".to_string(),
        ),
    }
}

fn count_delimiters(text: &str) -> usize {
    let dashes = text.matches(" - ").take(TOKEN_COUNT_CAP).count();
    let colons = text.matches(": ").take(TOKEN_COUNT_CAP).count();
    (dashes + colons).min(TOKEN_COUNT_CAP)
}
