//! Removal of invisible Unicode and line-ending normalization.
//!
//! Exports from phones with right-to-left locales are sprinkled with
//! direction marks, and iOS exports prefix every line with U+200E. These are
//! invisible to a reader but break anchored patterns like
//! `^\d{2}/\d{2}/\d{4}`, so they are stripped before any classification.

/// Returns `true` for code points that render as nothing but disturb
/// line-oriented matching.
pub fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'                  // Soft hyphen
        | '\u{061C}'                // Arabic letter mark
        | '\u{200B}'..='\u{200F}'   // ZWSP, ZWNJ, ZWJ, LRM, RLM
        | '\u{2028}'                // Line separator
        | '\u{2029}'                // Paragraph separator
        | '\u{202A}'..='\u{202E}'   // Embeddings and overrides
        | '\u{2060}'                // Word joiner
        | '\u{2066}'..='\u{2069}'   // Isolates
        | '\u{FEFF}' // BOM / zero-width no-break space
    )
}

/// Strips invisible code points and converts `\r\n` and lone `\r` to `\n`.
///
/// Idempotent: `sanitize(&sanitize(x)) == sanitize(x)`.
///
/// # Example
///
/// ```rust
/// use chatprep::sanitize::sanitize;
///
/// let raw = "\u{FEFF}\u{200E}[1/15/24, 10:30:45 AM] Alice: Hi\r\n";
/// assert_eq!(sanitize(raw), "[1/15/24, 10:30:45 AM] Alice: Hi\n");
/// ```
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().filter(|&c| !is_invisible(c)).peekable();

    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }

    out
}

/// Converts `\r\n` and lone `\r` line endings to `\n`, leaving everything
/// else untouched.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Sanitizes, trims every line, and drops lines that end up empty.
///
/// Only for callers whose grammar does not care about blank lines; the
/// default pipeline path keeps them.
///
/// # Example
///
/// ```rust
/// use chatprep::sanitize::sanitize_lines;
///
/// let lines = sanitize_lines("  first  \r\n\u{200B}\n\nsecond");
/// assert_eq!(lines, vec!["first", "second"]);
/// ```
pub fn sanitize_lines(text: &str) -> Vec<String> {
    sanitize(text)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}
