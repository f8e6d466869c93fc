//! Message-header layout detection for plain-text transcripts.
//!
//! Exporters vary the header line by platform and locale. The importer does
//! not parse messages, but it reports which header layout dominates the
//! first lines so the downstream parser can skip its own detection and so
//! that import reports say something more useful than "looks like a chat".
//!
//! Supported layouts:
//! - US bracketed: `[1/15/24, 10:30:45 AM] Sender: Message`
//! - US dash: `1/15/24, 10:30 AM - Sender: Message`
//! - EU dot bracketed: `[15.01.24, 10:30:45] Sender: Message`
//! - EU dot dash: `26.10.2025, 20:40 - Sender: Message`
//! - EU slash dash: `15/01/2024, 10:30 - Sender: Message`
//! - EU slash bracketed: `[15/01/2024, 10:30:45] Sender: Message`

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Number of non-empty leading lines inspected by [`detect_layout_in`].
pub const LAYOUT_SAMPLE_LINES: usize = 20;

/// A message-header layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineLayout {
    /// `[M/D/YY, h:mm:ss AM] Sender: text`
    UsBracketed,
    /// `M/D/YY, h:mm AM - Sender: text`
    UsDash,
    /// `[DD.MM.YY, HH:mm:ss] Sender: text`
    EuDotBracketed,
    /// `DD.MM.YYYY, HH:mm - Sender: text`
    EuDotDash,
    /// `DD/MM/YYYY, HH:mm - Sender: text`
    EuSlashDash,
    /// `[DD/MM/YYYY, HH:mm:ss] Sender: text`
    EuSlashBracketed,
}

impl LineLayout {
    /// All layouts, in tie-break order.
    pub fn all() -> &'static [LineLayout] {
        &[
            LineLayout::UsBracketed,
            LineLayout::UsDash,
            LineLayout::EuDotBracketed,
            LineLayout::EuDotDash,
            LineLayout::EuSlashDash,
            LineLayout::EuSlashBracketed,
        ]
    }

    /// Header pattern. Groups: date, time, sender, text.
    ///
    /// US layouts require the AM/PM marker; without it a `[DD/MM/YYYY, ...]`
    /// header would read as month-first.
    pub fn pattern(self) -> &'static str {
        match self {
            LineLayout::UsBracketed => {
                r"^\[(\d{1,2}/\d{1,2}/\d{2,4}),\s(\d{1,2}:\d{2}(?::\d{2})?\s?[APap][Mm])\]\s([^:]+):\s?(.*)"
            }
            LineLayout::UsDash => {
                r"^(\d{1,2}/\d{1,2}/\d{2,4}),\s(\d{1,2}:\d{2}(?::\d{2})?\s?[APap][Mm])\s-\s([^:]+):\s?(.*)"
            }
            LineLayout::EuDotBracketed => {
                r"^\[(\d{2}\.\d{2}\.\d{2,4}),\s(\d{2}:\d{2}(?::\d{2})?)\]\s([^:]+):\s?(.*)"
            }
            LineLayout::EuDotDash => {
                r"^(\d{2}\.\d{2}\.\d{2,4}),\s(\d{2}:\d{2}(?::\d{2})?)\s-\s([^:]+):\s?(.*)"
            }
            LineLayout::EuSlashDash => {
                r"^(\d{2}/\d{2}/\d{2,4}),\s(\d{2}:\d{2}(?::\d{2})?)\s-\s([^:]+):\s?(.*)"
            }
            LineLayout::EuSlashBracketed => {
                r"^\[(\d{2}/\d{2}/\d{2,4}),\s(\d{2}:\d{2}(?::\d{2})?)\]\s([^:]+):\s?(.*)"
            }
        }
    }

    /// chrono format strings for `"{date}, {time}"`.
    pub fn timestamp_formats(self) -> &'static [&'static str] {
        match self {
            LineLayout::UsBracketed | LineLayout::UsDash => &[
                "%m/%d/%y, %I:%M:%S %p",
                "%m/%d/%y, %I:%M %p",
                "%m/%d/%Y, %I:%M:%S %p",
                "%m/%d/%Y, %I:%M %p",
            ],
            LineLayout::EuDotBracketed | LineLayout::EuDotDash => &[
                "%d.%m.%y, %H:%M:%S",
                "%d.%m.%y, %H:%M",
                "%d.%m.%Y, %H:%M:%S",
                "%d.%m.%Y, %H:%M",
            ],
            LineLayout::EuSlashDash | LineLayout::EuSlashBracketed => &[
                "%d/%m/%y, %H:%M:%S",
                "%d/%m/%y, %H:%M",
                "%d/%m/%Y, %H:%M:%S",
                "%d/%m/%Y, %H:%M",
            ],
        }
    }
}

impl std::fmt::Display for LineLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LineLayout::UsBracketed => "US bracketed",
            LineLayout::UsDash => "US dash",
            LineLayout::EuDotBracketed => "EU dot bracketed",
            LineLayout::EuDotDash => "EU dot dash",
            LineLayout::EuSlashDash => "EU slash dash",
            LineLayout::EuSlashBracketed => "EU slash bracketed",
        };
        f.write_str(name)
    }
}

static MATCHERS: LazyLock<Vec<(LineLayout, Regex)>> = LazyLock::new(|| {
    LineLayout::all()
        .iter()
        .map(|&layout| {
            let regex = Regex::new(layout.pattern()).expect("layout patterns are valid");
            (layout, regex)
        })
        .collect()
});

/// Picks the layout whose headers parse on the most lines.
///
/// A line counts for a layout only if it matches the header pattern and its
/// timestamp is a real date under that layout's formats. Ties go to the
/// layout listed first in [`LineLayout::all`]. Returns `None` if no line
/// parses under any layout.
pub fn detect_layout(lines: &[&str]) -> Option<LineLayout> {
    let mut scores = vec![0usize; MATCHERS.len()];

    for line in lines {
        for (i, (layout, regex)) in MATCHERS.iter().enumerate() {
            if header_timestamp(regex, *layout, line).is_some() {
                scores[i] += 1;
            }
        }
    }

    let max_score = *scores.iter().max()?;
    if max_score == 0 {
        return None;
    }

    let winner = scores.iter().position(|&s| s == max_score)?;
    Some(MATCHERS[winner].0)
}

/// Runs [`detect_layout`] over the first [`LAYOUT_SAMPLE_LINES`] non-empty
/// lines of `text`.
pub fn detect_layout_in(text: &str) -> Option<LineLayout> {
    let sample: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .take(LAYOUT_SAMPLE_LINES)
        .collect();
    detect_layout(&sample)
}

/// Parses the timestamp of a header line written in `layout`.
///
/// Exports carry local wall-clock time without a zone, so the result is
/// naive.
pub fn parse_layout_timestamp(line: &str, layout: LineLayout) -> Option<NaiveDateTime> {
    let (_, regex) = MATCHERS.iter().find(|(l, _)| *l == layout)?;
    header_timestamp(regex, layout, line)
}

fn header_timestamp(regex: &Regex, layout: LineLayout, line: &str) -> Option<NaiveDateTime> {
    let caps = regex.captures(line)?;
    let datetime = format!("{}, {}", caps.get(1)?.as_str(), caps.get(2)?.as_str());

    layout
        .timestamp_formats()
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&datetime, fmt).ok())
}

/// Timestamp of the first line in `text` that parses under `layout`.
pub fn first_timestamp(text: &str, layout: LineLayout) -> Option<NaiveDateTime> {
    text.lines()
        .take(LAYOUT_SAMPLE_LINES * 5)
        .find_map(|line| parse_layout_timestamp(line, layout))
}
