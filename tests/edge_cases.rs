//! Edge case tests for chatprep
//!
//! Malformed, truncated and adversarial inputs that real exports produce.

use std::io::{Cursor, Write};

use chatprep::archive;
use chatprep::encoding::{self, DECODE_LADDER, LikelyEncoding, Rung, detect_likely_encoding};
use chatprep::prelude::*;
use chatprep::sanitize::{sanitize, sanitize_lines};
use chatprep::sniff::{classify_bytes, classify_with_window};
use zip::write::SimpleFileOptions;

fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(data.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

// =========================================================================
// Short and empty input
// =========================================================================

#[test]
fn test_sniff_never_fails_on_short_input() {
    assert_eq!(classify_bytes(&[]), ContainerKind::Unknown);
    assert_eq!(classify_bytes(b"P"), ContainerKind::Unknown);
    assert_eq!(classify_bytes(b"hi"), ContainerKind::Unknown);
    assert_eq!(classify_bytes(b"PK"), ContainerKind::Archive);
}

#[test]
fn test_single_byte_input_is_processed() {
    let outcome = ImportPipeline::new().normalize(RawInput::new("x")).unwrap();
    assert_eq!(outcome.document.source_container, ContainerKind::Unknown);
    assert_eq!(outcome.document.text, "x");
    assert!(outcome.warning().is_some());
}

#[test]
fn test_whitespace_only_input_is_accepted_with_warning() {
    let outcome = ImportPipeline::new()
        .normalize(RawInput::new("\r\n\r\n   \n"))
        .unwrap();
    assert_eq!(outcome.document.text, "\n\n   \n");
    assert!(outcome.warning().is_some());
}

#[test]
fn test_invisible_only_input_sanitizes_to_empty() {
    let outcome = ImportPipeline::new()
        .normalize(RawInput::new("\u{FEFF}\u{200B}\u{200E}"))
        .unwrap();
    assert!(outcome.document.is_empty());
    assert_eq!(outcome.final_stage(), PipelineStage::Done);
}

// =========================================================================
// Markup window
// =========================================================================

#[test]
fn test_markup_token_beyond_window_is_not_markup() {
    let mut bytes = vec![b' '; 64];
    bytes.extend_from_slice(b"<html>");
    assert_eq!(classify_with_window(&bytes, 32), ContainerKind::PlainText);
    assert_eq!(classify_with_window(&bytes, 128), ContainerKind::Markup);
}

#[test]
fn test_markup_token_is_case_insensitive() {
    assert_eq!(classify_bytes(b"<HtMl lang=\"en\">"), ContainerKind::Markup);
}

// =========================================================================
// Encoding
// =========================================================================

#[test]
fn test_decode_truncated_utf8_sequence() {
    // "Привет" cut in the middle of the last character
    let full = "Привет".as_bytes();
    let cut = &full[..full.len() - 1];
    let decoded = encoding::decode(cut);
    assert_eq!(decoded.quality, Quality::Lossy);
    assert!(decoded.text.starts_with("Приве"));
    assert!(decoded.text.ends_with('\u{FFFD}'));
}

#[test]
fn test_decode_empty_is_clean() {
    let decoded = encoding::decode(&[]);
    assert_eq!(decoded.text, "");
    assert_eq!(decoded.quality, Quality::Clean);
}

#[test]
fn test_every_rung_handles_garbage() {
    let garbage = [0x00, 0x80, 0xFF, b'a', 0xC3, b'\n', 0x1B];
    for rung in DECODE_LADDER {
        match rung {
            Rung::StrictUtf8 => assert!(rung.attempt(&garbage).is_none()),
            _ => assert!(rung.attempt(&garbage).is_some(), "{rung:?} refused"),
        }
    }
    assert_eq!(
        Rung::FilteredAscii.attempt(&garbage).as_deref(),
        Some("a\n")
    );
    assert_eq!(
        Rung::FilteredAscii.quality(),
        Quality::Filtered
    );
}

#[test]
fn test_utf16_export_is_flagged() {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in "12/05/2023".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    assert_eq!(detect_likely_encoding(&bytes).label, LikelyEncoding::Utf16Le);

    let outcome = ImportPipeline::new().normalize(RawInput::new(bytes)).unwrap();
    assert_eq!(outcome.encoding_guess.label, LikelyEncoding::Utf16Le);
    assert!(outcome.document.is_degraded());
}

#[test]
fn test_bom_is_stripped() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"12/05/2023, 10:01 - Alice: hello");
    let outcome = ImportPipeline::new().normalize(RawInput::new(bytes)).unwrap();
    assert_eq!(outcome.encoding_guess.label, LikelyEncoding::Utf8Bom);
    assert_eq!(outcome.document.quality, Quality::Clean);
    assert_eq!(outcome.document.text, "12/05/2023, 10:01 - Alice: hello");
}

// =========================================================================
// Sanitizing
// =========================================================================

#[test]
fn test_rtl_export_lines_match_after_sanitizing() {
    let raw = "\u{200F}12/05/2023, 10:01 - \u{202B}أحمد\u{202C}: مرحبا";
    let outcome = ImportPipeline::new().normalize(RawInput::new(raw)).unwrap();
    assert_eq!(outcome.document.text, "12/05/2023, 10:01 - أحمد: مرحبا");
    assert_eq!(
        outcome.signals.layout,
        Some(chatprep::layout::LineLayout::EuSlashDash)
    );
}

#[test]
fn test_mixed_line_endings() {
    assert_eq!(sanitize("a\rb\r\nc\nd"), "a\nb\nc\nd");
    assert_eq!(sanitize_lines("a\rb\r\n\r\nc"), vec!["a", "b", "c"]);
}

#[test]
fn test_zwj_inside_emoji_is_removed() {
    // ZWJ sequences lose their joiner; the component emoji stay.
    assert_eq!(sanitize("👨\u{200D}👩"), "👨👩");
}

// =========================================================================
// Archives
// =========================================================================

#[test]
fn test_truncated_archive_is_corrupt() {
    let zip = build_zip(&[("chat.txt", "12/05/2023, 10:01 - A: b")]);
    let cut = &zip[..zip.len() / 2];
    let err = ImportPipeline::new()
        .normalize(RawInput::new(cut.to_vec()))
        .unwrap_err();
    assert!(err.is_corrupt_archive());
    assert!(!err.is_retryable());
}

#[test]
fn test_pk_prefixed_text_is_treated_as_archive() {
    let err = ImportPipeline::new()
        .normalize(RawInput::new("PKG notes: 12/05/2023, 10:01 - A: b"))
        .unwrap_err();
    assert!(err.is_corrupt_archive());
}

#[test]
fn test_empty_archive_has_no_transcript() {
    let zip = build_zip(&[]);
    let err = ImportPipeline::new()
        .normalize(RawInput::new(zip))
        .unwrap_err();
    assert!(matches!(err, ImportError::NoTranscriptInArchive { entries: 0 }));
}

#[test]
fn test_zero_length_transcript_entry_warns() {
    let zip = build_zip(&[("WhatsApp Chat.txt", "")]);
    let outcome = ImportPipeline::new().normalize(RawInput::new(zip)).unwrap();
    assert!(outcome.document.is_empty());
    assert!(outcome.warning().is_some());
    assert_eq!(outcome.document.source_container, ContainerKind::Archive);
}

#[test]
fn test_oversized_entry_is_too_large() {
    let body = "12/05/2023, 10:01 - A: b\n".repeat(100);
    let zip = build_zip(&[("chat.txt", body.as_str())]);
    // The compressed archive fits, the entry does not.
    let config = ImportConfig::new().with_max_file_size(zip.len() as u64);
    assert!(body.len() > zip.len());

    let err = ImportPipeline::with_config(config)
        .normalize(RawInput::new(zip))
        .unwrap_err();
    assert!(err.is_too_large());
}

#[test]
fn test_entry_without_signature_uses_name() {
    let zip = build_zip(&[("WhatsApp Chat.html", "\u{1}\u{2}\u{3}\u{4}\u{5}")]);
    let outcome = ImportPipeline::new().normalize(RawInput::new(zip)).unwrap();
    assert_eq!(outcome.warning(), Some("source fingerprint not found"));
}

#[test]
fn test_nested_directories_in_archive() {
    let zip = build_zip(&[
        ("export/media/IMG-0001.jpg", "jpg"),
        ("export/WhatsApp Chat - Family.txt", "12/05/2023, 10:01 - Mom: dinner?"),
    ]);
    let candidates = archive::list_candidates(&zip).unwrap();
    assert_eq!(candidates.len(), 2);

    let outcome = ImportPipeline::new().normalize(RawInput::new(zip)).unwrap();
    assert_eq!(
        outcome.archive_entry.as_deref(),
        Some("export/WhatsApp Chat - Family.txt")
    );
    assert!(outcome.verdict.is_accepted());
}

// =========================================================================
// Hints
// =========================================================================

#[test]
fn test_misleading_html_hint_on_text() {
    let outcome = ImportPipeline::new()
        .normalize(RawInput::new("12/05/2023, 10:01 - Alice: hello").with_hint("chat.html"))
        .unwrap();
    assert_eq!(outcome.document.source_container, ContainerKind::PlainText);
    assert!(outcome.verdict.is_accepted());
}

#[test]
fn test_accepted_extensions_are_advisory() {
    let config = ImportConfig::default();
    assert!(config.is_accepted_extension("chat.txt"));
    assert!(!config.is_accepted_extension("chat.pdf"));

    // A .pdf hint does not stop a real transcript from importing.
    let outcome = ImportPipeline::with_config(config)
        .normalize(RawInput::new("12/05/2023, 10:01 - Alice: hello").with_hint("chat.pdf"))
        .unwrap();
    assert!(outcome.verdict.is_accepted());
}
