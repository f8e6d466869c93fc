//! The import pipeline: one untrusted file in, one validated document out.
//!
//! A single invocation walks a linear state machine:
//!
//! ```text
//! Start → Sniffed → (Extracted)? → Decoded → Sanitized → Classified → Done
//!   └──────────────── first failure ─────────────────────────────────→ Rejected
//! ```
//!
//! `Extracted` only happens for archives. The two hard gates (zero bytes,
//! over the size limit) run before sniffing, so nothing is decoded or
//! classified for input that can never be a transcript.
//!
//! Invocations share no state. The same [`ImportPipeline`] can be used from
//! several threads at once.
//!
//! # Example
//!
//! ```rust
//! use chatprep::prelude::*;
//!
//! let pipeline = ImportPipeline::new();
//! let outcome = pipeline.normalize(RawInput::new("12/05/2023, 10:01 - Alice: hello"))?;
//!
//! assert_eq!(outcome.verdict, ValidationVerdict::Accepted);
//! assert_eq!(outcome.document.source_container, ContainerKind::PlainText);
//! assert_eq!(outcome.document.quality, Quality::Clean);
//! # Ok::<(), ImportError>(())
//! ```

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::archive;
use crate::classify::{self, ContentSignals, ValidationVerdict};
use crate::config::ImportConfig;
use crate::document::{NormalizedDocument, RawInput};
use crate::encoding::{self, EncodingGuess};
use crate::error::{ImportError, Result};
use crate::progress::{ProgressCallback, StageProgress};
use crate::sanitize;
use crate::sniff::{self, ContainerKind};
use crate::value::Value;

/// States of a pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    Sniffed,
    /// Transcript entry pulled out of an archive
    Extracted,
    Decoded,
    Sanitized,
    Classified,
    /// Document produced (possibly with a warning)
    Done,
    /// Invocation stopped with an [`ImportError`]
    Rejected,
}

impl PipelineStage {
    /// Position in the state machine. `Rejected` shares `Done`'s slot.
    pub fn ordinal(self) -> usize {
        match self {
            PipelineStage::Start => 0,
            PipelineStage::Sniffed => 1,
            PipelineStage::Extracted => 2,
            PipelineStage::Decoded => 3,
            PipelineStage::Sanitized => 4,
            PipelineStage::Classified => 5,
            PipelineStage::Done | PipelineStage::Rejected => 6,
        }
    }

    /// Returns `true` for `Done` and `Rejected`.
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Start => "start",
            PipelineStage::Sniffed => "sniffed",
            PipelineStage::Extracted => "extracted",
            PipelineStage::Decoded => "decoded",
            PipelineStage::Sanitized => "sanitized",
            PipelineStage::Classified => "classified",
            PipelineStage::Done => "done",
            PipelineStage::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful import: the document plus everything learned producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    /// Text for the message parser
    pub document: NormalizedDocument,
    /// Never `Rejected`; rejections are returned as errors
    pub verdict: ValidationVerdict,
    /// Observations behind the verdict
    pub signals: ContentSignals,
    /// States visited, in order, ending in `Done`
    pub stages: Vec<PipelineStage>,
    /// Name of the archive entry the text came from
    pub archive_entry: Option<String>,
    /// Advisory encoding guess for the decoded bytes
    pub encoding_guess: EncodingGuess,
    /// Size of the raw input
    pub input_bytes: u64,
}

impl ImportOutcome {
    /// The last stage reached. Always [`PipelineStage::Done`] for outcomes
    /// returned by the pipeline.
    pub fn final_stage(&self) -> PipelineStage {
        self.stages.last().copied().unwrap_or(PipelineStage::Start)
    }

    /// Warning the caller should surface, if any.
    pub fn warning(&self) -> Option<&str> {
        self.verdict.warning()
    }

    /// Splits into the two values handed across the output boundary.
    pub fn into_parts(self) -> (NormalizedDocument, ValidationVerdict) {
        (self.document, self.verdict)
    }

    /// A loosely typed summary for reports.
    ///
    /// Carries sizes, labels and diagnostics only, never document text.
    pub fn summary(&self) -> Value {
        let stages: Vec<Value> = self
            .stages
            .iter()
            .map(|s| Value::from(s.as_str()))
            .collect();

        Value::map([
            ("stage", Value::from(self.final_stage().as_str())),
            ("container", Value::from(self.document.source_container.as_str())),
            ("archive_entry", Value::from(self.archive_entry.clone())),
            ("encoding", Value::from(self.document.encoding_used.to_string())),
            ("quality", Value::from(self.document.quality.to_string())),
            ("likely_encoding", Value::from(self.encoding_guess.label.as_str())),
            ("high_bit_ratio", Value::from(self.encoding_guess.high_bit_ratio)),
            ("verdict", Value::from(self.verdict.label())),
            ("warning", Value::from(self.warning())),
            ("input_bytes", Value::from(self.input_bytes)),
            ("text_bytes", Value::from(self.document.text.len())),
            ("lines", Value::from(self.document.line_count())),
            ("date_tokens", Value::from(self.signals.date_tokens)),
            ("delimiter_tokens", Value::from(self.signals.delimiter_tokens)),
            (
                "layout",
                Value::from(self.signals.layout.map(|l| l.to_string())),
            ),
            (
                "first_timestamp",
                Value::from(
                    self.signals
                        .first_timestamp
                        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string()),
                ),
            ),
            ("stages", Value::List(stages)),
        ])
    }
}

impl From<&ImportError> for ValidationVerdict {
    fn from(err: &ImportError) -> Self {
        ValidationVerdict::Rejected(err.to_string())
    }
}

/// Verdict for a finished invocation, mapping errors to `Rejected`.
pub fn verdict_of(result: &Result<ImportOutcome>) -> ValidationVerdict {
    match result {
        Ok(outcome) => outcome.verdict.clone(),
        Err(err) => ValidationVerdict::from(err),
    }
}

/// Composes sniffing, extraction, decoding, sanitizing and classification.
#[derive(Clone, Default)]
pub struct ImportPipeline {
    config: ImportConfig,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for ImportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportPipeline")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl ImportPipeline {
    /// Creates a pipeline with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pipeline with custom limits.
    pub fn with_config(config: ImportConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Reports every stage transition to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Normalizes in-memory input.
    ///
    /// # Errors
    ///
    /// - [`ImportError::EmptyInput`] for zero bytes
    /// - [`ImportError::TooLarge`] above `max_file_size`
    /// - [`ImportError::NoTranscriptInArchive`] / [`ImportError::CorruptArchive`]
    ///   for archives without a usable entry
    pub fn normalize(&self, input: RawInput) -> Result<ImportOutcome> {
        self.normalize_until(input, &|| false)
    }

    /// Like [`Self::normalize`], but asks `abandoned` before entering each
    /// stage.
    ///
    /// Once it answers `true` the invocation stops with
    /// [`ImportError::Abandoned`]. A stage already running is never
    /// interrupted, so the check costs nothing inside decoding or extraction.
    pub fn normalize_until(
        &self,
        input: RawInput,
        abandoned: &dyn Fn() -> bool,
    ) -> Result<ImportOutcome> {
        let mut trail = StageTrail::new(self.progress.as_ref(), input.len() as u64, abandoned);

        match self.run(&input, &mut trail) {
            Ok(outcome) => Ok(outcome),
            Err(ImportError::Abandoned) => {
                tracing::debug!(after = ?trail.stages.last(), "import abandoned");
                Err(ImportError::Abandoned)
            }
            Err(err) => {
                trail.record(PipelineStage::Rejected);
                tracing::warn!(kind = err.kind(), error = %err, "import rejected");
                Err(err)
            }
        }
    }

    /// Normalizes everything `reader` yields.
    ///
    /// At most `max_file_size + 1` bytes are read, so an oversized stream
    /// is rejected without being buffered in full. The reported size is then
    /// a lower bound.
    pub fn normalize_reader<R: Read>(&self, reader: R, hint: Option<&str>) -> Result<ImportOutcome> {
        self.normalize_reader_until(reader, hint, &|| false)
    }

    /// Normalizes a file, using its name as the hint.
    ///
    /// The size gate is checked against file metadata before anything is
    /// read.
    pub fn normalize_path(&self, path: impl AsRef<Path>) -> Result<ImportOutcome> {
        self.normalize_path_until(path, &|| false)
    }

    /// [`Self::normalize_path`] with an abandon check; see
    /// [`Self::normalize_until`]. The check also runs once before the file
    /// is opened.
    pub fn normalize_path_until(
        &self,
        path: impl AsRef<Path>,
        abandoned: &dyn Fn() -> bool,
    ) -> Result<ImportOutcome> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "importing file");

        let metadata = fs::metadata(path).map_err(|e| self.reject(e.into()))?;
        let max = self.config.max_file_size;
        if metadata.len() > max {
            return Err(self.reject(ImportError::too_large(metadata.len(), max)));
        }

        if abandoned() {
            tracing::debug!(path = %path.display(), "import abandoned before reading");
            return Err(ImportError::Abandoned);
        }

        let file = File::open(path).map_err(|e| self.reject(e.into()))?;
        let hint = path.file_name().and_then(|n| n.to_str());
        self.normalize_reader_until(BufReader::new(file), hint, abandoned)
    }

    fn normalize_reader_until<R: Read>(
        &self,
        reader: R,
        hint: Option<&str>,
        abandoned: &dyn Fn() -> bool,
    ) -> Result<ImportOutcome> {
        let limit = self.config.max_file_size.saturating_add(1);
        let mut bytes = Vec::new();
        reader
            .take(limit)
            .read_to_end(&mut bytes)
            .map_err(|e| self.reject(ImportError::from(e)))?;

        let input = RawInput {
            bytes,
            hint: hint.map(str::to_owned),
        };
        self.normalize_until(input, abandoned)
    }

    /// Reports a rejection that happened before [`Self::normalize_until`] ran.
    fn reject(&self, err: ImportError) -> ImportError {
        if let Some(callback) = &self.progress {
            callback(StageProgress::new(PipelineStage::Rejected, 0));
        }
        tracing::warn!(kind = err.kind(), error = %err, "import rejected");
        err
    }

    fn check_gates(&self, len: u64) -> Result<()> {
        if len == 0 {
            return Err(ImportError::EmptyInput);
        }
        let max = self.config.max_file_size;
        if len > max {
            return Err(ImportError::too_large(len, max));
        }
        Ok(())
    }

    fn run(&self, input: &RawInput, trail: &mut StageTrail<'_>) -> Result<ImportOutcome> {
        trail.enter(PipelineStage::Start)?;
        let input_bytes = input.len() as u64;
        self.check_gates(input_bytes)?;

        let container = sniff::classify_with_window(&input.bytes, self.config.sniff_window);
        trail.container = Some(container);
        trail.enter(PipelineStage::Sniffed)?;

        let (payload, policy, archive_entry): (Cow<'_, [u8]>, ContainerKind, Option<String>) =
            match container {
                ContainerKind::Archive => {
                    let entry = archive::extract_transcript(&input.bytes, &self.config)?;
                    trail.enter(PipelineStage::Extracted)?;
                    let policy = self.entry_policy(&entry.bytes, &entry.name);
                    (Cow::Owned(entry.bytes), policy, Some(entry.name))
                }
                ContainerKind::Unknown => (
                    Cow::Borrowed(input.bytes.as_slice()),
                    unknown_policy(input),
                    None,
                ),
                other => (Cow::Borrowed(input.bytes.as_slice()), other, None),
            };

        let encoding_guess = encoding::detect_likely_encoding(&payload);
        let decoded = encoding::decode(&payload);
        drop(payload);
        trail.enter(PipelineStage::Decoded)?;
        if decoded.quality.is_degraded() {
            tracing::warn!(
                encoding = %decoded.encoding,
                quality = %decoded.quality,
                likely = encoding_guess.label.as_str(),
                "decoded with degraded quality"
            );
        }

        let text = if self.config.normalize_lines {
            sanitize::sanitize_lines(&decoded.text).join("\n")
        } else {
            sanitize::sanitize(&decoded.text)
        };
        trail.enter(PipelineStage::Sanitized)?;

        let (verdict, signals) = classify::classify_with_signals(&text, policy);
        trail.enter(PipelineStage::Classified)?;

        // The classifier only warns today; this keeps a rejecting policy
        // from ever handing text downstream.
        if let ValidationVerdict::Rejected(reason) = &verdict {
            return Err(ImportError::unrecognized(reason.clone()));
        }
        if let Some(reason) = verdict.warning() {
            tracing::warn!(container = %container, policy = %policy, reason, "import accepted with warning");
        }

        let document = NormalizedDocument {
            text,
            encoding_used: decoded.encoding,
            quality: decoded.quality,
            source_container: container,
        };

        trail.enter(PipelineStage::Done)?;
        tracing::info!(
            bytes = input_bytes,
            container = %container,
            encoding = %document.encoding_used,
            quality = %document.quality,
            verdict = verdict.label(),
            "import complete"
        );

        Ok(ImportOutcome {
            document,
            verdict,
            signals,
            stages: trail.stages.clone(),
            archive_entry,
            encoding_guess,
            input_bytes,
        })
    }

    /// Which classification policy an extracted archive entry gets.
    ///
    /// Bytes decide first; the entry name only breaks a tie when the bytes
    /// carry no signature.
    fn entry_policy(&self, bytes: &[u8], name: &str) -> ContainerKind {
        match sniff::classify_with_window(bytes, self.config.sniff_window) {
            ContainerKind::Markup => ContainerKind::Markup,
            ContainerKind::PlainText => ContainerKind::PlainText,
            ContainerKind::Archive | ContainerKind::Unknown => {
                match sniff::container_from_extension(name) {
                    Some(ContainerKind::Markup) => ContainerKind::Markup,
                    _ => ContainerKind::PlainText,
                }
            }
        }
    }
}

/// Unsigned bytes are judged as plain text unless the hint says markup.
fn unknown_policy(input: &RawInput) -> ContainerKind {
    let hinted = input
        .extension()
        .and_then(|ext| sniff::container_from_extension(&format!(".{ext}")));
    match hinted {
        Some(ContainerKind::Markup) => ContainerKind::Markup,
        _ => ContainerKind::PlainText,
    }
}

/// Records visited stages and forwards them to the progress callback.
struct StageTrail<'a> {
    stages: Vec<PipelineStage>,
    progress: Option<&'a ProgressCallback>,
    abandoned: &'a dyn Fn() -> bool,
    input_bytes: u64,
    container: Option<ContainerKind>,
}

impl<'a> StageTrail<'a> {
    fn new(
        progress: Option<&'a ProgressCallback>,
        input_bytes: u64,
        abandoned: &'a dyn Fn() -> bool,
    ) -> Self {
        Self {
            stages: Vec::with_capacity(7),
            progress,
            abandoned,
            input_bytes,
            container: None,
        }
    }

    /// Moves to `stage` unless the invocation has been abandoned.
    fn enter(&mut self, stage: PipelineStage) -> Result<()> {
        if (self.abandoned)() {
            return Err(ImportError::Abandoned);
        }
        self.record(stage);
        Ok(())
    }

    fn record(&mut self, stage: PipelineStage) {
        self.stages.push(stage);
        tracing::debug!(
            stage = %stage,
            bytes = self.input_bytes,
            container = self.container.as_ref().map(ContainerKind::as_str),
            "pipeline stage"
        );
        if let Some(callback) = self.progress {
            callback(StageProgress::new(stage, self.input_bytes).with_container(self.container));
        }
    }
}
