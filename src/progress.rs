//! Stage-level progress reporting for pipeline invocations.
//!
//! The pipeline calls an optional [`ProgressCallback`] at every state
//! transition, which lets a UI show "extracting…" or "decoding…" without
//! polling. Terminal stages ([`PipelineStage::Done`] and
//! [`PipelineStage::Rejected`]) are always reported last.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use chatprep::pipeline::{ImportPipeline, PipelineStage};
//! use chatprep::progress::ProgressCallback;
//! use chatprep::document::RawInput;
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let callback: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p.stage));
//!
//! let pipeline = ImportPipeline::new().with_progress(callback);
//! pipeline.normalize(RawInput::new("12/05/2023, 10:01 - Alice: hello"))?;
//!
//! assert_eq!(seen.lock().unwrap().last(), Some(&PipelineStage::Done));
//! # Ok::<(), chatprep::ImportError>(())
//! ```

use std::sync::Arc;

use crate::pipeline::PipelineStage;
use crate::sniff::ContainerKind;

/// A single stage transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageProgress {
    /// The stage just entered.
    pub stage: PipelineStage,

    /// Size of the raw input in bytes.
    pub input_bytes: u64,

    /// Sniffed container, once known.
    pub container: Option<ContainerKind>,
}

impl StageProgress {
    /// Creates a progress event without a container.
    pub fn new(stage: PipelineStage, input_bytes: u64) -> Self {
        Self {
            stage,
            input_bytes,
            container: None,
        }
    }

    /// Attaches the sniffed container kind.
    #[must_use]
    pub fn with_container(mut self, container: Option<ContainerKind>) -> Self {
        self.container = container;
        self
    }

    /// Rough completion percentage (0.0 - 100.0) derived from the stage.
    ///
    /// Both terminal stages report 100.
    ///
    /// ```rust
    /// use chatprep::pipeline::PipelineStage;
    /// use chatprep::progress::StageProgress;
    ///
    /// assert_eq!(StageProgress::new(PipelineStage::Start, 10).percentage(), 0.0);
    /// assert_eq!(StageProgress::new(PipelineStage::Rejected, 10).percentage(), 100.0);
    /// ```
    pub fn percentage(&self) -> f64 {
        let last = PipelineStage::Done.ordinal();
        let ordinal = self.stage.ordinal().min(last);
        (ordinal as f64 / last as f64) * 100.0
    }

    /// Returns `true` once the invocation has finished, either way.
    pub fn is_complete(&self) -> bool {
        self.stage.is_terminal()
    }
}

/// Callback type for receiving stage transitions.
///
/// Invoked synchronously on the thread running the pipeline.
pub type ProgressCallback = Arc<dyn Fn(StageProgress) + Send + Sync>;

/// Creates a no-op progress callback.
pub fn no_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

/// Creates a progress callback that prints each stage to stderr.
///
/// ```rust
/// use chatprep::pipeline::PipelineStage;
/// use chatprep::progress::{StageProgress, stderr_progress};
///
/// let callback = stderr_progress();
/// // Prints "  … sniffed (2048 bytes)" to stderr
/// callback(StageProgress::new(PipelineStage::Sniffed, 2048));
/// ```
pub fn stderr_progress() -> ProgressCallback {
    Arc::new(|progress| {
        let marker = match progress.stage {
            PipelineStage::Done => "✓",
            PipelineStage::Rejected => "✗",
            _ => "…",
        };
        match progress.container {
            Some(container) => eprintln!(
                "  {marker} {} ({} bytes, {container})",
                progress.stage, progress.input_bytes
            ),
            None => eprintln!(
                "  {marker} {} ({} bytes)",
                progress.stage, progress.input_bytes
            ),
        }
    })
}
