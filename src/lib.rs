//! # Chatprep
//!
//! A Rust library for turning untrusted chat export files into clean,
//! validated UTF-8 text, ready for a message parser.
//!
//! ## Overview
//!
//! Exports arrive as plain text, HTML, or zip archives bundling either.
//! Extensions lie, encodings depend on the exporting phone's locale, and
//! iOS sprinkles invisible direction marks over every line. Chatprep takes
//! the raw bytes and:
//!
//! 1. **sniffs** the real container type from magic bytes ([`sniff`])
//! 2. **extracts** the transcript from archives ([`archive`])
//! 3. **decodes** with a strict-to-lenient fallback ladder ([`encoding`])
//! 4. **sanitizes** invisible Unicode and line endings ([`sanitize`])
//! 5. **classifies** whether the text looks like a transcript ([`classify`])
//!
//! Only input that cannot hold a transcript at all fails: zero bytes, over
//! the size limit, unreadable, or an archive without a transcript entry.
//! Everything else produces a document. Degraded decoding and doubtful
//! content are reported as data, not errors.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatprep::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let pipeline = ImportPipeline::new();
//!     let outcome = pipeline.normalize_path("WhatsApp Chat with Bob.zip")?;
//!
//!     if let Some(warning) = outcome.warning() {
//!         eprintln!("warning: {warning}");
//!     }
//!     if outcome.document.quality != Quality::Clean {
//!         eprintln!("some characters could not be decoded");
//!     }
//!     println!("{}", outcome.document.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`pipeline`] - [`ImportPipeline`](pipeline::ImportPipeline), the orchestrator
//! - [`document`] - [`RawInput`](document::RawInput), [`NormalizedDocument`](document::NormalizedDocument)
//! - [`sniff`], [`encoding`], [`sanitize`], [`archive`], [`classify`] - pipeline stages
//! - [`layout`] - message header layout detection
//! - [`controller`] - background imports with supersede-on-resubmit
//! - [`progress`] - stage progress callbacks
//! - [`value`] - loosely typed report values
//! - [`config`] - [`ImportConfig`](config::ImportConfig)
//! - [`error`] - [`ImportError`], [`Result`]
//! - [`prelude`] - Convenient re-exports

pub mod archive;
#[cfg(feature = "cli")]
pub mod cli;
pub mod classify;
pub mod config;
pub mod controller;
pub mod document;
pub mod encoding;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod progress;
pub mod sanitize;
pub mod sniff;
pub mod value;

// Re-export the main types at the crate root for convenience
pub use error::{ImportError, Result};

/// Convenient re-exports for common usage.
///
/// ```rust
/// use chatprep::prelude::*;
/// ```
pub mod prelude {
    // Error types
    pub use crate::error::{ImportError, Result};

    // Configuration
    pub use crate::config::ImportConfig;

    // Pipeline
    pub use crate::document::{NormalizedDocument, RawInput};
    pub use crate::pipeline::{ImportOutcome, ImportPipeline, PipelineStage};

    // Stage types
    pub use crate::classify::{ContentSignals, ValidationVerdict};
    pub use crate::encoding::{Quality, TextEncoding};
    pub use crate::sniff::ContainerKind;

    // Background imports and progress
    pub use crate::controller::{ImportController, ImportHandle};
    pub use crate::progress::{ProgressCallback, StageProgress};

    pub use crate::value::Value;
}
