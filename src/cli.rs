//! Command-line interface definition using clap.
//!
//! This module defines:
//! - [`Args`] - CLI argument structure (for use with clap)
//! - [`ReportFormat`] - How the import report is printed
//!
//! ```rust
//! use chatprep::cli::ReportFormat;
//!
//! let format: ReportFormat = "json".parse().unwrap();
//! assert_eq!(format, ReportFormat::Json);
//! ```

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MAX_FILE_SIZE, ImportConfig};

/// Normalize a chat export (TXT, HTML or ZIP) into clean UTF-8 text.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatprep")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    chatprep \"WhatsApp Chat with Bob.txt\"
    chatprep export.zip -o chat.txt
    chatprep chat.html --report json
    cat chat.txt | chatprep - --lines")]
pub struct Args {
    /// Path to the export file, or `-` for stdin
    pub input: String,

    /// Where to write the normalized text (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Report format, printed to stderr
    #[arg(short, long, value_enum, default_value = "text")]
    pub report: ReportFormat,

    /// Trim every line and drop blank ones
    #[arg(long)]
    pub lines: bool,

    /// Reject inputs larger than this many bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_size: u64,

    /// Print each pipeline stage as it is reached
    #[arg(long)]
    pub progress: bool,
}

impl Args {
    /// Builds the pipeline configuration these flags describe.
    pub fn to_config(&self) -> ImportConfig {
        ImportConfig::new()
            .with_max_file_size(self.max_size)
            .with_normalize_lines(self.lines)
    }

    /// Returns `true` if the input should be read from stdin.
    pub fn reads_stdin(&self) -> bool {
        self.input == "-"
    }
}

/// Report output options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable summary
    #[default]
    Text,

    /// Machine-readable JSON object
    Json,
}

impl ReportFormat {
    /// Returns all supported format names.
    pub fn all_names() -> &'static [&'static str] {
        &["text", "json"]
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "JSON"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!(
                "Unknown report format: '{}'. Expected one of: {}",
                s,
                ReportFormat::all_names().join(", ")
            )),
        }
    }
}
