//! Result types produced by the pipeline.
//!
//! [`AnalysisResult`] is the single per-file outcome: the normaliser and the
//! classifier both end here, so every caller (HTTP handler, batch driver,
//! CLI) decides what to do from the [`AnalysisStatus`] tag rather than by
//! sniffing string prefixes. The legacy `"Error: ..."` / `"Info: ..."`
//! strings are produced only by [`AnalysisResult::rendered`].

use crate::error::FileError;
use crate::sections::ParsedAnalysis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome class of one analysed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Success,
    Error,
    Info,
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalysisStatus::Success => "success",
            AnalysisStatus::Error => "error",
            AnalysisStatus::Info => "info",
        })
    }
}

/// Outcome of analysing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub filename: String,
    pub status: AnalysisStatus,
    /// Generated text on success; the bare message otherwise.
    pub text: String,
}

impl AnalysisResult {
    pub fn success(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: AnalysisStatus::Success,
            text: text.into(),
        }
    }

    pub fn error(filename: impl Into<String>, err: &FileError) -> Self {
        Self {
            filename: filename.into(),
            status: AnalysisStatus::Error,
            text: err.to_string(),
        }
    }

    pub fn info(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: AnalysisStatus::Info,
            text: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == AnalysisStatus::Error
    }

    /// Text as shown to API and batch consumers: generated text verbatim,
    /// otherwise the message with an `Error: ` or `Info: ` prefix.
    pub fn rendered(&self) -> String {
        match self.status {
            AnalysisStatus::Success => self.text.clone(),
            AnalysisStatus::Error => format!("Error: {}", self.text),
            AnalysisStatus::Info => format!("Info: {}", self.text),
        }
    }

    /// Parse the Markdown sections of a successful analysis.
    pub fn sections(&self) -> Option<ParsedAnalysis> {
        match self.status {
            AnalysisStatus::Success => Some(crate::sections::parse_analysis(&self.text)),
            _ => None,
        }
    }
}

/// One entry of a batch results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchEntry {
    Success {
        analysis: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sections: Option<ParsedAnalysis>,
    },
    Error {
        message: String,
    },
    Info {
        message: String,
    },
}

impl BatchEntry {
    pub fn from_result(result: &AnalysisResult, include_sections: bool) -> Self {
        match result.status {
            AnalysisStatus::Success => BatchEntry::Success {
                analysis: result.text.clone(),
                sections: if include_sections {
                    result.sections()
                } else {
                    None
                },
            },
            AnalysisStatus::Error => BatchEntry::Error {
                message: result.rendered(),
            },
            AnalysisStatus::Info => BatchEntry::Info {
                message: result.rendered(),
            },
        }
    }
}

/// Batch results keyed by input path relative to the input directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchReport {
    pub entries: BTreeMap<String, BatchEntry>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, BatchEntry::Error { .. }))
            .count()
    }

    pub fn success_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, BatchEntry::Success { .. }))
            .count()
    }
}
