//! Error types for the docanalyze library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`AnalyzerError`]. **Fatal** when returned from configuration or the
//!   server (required configuration missing, bind failure). The batch
//!   driver logs its own variants (results file not writable) and carries
//!   on.
//!
//! * [`FileError`]. **Per file.** One upload could not be analysed
//!   (unsupported type, corrupt PDF, safety block, transport failure). Never
//!   propagated; converted into an [`crate::output::AnalysisResult`] with
//!   [`crate::output::AnalysisStatus::Error`] so the rest of the batch
//!   continues.
//!
//! * [`RemoteError`]: a failed call to the hosted model. The response
//!   normaliser turns it into a [`FileError`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docanalyze library.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// A required setting is absent from flags and environment.
    #[error("{name} must be set (flag or environment variable {env})")]
    MissingConfig { name: &'static str, env: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Batch errors ──────────────────────────────────────────────────────
    /// Could not create or write the results file.
    #[error("Failed to write results file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Results could not be serialised to JSON.
    #[error("Failed to serialise results: {0}")]
    Serialise(#[from] serde_json::Error),

    // ── Server errors ─────────────────────────────────────────────────────
    /// The HTTP listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single file.
///
/// The `Display` text is the message that follows the `"Error: "` prefix in
/// rendered results.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    // ── Input errors ──────────────────────────────────────────────────────
    #[error("File not found.")]
    NotFound,

    #[error("Unsupported file type '{mime}'.")]
    UnsupportedType { mime: String },

    #[error("Could not load image file {name}.")]
    ImageLoad { name: String, detail: String },

    #[error("Could not read text file {name}.")]
    TextRead { name: String, detail: String },

    #[error("Could not render PDF file {name}: {detail}")]
    PdfRender { name: String, detail: String },

    /// An uploaded file could not be received or stored for analysis.
    #[error("Could not save uploaded file: {detail}")]
    UploadFailed { detail: String },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The model handle for the resolved target could not be created.
    #[error("Could not initialize model '{target}': {detail}")]
    ModelInit { target: String, detail: String },

    /// The remote call failed (network, HTTP status, undecodable body).
    #[error("{0}")]
    Transport(String),

    // ── Content errors ────────────────────────────────────────────────────
    /// Generation ended with a finish reason other than `STOP`.
    #[error("Analysis stopped due to {reason}. Check safety settings or input content.")]
    Stopped { reason: String },

    /// The prompt was rejected before any generation happened.
    #[error("Analysis failed. Reason: {feedback}")]
    PromptBlocked { feedback: String },

    /// The reply carried no candidates or only blank text.
    #[error("Model response was empty or unexpected.")]
    EmptyResponse,
}

/// A failed call to the hosted generative model.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The target identifier cannot be turned into a callable endpoint.
    #[error("invalid model target '{identifier}': {detail}")]
    InvalidTarget { identifier: String, detail: String },

    /// No usable credentials, or the token exchange failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The request could not be sent or the connection dropped.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The reply body was not the expected JSON shape.
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether the failure happened before any request was sent, i.e. the
    /// model handle itself could not be instantiated.
    pub fn is_init_failure(&self) -> bool {
        matches!(self, RemoteError::InvalidTarget { .. } | RemoteError::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_display() {
        let e = AnalyzerError::MissingConfig {
            name: "project id",
            env: "GCP_PROJECT_ID",
        };
        assert!(e.to_string().contains("GCP_PROJECT_ID"), "got: {e}");
    }

    #[test]
    fn stopped_display_contains_reason() {
        let e = FileError::Stopped {
            reason: "SAFETY".into(),
        };
        assert_eq!(
            e.to_string(),
            "Analysis stopped due to SAFETY. Check safety settings or input content."
        );
    }

    #[test]
    fn unsupported_display() {
        let e = FileError::UnsupportedType {
            mime: "chemical/x-xyz".into(),
        };
        assert!(e.to_string().starts_with("Unsupported file type"));
    }

    #[test]
    fn init_failures_are_classified() {
        assert!(RemoteError::Auth("no token".into()).is_init_failure());
        assert!(!RemoteError::Http {
            status: 500,
            body: String::new()
        }
        .is_init_failure());
    }
}
