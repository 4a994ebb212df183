//! # docanalyze
//!
//! Analyse documents (images, plain text, PDFs) with a Gemini model hosted on
//! Vertex AI, over HTTP, in batch, or as a library.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Classify   MIME from extension → image | text | pdf loader
//!  │                (PDF: first 1–5 pages rasterised via pdfium, spawn_blocking)
//!  ├─ 2. Assemble   [prompt, file part(s), section template] + model target
//!  │                (override → tuned endpoint → base model)
//!  ├─ 3. Generate   Vertex AI generateContent (no retries)
//!  └─ 4. Normalise  text | "Error: ..." | "Info: ..." as a tagged AnalysisResult
//! ```
//!
//! Files are processed one at a time. Every file yields exactly one
//! [`AnalysisResult`]; only missing configuration or a failed bind are
//! fatal ([`AnalyzerError`]). A missing batch directory or an unwritable
//! results file is logged.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docanalyze::{Analyzer, AnalyzerConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // GCP_PROJECT_ID, GCP_REGION and GCP_ACCESS_TOKEN (or
//!     // GOOGLE_APPLICATION_CREDENTIALS) come from the environment.
//!     let analyzer = Analyzer::from_config(AnalyzerConfig::from_env()?)?;
//!     let result = analyzer
//!         .analyze_file(Path::new("receipt.jpg"), "What was bought?", None)
//!         .await;
//!     println!("{}", result.rendered());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | The `docanalyze` binary (clap, anyhow, tracing-subscriber, indicatif, dotenvy) |
//! | `server` | on      | The axum HTTP front end ([`server`]) |
//!
//! Library-only use:
//! ```toml
//! docanalyze = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod sections;
#[cfg(feature = "server")]
pub mod server;
pub mod vertex;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{Analyzer, FileInput};
pub use batch::{run_batch, scan_inputs, write_report, BatchRun};
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder, BatchConfig, SafetyThreshold, ServerConfig};
pub use error::{AnalyzerError, FileError, RemoteError};
pub use output::{AnalysisResult, AnalysisStatus, BatchEntry, BatchReport};
pub use pipeline::assemble::{ContentPart, ModelKind, ModelPolicy, ModelTarget};
pub use pipeline::classify::{Classification, ContentKind, LoadedContent};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use sections::{parse_analysis, ParsedAnalysis};
pub use vertex::{Credentials, GenerativeModel, VertexClient};
