//! Analysis entry points.
//!
//! An [`Analyzer`] is built once at process start and shared (behind `Arc`)
//! by the HTTP handlers, the batch driver and the CLI. It owns the model
//! handle, so there is no global "initialised" state anywhere.
//!
//! [`Analyzer::analyze_file`] returns an [`AnalysisResult`], never a
//! `Result`: every per-file failure is data.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::output::{AnalysisResult, AnalysisStatus};
use crate::pipeline::assemble::{self, ModelPolicy};
use crate::pipeline::classify::{self, Classification};
use crate::pipeline::{normalize, AnalysisRequest};
use crate::progress::ProgressCallback;
use crate::prompts::EMPTY_TEXT_MESSAGE;
use crate::vertex::{Credentials, GenerativeModel, VertexClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Length of the analysis snippet written to the log.
const LOG_SNIPPET_CHARS: usize = 100;

/// A file queued for a multi-file run.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub path: PathBuf,
    /// Name used in results (the upload name, or a path relative to the
    /// batch input directory).
    pub name: String,
}

impl FileInput {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Use the file name component as the display name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name }
    }
}

/// Shared analysis handle.
pub struct Analyzer {
    model: Arc<dyn GenerativeModel>,
    config: AnalyzerConfig,
    policy: ModelPolicy,
}

impl Analyzer {
    /// Build an analyzer around any model implementation.
    pub fn new(model: Arc<dyn GenerativeModel>, config: AnalyzerConfig) -> Self {
        let policy = ModelPolicy::from_config(&config);
        Self {
            model,
            config,
            policy,
        }
    }

    /// Build an analyzer backed by Vertex AI, with credentials from the
    /// environment.
    pub fn from_config(config: AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let client = VertexClient::new(&config, Credentials::from_env())?;
        info!(
            "Vertex AI client ready for project '{}' in region '{}'",
            config.project_id, config.region
        );
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn policy(&self) -> &ModelPolicy {
        &self.policy
    }

    /// Provider name of the underlying model.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Analyse one file, naming the result after its file name.
    pub async fn analyze_file(
        &self,
        path: &Path,
        prompt: &str,
        model_override: Option<&str>,
    ) -> AnalysisResult {
        let input = FileInput::from_path(path);
        self.analyze_named(&input.path, &input.name, prompt, model_override)
            .await
    }

    /// Analyse one file under an explicit display name.
    pub async fn analyze_named(
        &self,
        path: &Path,
        name: &str,
        prompt: &str,
        model_override: Option<&str>,
    ) -> AnalysisResult {
        let start = Instant::now();
        info!("Analyzing file: {}", name);

        let content = match classify::load(path, &self.config).await {
            Ok(Classification::Content(content)) => content,
            Ok(Classification::EmptyText) => {
                info!("Input text file {} is empty; skipping model call", name);
                return AnalysisResult::info(name, EMPTY_TEXT_MESSAGE);
            }
            Err(e) => {
                warn!("Could not load {}: {}", name, e);
                return AnalysisResult::error(name, &e);
            }
        };

        let request = AnalysisRequest {
            path: path.to_path_buf(),
            filename: name.to_string(),
            content,
            prompt: prompt.to_string(),
        };
        let kind = request.content.kind();
        let target = self.policy.resolve(model_override);
        let body = assemble::build_request(request.into_parts(), &self.config);
        debug!(
            "Sending {:?} content to {} ({} parts)",
            kind,
            target,
            body.part_count()
        );

        let reply = self.model.generate(&target, &body).await;
        match normalize::normalize(&target, reply) {
            Ok(text) => {
                info!(
                    "Analysis complete for {} in {}ms: {}",
                    name,
                    start.elapsed().as_millis(),
                    snippet(&text)
                );
                AnalysisResult::success(name, text)
            }
            Err(e) => {
                warn!("Analysis failed for {}: {}", name, e);
                AnalysisResult::error(name, &e)
            }
        }
    }

    /// Analyse several files strictly one after another.
    ///
    /// Always returns one result per input, in input order.
    pub async fn analyze_files(
        &self,
        inputs: &[FileInput],
        prompt: &str,
        model_override: Option<&str>,
        progress: Option<&ProgressCallback>,
    ) -> Vec<AnalysisResult> {
        let total = inputs.len();
        if let Some(cb) = progress {
            cb.on_batch_start(total);
        }

        let mut results = Vec::with_capacity(total);
        for (i, input) in inputs.iter().enumerate() {
            if let Some(cb) = progress {
                cb.on_file_start(i + 1, total, &input.name);
            }
            let result = self
                .analyze_named(&input.path, &input.name, prompt, model_override)
                .await;
            if let Some(cb) = progress {
                cb.on_file_complete(i + 1, total, &input.name, result.status);
            }
            results.push(result);
        }

        let errors = results
            .iter()
            .filter(|r| r.status == AnalysisStatus::Error)
            .count();
        info!("Analysed {} files: {} failed", total, errors);
        if let Some(cb) = progress {
            cb.on_batch_complete(total, errors);
        }
        results
    }
}

fn snippet(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= LOG_SNIPPET_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(LOG_SNIPPET_CHARS).collect();
        format!("{cut}...")
    }
}
