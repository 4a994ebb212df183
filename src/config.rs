//! Configuration types for document analysis.
//!
//! All pipeline behaviour is controlled through [`AnalyzerConfig`], built via
//! its [`AnalyzerConfigBuilder`]. The two transport-level identifiers
//! (`project_id`, `region`) are the only required settings; a missing one is
//! the single process-fatal configuration error.

use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Base model used when neither an override nor a tuned endpoint is set.
pub const DEFAULT_BASE_MODEL: &str = "gemini-2.0-flash-lite-001";

/// Hard upper bound on rasterised PDF pages sent per file.
pub const MAX_PDF_PAGES: usize = 5;

/// Configuration for the analysis pipeline.
///
/// # Example
/// ```rust
/// use docanalyze::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .project_id("my-project")
///     .region("europe-west4")
///     .max_pdf_pages(3)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_pdf_pages, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Google Cloud project that owns the Vertex AI resources.
    pub project_id: String,

    /// Vertex AI region, e.g. `europe-west4`.
    pub region: String,

    /// Publisher model used as the last fallback. Default: [`DEFAULT_BASE_MODEL`].
    pub base_model: String,

    /// Tuned endpoint, either a full resource name
    /// (`projects/P/locations/L/endpoints/ID`) or a bare endpoint id.
    /// Preferred over `base_model` when set.
    pub tuned_endpoint: Option<String>,

    /// Base URL replacing `https://{region}-aiplatform.googleapis.com`.
    pub api_endpoint: Option<String>,

    /// Sampling temperature. Default: 0.3.
    pub temperature: f32,

    /// Nucleus sampling cut-off. Default: 0.95.
    pub top_p: f32,

    /// Top-k sampling cut-off. Default: 40.
    pub top_k: u32,

    /// Maximum generated tokens per file. Default: 2048.
    pub max_output_tokens: u32,

    /// Block threshold applied to every harm category. Default: [`SafetyThreshold::BlockOnlyHigh`].
    pub safety_threshold: SafetyThreshold,

    /// Number of leading PDF pages rasterised and sent. Range: 1–5. Default: 5.
    ///
    /// Each page becomes one inline PNG in the request, so this bounds the
    /// payload size of a single remote call.
    pub max_pdf_pages: usize,

    /// Zoom factor applied when rasterising PDF pages. Default: 2.0.
    pub pdf_scale: f32,

    /// Longest edge of a rendered page in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Explicit pdfium shared library. `None` binds the system library.
    pub pdfium_library: Option<PathBuf>,

    /// Transport timeout for one remote call, in seconds. Default: 120.
    pub api_timeout_secs: u64,
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder::default()
    }

    /// Build a configuration from the process environment.
    ///
    /// Reads `GCP_PROJECT_ID`, `GCP_REGION` (required), `TUNED_MODEL_ID`,
    /// `BASE_MODEL_ID`, `VERTEX_API_ENDPOINT`, `PDFIUM_LIB_PATH` and
    /// `DOCANALYZE_API_TIMEOUT` (seconds).
    pub fn from_env() -> Result<Self, AnalyzerError> {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let mut builder = Self::builder();
        if let Some(v) = var("GCP_PROJECT_ID") {
            builder = builder.project_id(v);
        }
        if let Some(v) = var("GCP_REGION") {
            builder = builder.region(v);
        }
        if let Some(v) = var("TUNED_MODEL_ID") {
            builder = builder.tuned_endpoint(v);
        }
        if let Some(v) = var("BASE_MODEL_ID") {
            builder = builder.base_model(v);
        }
        if let Some(v) = var("VERTEX_API_ENDPOINT") {
            builder = builder.api_endpoint(v);
        }
        if let Some(v) = var("PDFIUM_LIB_PATH") {
            builder = builder.pdfium_library(v);
        }
        if let Some(v) = var("DOCANALYZE_API_TIMEOUT") {
            builder = builder.api_timeout_secs(parse_timeout_secs(&v)?);
        }
        builder.build()
    }
}

fn parse_timeout_secs(raw: &str) -> Result<u64, AnalyzerError> {
    raw.trim().parse().map_err(|_| {
        AnalyzerError::InvalidConfig(format!(
            "DOCANALYZE_API_TIMEOUT must be a whole number of seconds, got '{raw}'"
        ))
    })
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    project_id: Option<String>,
    region: Option<String>,
    config: AnalyzerConfig,
}

impl Default for AnalyzerConfigBuilder {
    fn default() -> Self {
        Self {
            project_id: None,
            region: None,
            config: AnalyzerConfig {
                project_id: String::new(),
                region: String::new(),
                base_model: DEFAULT_BASE_MODEL.to_string(),
                tuned_endpoint: None,
                api_endpoint: None,
                temperature: 0.3,
                top_p: 0.95,
                top_k: 40,
                max_output_tokens: 2048,
                safety_threshold: SafetyThreshold::default(),
                max_pdf_pages: MAX_PDF_PAGES,
                pdf_scale: 2.0,
                max_rendered_pixels: 2000,
                pdfium_library: None,
                api_timeout_secs: 120,
            },
        }
    }
}

impl AnalyzerConfigBuilder {
    pub fn project_id(mut self, id: impl Into<String>) -> Self {
        self.project_id = Some(id.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn base_model(mut self, model: impl Into<String>) -> Self {
        self.config.base_model = model.into();
        self
    }

    pub fn tuned_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.tuned_endpoint = Some(endpoint.into());
        self
    }

    pub fn api_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.api_endpoint = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn top_k(mut self, k: u32) -> Self {
        self.config.top_k = k.max(1);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn safety_threshold(mut self, threshold: SafetyThreshold) -> Self {
        self.config.safety_threshold = threshold;
        self
    }

    pub fn max_pdf_pages(mut self, n: usize) -> Self {
        self.config.max_pdf_pages = n.clamp(1, MAX_PDF_PAGES);
        self
    }

    pub fn pdf_scale(mut self, scale: f32) -> Self {
        self.config.pdf_scale = scale.clamp(0.5, 4.0);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, AnalyzerError> {
        let project_id = self
            .project_id
            .filter(|s| !s.trim().is_empty())
            .ok_or(AnalyzerError::MissingConfig {
                name: "GCP project id",
                env: "GCP_PROJECT_ID",
            })?;
        let region = self
            .region
            .filter(|s| !s.trim().is_empty())
            .ok_or(AnalyzerError::MissingConfig {
                name: "GCP region",
                env: "GCP_REGION",
            })?;

        let mut config = self.config;
        if config.base_model.trim().is_empty() {
            return Err(AnalyzerError::InvalidConfig(
                "base model identifier must not be empty".into(),
            ));
        }
        if config.api_timeout_secs == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        config.tuned_endpoint = config.tuned_endpoint.filter(|s| !s.trim().is_empty());
        config.project_id = project_id.trim().to_string();
        config.region = region.trim().to_string();
        Ok(config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Harm-block threshold sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyThreshold {
    BlockLowAndAbove,
    BlockMediumAndAbove,
    #[default]
    BlockOnlyHigh,
    BlockNone,
}

impl SafetyThreshold {
    /// Wire name understood by Vertex AI.
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyThreshold::BlockLowAndAbove => "BLOCK_LOW_AND_ABOVE",
            SafetyThreshold::BlockMediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
            SafetyThreshold::BlockOnlyHigh => "BLOCK_ONLY_HIGH",
            SafetyThreshold::BlockNone => "BLOCK_NONE",
        }
    }
}

/// Settings for the HTTP front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit for multipart uploads. Default: 32 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings for offline batch runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Default: `results.json`.
    pub output_filename: String,
    /// Instruction sent with every file.
    pub prompt: String,
    /// Embed parsed Markdown sections next to each successful analysis.
    pub include_sections: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("inputs"),
            output_dir: PathBuf::from("outputs"),
            output_filename: "results.json".to_string(),
            prompt: crate::prompts::DEFAULT_BATCH_PROMPT.to_string(),
            include_sections: false,
        }
    }
}

impl BatchConfig {
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> AnalyzerConfigBuilder {
        AnalyzerConfig::builder().project_id("p").region("europe-west4")
    }

    #[test]
    fn defaults() {
        let c = minimal().build().unwrap();
        assert_eq!(c.base_model, DEFAULT_BASE_MODEL);
        assert_eq!(c.max_output_tokens, 2048);
        assert_eq!(c.top_k, 40);
        assert_eq!(c.max_pdf_pages, MAX_PDF_PAGES);
        assert!(c.tuned_endpoint.is_none());
    }

    #[test]
    fn missing_project_is_fatal() {
        let err = AnalyzerConfig::builder().region("r").build().unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::MissingConfig {
                env: "GCP_PROJECT_ID",
                ..
            }
        ));
    }

    #[test]
    fn blank_region_is_fatal() {
        let err = AnalyzerConfig::builder()
            .project_id("p")
            .region("  ")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::MissingConfig {
                env: "GCP_REGION",
                ..
            }
        ));
    }

    #[test]
    fn pdf_page_cap_is_clamped() {
        assert_eq!(minimal().max_pdf_pages(0).build().unwrap().max_pdf_pages, 1);
        assert_eq!(minimal().max_pdf_pages(50).build().unwrap().max_pdf_pages, MAX_PDF_PAGES);
    }

    #[test]
    fn empty_tuned_endpoint_is_dropped() {
        let c = minimal().tuned_endpoint("").build().unwrap();
        assert!(c.tuned_endpoint.is_none());
    }

    #[test]
    fn api_endpoint_trailing_slash_trimmed() {
        let c = minimal().api_endpoint("http://localhost:8080/").build().unwrap();
        assert_eq!(c.api_endpoint.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn timeout_from_text() {
        assert_eq!(parse_timeout_secs(" 30 ").unwrap(), 30);
        assert!(matches!(
            parse_timeout_secs("soon"),
            Err(AnalyzerError::InvalidConfig(_))
        ));
        let err = minimal().api_timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidConfig(_)));
    }

    #[test]
    fn threshold_wire_names() {
        assert_eq!(SafetyThreshold::default().as_str(), "BLOCK_ONLY_HIGH");
        let json = serde_json::to_string(&SafetyThreshold::BlockNone).unwrap();
        assert_eq!(json, "\"BLOCK_NONE\"");
    }
}
