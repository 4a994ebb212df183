//! Request assembly: ordered content parts, model target resolution and the
//! generation/safety configuration sent with every call.

use super::classify::LoadedContent;
use super::encode::to_base64;
use crate::config::AnalyzerConfig;
use crate::prompts::ANALYSIS_TEMPLATE;
use crate::vertex::types::{
    Content, GenerateRequest, GenerationConfig, Part, SafetySetting, HARM_CATEGORIES,
};
use std::fmt;

/// One unit of model input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

impl ContentPart {
    fn into_wire(self) -> Part {
        match self {
            ContentPart::Text(text) => Part::text(text),
            ContentPart::InlineData { mime_type, data } => Part::inline(mime_type, to_base64(&data)),
        }
    }
}

/// Order of parts: user instruction, file content, structural template.
pub fn content_parts(prompt: &str, content: LoadedContent) -> Vec<ContentPart> {
    let mut parts = Vec::new();
    let prompt = prompt.trim();
    if !prompt.is_empty() {
        parts.push(ContentPart::Text(prompt.to_string()));
    }
    match content {
        LoadedContent::Text(text) => parts.push(ContentPart::Text(text)),
        LoadedContent::Image { mime_type, bytes } => parts.push(ContentPart::InlineData {
            mime_type,
            data: bytes,
        }),
        LoadedContent::PdfPages(pages) => {
            parts.extend(pages.into_iter().map(|p| ContentPart::InlineData {
                mime_type: "image/png".to_string(),
                data: p.png,
            }));
        }
    }
    parts.push(ContentPart::Text(ANALYSIS_TEMPLATE.to_string()));
    parts
}

/// Wrap parts in a single user turn with the configured sampling and safety
/// settings.
pub fn build_request(parts: Vec<ContentPart>, config: &AnalyzerConfig) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts: parts.into_iter().map(ContentPart::into_wire).collect(),
        }],
        generation_config: GenerationConfig {
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
        },
        safety_settings: HARM_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: category.to_string(),
                threshold: config.safety_threshold.as_str().to_string(),
            })
            .collect(),
    }
}

// ── Model targets ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    BaseModel,
    TunedEndpoint,
}

/// The model a request is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTarget {
    pub identifier: String,
    pub kind: ModelKind,
}

impl ModelTarget {
    pub fn base(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            kind: ModelKind::BaseModel,
        }
    }

    pub fn tuned(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            kind: ModelKind::TunedEndpoint,
        }
    }

    /// Classify a free-form identifier: endpoint resource names and numeric
    /// ids are tuned endpoints, anything else is a base model.
    pub fn infer(identifier: &str) -> Self {
        let id = identifier.trim();
        let numeric = !id.is_empty() && id.chars().all(|c| c.is_ascii_digit());
        if numeric || id.contains("/endpoints/") {
            Self::tuned(id)
        } else {
            Self::base(id)
        }
    }
}

impl fmt::Display for ModelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ModelKind::BaseModel => write!(f, "base model {}", self.identifier),
            ModelKind::TunedEndpoint => write!(f, "tuned endpoint {}", self.identifier),
        }
    }
}

/// Model selection: caller override, then tuned endpoint, then base model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPolicy {
    tuned: Option<String>,
    base: String,
}

impl ModelPolicy {
    pub fn new(tuned: Option<String>, base: impl Into<String>) -> Self {
        Self {
            tuned: tuned.filter(|t| !t.trim().is_empty()),
            base: base.into(),
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(config.tuned_endpoint.clone(), config.base_model.clone())
    }

    /// Candidates in precedence order; the last one is always the base model.
    pub fn candidates(&self, override_id: Option<&str>) -> Vec<ModelTarget> {
        let override_target = override_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ModelTarget::infer);
        let tuned = self.tuned.as_deref().map(|t| ModelTarget::tuned(t.trim()));
        [override_target, tuned, Some(ModelTarget::base(self.base.clone()))]
            .into_iter()
            .flatten()
            .collect()
    }

    /// The first candidate. Evaluated once per request.
    pub fn resolve(&self, override_id: Option<&str>) -> ModelTarget {
        self.candidates(override_id)
            .into_iter()
            .next()
            .unwrap_or_else(|| ModelTarget::base(self.base.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::classify::PagePng;

    fn config() -> AnalyzerConfig {
        AnalyzerConfig::builder().project_id("p").region("r").build().unwrap()
    }

    #[test]
    fn part_order_for_text() {
        let parts = content_parts("summarize", LoadedContent::Text("hello".into()));
        assert_eq!(
            parts,
            vec![
                ContentPart::Text("summarize".into()),
                ContentPart::Text("hello".into()),
                ContentPart::Text(ANALYSIS_TEMPLATE.into()),
            ]
        );
    }

    #[test]
    fn one_inline_part_per_pdf_page() {
        let pages = (1..=3)
            .map(|page| PagePng {
                page,
                png: vec![page as u8],
            })
            .collect();
        let parts = content_parts("describe", LoadedContent::PdfPages(pages));
        assert_eq!(parts.len(), 5);
        assert!(matches!(&parts[2], ContentPart::InlineData { mime_type, data } if mime_type == "image/png" && data == &vec![2u8]));
    }

    #[test]
    fn blank_prompt_is_omitted() {
        let parts = content_parts(
            "  ",
            LoadedContent::Image {
                mime_type: "image/jpeg".into(),
                bytes: vec![1, 2, 3],
            },
        );
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[0], ContentPart::InlineData { .. }));
    }

    #[test]
    fn request_carries_generation_and_safety_settings() {
        let req = build_request(
            vec![ContentPart::InlineData {
                mime_type: "image/png".into(),
                data: vec![0, 1, 2],
            }],
            &config(),
        );
        assert_eq!(req.contents[0].role, "user");
        let blob = req.contents[0].parts[0].inline_data.as_ref().unwrap();
        assert_eq!(blob.data, "AAEC");
        assert_eq!(req.generation_config.max_output_tokens, 2048);
        assert_eq!(req.generation_config.top_k, 40);
        assert_eq!(req.safety_settings.len(), 4);
        assert!(req.safety_settings.iter().all(|s| s.threshold == "BLOCK_ONLY_HIGH"));
    }

    #[test]
    fn policy_precedence() {
        let policy = ModelPolicy::new(Some("987".into()), "gemini-base");
        assert_eq!(policy.resolve(Some("gemini-x")), ModelTarget::base("gemini-x"));
        assert_eq!(policy.resolve(None), ModelTarget::tuned("987"));
        assert_eq!(policy.resolve(Some("   ")), ModelTarget::tuned("987"));

        let untuned = ModelPolicy::new(Some(String::new()), "gemini-base");
        assert_eq!(untuned.resolve(None), ModelTarget::base("gemini-base"));
        assert_eq!(untuned.candidates(None).len(), 1);
    }

    #[test]
    fn override_kind_is_inferred() {
        assert_eq!(ModelTarget::infer("1234").kind, ModelKind::TunedEndpoint);
        assert_eq!(
            ModelTarget::infer("projects/p/locations/l/endpoints/9").kind,
            ModelKind::TunedEndpoint
        );
        assert_eq!(ModelTarget::infer("gemini-1.5-pro-002").kind, ModelKind::BaseModel);
    }

    #[test]
    fn policy_from_config_uses_default_base() {
        let policy = ModelPolicy::from_config(&config());
        assert_eq!(
            policy.resolve(None),
            ModelTarget::base(crate::config::DEFAULT_BASE_MODEL)
        );
    }
}
