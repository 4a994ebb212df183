//! Wire types for the Vertex AI `generateContent` REST method.
//!
//! Field names follow the JSON API (camelCase). Response types derive
//! `Default` and tolerate missing fields: a blocked reply may carry no
//! candidates, and a stopped candidate may carry no content.

use serde::{Deserialize, Serialize};

/// Finish reason of a normally completed generation.
pub const FINISH_REASON_STOP: &str = "STOP";

/// Harm categories covered by the safety settings of every request.
pub const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HARASSMENT",
];

// ── Request ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

impl GenerateRequest {
    /// Total number of parts across all turns.
    pub fn part_count(&self) -> usize {
        self.contents.iter().map(|c| c.parts.len()).sum()
    }
}

/// One conversation turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A text or inline-binary part. Exactly one field is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: impl Into<String>, base64_data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(Blob {
                mime_type: mime_type.into(),
                data: base64_data,
            }),
        }
    }
}

/// Base64-encoded bytes with their MIME type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

// ── Response ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
}

impl GenerateResponse {
    /// A reply carrying a single candidate that stopped normally.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: "model".to_string(),
                    parts: vec![Part::text(text)],
                }),
                finish_reason: Some(FINISH_REASON_STOP.to_string()),
                safety_ratings: Vec::new(),
            }],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

impl Candidate {
    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyRating {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub probability: String,
    #[serde(default)]
    pub blocked: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason_message: Option<String>,
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

impl PromptFeedback {
    /// Human-readable description when the prompt was blocked.
    pub fn block_description(&self) -> Option<String> {
        let reason = self.block_reason.as_deref()?;
        if reason.is_empty() || reason == "BLOCKED_REASON_UNSPECIFIED" {
            return None;
        }
        Some(match self.block_reason_message.as_deref() {
            Some(msg) if !msg.is_empty() => format!("{reason} ({msg})"),
            _ => reason.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialises_camel_case() {
        let req = GenerateRequest {
            contents: vec![Content {
                role: "user".into(),
                parts: vec![Part::text("hi"), Part::inline("image/png", "AAAA".into())],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: 2048,
                temperature: 0.3,
                top_p: 0.95,
                top_k: 40,
            },
            safety_settings: vec![SafetySetting {
                category: HARM_CATEGORIES[0].into(),
                threshold: "BLOCK_ONLY_HIGH".into(),
            }],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert!(json["contents"][0]["parts"][0].get("inlineData").is_none());
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["safetySettings"][0]["threshold"], "BLOCK_ONLY_HIGH");
        assert_eq!(req.part_count(), 2);
    }

    #[test]
    fn blocked_reply_without_candidates_decodes() {
        let reply: GenerateResponse = serde_json::from_str(
            r#"{"promptFeedback":{"blockReason":"SAFETY","blockReasonMessage":"unsafe"}}"#,
        )
        .unwrap();
        assert!(reply.candidates.is_empty());
        let feedback = reply.prompt_feedback.unwrap();
        assert_eq!(feedback.block_description().as_deref(), Some("SAFETY (unsafe)"));
    }

    #[test]
    fn candidate_text_joins_parts() {
        let reply: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"a"},{"text":"b"}]},"finishReason":"STOP"}],
                "usageMetadata":{"promptTokenCount":3,"candidatesTokenCount":2,"totalTokenCount":5}}"#,
        )
        .unwrap();
        assert_eq!(reply.candidates[0].text(), "ab");
        assert_eq!(reply.usage_metadata.unwrap().total_token_count, 5);
    }

    #[test]
    fn unspecified_block_reason_is_ignored() {
        let fb = PromptFeedback {
            block_reason: Some("BLOCKED_REASON_UNSPECIFIED".into()),
            ..PromptFeedback::default()
        };
        assert!(fb.block_description().is_none());
    }
}
