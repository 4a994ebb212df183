//! Shared helpers: a scripted in-process model and config builders.

#![allow(dead_code)]

use async_trait::async_trait;
use docanalyze::error::RemoteError;
use docanalyze::vertex::types::{Candidate, Content, Part};
use docanalyze::vertex::{GenerateRequest, GenerateResponse, GenerativeModel};
use docanalyze::{Analyzer, AnalyzerConfig, ModelTarget};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Marker that makes [`ScriptedModel`] answer with a SAFETY stop.
pub const BLOCK_MARKER: &str = "BLOCK_THIS_FILE";

/// Replies with a fixed text, or a SAFETY stop when any text part contains
/// [`BLOCK_MARKER`]. Counts calls and remembers the targets it was asked for.
#[derive(Default)]
pub struct ScriptedModel {
    pub reply: String,
    pub calls: AtomicUsize,
    pub targets: Mutex<Vec<String>>,
    pub part_counts: Mutex<Vec<usize>>,
}

impl ScriptedModel {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: text.to_string(),
            ..Self::default()
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn safety_stop() -> GenerateResponse {
    GenerateResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                role: "model".into(),
                parts: vec![Part::text("partial")],
            }),
            finish_reason: Some("SAFETY".into()),
            safety_ratings: Vec::new(),
        }],
        ..GenerateResponse::default()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(
        &self,
        target: &ModelTarget,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().unwrap().push(target.identifier.clone());
        self.part_counts.lock().unwrap().push(request.part_count());

        let blocked = request
            .contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .any(|t| t.contains(BLOCK_MARKER));
        if blocked {
            Ok(safety_stop())
        } else {
            Ok(GenerateResponse::from_text(self.reply.clone()))
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn test_config() -> AnalyzerConfig {
    AnalyzerConfig::builder()
        .project_id("test-project")
        .region("europe-west4")
        .build()
        .unwrap()
}

pub fn analyzer_with(model: Arc<ScriptedModel>) -> Analyzer {
    Analyzer::new(model, test_config())
}
