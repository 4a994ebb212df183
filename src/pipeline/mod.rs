//! Per-file analysis pipeline.
//!
//! Stages:
//! 1. [`classify`]: detect the content kind and load the file
//!    ([`render`] and [`encode`] rasterise PDFs)
//! 2. [`assemble`]: ordered content parts, model target, request settings
//! 3. remote call through [`crate::vertex::GenerativeModel`]
//! 4. [`normalize`]: reply to text or per-file error

pub mod assemble;
pub mod classify;
pub mod encode;
pub mod normalize;
pub mod render;

use classify::LoadedContent;
use std::path::PathBuf;

/// Everything needed to analyse one file. Built once, consumed by the call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub path: PathBuf,
    pub filename: String,
    pub content: LoadedContent,
    pub prompt: String,
}

impl AnalysisRequest {
    pub fn into_parts(self) -> Vec<assemble::ContentPart> {
        assemble::content_parts(&self.prompt, self.content)
    }
}
