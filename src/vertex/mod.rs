//! Hosted generative model access.
//!
//! [`GenerativeModel`] is the seam between the pipeline and the remote
//! service. [`VertexClient`] is the production implementation; tests plug in
//! scripted models.

pub mod auth;
pub mod client;
pub mod types;

pub use auth::Credentials;
pub use client::VertexClient;
pub use types::{GenerateRequest, GenerateResponse};

use crate::error::RemoteError;
use crate::pipeline::assemble::ModelTarget;
use async_trait::async_trait;

/// A remote model that turns an ordered list of content parts into text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Run one generation against `target`. No retries.
    async fn generate(
        &self,
        target: &ModelTarget,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, RemoteError>;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}
