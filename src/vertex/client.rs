//! Vertex AI REST client.

use super::auth::Credentials;
use super::types::{GenerateRequest, GenerateResponse};
use super::GenerativeModel;
use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, RemoteError};
use crate::pipeline::assemble::{ModelKind, ModelTarget};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Longest error body kept from a failed HTTP response.
const MAX_ERROR_BODY: usize = 500;

/// Calls `generateContent` on publisher models and tuned endpoints.
pub struct VertexClient {
    http: reqwest::Client,
    credentials: Credentials,
    project_id: String,
    region: String,
    api_endpoint: Option<String>,
}

impl VertexClient {
    /// Create a client for the configured project and region.
    ///
    /// No network traffic happens here; credentials are resolved on the
    /// first call.
    pub fn new(config: &AnalyzerConfig, credentials: Credentials) -> Result<Self, AnalyzerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| AnalyzerError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            credentials,
            project_id: config.project_id.clone(),
            region: config.region.clone(),
            api_endpoint: config.api_endpoint.clone(),
        })
    }

    fn host_for(&self, location: &str) -> String {
        match &self.api_endpoint {
            Some(base) => base.clone(),
            None => format!("https://{location}-aiplatform.googleapis.com"),
        }
    }

    /// Resolve the `generateContent` URL for a target.
    ///
    /// Accepted identifiers:
    /// * base model: `gemini-2.0-flash-lite-001` or
    ///   `publishers/{publisher}/models/{model}`
    /// * tuned endpoint: a numeric endpoint id, or
    ///   `projects/{project}/locations/{location}/endpoints/{id}`
    pub fn endpoint_url(&self, target: &ModelTarget) -> Result<String, RemoteError> {
        let id = target.identifier.trim();
        let invalid = |detail: &str| RemoteError::InvalidTarget {
            identifier: target.identifier.clone(),
            detail: detail.to_string(),
        };
        if id.is_empty() {
            return Err(invalid("identifier is empty"));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(invalid("identifier contains whitespace"));
        }

        let (location, resource) = match target.kind {
            ModelKind::BaseModel => {
                let segments: Vec<&str> = id.split('/').collect();
                let resource = match segments.as_slice() {
                    [model] => format!(
                        "projects/{}/locations/{}/publishers/google/models/{model}",
                        self.project_id, self.region
                    ),
                    ["publishers", publisher, "models", model]
                        if !publisher.is_empty() && !model.is_empty() =>
                    {
                        format!(
                            "projects/{}/locations/{}/publishers/{publisher}/models/{model}",
                            self.project_id, self.region
                        )
                    }
                    _ => return Err(invalid("expected a model name or publishers/{p}/models/{m}")),
                };
                (self.region.as_str(), resource)
            }
            ModelKind::TunedEndpoint => {
                if id.chars().all(|c| c.is_ascii_digit()) {
                    (
                        self.region.as_str(),
                        format!(
                            "projects/{}/locations/{}/endpoints/{id}",
                            self.project_id, self.region
                        ),
                    )
                } else {
                    let segments: Vec<&str> = id.split('/').collect();
                    match segments.as_slice() {
                        ["projects", project, "locations", location, "endpoints", endpoint]
                            if !project.is_empty()
                                && !location.is_empty()
                                && !endpoint.is_empty() =>
                        {
                            (*location, id.to_string())
                        }
                        _ => {
                            return Err(invalid(
                                "expected an endpoint id or projects/{p}/locations/{l}/endpoints/{id}",
                            ))
                        }
                    }
                }
            }
        };

        Ok(format!(
            "{}/v1/{resource}:generateContent",
            self.host_for(location)
        ))
    }
}

#[async_trait]
impl GenerativeModel for VertexClient {
    async fn generate(
        &self,
        target: &ModelTarget,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, RemoteError> {
        let url = self.endpoint_url(target)?;
        let token = self.credentials.bearer_token(&self.http).await?;

        debug!("POST {} ({} parts)", url, request.part_count());
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    fn name(&self) -> &str {
        "vertex-ai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_endpoint: Option<&str>) -> VertexClient {
        let mut builder = AnalyzerConfig::builder().project_id("proj").region("europe-west4");
        if let Some(url) = api_endpoint {
            builder = builder.api_endpoint(url);
        }
        VertexClient::new(&builder.build().unwrap(), Credentials::Missing).unwrap()
    }

    #[test]
    fn base_model_url() {
        let url = client(None)
            .endpoint_url(&ModelTarget::base("gemini-2.0-flash-lite-001"))
            .unwrap();
        assert_eq!(
            url,
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/proj/locations/europe-west4/publishers/google/models/gemini-2.0-flash-lite-001:generateContent"
        );
    }

    #[test]
    fn publisher_qualified_model_url() {
        let url = client(None)
            .endpoint_url(&ModelTarget::base("publishers/google/models/gemini-pro"))
            .unwrap();
        assert!(url.ends_with("/locations/europe-west4/publishers/google/models/gemini-pro:generateContent"));
    }

    #[test]
    fn numeric_endpoint_uses_configured_project() {
        let url = client(None)
            .endpoint_url(&ModelTarget::tuned("1234567890"))
            .unwrap();
        assert_eq!(
            url,
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/proj/locations/europe-west4/endpoints/1234567890:generateContent"
        );
    }

    #[test]
    fn full_endpoint_name_uses_its_own_location() {
        let url = client(None)
            .endpoint_url(&ModelTarget::tuned("projects/other/locations/us-central1/endpoints/42"))
            .unwrap();
        assert_eq!(
            url,
            "https://us-central1-aiplatform.googleapis.com/v1/projects/other/locations/us-central1/endpoints/42:generateContent"
        );
    }

    #[test]
    fn api_endpoint_override() {
        let url = client(Some("http://localhost:9000/"))
            .endpoint_url(&ModelTarget::base("m"))
            .unwrap();
        assert!(url.starts_with("http://localhost:9000/v1/projects/proj/"), "got {url}");
    }

    #[test]
    fn malformed_targets_are_init_failures() {
        let c = client(None);
        for target in [
            ModelTarget::base(""),
            ModelTarget::base("a/b"),
            ModelTarget::base("gemini pro"),
            ModelTarget::tuned("projects/p/endpoints/1"),
        ] {
            let err = c.endpoint_url(&target).unwrap_err();
            assert!(err.is_init_failure(), "{target:?} gave {err}");
        }
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_sending() {
        let c = client(Some("http://127.0.0.1:9"));
        let req = crate::pipeline::assemble::build_request(
            vec![crate::pipeline::assemble::ContentPart::Text("hi".into())],
            &AnalyzerConfig::builder().project_id("p").region("r").build().unwrap(),
        );
        let err = c.generate(&ModelTarget::base("m"), &req).await.unwrap_err();
        assert!(matches!(err, RemoteError::Auth(_)));
    }
}
