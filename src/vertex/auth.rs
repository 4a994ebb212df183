//! OAuth2 bearer tokens for Vertex AI.
//!
//! Two sources are supported: a pre-issued access token (`GCP_ACCESS_TOKEN`,
//! e.g. from `gcloud auth print-access-token`) and a service-account key file
//! (`GOOGLE_APPLICATION_CREDENTIALS`) exchanged through the JWT-bearer grant.
//! Exchanged tokens are cached for 55 minutes.
//!
//! Missing credentials are not an error at construction time: the first call
//! fails with [`RemoteError::Auth`], which the normaliser reports per file.

use crate::error::RemoteError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info};

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME: Duration = Duration::from_secs(55 * 60);
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Where bearer tokens come from.
#[derive(Debug)]
pub enum Credentials {
    /// A fixed, pre-issued access token.
    AccessToken(String),
    /// A service-account key file exchanged for short-lived tokens.
    ServiceAccount(ServiceAccountAuth),
    /// Nothing configured.
    Missing,
}

impl Credentials {
    /// Resolve credentials from `GCP_ACCESS_TOKEN`, then
    /// `GOOGLE_APPLICATION_CREDENTIALS`.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        if let Some(token) = var("GCP_ACCESS_TOKEN") {
            info!("Using access token from GCP_ACCESS_TOKEN");
            return Credentials::AccessToken(token.trim().to_string());
        }
        if let Some(path) = var("GOOGLE_APPLICATION_CREDENTIALS") {
            info!("Using service account key {}", path);
            return Credentials::ServiceAccount(ServiceAccountAuth::new(path));
        }
        Credentials::Missing
    }

    /// A token valid for at least the next minute.
    pub async fn bearer_token(&self, http: &reqwest::Client) -> Result<String, RemoteError> {
        match self {
            Credentials::AccessToken(token) => Ok(token.clone()),
            Credentials::ServiceAccount(sa) => sa.token(http).await,
            Credentials::Missing => Err(RemoteError::Auth(
                "no credentials configured (set GCP_ACCESS_TOKEN or GOOGLE_APPLICATION_CREDENTIALS)"
                    .to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Service-account key file with a cached access token.
#[derive(Debug)]
pub struct ServiceAccountAuth {
    key_path: PathBuf,
    token: RwLock<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountAuth {
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
            token: RwLock::new(None),
        }
    }

    async fn token(&self, http: &reqwest::Client) -> Result<String, RemoteError> {
        {
            let cached = self.token.read().await;
            if let Some(ref t) = *cached {
                if t.expires_at > Instant::now() + REFRESH_MARGIN {
                    return Ok(t.access_token.clone());
                }
            }
        }

        let fresh = self.exchange(http).await?;
        *self.token.write().await = Some(CachedToken {
            access_token: fresh.clone(),
            expires_at: Instant::now() + TOKEN_LIFETIME,
        });
        Ok(fresh)
    }

    async fn exchange(&self, http: &reqwest::Client) -> Result<String, RemoteError> {
        let raw = tokio::fs::read_to_string(&self.key_path).await.map_err(|e| {
            RemoteError::Auth(format!(
                "cannot read service account key {}: {e}",
                self.key_path.display()
            ))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)
            .map_err(|e| RemoteError::Auth(format!("invalid service account key: {e}")))?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let assertion = sign_assertion(&key, now)?;

        debug!("Exchanging JWT assertion for {}", key.client_email);
        let response = http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| RemoteError::Auth(format!("token exchange request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Auth(format!(
                "token exchange failed ({status}): {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Auth(format!("invalid token response: {e}")))?;
        Ok(token.access_token)
    }
}

/// Build and RS256-sign the JWT-bearer assertion.
fn sign_assertion(key: &ServiceAccountKey, now: u64) -> Result<String, RemoteError> {
    let claims = serde_json::json!({
        "iss": key.client_email,
        "scope": CLOUD_PLATFORM_SCOPE,
        "aud": key.token_uri,
        "iat": now,
        "exp": now + 3600,
    });
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    let signing_input = format!("{header}.{payload}");

    let pem_text = key.private_key.replace("\\n", "\n");
    let der = pem::parse(&pem_text)
        .map_err(|e| RemoteError::Auth(format!("cannot parse private key PEM: {e}")))?;
    let key_pair = ring::signature::RsaKeyPair::from_pkcs8(der.contents())
        .map_err(|e| RemoteError::Auth(format!("unsupported private key: {e}")))?;

    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &ring::signature::RSA_PKCS1_SHA256,
            &ring::rand::SystemRandom::new(),
            signing_input.as_bytes(),
            &mut signature,
        )
        .map_err(|_| RemoteError::Auth("failed to sign JWT assertion".to_string()))?;

    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(&signature)))
}
